//! Key-value table descriptor.

use crate::error::SynthError;
use crate::logical_id::LogicalId;
use crate::reference::Reference;
use crate::resource::{RemovalPolicy, Resource, ResourceType};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    String,
    Number,
    Binary,
}

impl KeyType {
    /// Attribute type code used in the table's attribute definitions.
    pub fn attribute_type(&self) -> &'static str {
        match self {
            KeyType::String => "S",
            KeyType::Number => "N",
            KeyType::Binary => "B",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionKey {
    pub name: String,
    pub key_type: KeyType,
}

impl PartitionKey {
    pub fn new(name: &str, key_type: KeyType) -> Self {
        PartitionKey {
            name: name.to_owned(),
            key_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    /// On-demand; no capacity is reserved.
    PayPerRequest,
    Provisioned {
        read_capacity: u64,
        write_capacity: u64,
    },
}

impl BillingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingMode::PayPerRequest => "PAY_PER_REQUEST",
            BillingMode::Provisioned { .. } => "PROVISIONED",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub id: LogicalId,
    pub partition_key: PartitionKey,
    pub billing_mode: BillingMode,
    pub removal_policy: RemovalPolicy,
}

impl TableSpec {
    /// An on-demand table that is retained when removed from the stack.
    pub fn new(id: LogicalId, partition_key: PartitionKey) -> Self {
        TableSpec {
            id,
            partition_key,
            billing_mode: BillingMode::PayPerRequest,
            removal_policy: RemovalPolicy::Retain,
        }
    }

    pub fn with_billing_mode(mut self, billing_mode: BillingMode) -> Self {
        self.billing_mode = billing_mode;
        self
    }

    pub fn with_removal_policy(mut self, removal_policy: RemovalPolicy) -> Self {
        self.removal_policy = removal_policy;
        self
    }

    pub fn validate(&self) -> Result<(), SynthError> {
        if self.partition_key.name.is_empty() {
            return Err(SynthError::configuration(
                "partition_key",
                format!("table '{}' has an empty partition key name", self.id),
            ));
        }
        if let BillingMode::Provisioned {
            read_capacity,
            write_capacity,
        } = self.billing_mode
        {
            if read_capacity == 0 || write_capacity == 0 {
                return Err(SynthError::configuration(
                    "billing_mode",
                    format!(
                        "table '{}' is provisioned but has zero read or write capacity",
                        self.id
                    ),
                ));
            }
        }
        Ok(())
    }

    /// The engine-assigned table name.
    pub fn table_name(&self) -> Reference {
        Reference::name_of(&self.id)
    }

    pub fn arn(&self) -> Reference {
        Reference::attribute_of(&self.id, "Arn")
    }

    pub fn to_resource(&self) -> Resource {
        let mut properties = json!({
            "AttributeDefinitions": [{
                "AttributeName": self.partition_key.name,
                "AttributeType": self.partition_key.key_type.attribute_type(),
            }],
            "BillingMode": self.billing_mode.as_str(),
            "KeySchema": [{
                "AttributeName": self.partition_key.name,
                "KeyType": "HASH",
            }],
        });
        if let BillingMode::Provisioned {
            read_capacity,
            write_capacity,
        } = self.billing_mode
        {
            properties["ProvisionedThroughput"] = json!({
                "ReadCapacityUnits": read_capacity,
                "WriteCapacityUnits": write_capacity,
            });
        }
        Resource::new(self.id.clone(), ResourceType::Table, properties)
            .with_removal_policy(self.removal_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableSpec {
        TableSpec::new(
            LogicalId::allocate(&["VisitorTimeTable"]),
            PartitionKey::new("key", KeyType::String),
        )
    }

    #[test]
    fn test_on_demand_table_has_no_throughput() {
        let r = table().to_resource();
        assert_eq!(r.properties["BillingMode"], "PAY_PER_REQUEST");
        assert!(r.properties.get("ProvisionedThroughput").is_none());
        assert_eq!(r.properties["KeySchema"][0]["KeyType"], "HASH");
        assert_eq!(r.properties["AttributeDefinitions"][0]["AttributeType"], "S");
        assert!(r.retained());
    }

    #[test]
    fn test_provisioned_table_emits_capacity() {
        let r = table()
            .with_billing_mode(BillingMode::Provisioned {
                read_capacity: 5,
                write_capacity: 2,
            })
            .to_resource();
        assert_eq!(r.properties["BillingMode"], "PROVISIONED");
        assert_eq!(r.properties["ProvisionedThroughput"]["ReadCapacityUnits"], 5);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let t = table().with_billing_mode(BillingMode::Provisioned {
            read_capacity: 0,
            write_capacity: 1,
        });
        let err = t.validate().unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
    }

    #[test]
    fn test_table_name_is_symbolic() {
        let t = table();
        assert_eq!(t.table_name(), Reference::Ref(t.id.clone()));
    }
}
