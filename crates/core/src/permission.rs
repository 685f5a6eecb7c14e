//! Permission resolver: turns a read/write grant into a policy document.
//!
//! Resolution is a pure function of its inputs. The same binding always
//! yields the same document, so the engine sees a re-applied grant as a no-op.

use crate::logical_id::LogicalId;
use crate::reference::Reference;
use crate::resource::{Resource, ResourceType};
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// Item-level read operations. Never includes table management.
pub const READ_ACTIONS: &[&str] = &[
    "dynamodb:BatchGetItem",
    "dynamodb:ConditionCheckItem",
    "dynamodb:DescribeTable",
    "dynamodb:GetItem",
    "dynamodb:GetRecords",
    "dynamodb:GetShardIterator",
    "dynamodb:Query",
    "dynamodb:Scan",
];

/// Item-level write operations. `DeleteItem` removes an item, not the table.
pub const WRITE_ACTIONS: &[&str] = &[
    "dynamodb:BatchWriteItem",
    "dynamodb:DeleteItem",
    "dynamodb:DescribeTable",
    "dynamodb:PutItem",
    "dynamodb:UpdateItem",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    Read,
    Write,
}

impl Action {
    pub fn provider_actions(&self) -> &'static [&'static str] {
        match self {
            Action::Read => READ_ACTIONS,
            Action::Write => WRITE_ACTIONS,
        }
    }
}

/// A grant from a function's execution identity to a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionBinding {
    pub grantor: LogicalId,
    pub grantee: LogicalId,
    pub actions: BTreeSet<Action>,
}

impl PermissionBinding {
    pub fn read_write(grantor: &LogicalId, grantee: &LogicalId) -> Self {
        PermissionBinding {
            grantor: grantor.clone(),
            grantee: grantee.clone(),
            actions: [Action::Read, Action::Write].into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStatement {
    /// Statement id naming the grantor the statement was resolved for.
    pub sid: String,
    pub actions: Vec<String>,
    pub resources: Vec<Reference>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    pub statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn to_json(&self) -> Value {
        let statements: Vec<Value> = self
            .statements
            .iter()
            .map(|s| {
                let resources: Vec<Value> = s.resources.iter().map(Reference::to_json).collect();
                json!({
                    "Action": s.actions,
                    "Effect": "Allow",
                    "Resource": resources,
                    "Sid": s.sid,
                })
            })
            .collect();
        json!({
            "Statement": statements,
            "Version": "2012-10-17",
        })
    }

    /// Every provider action granted by the document.
    pub fn granted_actions(&self) -> BTreeSet<&str> {
        self.statements
            .iter()
            .flat_map(|s| s.actions.iter().map(String::as_str))
            .collect()
    }
}

/// Resolve `binding` into a single-statement document scoped to `table_arn`.
/// Actions are de-duplicated and sorted; the statement id is taken from the
/// grantor, which is attached to the document through its execution role.
pub fn resolve_grant(binding: &PermissionBinding, table_arn: &Reference) -> PolicyDocument {
    let actions: BTreeSet<&str> = binding
        .actions
        .iter()
        .flat_map(|a| a.provider_actions().iter().copied())
        .collect();
    PolicyDocument {
        statements: vec![PolicyStatement {
            sid: statement_id(&binding.grantor),
            actions: actions.into_iter().map(str::to_owned).collect(),
            resources: vec![table_arn.clone()],
        }],
    }
}

/// `Grant` followed by the grantor's logical id; statement ids are alphanumeric.
fn statement_id(grantor: &LogicalId) -> String {
    format!("Grant{}", grantor.as_str())
}

/// The policy resource attaching `document` to the execution role.
pub fn grant_policy(id: &LogicalId, role: &LogicalId, document: &PolicyDocument) -> Resource {
    let properties = json!({
        "PolicyDocument": document.to_json(),
        "PolicyName": id.as_str(),
        "Roles": [Reference::name_of(role).to_json()],
    });
    Resource::new(id.clone(), ResourceType::Policy, properties)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding() -> PermissionBinding {
        PermissionBinding::read_write(
            &LogicalId::allocate(&["Fn"]),
            &LogicalId::allocate(&["Table"]),
        )
    }

    #[test]
    fn test_read_write_grant_excludes_admin_actions() {
        let table = LogicalId::allocate(&["Table"]);
        let doc = resolve_grant(&binding(), &Reference::attribute_of(&table, "Arn"));
        let actions = doc.granted_actions();
        assert!(actions.contains("dynamodb:GetItem"));
        assert!(actions.contains("dynamodb:PutItem"));
        for forbidden in ["dynamodb:DeleteTable", "dynamodb:CreateTable", "dynamodb:*", "*"] {
            assert!(!actions.contains(forbidden), "{} must not be granted", forbidden);
        }
    }

    #[test]
    fn test_describe_table_listed_once() {
        let table = LogicalId::allocate(&["Table"]);
        let doc = resolve_grant(&binding(), &Reference::attribute_of(&table, "Arn"));
        let count = doc.statements[0]
            .actions
            .iter()
            .filter(|a| *a == "dynamodb:DescribeTable")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let table = LogicalId::allocate(&["Table"]);
        let arn = Reference::attribute_of(&table, "Arn");
        assert_eq!(resolve_grant(&binding(), &arn), resolve_grant(&binding(), &arn));
    }

    #[test]
    fn test_statement_names_the_grantor() {
        let table = LogicalId::allocate(&["Table"]);
        let b = binding();
        let doc = resolve_grant(&b, &Reference::attribute_of(&table, "Arn"));
        assert_eq!(doc.statements[0].sid, format!("Grant{}", b.grantor));
        assert_eq!(doc.to_json()["Statement"][0]["Sid"], format!("Grant{}", b.grantor));

        let other = PermissionBinding::read_write(&LogicalId::allocate(&["Other"]), &table);
        let other_doc = resolve_grant(&other, &Reference::attribute_of(&table, "Arn"));
        assert_ne!(doc.statements[0].sid, other_doc.statements[0].sid);
    }

    #[test]
    fn test_read_only_grant_has_no_writes() {
        let mut b = binding();
        b.actions.remove(&Action::Write);
        let table = LogicalId::allocate(&["Table"]);
        let doc = resolve_grant(&b, &Reference::attribute_of(&table, "Arn"));
        assert!(!doc.granted_actions().contains("dynamodb:PutItem"));
    }
}
