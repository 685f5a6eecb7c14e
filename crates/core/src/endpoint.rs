//! Endpoint publisher: the public function URL.
//!
//! The published policy is fixed: no authentication, any origin, any method,
//! any header. Anyone can invoke the function without credentials, and the
//! builder has no option to narrow it.

use crate::logical_id::LogicalId;
use crate::reference::Reference;
use crate::resource::{Resource, ResourceType};
use serde_json::{json, Value};
use std::collections::BTreeSet;

pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    None,
    AwsIam,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::None => "NONE",
            AuthType::AwsIam => "AWS_IAM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpMethod {
    All,
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::All => WILDCARD,
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    pub allowed_origins: BTreeSet<String>,
    pub allowed_methods: BTreeSet<HttpMethod>,
    pub allowed_headers: BTreeSet<String>,
}

impl CorsPolicy {
    /// Any origin, any method, any header.
    pub fn open() -> Self {
        CorsPolicy {
            allowed_origins: [WILDCARD.to_owned()].into_iter().collect(),
            allowed_methods: [HttpMethod::All].into_iter().collect(),
            allowed_headers: [WILDCARD.to_owned()].into_iter().collect(),
        }
    }

    pub fn to_json(&self) -> Value {
        let methods: Vec<&str> = self.allowed_methods.iter().map(HttpMethod::as_str).collect();
        json!({
            "AllowHeaders": self.allowed_headers,
            "AllowMethods": methods,
            "AllowOrigins": self.allowed_origins,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    pub id: LogicalId,
    pub bound_function: LogicalId,
    pub auth_type: AuthType,
    pub cors: CorsPolicy,
}

/// Bind a public, unauthenticated URL with open CORS to `function`.
pub fn publish(id: LogicalId, function: &LogicalId) -> EndpointSpec {
    EndpointSpec {
        id,
        bound_function: function.clone(),
        auth_type: AuthType::None,
        cors: CorsPolicy::open(),
    }
}

impl EndpointSpec {
    /// The URL, known only after materialization.
    pub fn url(&self) -> Reference {
        Reference::attribute_of(&self.id, "FunctionUrl")
    }

    pub fn to_resource(&self) -> Resource {
        let properties = json!({
            "AuthType": self.auth_type.as_str(),
            "Cors": self.cors.to_json(),
            "TargetFunctionArn": Reference::attribute_of(&self.bound_function, "Arn").to_json(),
        });
        Resource::new(self.id.clone(), ResourceType::FunctionUrl, properties)
    }

    /// Without auth the provider only serves the URL if everyone may invoke it.
    pub fn public_invoke_permission(&self, id: LogicalId) -> Option<Resource> {
        if self.auth_type != AuthType::None {
            return None;
        }
        let properties = json!({
            "Action": "lambda:InvokeFunctionUrl",
            "FunctionName": Reference::attribute_of(&self.bound_function, "Arn").to_json(),
            "FunctionUrlAuthType": self.auth_type.as_str(),
            "Principal": WILDCARD,
        });
        Some(Resource::new(id, ResourceType::Permission, properties))
    }
}
