//! Deployment-time configuration.
//!
//! Settings are gathered once by the caller (defaults, config file, env file,
//! process environment, flags) and handed to the builder as a finished
//! [`StackConfig`]. The builder never reads ambient state itself.

use crate::error::SynthError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Version injected when none is configured.
pub const DEFAULT_VERSION: &str = "0.0";

/// Environment keys understood by [`StackConfig::apply_env`].
pub const ENV_VERSION: &str = "VERSION";
pub const ENV_BUNDLE: &str = "CICD_STACK_BUNDLE";
pub const ENV_REGION: &str = "CICD_STACK_REGION";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    pub stack_name: String,
    pub description: Option<String>,
    /// Version tag passed to the function; empty counts as unset.
    pub version: Option<String>,
    pub code_bundle_path: PathBuf,
    pub runtime: String,
    pub handler: String,
    pub region: String,
    /// Reject version tags that are not `[v]N(.N)*[-pre]`. Off by default.
    pub validate_version: bool,
}

impl Default for StackConfig {
    fn default() -> Self {
        StackConfig {
            stack_name: "CicdAwsStack".to_owned(),
            description: None,
            version: None,
            code_bundle_path: PathBuf::from("lambda"),
            runtime: "python3.9".to_owned(),
            handler: "main.handler".to_owned(),
            region: "us-east-1".to_owned(),
            validate_version: false,
        }
    }
}

impl StackConfig {
    /// Overlay environment-style settings. `lookup` returns the value of a
    /// key, or `None` when unset.
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_VERSION) {
            self.version = Some(v);
        }
        if let Some(v) = lookup(ENV_BUNDLE).filter(|v| !v.is_empty()) {
            self.code_bundle_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_REGION).filter(|v| !v.is_empty()) {
            self.region = v;
        }
        self
    }

    /// The version handed to the function: the configured tag exactly as
    /// given, or [`DEFAULT_VERSION`] when unset or empty.
    pub fn resolved_version(&self) -> Result<String, SynthError> {
        let version = match self.version.as_deref() {
            None | Some("") => return Ok(DEFAULT_VERSION.to_owned()),
            Some(v) => v,
        };
        if self.validate_version && !is_version_token(version.trim()) {
            return Err(SynthError::configuration(
                "version",
                format!("'{}' is not a well-formed version token", version),
            ));
        }
        Ok(version.to_owned())
    }

    /// Bucket the code asset is uploaded to.
    pub fn asset_bucket(&self) -> String {
        format!("{}-assets-{}", self.stack_name.to_ascii_lowercase(), self.region)
    }
}

/// `[v]` digits, optionally `.digits` repeated, optionally `-` prerelease
/// of alphanumerics, dots and dashes.
pub fn is_version_token(s: &str) -> bool {
    let s = s.strip_prefix('v').unwrap_or(s);
    let (core, pre) = match s.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (s, None),
    };
    let core_ok = !core.is_empty()
        && core
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
    let pre_ok = pre.map_or(true, |p| {
        !p.is_empty()
            && p
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    });
    core_ok && pre_ok
}
