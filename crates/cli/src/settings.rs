//! Layered loading of [`StackConfig`].
//!
//! Lowest precedence first: built-in defaults, the `[stack]` table of a TOML
//! config file, a `.env` file, the process environment, then command-line
//! flags.
//!
//! ```toml
//! [stack]
//! stack_name = "CicdAwsStack"
//! code_bundle_path = "lambda"
//! region = "eu-west-1"
//! validate_version = true
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cicd_stack_core::StackConfig;
use serde::Deserialize;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "cicd-stack.toml";
/// Env file picked up from the working directory when `--env-file` is absent.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Flags shared by every command that builds the stack.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SettingsArgs {
    /// TOML config file with a [stack] table
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Env file with VERSION / CICD_STACK_BUNDLE / CICD_STACK_REGION
    #[arg(long)]
    pub env_file: Option<PathBuf>,
    /// Version tag passed to the function (empty means 0.0)
    #[arg(long = "stack-version")]
    pub stack_version: Option<String>,
    /// Path to the function code bundle (file or directory)
    #[arg(long)]
    pub bundle: Option<PathBuf>,
    /// Stack name
    #[arg(long)]
    pub stack_name: Option<String>,
    /// Target region
    #[arg(long)]
    pub region: Option<String>,
    /// Reject malformed version tags
    #[arg(long)]
    pub strict_version: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    stack: StackConfig,
}

/// Read and parse a stack config TOML file from `path`.
pub fn read_config_file(path: &Path) -> Result<StackConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    let file: ConfigFile = toml::from_str(&content)
        .map_err(|e| format!("could not parse '{}': {}", path.display(), e))?;
    Ok(file.stack)
}

/// Read a dotenv file into a map without touching the process environment.
pub fn read_env_file(path: &Path) -> Result<BTreeMap<String, String>, String> {
    let iter = dotenvy::from_path_iter(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    iter.map(|item| item.map_err(|e| format!("could not parse '{}': {}", path.display(), e)))
        .collect()
}

/// Resolve the final configuration for a command.
pub fn load(args: &SettingsArgs) -> Result<StackConfig, String> {
    let mut config = match &args.config {
        Some(path) => read_config_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            read_config_file(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => StackConfig::default(),
    };

    let dotenv = match &args.env_file {
        Some(path) => read_env_file(path)?,
        None if Path::new(DEFAULT_ENV_FILE).is_file() => {
            read_env_file(Path::new(DEFAULT_ENV_FILE))?
        }
        None => BTreeMap::new(),
    };
    config = config
        .apply_env(|key| dotenv.get(key).cloned())
        .apply_env(|key| std::env::var(key).ok());

    apply_flags(config, args)
}

fn apply_flags(mut config: StackConfig, args: &SettingsArgs) -> Result<StackConfig, String> {
    if let Some(v) = &args.stack_version {
        config.version = Some(v.clone());
    }
    if let Some(p) = &args.bundle {
        config.code_bundle_path = p.clone();
    }
    if let Some(name) = &args.stack_name {
        if name.trim().is_empty() {
            return Err("--stack-name must not be empty".to_owned());
        }
        config.stack_name = name.clone();
    }
    if let Some(region) = &args.region {
        config.region = region.clone();
    }
    if args.strict_version {
        config.validate_version = true;
    }
    tracing::debug!(
        stack = %config.stack_name,
        bundle = %config.code_bundle_path.display(),
        region = %config.region,
        "loaded configuration"
    );
    Ok(config)
}
