mod deploy;
mod diff;
mod graph;
mod plan;
mod synth;

pub(crate) use deploy::cmd_deploy;
pub(crate) use diff::cmd_diff;
pub(crate) use graph::cmd_graph;
pub(crate) use plan::cmd_plan;
pub(crate) use synth::cmd_synth;

use std::path::Path;

use cicd_stack_core::{Stack, StackBuilder, StackConfig};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::settings::{self, SettingsArgs};
use crate::{exit_with_error, exit_with_synth_error, OutputFormat};

/// Load settings and build the stack, exiting 1 on any failure.
pub(crate) fn build_stack(
    args: &SettingsArgs,
    output: OutputFormat,
    quiet: bool,
) -> (StackConfig, Stack) {
    let config = match settings::load(args) {
        Ok(c) => c,
        Err(msg) => exit_with_error(&msg, output, quiet),
    };
    match StackBuilder::new(config.clone()).build() {
        Ok(stack) => (config, stack),
        Err(e) => exit_with_synth_error(&e, output, quiet),
    }
}

/// Read and deserialize a JSON file, exiting 1 on failure.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path, output: OutputFormat, quiet: bool) -> T {
    let content = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading '{}': {}", path.display(), e);
            exit_with_error(&msg, output, quiet);
        }
    };
    match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", path.display(), e);
            exit_with_error(&msg, output, quiet);
        }
    }
}

pub(crate) fn print_json(value: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("serialization error: {}", e))
    );
}
