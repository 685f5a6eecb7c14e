//! Simulated deployment: converge against the in-memory provider so the
//! plan, ordering and outputs can be inspected without touching an account.

use std::path::Path;

use cicd_stack_provision::{converge, DeployedState, MemoryProvider, RetryPolicy};
use serde_json::json;

use super::{build_stack, print_json, read_json};
use crate::{exit_with_error, exit_with_synth_error, settings::SettingsArgs, OutputFormat};

pub(crate) fn cmd_deploy(
    args: &SettingsArgs,
    state_path: Option<&Path>,
    state_out: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let (config, stack) = build_stack(args, output, quiet);
    let template = stack.synthesize();
    let previous: Option<DeployedState> = state_path.map(|p| read_json(p, output, quiet));

    let provider = MemoryProvider::new(&config.stack_name, &config.region);
    if let Some(prev) = &previous {
        if prev.stack_name != config.stack_name {
            let msg = format!(
                "state belongs to stack '{}', not '{}'",
                prev.stack_name, config.stack_name
            );
            exit_with_error(&msg, output, quiet);
        }
        if let Err(e) = provider.adopt(prev) {
            exit_with_synth_error(&e, output, quiet);
        }
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => exit_with_error(&format!("failed to start runtime: {}", e), output, quiet),
    };
    let result = runtime.block_on(converge(
        &provider,
        &config.stack_name,
        &template,
        previous.as_ref(),
        &RetryPolicy::default(),
    ));

    let deployed = match result {
        Ok(state) => state,
        Err(e) => {
            if let Some(path) = state_out {
                write_state(path, &e.partial, output, quiet);
            }
            exit_with_error(&e.to_string(), output, quiet);
        }
    };
    if let Some(path) = state_out {
        write_state(path, &deployed, output, quiet);
    }

    let stack_output = match deployed.stack_output() {
        Ok(o) => o,
        Err(e) => exit_with_error(&e.to_string(), output, quiet),
    };
    match output {
        OutputFormat::Json => print_json(&json!({
            "outputs": deployed.outputs,
            "resources": deployed.resources.len(),
            "stack": deployed.stack_name,
            "status": "Materialized",
        })),
        OutputFormat::Text => {
            if !quiet {
                println!(
                    "stack {} materialized ({} resources)",
                    deployed.stack_name,
                    deployed.resources.len()
                );
            }
            println!("Url = {}", stack_output.url);
        }
    }
}

fn write_state(path: &Path, state: &DeployedState, output: OutputFormat, quiet: bool) {
    let pretty = match serde_json::to_string_pretty(state) {
        Ok(s) => s,
        Err(e) => exit_with_error(&format!("serialization error: {}", e), output, quiet),
    };
    if let Err(e) = std::fs::write(path, pretty + "\n") {
        let msg = format!("error writing '{}': {}", path.display(), e);
        exit_with_error(&msg, output, quiet);
    }
}
