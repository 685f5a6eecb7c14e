use std::path::Path;

use cicd_stack_provision::{plan, DeployedState};

use super::{build_stack, print_json, read_json};
use crate::{exit_with_error, settings::SettingsArgs, OutputFormat};

pub(crate) fn cmd_plan(
    args: &SettingsArgs,
    state_path: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let (_, stack) = build_stack(args, output, quiet);
    let template = stack.synthesize();
    let previous: Option<DeployedState> = state_path.map(|p| read_json(p, output, quiet));

    let planned = match plan(previous.as_ref(), &template) {
        Ok(p) => p,
        Err(e) => exit_with_error(&e.to_string(), output, quiet),
    };
    match output {
        OutputFormat::Json => print_json(&planned.to_json()),
        OutputFormat::Text => println!("{}", planned.to_text()),
    }
}
