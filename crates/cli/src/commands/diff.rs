use std::path::Path;
use std::process;

use cicd_stack_core::Template;
use cicd_stack_provision::diff;
use serde_json::Value;

use super::{print_json, read_json};
use crate::{exit_with_synth_error, OutputFormat};

/// Diff two templates. Exits 1 when they differ, like diff(1).
pub(crate) fn cmd_diff(old_path: &Path, new_path: &Path, output: OutputFormat, quiet: bool) {
    let old_value: Value = read_json(old_path, output, quiet);
    let new_value: Value = read_json(new_path, output, quiet);
    let old = match Template::from_json(&old_value) {
        Ok(t) => t,
        Err(e) => exit_with_synth_error(&e, output, quiet),
    };
    let new = match Template::from_json(&new_value) {
        Ok(t) => t,
        Err(e) => exit_with_synth_error(&e, output, quiet),
    };

    let plan = diff(&old.resources, &new.resources);
    let changed_outputs: Vec<&String> = old
        .outputs
        .keys()
        .chain(new.outputs.keys())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .filter(|name| old.outputs.get(*name) != new.outputs.get(*name))
        .collect();
    let identical = plan.is_empty() && changed_outputs.is_empty();

    if !quiet || output == OutputFormat::Json {
        match output {
            OutputFormat::Json => {
                let mut value = plan.to_json();
                value["outputs"] = serde_json::json!(changed_outputs);
                print_json(&value);
            }
            OutputFormat::Text if identical => println!("no differences"),
            OutputFormat::Text => {
                if !plan.is_empty() {
                    println!("{}", plan.to_text());
                }
                for name in &changed_outputs {
                    println!("~ Output {}", name);
                }
            }
        }
    }

    if !identical {
        process::exit(1);
    }
}
