use cicd_stack_core::LogicalId;
use serde_json::json;

use super::{build_stack, print_json};
use crate::settings::SettingsArgs;
use crate::{exit_with_synth_error, OutputFormat};

pub(crate) fn cmd_graph(args: &SettingsArgs, output: OutputFormat, quiet: bool) {
    let (_, stack) = build_stack(args, output, quiet);
    let graph = stack.graph();
    let layers = match graph.layers() {
        Ok(l) => l,
        Err(e) => exit_with_synth_error(&e, output, quiet),
    };
    let edges = graph.edges();
    let type_of = |id: &LogicalId| -> &'static str {
        graph
            .get(id)
            .map(|r| r.resource_type.as_str())
            .unwrap_or("?")
    };

    match output {
        OutputFormat::Json => {
            let layers_json: Vec<Vec<serde_json::Value>> = layers
                .iter()
                .map(|layer| {
                    layer
                        .iter()
                        .map(|id| json!({"id": id.as_str(), "type": type_of(id)}))
                        .collect()
                })
                .collect();
            let edges_json: Vec<serde_json::Value> = edges
                .iter()
                .map(|(from, to)| json!({"from": from.as_str(), "to": to.as_str()}))
                .collect();
            print_json(&json!({
                "edges": edges_json,
                "layers": layers_json,
                "stack": stack.name,
            }));
        }
        OutputFormat::Text => {
            for (i, layer) in layers.iter().enumerate() {
                println!("layer {}:", i);
                for id in layer {
                    println!("  {}  {}", id, type_of(id));
                }
            }
            if !quiet {
                println!("edges:");
                for (from, to) in &edges {
                    println!("  {} -> {}", from, to);
                }
            }
        }
    }
}
