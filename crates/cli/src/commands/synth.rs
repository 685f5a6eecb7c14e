use std::path::Path;

use cicd_stack_core::{build_manifest, compute_etag};

use super::{build_stack, print_json};
use crate::settings::SettingsArgs;
use crate::{exit_with_error, OutputFormat};

pub(crate) fn cmd_synth(
    args: &SettingsArgs,
    manifest: bool,
    out: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let (_, stack) = build_stack(args, output, quiet);
    let template = stack.synthesize();
    let template_json = template.to_json();
    let value = if manifest {
        build_manifest(&template)
    } else {
        template_json.clone()
    };

    let Some(path) = out else {
        print_json(&value);
        return;
    };

    let pretty = serde_json::to_string_pretty(&value)
        .unwrap_or_else(|e| format!("serialization error: {}", e));
    if let Err(e) = std::fs::write(path, pretty + "\n") {
        let msg = format!("error writing '{}': {}", path.display(), e);
        exit_with_error(&msg, output, quiet);
    }
    if !quiet {
        match output {
            OutputFormat::Text => println!("wrote {}", path.display()),
            OutputFormat::Json => print_json(&serde_json::json!({
                "etag": compute_etag(&template_json),
                "written": path.display().to_string(),
            })),
        }
    }
}
