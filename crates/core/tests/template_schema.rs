//! Validates synthesized templates against the formal template schema at
//! schema/template-schema.json.

use cicd_stack_core::{build_manifest, StackBuilder, StackConfig};
use std::path::Path;

fn validator() -> jsonschema::Validator {
    let schema_path =
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../schema/template-schema.json");
    let schema_src = std::fs::read_to_string(&schema_path)
        .unwrap_or_else(|e| panic!("Failed to read schema at {}: {}", schema_path.display(), e));
    let schema_value: serde_json::Value = serde_json::from_str(&schema_src).unwrap();
    jsonschema::validator_for(&schema_value)
        .unwrap_or_else(|e| panic!("Failed to compile schema: {}", e))
}

fn synthesize(version: Option<&str>) -> serde_json::Value {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.py"), "def handler(event, context): pass\n").unwrap();
    let config = StackConfig {
        code_bundle_path: dir.path().to_path_buf(),
        version: version.map(str::to_owned),
        description: Some("Visitor counter backend".to_owned()),
        ..Default::default()
    };
    StackBuilder::new(config).build().unwrap().synthesize().to_json()
}

#[test]
fn synthesized_templates_match_schema() {
    let validator = validator();
    let mut failures = Vec::new();
    for version in [None, Some(""), Some("1.2"), Some("2.0.0-rc.1")] {
        let template = synthesize(version);
        if let Err(error) = validator.validate(&template) {
            failures.push(format!("version {:?}: {}", version, error));
        }
    }
    assert!(
        failures.is_empty(),
        "Schema validation failed:\n{}",
        failures.join("\n")
    );
}

#[test]
fn schema_rejects_literal_output_value() {
    let validator = validator();
    let mut template = synthesize(None);
    template["Outputs"]["Url"]["Value"] = serde_json::json!("https://example.com");
    assert!(validator.validate(&template).is_err());
}

#[test]
fn manifest_wraps_schema_valid_template() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.py"), "def handler(event, context): pass\n").unwrap();
    let config = StackConfig {
        code_bundle_path: dir.path().to_path_buf(),
        ..Default::default()
    };
    let template = StackBuilder::new(config).build().unwrap().synthesize();
    let manifest = build_manifest(&template);
    assert!(validator().validate(&manifest["template"]).is_ok());
    assert_eq!(
        manifest["etag"],
        cicd_stack_core::compute_etag(&template.to_json())
    );
}
