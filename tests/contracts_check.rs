#![cfg(unix)]

mod common;

use common::TestEnv;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

fn load_schema(name: &str) -> Value {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let raw = fs::read_to_string(root.join("docs/contracts").join(name)).unwrap();
    serde_json::from_str(&raw).unwrap()
}

fn validate(schema_name: &str, data: &Value) {
    let schema = load_schema(schema_name);
    let validator = JSONSchema::compile(&schema).expect("compile schema");
    let msgs: Vec<String> = match validator.validate(data) {
        Ok(()) => return,
        Err(errors) => errors.map(|e| e.to_string()).collect(),
    };
    panic!("schema validation failed: {}", msgs.join(" | "));
}

const MANUAL: [&str; 4] = ["--focal-length-mm", "26", "--pixel-pitch-um", "1.7"];

fn measure(env: &TestEnv) -> Value {
    let mut args = vec!["measure", env.image_arg()];
    args.extend(MANUAL);
    env.run_json(&args)
}

#[test]
fn contracts_check() {
    let env = TestEnv::new();

    let ok = measure(&env);
    assert_eq!(ok["ok"], true);
    validate("pipeline-result.schema.json", &ok["data"]);

    let incomplete = env.run_json(&["measure", env.image_arg()]);
    validate("pipeline-result.schema.json", &incomplete["data"]);

    env.distance("echo 'Unable to locate planet' >&2; exit 1");
    let failed = measure(&env);
    validate("pipeline-result.schema.json", &failed["data"]);

    env.distance("echo \"version 'CXXABI_1.3.15' not found\" >&2; exit 1");
    let incompatible = measure(&env);
    validate("pipeline-result.schema.json", &incompatible["data"]);

    env.distance("exit 3");
    let mut args = vec!["measure", env.image_arg()];
    args.extend(MANUAL);
    let internal = env.run_json_failure(&args);
    validate("error.schema.json", &internal);

    let resolved = env.run_json(&["resolve", env.image_arg()]);
    validate("resolve.schema.json", &resolved["data"]);

    let doctor = env.run_json(&["doctor"]);
    validate("doctor.schema.json", &doctor["data"]);
}
