//! Test: Recipes - pipelines declared in YAML

use crate::helpers::*;
use forkline::{PipelineConfig, Standalone, Variables};
use serde_json::json;
use std::collections::HashMap;

#[tokio::test]
async fn test_user_onboarding_recipe() {
    let yaml = r#"
name: "Onboard users"
description: "Tag valid users and fan out one record per team"

variables:
  region: "eu"

steps:
  - name: "valid email"
    filter: { field: user.email, pattern: '^[^@]+@[^@]+$', use_regex: true }
  - remove: [user.password]
  - set:
      status: "active"
      meta: { region: "{{ region }}" }
  - split: { field: teams, into: team }
  - remove: [teams]
"#;

    let config = PipelineConfig::from_yaml(yaml).unwrap();
    let pipeline = config.to_pipeline(&HashMap::new()).unwrap();

    let out = outputs(
        &pipeline,
        json!([
            { "user": { "email": "ada@example.com", "password": "x" }, "teams": ["core", "infra"] },
            { "user": { "email": "not-an-email" }, "teams": ["core"] },
        ]),
    )
    .await;

    assert_eq!(
        out,
        vec![
            json!({
                "user": { "email": "ada@example.com" },
                "status": "active",
                "meta": { "region": "eu" },
                "team": "core"
            }),
            json!({
                "user": { "email": "ada@example.com" },
                "status": "active",
                "meta": { "region": "eu" },
                "team": "infra"
            }),
        ]
    );
}

#[tokio::test]
async fn test_recipe_branch_and_parallel() {
    let yaml = r#"
name: "Variants"
steps:
  - parallel:
      - set: { a: 1 }
      - set: { b: 2 }
  - branch:
      - - set: { variant: "full" }
      - - set: { variant: "slim" }
        - remove: [b]
  - finish_if: { field: variant, pattern: "slim" }
  - set: { finished: "normally" }
"#;

    let pipeline = PipelineConfig::from_yaml(yaml).unwrap().to_pipeline(&HashMap::new()).unwrap();
    let out = outputs(&pipeline, json!({ "id": 1 })).await;

    assert_eq!(
        out,
        vec![
            json!({ "id": 1, "a": 1, "b": 2, "variant": "full", "finished": "normally" }),
            json!({ "id": 1, "a": 1, "variant": "slim" }),
        ]
    );
}

#[tokio::test]
async fn test_remove_inside_parallel() {
    let yaml = r#"
name: "Scrub"
steps:
  - parallel:
      - remove: [password, profile.token]
      - set: { scrubbed: true }
"#;
    let pipeline = PipelineConfig::from_yaml(yaml).unwrap().to_pipeline(&HashMap::new()).unwrap();
    assert_eq!(
        outputs(
            &pipeline,
            json!({ "id": 1, "password": "x", "profile": { "name": "ada", "token": "t" } })
        )
        .await,
        vec![json!({ "id": 1, "profile": { "name": "ada" }, "scrubbed": true })]
    );
}

#[tokio::test]
async fn test_variable_overrides_win() {
    let yaml = r#"
name: "Overrides"
variables:
  tier: "free"
steps:
  - set: { tier: "{{ tier }}", label: "{{ tier }}-{{ unknown }}" }
"#;

    let config = PipelineConfig::from_yaml(yaml).unwrap();
    let overrides = HashMap::from([("tier".to_string(), "pro".to_string())]);

    let out = outputs(&config.to_pipeline(&overrides).unwrap(), json!({})).await;
    assert_eq!(out, vec![json!({ "tier": "pro", "label": "pro-{{ unknown }}" })]);
}

/// Handlers can swap the variables for the rest of the run
#[tokio::test]
async fn test_variables_live_in_extensions() {
    let yaml = r#"
name: "Live variables"
variables:
  greeting: "hello"
steps:
  - set: { text: "{{ greeting }}" }
"#;
    let config = PipelineConfig::from_yaml(yaml).unwrap();

    let change = forkline::handler_fn(|_, ctx| {
        ctx.extensions()
            .insert(Variables::new(HashMap::from([("greeting".to_string(), "bye".to_string())])));
        Ok(())
    });
    let extensions = forkline::Extensions::new().with(config.variables_with(&HashMap::new()));
    let pipeline = forkline::Pipeline::with_extensions(
        forkline::series![change, config.to_handler().unwrap()],
        extensions,
    );

    let out = pipeline.run(json!({})).await.unwrap();
    assert_eq!(out[0]["text"], json!("bye"));
}

#[tokio::test]
async fn test_replace_step_detaches() {
    let yaml = r#"
name: "Reset"
steps:
  - replace: { reset: true }
  - set: { after: 1 }
"#;
    let pipeline = PipelineConfig::from_yaml(yaml).unwrap().to_pipeline(&HashMap::new()).unwrap();
    assert_eq!(
        outputs(&pipeline, json!({ "old": 1 })).await,
        vec![json!({ "reset": true, "after": 1 })]
    );
}

#[test]
fn test_recipe_from_file() {
    let path = std::env::temp_dir().join(format!("forkline-recipe-{}.yaml", std::process::id()));
    std::fs::write(
        &path,
        "name: \"From file\"\nsteps:\n  - set: { a: 1 }\n  - remove: [b]\n",
    )
    .unwrap();

    let config = PipelineConfig::from_file(&path).unwrap();
    assert_eq!(config.name, "From file");
    assert_eq!(config.step_count(), 2);

    std::fs::remove_file(&path).ok();

    let err = PipelineConfig::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to read recipe"));
}
