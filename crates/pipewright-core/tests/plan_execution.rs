//! End-to-end plan execution against a populated registry.

use pipewright_core::builtin::register_builtins;
use pipewright_core::plan::{PlanError, PlanExecutor, ReferenceError, parse_plan_yaml};
use pipewright_core::registry::{StrategyError, StrategyRegistry};
use pipewright_types::Kwargs;
use serde_json::{Value, json};

fn num(kwargs: &Kwargs, key: &str) -> Result<i64, StrategyError> {
    kwargs
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| StrategyError::MissingArgument(key.to_string()))
}

fn registry() -> StrategyRegistry {
    let mut reg = StrategyRegistry::new();
    register_builtins(&mut reg).unwrap();
    reg.register_fn("math", "add", |kw| Ok(json!(num(&kw, "x")? + num(&kw, "y")?)))
        .unwrap();
    reg.register_fn("math", "mul", |kw| Ok(json!(num(&kw, "x")? * num(&kw, "y")?)))
        .unwrap();
    reg
}

#[test]
fn add_then_multiply_produces_full_result_bundle() {
    let plan = parse_plan_yaml(
        r#"
version: 1
steps:
  - id: a
    use: math.add
    with: { x: 1, y: 2 }
  - id: b
    use: math.mul
    with: { x: "${{ a }}", y: 3 }
outputs:
  result: "${{ b }}"
"#,
    )
    .unwrap();

    let result = PlanExecutor::new(&registry()).execute(&plan).unwrap();
    assert_eq!(
        serde_json::to_value(result).unwrap(),
        json!({"version": 1, "steps": {"a": 3, "b": 9}, "outputs": {"result": 9}})
    );
}

#[test]
fn version_two_is_rejected_before_any_step() {
    let plan = parse_plan_yaml(
        "version: 2\nsteps:\n  - { id: a, use: math.add, with: { x: 1, y: 2 } }\n",
    )
    .unwrap();
    let err = PlanExecutor::new(&registry()).execute(&plan).unwrap_err();
    assert!(matches!(err, PlanError::Configuration(_)), "{err}");
}

#[test]
fn bare_name_resolves_to_first_registered_family() {
    let mut reg = StrategyRegistry::new();
    reg.register_fn("alpha", "shared", |_| Ok(json!("alpha"))).unwrap();
    reg.register_fn("beta", "shared", |_| Ok(json!("beta"))).unwrap();

    let plan = parse_plan_yaml("steps:\n  - { id: s, use: shared }\noutputs: { who: \"${{ s }}\" }\n")
        .unwrap();
    let result = PlanExecutor::new(&reg).execute(&plan).unwrap();
    assert_eq!(result.outputs["who"], json!("alpha"));
}

#[test]
fn nested_vars_reference_resolves() {
    let plan = parse_plan_yaml(
        r#"
vars:
  x: { y: [10, 20] }
steps:
  - id: sum
    use: math.add
    with: { x: "${{ vars.x.y[0] }}", y: "${{ vars.x.y[1] }}" }
outputs:
  first: "${{ vars.x.y[0] }}"
  sum: "${{ sum }}"
"#,
    )
    .unwrap();
    let result = PlanExecutor::new(&registry()).execute(&plan).unwrap();
    assert_eq!(result.outputs["first"], json!(10));
    assert_eq!(result.outputs["sum"], json!(30));
}

#[test]
fn reference_to_unknown_step_fails() {
    let plan = parse_plan_yaml(
        "steps:\n  - { id: a, use: math.add, with: { x: \"${{ ghost }}\", y: 1 } }\n",
    )
    .unwrap();
    let err = PlanExecutor::new(&registry()).execute(&plan).unwrap_err();
    match err {
        PlanError::Reference { source, .. } => {
            assert_eq!(source, ReferenceError::UnknownStep("ghost".into()));
        }
        other => panic!("expected reference error, got {other:?}"),
    }
}

#[test]
fn rerunning_a_plan_gives_identical_outputs() {
    let plan = parse_plan_yaml(
        r#"
vars:
  doc: "Pipewright wires strategies into plans. Plans reference earlier steps."
steps:
  - id: chunks
    use: chunking.fixed
    with: { data: "${{ vars.doc }}", chunk_size: 24, chunk_overlap: 4 }
  - id: ranked
    use: rerank.bm25_preselect
    with: { query: "plans steps", hits: "${{ chunks }}", top_k: 2 }
  - id: prompt
    use: prompt.rag
    with: { query: "What do plans do?", hits: "${{ ranked }}" }
outputs:
  prompt: "${{ prompt }}"
  best: "${{ ranked[0].text }}"
"#,
    )
    .unwrap();

    let reg = registry();
    let executor = PlanExecutor::new(&reg);
    let first = executor.execute(&plan).unwrap();
    let second = executor.execute(&plan).unwrap();
    assert_eq!(first.outputs, second.outputs);
    assert!(first.outputs["prompt"].as_str().unwrap().starts_with("Context:\n"));
}
