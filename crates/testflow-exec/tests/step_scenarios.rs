//! Step-level behavior against a real HTTP stub: assertion aggregation
//! (every rule is evaluated, none short-circuits the rest), iteration
//! (one child result per element, parent failure if any child fails), and
//! scenario branching (a matched condition folds its branch's assertions
//! into the step additively).

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use testflow_core::suite::{AssertionRule, AssertionRuleSet, IterateSpec, Scenario, ScenarioBranch, Suite};
use testflow_exec::{Status, StepContext, StepExecutor};
use testflow_expr::Evaluator;
use testflow_http::{HttpClient, RetryPolicy};
use testflow_vars::{FakerProvider, GlobalRegistry, ScopeLayer, Scopes};

fn suite_with_one_step(yaml_steps: &str, base_url: &str) -> Suite {
    let yaml = format!("node_id: s\nbase_url: \"{base_url}\"\nsteps:\n{yaml_steps}");
    Suite::from_yaml(&yaml, "inline").unwrap()
}

async fn run_first_step(suite: &Suite) -> testflow_exec::StepResult {
    run_first_step_with_vars(suite, &[]).await
}

async fn run_first_step_with_vars(suite: &Suite, vars: &[(&str, serde_json::Value)]) -> testflow_exec::StepResult {
    let faker = FakerProvider::seeded(0);
    let evaluator = Evaluator::new(250);
    let http = HttpClient::new().unwrap();
    let mut scopes = Scopes::new(GlobalRegistry::new());
    for (name, value) in vars {
        scopes.set(ScopeLayer::Suite, name, value.clone());
    }

    let mut ctx = StepContext {
        scopes: &mut scopes,
        faker: &faker,
        evaluator: &evaluator,
        http: &http,
        retry: RetryPolicy::default(),
        base_url: suite.base_url.clone(),
        strict_interpolation: false,
        continue_on_capture_failure: true,
        default_timeout: Duration::from_secs(5),
    };

    StepExecutor::execute(&suite.steps[0], &mut ctx).await
}

#[tokio::test]
async fn every_assertion_is_evaluated_even_after_one_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 0, "type": "user"})))
        .mount(&server)
        .await;

    let mut suite = suite_with_one_step(
        "  - name: list\n    request:\n      method: GET\n      url: /users\n",
        &server.uri(),
    );
    suite.steps[0].assert.insert("status_code".to_string(), AssertionRule::Simple(json!(200)));
    suite.steps[0].assert.insert(
        "body.count".to_string(),
        AssertionRule::Structured(Box::new(AssertionRuleSet {
            greater_than: Some(json!(0)),
            ..Default::default()
        })),
    );
    suite.steps[0].assert.insert("body.type".to_string(), AssertionRule::Simple(json!("user")));

    let result = run_first_step(&suite).await;

    assert_eq!(result.status, Status::Failure);
    assert_eq!(result.assertions.len(), 3);
    let passed: Vec<bool> = result.assertions.iter().map(|a| a.passed).collect();
    assert_eq!(passed, vec![true, false, true]);
}

#[tokio::test]
async fn iteration_runs_every_element_and_fails_the_parent_if_any_child_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).and(path("/items/1")).respond_with(ResponseTemplate::new(200)).mount(&server).await;
    Mock::given(method("GET")).and(path("/items/2")).respond_with(ResponseTemplate::new(500)).mount(&server).await;
    Mock::given(method("GET")).and(path("/items/3")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

    let mut suite = suite_with_one_step(
        "  - name: fetch\n    request:\n      method: GET\n      url: /items/{{n}}\n",
        &server.uri(),
    );
    suite.steps[0].assert.insert("status_code".to_string(), AssertionRule::Simple(json!(200)));
    suite.steps[0].iterate = Some(IterateSpec::Over { over: "[1, 2, 3]".to_string(), r#as: "n".to_string() });

    let result = run_first_step(&suite).await;

    assert_eq!(result.status, Status::Failure);
    assert_eq!(result.iterations.len(), 3);
    let statuses: Vec<Status> = result.iterations.iter().map(|i| i.status).collect();
    assert_eq!(statuses, vec![Status::Success, Status::Failure, Status::Success]);
}

#[tokio::test]
async fn a_matched_scenario_folds_its_branch_assertions_into_the_step() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "role": "admin",
            "permissions": ["read"],
        })))
        .mount(&server)
        .await;

    let mut suite = suite_with_one_step(
        "  - name: me\n    request:\n      method: GET\n      url: /me\n",
        &server.uri(),
    );
    suite.steps[0].assert.insert("status_code".to_string(), AssertionRule::Simple(json!(200)));
    suite.steps[0].scenarios.push(Scenario {
        condition: "response.body.role == \"admin\"".to_string(),
        then: Some(ScenarioBranch {
            assert: indexmap::IndexMap::from([(
                "body.permissions".to_string(),
                AssertionRule::Structured(Box::new(AssertionRuleSet {
                    contains: Some(json!("write")),
                    ..Default::default()
                })),
            )]),
            capture: indexmap::IndexMap::new(),
        }),
        r#else: None,
    });

    let result = run_first_step(&suite).await;

    assert_eq!(result.status, Status::Failure);
    assert_eq!(result.scenarios_meta.len(), 1);
    let meta = &result.scenarios_meta[0];
    assert!(meta.matched);
    assert!(meta.executed);
    assert_eq!(meta.branch_taken.as_deref(), Some("then"));
    assert_eq!(meta.assertions_contributed, 1);
}

#[tokio::test]
async fn a_scenario_condition_can_use_the_bracketed_reference_grammar() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"role": "admin"})))
        .mount(&server)
        .await;

    let mut suite = suite_with_one_step(
        "  - name: me\n    request:\n      method: GET\n      url: /me\n",
        &server.uri(),
    );
    suite.steps[0].assert.insert("status_code".to_string(), AssertionRule::Simple(json!(200)));
    suite.steps[0].scenarios.push(Scenario {
        condition: "{{response.body.role}} == \"admin\"".to_string(),
        then: Some(ScenarioBranch {
            assert: indexmap::IndexMap::from([("body.role".to_string(), AssertionRule::Simple(json!("admin")))]),
            capture: indexmap::IndexMap::new(),
        }),
        r#else: None,
    });

    let result = run_first_step(&suite).await;

    let meta = &result.scenarios_meta[0];
    assert!(meta.matched);
    assert_eq!(meta.branch_taken.as_deref(), Some("then"));
    assert_eq!(result.status, Status::Success);
}

#[tokio::test]
async fn iterate_over_can_use_the_bracketed_reference_grammar() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).and(path("/items/1")).respond_with(ResponseTemplate::new(200)).mount(&server).await;
    Mock::given(method("GET")).and(path("/items/2")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

    let mut suite = suite_with_one_step(
        "  - name: fetch\n    request:\n      method: GET\n      url: /items/{{n}}\n",
        &server.uri(),
    );
    suite.steps[0].assert.insert("status_code".to_string(), AssertionRule::Simple(json!(200)));
    suite.steps[0].iterate = Some(IterateSpec::Over { over: "{{items}}".to_string(), r#as: "n".to_string() });

    let result = run_first_step_with_vars(&suite, &[("items", json!([1, 2]))]).await;

    assert_eq!(result.status, Status::Success);
    assert_eq!(result.iterations.len(), 2);
}
