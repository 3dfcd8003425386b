use botkit::scenario::{
    Condition, ConditionSource, ScenarioDefinition, ScenarioError, StateMachine, Transition,
};
use serde_json::{json, Map, Value};
use std::fs;
use tempfile::tempdir;

const TWO_SCENARIOS: &str = r#"{
  "scenarios": [
    {
      "name": "booking",
      "general_system_prompt": "You book tables.",
      "initial_agent": "party",
      "conditions": {"party_known": "party_size > 0"},
      "agents": [
        {
          "id": "party",
          "system_prompt": "Ask how many people.",
          "required_info": ["party_size"],
          "conditions": [{"condition": "party_known", "next_agent_id": "time"}]
        },
        {"id": "time", "system_prompt": "Ask for a time.", "required_info": ["time"]}
      ]
    },
    {
      "name": "feedback",
      "nodes": [{"id": "ask", "system_prompt": "Ask for feedback."}]
    }
  ]
}"#;

fn data(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object")
}

#[test]
fn legacy_agent_keys_load_from_disk() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("scenarios.json");
    fs::write(&path, TWO_SCENARIOS).expect("write");

    assert_eq!(
        ScenarioDefinition::list_names(&path).expect("names"),
        vec!["booking".to_string(), "feedback".to_string()]
    );

    let booking = ScenarioDefinition::from_path(&path, None).expect("first scenario");
    assert_eq!(booking.name(), "booking");
    assert_eq!(booking.nodes().len(), 2);
    let edge = &booking.nodes()[0].edges[0];
    assert_eq!(edge.source, ConditionSource::Named("party_known".to_string()));
    assert_eq!(edge.label(), "party_known");
    assert_eq!(booking.nodes()[edge.target].id.as_str(), "time");

    let feedback = ScenarioDefinition::from_path(&path, Some("feedback")).expect("named");
    assert_eq!(feedback.initial_index(), 0);
    assert_eq!(feedback.general_system_prompt(), "");
}

#[test]
fn state_machine_moves_when_a_named_condition_holds() {
    let definition = ScenarioDefinition::from_json_str(TWO_SCENARIOS, Some("booking"))
        .expect("booking");
    let mut machine = StateMachine::new(definition);
    assert_eq!(machine.transition(), Transition::Stayed);

    machine.merge_extracted(data(json!({"party_size": "4"})));
    assert_eq!(
        machine.transition(),
        Transition::Moved {
            from: "party".to_string(),
            to: "time".to_string(),
            condition: "party_known".to_string(),
        }
    );
    assert_eq!(machine.missing_required(), vec!["time"]);
}

#[test]
fn unknown_scenario_lists_what_is_available() {
    let err = ScenarioDefinition::from_json_str(TWO_SCENARIOS, Some("checkout"))
        .expect_err("unknown");
    match err {
        ScenarioError::UnknownScenario { name, available } => {
            assert_eq!(name, "checkout");
            assert!(available.contains("booking"));
            assert!(available.contains("feedback"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn broken_graphs_are_rejected_at_load_time() {
    let dangling = r#"{"scenarios": [{"name": "s", "nodes": [
        {"id": "a", "edges": [{"when": "true", "next_node": "nowhere"}]}
    ]}]}"#;
    assert!(matches!(
        ScenarioDefinition::from_json_str(dangling, None),
        Err(ScenarioError::Invalid { .. })
    ));

    let bad_condition = r#"{"scenarios": [{"name": "s", "nodes": [
        {"id": "a", "edges": [{"when": "x = 1", "next_node": "a"}]}
    ]}]}"#;
    let err = ScenarioDefinition::from_json_str(bad_condition, None).expect_err("bad expr");
    assert!(matches!(err, ScenarioError::Condition { .. }));
    assert!(err.to_string().contains("=="));

    let undefined_name = r#"{"scenarios": [{"name": "s", "nodes": [
        {"id": "a", "edges": [{"condition": "ready", "next_node": "a"}]}
    ]}]}"#;
    assert!(matches!(
        ScenarioDefinition::from_json_str(undefined_name, None),
        Err(ScenarioError::Invalid { .. })
    ));

    assert!(matches!(
        ScenarioDefinition::from_json_str(r#"{"scenarios": []}"#, None),
        Err(ScenarioError::NoScenarios)
    ));
    assert!(matches!(
        ScenarioDefinition::from_json_str("{not json", None),
        Err(ScenarioError::Parse { path: None, .. })
    ));
}

#[test]
fn conditions_read_like_the_fields_they_test() {
    let order = data(json!({
        "customer": {"name": "Ada", "tier": "gold"},
        "items": ["tea", "scone"],
        "total": "18.50",
        "coupon": null
    }));
    let cases = [
        ("customer.tier == 'gold' and total > 10", true),
        ("len(items) >= 2 && 'tea' in items", true),
        ("coupon is null", true),
        ("missing(coupon) or coupon == 'FREE'", true),
        ("not exists(customer.email)", true),
        ("lower(customer.name) == 'ada'", true),
        ("contains(customer.name, 'Ad')", true),
        ("'coffee' not in items", true),
        ("items < 3", false),
        ("customer.tier in ['silver', 'bronze']", false),
    ];
    for (source, expected) in cases {
        let condition = Condition::parse(source).expect(source);
        assert_eq!(condition.evaluate(&order), expected, "{source}");
    }
    assert_eq!(
        Condition::parse("total > 10 and exists(customer.tier)")
            .expect("parse")
            .referenced_fields(),
        vec!["total".to_string(), "customer".to_string()]
    );
}
