// Integration tests for region navigation and operator execution
// Covers the core workflow scenarios against the public API

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use manifold_workflow::intent::{ClassifierError, IntentClassifier, IntentRule, KeywordClassifier};
use manifold_workflow::models::{Intent, State};
use manifold_workflow::workflow::{Manifold, Operator, Region, WorkflowError};
use serde_json::json;

fn keyword_manifold() -> Manifold {
    Manifold::new(Arc::new(KeywordClassifier::default()))
}

fn flag(name: &str, key: &'static str) -> Operator {
    Operator::new(name, move |mut state: State| async move {
        state.insert(key.to_string(), json!(true));
        Ok(state)
    })
}

/// Always returns the same intent
struct Fixed(Intent);

#[async_trait]
impl IntentClassifier for Fixed {
    async fn query(&self, _prompt: &str) -> Result<Intent, ClassifierError> {
        Ok(self.0.clone())
    }
}

/// Always fails
struct Broken;

#[async_trait]
impl IntentClassifier for Broken {
    async fn query(&self, _prompt: &str) -> Result<Intent, ClassifierError> {
        Err(ClassifierError::Request("classifier offline".to_string()))
    }
}

#[test]
fn test_add_region_sets_current_once() {
    let mut manifold = keyword_manifold();
    let region = Region::with_operators("testRegion", vec![flag("testOperation", "test")]);
    manifold.add_region(region.clone());
    manifold.add_region(Region::new("other"));

    assert!(Arc::ptr_eq(manifold.current().unwrap(), &region));
}

#[tokio::test]
async fn test_navigate_to_adjacent_region_by_substring() {
    let mut manifold = keyword_manifold();
    let region_a = Region::with_operators("regionA", vec![flag("operationA", "a")]);
    let region_b = Region::with_operators("processingRegion", vec![flag("operationB", "b")]);
    region_a.connect_to(&region_b);
    manifold.add_region(region_a);
    manifold.add_region(region_b.clone());

    assert!(manifold.navigate("process the data").await);
    assert!(Arc::ptr_eq(manifold.current().unwrap(), &region_b));
}

#[tokio::test]
async fn test_navigate_to_region_only_held_by_an_edge() {
    let mut manifold = keyword_manifold();
    let hub = Region::new("hub");
    hub.connect_to(&Region::with_operators("analysis", vec![flag("analysis", "analyzed")]));
    assert_eq!(hub.adjacent().len(), 1);
    manifold.add_region(hub);

    assert!(manifold.navigate("analyze the data").await);
    assert_eq!(manifold.current_name(), Some("analysis"));
    assert!(manifold.execute_workflow("analyze the data").await);
    assert_eq!(manifold.state().get("analyzed"), Some(&json!(true)));

    // Still reachable from the region that was left behind
    assert_eq!(manifold.current().unwrap().adjacent()[0].name(), "hub");
}

#[tokio::test]
async fn test_execute_matching_operator() {
    let mut manifold = keyword_manifold();
    manifold.add_region(Region::with_operators(
        "testRegion",
        vec![flag("testOperation", "executed")],
    ));

    assert!(manifold.execute_workflow("test the operation").await);
    assert_eq!(manifold.state().get("executed"), Some(&json!(true)));
}

#[tokio::test]
async fn test_unmatched_prompt_leaves_everything_alone() {
    let mut manifold = keyword_manifold();
    let region = Region::with_operators("sampleRegion", vec![flag("operation", "modified")]);
    manifold.add_region(region.clone());

    assert!(!manifold.navigate("unknown operation").await);
    assert!(Arc::ptr_eq(manifold.current().unwrap(), &region));

    assert!(!manifold.execute_workflow("unknown operation").await);
    assert!(manifold.state().is_empty());
}

#[tokio::test]
async fn test_navigate_without_regions_fails() {
    let mut manifold = keyword_manifold();
    assert!(!manifold.navigate("non-existent operation").await);
}

#[tokio::test]
async fn test_low_confidence_blocks_navigation() {
    let mut manifold = Manifold::new(Arc::new(Fixed(Intent::new("target", 0.3))));
    let start = Region::new("start");
    let target = Region::new("target");
    start.connect_to(&target);
    manifold.add_region(start);
    manifold.add_region(target);

    assert!(!manifold.navigate("go to target").await);
    assert_eq!(manifold.current_name(), Some("start"));
}

#[tokio::test]
async fn test_high_confidence_without_match_blocks_navigation() {
    let mut manifold = Manifold::new(Arc::new(Fixed(Intent::new("elsewhere", 0.99))));
    let start = Region::new("start");
    let target = Region::new("target");
    start.connect_to(&target);
    manifold.add_region(start);
    manifold.add_region(target);

    assert!(!manifold.navigate("go").await);
    assert_eq!(manifold.current_name(), Some("start"));
}

#[tokio::test]
async fn test_state_accumulates_across_regions() {
    let mut manifold = keyword_manifold();
    let region1 = Region::with_operators("operator1", vec![flag("operator1", "step1")]);
    let region2 = Region::with_operators("operator2", vec![flag("operator2", "step2")]);
    region1.connect_to(&region2);
    manifold.add_region(region1);
    manifold.add_region(region2);

    manifold.navigate("operator1").await;
    manifold.execute_workflow("operator1").await;
    manifold.navigate("operator2").await;
    manifold.execute_workflow("operator2").await;

    let state = manifold.state();
    assert_eq!(state.get("step1"), Some(&json!(true)));
    assert_eq!(state.get("step2"), Some(&json!(true)));
}

#[tokio::test]
async fn test_merge_keeps_keys_the_operator_omits() {
    let classifier = KeywordClassifier::new(vec![
        IntentRule::new("seed", "seed", 0.9),
        IntentRule::new("work", "work", 0.9),
    ]);
    let mut manifold = Manifold::new(Arc::new(classifier));
    manifold.add_region(Region::with_operators(
        "r",
        vec![
            flag("seed", "seeded"),
            // Returns only the keys it changes
            Operator::new("work", |_state: State| async move {
                let mut update = State::new();
                update.insert("count".to_string(), json!(2));
                Ok(update)
            }),
        ],
    ));

    assert!(manifold.execute_workflow("seed").await);
    assert!(manifold.execute_workflow("work").await);

    let mut expected = State::new();
    expected.insert("seeded".to_string(), json!(true));
    expected.insert("count".to_string(), json!(2));
    assert_eq!(manifold.state(), expected);
}

#[tokio::test]
async fn test_operator_output_overrides_existing_keys() {
    let mut manifold = Manifold::new(Arc::new(Fixed(Intent::new("bump", 0.9))));
    manifold.add_region(Region::with_operators(
        "r",
        vec![Operator::new("bump", |state: State| async move {
            let current = state.get("n").and_then(|v| v.as_i64()).unwrap_or(0);
            let mut update = State::new();
            update.insert("n".to_string(), json!(current + 1));
            update.insert("touched".to_string(), json!(true));
            Ok(update)
        })],
    ));

    manifold.execute_workflow("bump").await;
    manifold.execute_workflow("bump").await;

    let state = manifold.state();
    assert_eq!(state.get("n"), Some(&json!(2)));
    assert_eq!(state.get("touched"), Some(&json!(true)));
}

#[tokio::test]
async fn test_analysis_processing_transformation_chain() {
    let mut manifold = keyword_manifold();
    let analysis = Region::with_operators("analysis", vec![flag("analysis", "analyzed")]);
    let processing = Region::with_operators("processing", vec![flag("processing", "processed")]);
    let transformation = Region::with_operators(
        "transformation",
        vec![flag("transformation", "transformed")],
    );
    analysis.connect_to(&processing);
    processing.connect_to(&transformation);

    // Start in the middle so analysis is one hop away
    manifold.add_region(processing);
    manifold.add_region(analysis);
    manifold.add_region(transformation);

    assert!(manifold.navigate("analyze the data").await);
    assert_eq!(manifold.current_name(), Some("analysis"));
    assert!(manifold.execute_workflow("analyze the data").await);
    assert_eq!(manifold.state().get("analyzed"), Some(&json!(true)));

    // transformation is not adjacent to analysis
    assert!(!manifold.navigate("transform it").await);
    assert!(manifold.navigate("process it").await);
    assert!(manifold.navigate("transform it").await);
    assert!(manifold.execute_workflow("transform it").await);
    assert_eq!(manifold.current_name(), Some("transformation"));
}

#[tokio::test]
async fn test_navigation_matches_substrings_but_execution_does_not() {
    let mut manifold = keyword_manifold();
    let start = Region::new("start");
    let processing_stage = Region::with_operators(
        "processingStage",
        vec![flag("processingStep", "processed")],
    );
    start.connect_to(&processing_stage);
    manifold.add_region(start);
    manifold.add_region(processing_stage);

    // "processing" is contained in "processingStage"
    assert!(manifold.navigate("process the data").await);
    assert_eq!(manifold.current_name(), Some("processingStage"));

    // ...and in "processingStep", but operators need an exact name
    assert!(!manifold.execute_workflow("process the data").await);
    assert!(manifold.state().get("processed").is_none());
}

#[tokio::test]
async fn test_execution_ignores_case() {
    let mut manifold = keyword_manifold();
    manifold.add_region(Region::with_operators("Cleaning", vec![flag("CLEANING", "cleaned")]));

    assert!(manifold.execute_workflow("Clean the data").await);
    assert_eq!(manifold.state().get("cleaned"), Some(&json!(true)));
}

#[tokio::test]
async fn test_classifier_failure_is_downgraded() -> Result<()> {
    let mut manifold = Manifold::new(Arc::new(Broken));
    let region = Region::with_operators("r", vec![flag("r", "ran")]);
    let other = Region::new("other");
    region.connect_to(&other);
    manifold.add_region(region);
    manifold.add_region(other);

    assert!(!manifold.navigate("anything").await);
    assert!(!manifold.execute_workflow("anything").await);

    let err = manifold.try_navigate("anything").await.unwrap_err();
    assert!(matches!(err, WorkflowError::Classifier(_)));
    assert!(err.to_string().contains("classifier offline"));

    let err = manifold.try_execute_workflow("anything").await.unwrap_err();
    assert!(matches!(err, WorkflowError::Classifier(_)));

    assert_eq!(manifold.current_name(), Some("r"));
    Ok(())
}

#[tokio::test]
async fn test_operator_failure_is_downgraded() {
    let mut manifold = Manifold::new(Arc::new(Fixed(Intent::new("explode", 0.9))));
    manifold.add_region(Region::with_operators(
        "r",
        vec![Operator::new("explode", |_state: State| async move {
            Err(anyhow::anyhow!("boom"))
        })],
    ));

    assert!(!manifold.execute_workflow("go").await);
    assert!(manifold.state().is_empty());

    match manifold.try_execute_workflow("go").await {
        Err(WorkflowError::Operator { name, message }) => {
            assert_eq!(name, "explode");
            assert_eq!(message, "boom");
        }
        other => panic!("expected operator error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_structural_failures_are_not_errors() -> Result<()> {
    let mut manifold = Manifold::new(Arc::new(Fixed(Intent::new("missing", 0.9))));
    manifold.add_region(Region::new("r"));

    assert!(!manifold.try_navigate("go").await?);
    assert!(!manifold.try_execute_workflow("go").await?);
    Ok(())
}
