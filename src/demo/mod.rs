//! Demonstration graph with a nested preprocessing stage
//!
//! preprocessing (nested: validation <-> cleaning) <-> analysis <-> transformation

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::intent::IntentClassifier;
use crate::models::State;
use crate::workflow::{Manifold, Operator, Region};

/// Prompts the demo runs, with a description of what each exercises
pub const DEMO_PROMPTS: &[(&str, &str)] = &[
    ("validate the input", "Nested: Data Validation"),
    ("clean the data", "Nested: Data Cleaning"),
    ("analyze the results", "Main: Data Analysis"),
    ("transform the output", "Main: Data Transformation"),
];

/// Operator that sets `flag` to true
pub fn flag_operator(name: &str, flag: &'static str) -> Operator {
    Operator::new(name, move |mut state: State| async move {
        state.insert(flag.to_string(), json!(true));
        Ok(state)
    })
}

/// Build the demo graph. Both levels share `classifier`.
pub fn build_demo_manifold(classifier: Arc<dyn IntentClassifier>) -> Manifold {
    let mut nested = Manifold::new(classifier.clone());
    let validation = Region::with_operators("validation", vec![flag_operator("validation", "validated")]);
    let cleaning = Region::with_operators("cleaning", vec![flag_operator("cleaning", "cleaned")]);
    validation.connect_to(&cleaning);
    nested.add_region(validation);
    nested.add_region(cleaning);

    let mut main = Manifold::new(classifier);
    let preprocessing = Region::nested("preprocessing", nested);
    let analysis = Region::with_operators("analysis", vec![flag_operator("analysis", "analyzed")]);
    let transformation = Region::with_operators(
        "transformation",
        vec![flag_operator("transformation", "transformed")],
    );
    preprocessing.connect_to(&analysis);
    analysis.connect_to(&transformation);

    main.add_region(preprocessing);
    main.add_region(analysis);
    main.add_region(transformation);
    main
}

/// Outcome of one prompt
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub prompt: String,
    pub description: String,
    pub navigated: bool,
    pub executed: bool,
    pub region: Option<String>,
}

/// Navigate then execute for every demo prompt
pub async fn run_demo(manifold: &mut Manifold) -> Vec<StepReport> {
    let mut reports = Vec::with_capacity(DEMO_PROMPTS.len());
    for (prompt, description) in DEMO_PROMPTS {
        let navigated = manifold.navigate(prompt).await;
        let executed = manifold.execute_workflow(prompt).await;
        reports.push(StepReport {
            prompt: prompt.to_string(),
            description: description.to_string(),
            navigated,
            executed,
            region: manifold.current_name().map(str::to_string),
        });
    }
    reports
}
