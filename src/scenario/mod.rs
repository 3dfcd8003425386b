//! Guided multi-turn conversations driven by a JSON node graph.

pub mod condition;
pub mod definition;
pub mod error;
pub mod extractor;
pub mod machine;

pub use condition::{truthy, Condition, ConditionError};
pub use definition::{ConditionSource, EdgeDefinition, NodeDefinition, ScenarioDefinition};
pub use error::ScenarioError;
pub use extractor::{build_extraction_prompt, parse_extraction, Extractor};
pub use machine::{StateMachine, Transition};
