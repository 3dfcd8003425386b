use super::condition::{is_field_name, Condition};
use super::error::ScenarioError;
use crate::shared::ids::NodeId;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ScenarioFileRaw {
    #[serde(default)]
    scenarios: Vec<ScenarioRaw>,
}

#[derive(Debug, Deserialize)]
struct ScenarioRaw {
    name: String,
    #[serde(default)]
    general_system_prompt: String,
    #[serde(default, alias = "initial_agent")]
    initial_node: Option<String>,
    #[serde(default)]
    conditions: BTreeMap<String, String>,
    #[serde(alias = "agents")]
    nodes: Vec<NodeRaw>,
}

#[derive(Debug, Deserialize)]
struct NodeRaw {
    id: String,
    #[serde(default)]
    system_prompt: String,
    #[serde(default)]
    required_info: Vec<String>,
    #[serde(default, alias = "conditions")]
    edges: Vec<EdgeRaw>,
}

#[derive(Debug, Deserialize)]
struct EdgeRaw {
    #[serde(default)]
    condition: Option<String>,
    #[serde(default)]
    when: Option<String>,
    #[serde(alias = "next_agent_id")]
    next_node: String,
}

/// Where an edge's condition came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionSource {
    Named(String),
    Inline,
}

#[derive(Debug, Clone)]
pub struct EdgeDefinition {
    pub source: ConditionSource,
    pub condition: Condition,
    pub target: usize,
}

impl EdgeDefinition {
    /// Condition name, or the inline expression text.
    pub fn label(&self) -> &str {
        match &self.source {
            ConditionSource::Named(name) => name,
            ConditionSource::Inline => self.condition.source(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeDefinition {
    pub id: NodeId,
    pub system_prompt: String,
    pub required_info: Vec<String>,
    pub edges: Vec<EdgeDefinition>,
}

/// One validated scenario graph. Edge targets are indexes into `nodes`.
#[derive(Debug, Clone)]
pub struct ScenarioDefinition {
    name: String,
    general_system_prompt: String,
    initial: usize,
    nodes: Vec<NodeDefinition>,
}

impl ScenarioDefinition {
    /// Loads `scenario` (or the first scenario when `None`) from a file.
    pub fn from_path(path: &Path, scenario: Option<&str>) -> Result<Self, ScenarioError> {
        let raw = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ScenarioFileRaw =
            serde_json::from_str(&raw).map_err(|source| ScenarioError::Parse {
                path: Some(path.to_path_buf()),
                source,
            })?;
        select(file, scenario)
    }

    pub fn from_json_str(raw: &str, scenario: Option<&str>) -> Result<Self, ScenarioError> {
        let file: ScenarioFileRaw =
            serde_json::from_str(raw).map_err(|source| ScenarioError::Parse {
                path: None,
                source,
            })?;
        select(file, scenario)
    }

    /// Names of every scenario in a file, in file order.
    pub fn list_names(path: &Path) -> Result<Vec<String>, ScenarioError> {
        let raw = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ScenarioFileRaw =
            serde_json::from_str(&raw).map_err(|source| ScenarioError::Parse {
                path: Some(path.to_path_buf()),
                source,
            })?;
        Ok(file.scenarios.into_iter().map(|s| s.name).collect())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn general_system_prompt(&self) -> &str {
        &self.general_system_prompt
    }

    pub fn initial_index(&self) -> usize {
        self.initial
    }

    pub fn nodes(&self) -> &[NodeDefinition] {
        &self.nodes
    }

}

fn select(file: ScenarioFileRaw, scenario: Option<&str>) -> Result<ScenarioDefinition, ScenarioError> {
    if file.scenarios.is_empty() {
        return Err(ScenarioError::NoScenarios);
    }
    let available = file
        .scenarios
        .iter()
        .map(|s| s.name.clone())
        .collect::<Vec<_>>()
        .join(", ");
    let raw = match scenario {
        Some(name) => file
            .scenarios
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ScenarioError::UnknownScenario {
                name: name.to_string(),
                available,
            })?,
        None => file
            .scenarios
            .into_iter()
            .next()
            .ok_or(ScenarioError::NoScenarios)?,
    };
    compile(raw)
}

fn compile(raw: ScenarioRaw) -> Result<ScenarioDefinition, ScenarioError> {
    let scenario = raw.name.clone();
    let invalid = |reason: String| ScenarioError::Invalid {
        scenario: scenario.clone(),
        reason,
    };

    if raw.nodes.is_empty() {
        return Err(invalid("scenario has no nodes".to_string()));
    }

    let mut index_by_id = HashMap::new();
    for (index, node) in raw.nodes.iter().enumerate() {
        NodeId::parse(&node.id).map_err(&invalid)?;
        if index_by_id.insert(node.id.clone(), index).is_some() {
            return Err(invalid(format!("duplicate node id `{}`", node.id)));
        }
    }

    let mut named = HashMap::new();
    for (name, source) in &raw.conditions {
        let condition = Condition::parse(source).map_err(|source| ScenarioError::Condition {
            scenario: scenario.clone(),
            condition: name.clone(),
            source,
        })?;
        named.insert(name.clone(), condition);
    }

    let initial = match raw.initial_node.as_deref() {
        Some(id) => *index_by_id
            .get(id)
            .ok_or_else(|| invalid(format!("initial node `{id}` does not exist")))?,
        None => 0,
    };

    let mut nodes = Vec::with_capacity(raw.nodes.len());
    for node in raw.nodes {
        if let Some(field) = node.required_info.iter().find(|f| !is_field_name(f)) {
            return Err(invalid(format!(
                "node `{}` has required_info entry `{field}` that conditions cannot name \
                 (use letters, digits and `_`)",
                node.id
            )));
        }

        let mut edges = Vec::with_capacity(node.edges.len());
        for edge in node.edges {
            let target = *index_by_id.get(&edge.next_node).ok_or_else(|| {
                invalid(format!(
                    "node `{}` points at unknown node `{}`",
                    node.id, edge.next_node
                ))
            })?;
            let (source, condition) = match (edge.condition, edge.when) {
                (Some(name), None) => {
                    let condition = named.get(&name).cloned().ok_or_else(|| {
                        invalid(format!(
                            "node `{}` references unknown condition `{name}`",
                            node.id
                        ))
                    })?;
                    (ConditionSource::Named(name), condition)
                }
                (None, Some(expr)) => {
                    let condition =
                        Condition::parse(&expr).map_err(|source| ScenarioError::Condition {
                            scenario: scenario.clone(),
                            condition: expr.clone(),
                            source,
                        })?;
                    (ConditionSource::Inline, condition)
                }
                _ => {
                    return Err(invalid(format!(
                        "edge from `{}` to `{}` needs exactly one of `condition` or `when`",
                        node.id, edge.next_node
                    )))
                }
            };
            edges.push(EdgeDefinition {
                source,
                condition,
                target,
            });
        }

        nodes.push(NodeDefinition {
            id: NodeId::parse(&node.id).map_err(&invalid)?,
            system_prompt: node.system_prompt,
            required_info: node.required_info,
            edges,
        });
    }

    Ok(ScenarioDefinition {
        name: raw.name,
        general_system_prompt: raw.general_system_prompt,
        initial,
        nodes,
    })
}
