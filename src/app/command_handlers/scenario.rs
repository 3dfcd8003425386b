use crate::app::command_support::parse_args;
use crate::scenario::ScenarioDefinition;
use std::path::Path;

const USAGE: &str = "usage: scenario <check|list> <file> [--scenario <name>]";

/// Scenario files are checked standalone; no config is needed.
pub fn cmd_scenario(args: &[String]) -> Result<String, String> {
    let Some(action) = args.first() else {
        return Err(USAGE.to_string());
    };
    let parsed = parse_args(&args[1..], &["scenario"])?;
    let [file] = parsed.positional.as_slice() else {
        return Err(USAGE.to_string());
    };
    let path = Path::new(file);

    match action.as_str() {
        "list" => {
            let names = ScenarioDefinition::list_names(path).map_err(|e| e.to_string())?;
            let mut lines = vec![format!("scenarios={}", names.len())];
            lines.extend(names.into_iter().map(|name| format!("scenario={name}")));
            Ok(lines.join("\n"))
        }
        "check" => {
            let definition = ScenarioDefinition::from_path(path, parsed.flag("scenario"))
                .map_err(|e| e.to_string())?;
            let nodes = definition.nodes();
            let initial = nodes
                .get(definition.initial_index())
                .map(|node| node.id.to_string())
                .unwrap_or_default();
            let mut lines = vec![
                "scenario ok".to_string(),
                format!("scenario={}", definition.name()),
                format!("initial={initial}"),
                format!("nodes={}", nodes.len()),
            ];
            let extracted: Vec<&str> = nodes
                .iter()
                .flat_map(|node| node.required_info.iter().map(String::as_str))
                .collect();
            let mut warnings = Vec::new();
            for node in nodes {
                let required = if node.required_info.is_empty() {
                    "-".to_string()
                } else {
                    node.required_info.join(",")
                };
                lines.push(format!("node={} required={required}", node.id));
                for edge in &node.edges {
                    let target = nodes
                        .get(edge.target)
                        .map(|n| n.id.as_str())
                        .unwrap_or("?");
                    let fields = edge.condition.referenced_fields();
                    let reads = if fields.is_empty() {
                        "-".to_string()
                    } else {
                        fields.join(",")
                    };
                    lines.push(format!("  when {} -> {target} reads={reads}", edge.label()));
                    for field in fields {
                        if !extracted.contains(&field.as_str()) {
                            warnings.push(format!(
                                "warning=edge {} -> {target} reads `{field}` which no node extracts",
                                node.id
                            ));
                        }
                    }
                }
            }
            lines.extend(warnings);
            Ok(lines.join("\n"))
        }
        other => Err(format!("unknown scenario action `{other}`\n{USAGE}")),
    }
}
