//! Agent discovery under `.cursor/agents/`.
//!
//! Any subdirectory can be launched as an agent. Listings only show the ones
//! holding a `.cursorrules` file. An agent may also carry `mcp.json`, a
//! `rules/` directory and a one-line `description.txt`.

use crate::error::LaunchError;
use std::fmt::Write as _;
use std::fs;
use std::path::{Component, Path, PathBuf};

const RULES_FILE: &str = ".cursorrules";
const RULES_DIR: &str = "rules";
const MCP_FILE: &str = "mcp.json";
const DESCRIPTION_FILE: &str = "description.txt";

const DESCRIPTION_WIDTH: usize = 70;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentInfo {
    pub name: String,
    pub path: PathBuf,
    pub has_rules: bool,
    pub has_mcp_config: bool,
    pub description: Option<String>,
}

/// Names of all agents, sorted.
pub fn list_agents(agents_dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(agents_dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().join(RULES_FILE).is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}

pub fn agent_info(agents_dir: &Path, name: &str) -> Option<AgentInfo> {
    let path = agents_dir.join(name);
    if !path.is_dir() {
        return None;
    }
    let has_rules = path.join(RULES_FILE).is_file() || non_empty_dir(&path.join(RULES_DIR));
    let description = fs::read_to_string(path.join(DESCRIPTION_FILE))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    Some(AgentInfo {
        name: name.to_string(),
        has_mcp_config: path.join(MCP_FILE).is_file(),
        has_rules,
        description,
        path,
    })
}

fn non_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// A name must stay one path segment below the agents directory.
pub fn validate_name(name: &str) -> Result<(), LaunchError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains('\0') => Ok(()),
        _ => Err(LaunchError::InvalidAgentName(name.to_string())),
    }
}

/// Resolve an agent directory for launching.
pub fn find_agent(agents_dir: &Path, name: &str) -> Result<PathBuf, LaunchError> {
    validate_name(name)?;
    let path = agents_dir.join(name);
    if path.is_dir() {
        return Ok(path);
    }
    let available = list_agents(agents_dir);
    Err(LaunchError::AgentNotFound {
        name: name.to_string(),
        available: if available.is_empty() {
            "(none)".to_string()
        } else {
            available.join(", ")
        },
    })
}

fn truncate_description(description: &str) -> String {
    if description.chars().count() > DESCRIPTION_WIDTH {
        let head: String = description.chars().take(DESCRIPTION_WIDTH - 3).collect();
        format!("{head}...")
    } else {
        description.to_string()
    }
}

/// Listing printed by `cursor-subagent list-agents`.
pub fn format_listing(agents_dir: &Path) -> String {
    let names = list_agents(agents_dir);
    let mut out = String::new();
    if names.is_empty() {
        let _ = writeln!(out, "No agents found.");
        let _ = writeln!(out, "Agents directory: {}", agents_dir.display());
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Create agents in .cursor/agents/ with a .cursorrules file"
        );
        return out;
    }
    let _ = writeln!(out, "Available agents ({}):", names.len());
    let _ = writeln!(out);
    for info in names.iter().filter_map(|v| agent_info(agents_dir, v)) {
        let _ = writeln!(out, "  • {}", info.name);
        if let Some(description) = &info.description {
            let _ = writeln!(out, "    {}", truncate_description(description));
        }
    }
    out
}

/// Detailed listing returned by the MCP `list-agents` tool.
pub fn format_details(agents_dir: &Path) -> String {
    let names = list_agents(agents_dir);
    if names.is_empty() {
        return "No agents found.".to_string();
    }
    let mut out = String::from("Available agents:\n");
    for info in names.iter().filter_map(|v| agent_info(agents_dir, v)) {
        let _ = writeln!(out, "\n**{}**", info.name);
        if let Some(description) = &info.description {
            let _ = writeln!(out, "  Description: {description}");
        }
        let _ = writeln!(out, "  Path: {}", info.path.display());
        let _ = writeln!(out, "  Has rules: {}", info.has_rules);
        let _ = writeln!(out, "  Has MCP config: {}", info.has_mcp_config);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn agents_fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let backend = dir.path().join("backend");
        fs::create_dir_all(backend.join("rules")).unwrap();
        fs::write(backend.join(RULES_FILE), "backend rules").unwrap();
        fs::write(backend.join(MCP_FILE), "{}").unwrap();
        fs::write(backend.join(DESCRIPTION_FILE), "  Server-side work\n").unwrap();

        let frontend = dir.path().join("frontend");
        fs::create_dir_all(&frontend).unwrap();
        fs::write(frontend.join(RULES_FILE), "frontend rules").unwrap();
        fs::write(frontend.join(DESCRIPTION_FILE), "x".repeat(80)).unwrap();

        // no .cursorrules, not an agent
        fs::create_dir_all(dir.path().join("scratch")).unwrap();
        dir
    }

    #[test]
    fn only_dirs_with_rules_are_agents() {
        let dir = agents_fixture();
        assert_eq!(list_agents(dir.path()), vec!["backend", "frontend"]);
        assert!(list_agents(&dir.path().join("missing")).is_empty());
    }

    #[test]
    fn agent_info_reports_contents() {
        let dir = agents_fixture();
        let info = agent_info(dir.path(), "backend").unwrap();
        assert!(info.has_rules);
        assert!(info.has_mcp_config);
        assert_eq!(info.description.as_deref(), Some("Server-side work"));

        let info = agent_info(dir.path(), "scratch").unwrap();
        assert!(!info.has_rules);
        assert!(!info.has_mcp_config);
        assert_eq!(info.description, None);

        assert_eq!(agent_info(dir.path(), "missing"), None);
    }

    #[test]
    fn names_must_be_a_single_segment() {
        assert!(validate_name("backend").is_ok());
        for name in ["", ".", "..", "a/b", "/abs", "../escape"] {
            assert!(
                matches!(validate_name(name), Err(LaunchError::InvalidAgentName(_))),
                "{name:?}"
            );
        }
    }

    #[test]
    fn missing_agent_lists_alternatives() {
        let dir = agents_fixture();
        assert_eq!(
            find_agent(dir.path(), "backend").unwrap(),
            dir.path().join("backend")
        );
        let err = find_agent(dir.path(), "missing").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Agent 'missing' does not exist\nAvailable agents: backend, frontend"
        );

        let empty = TempDir::new().unwrap();
        let err = find_agent(empty.path(), "backend").unwrap_err();
        assert!(err.to_string().ends_with("Available agents: (none)"), "{err}");
    }

    #[test]
    fn any_agent_directory_can_be_launched() {
        let dir = agents_fixture();
        let designer = dir.path().join("designer");
        fs::create_dir_all(designer.join("rules")).unwrap();
        fs::write(designer.join("rules/ui.md"), "ui rules").unwrap();
        fs::write(designer.join(MCP_FILE), "{}").unwrap();

        assert_eq!(find_agent(dir.path(), "designer").unwrap(), designer);
        assert_eq!(
            find_agent(dir.path(), "scratch").unwrap(),
            dir.path().join("scratch")
        );
        assert!(agent_info(dir.path(), "designer").unwrap().has_rules);

        fs::write(dir.path().join("notes.txt"), "").unwrap();
        assert!(matches!(
            find_agent(dir.path(), "notes.txt"),
            Err(LaunchError::AgentNotFound { .. })
        ));
    }

    #[test]
    fn listing_truncates_long_descriptions() {
        let dir = agents_fixture();
        let listing = format_listing(dir.path());
        assert!(listing.starts_with("Available agents (2):\n\n  • backend\n    Server-side work\n"));
        assert!(listing.contains(&format!("    {}...\n", "x".repeat(67))));
    }

    #[test]
    fn empty_listing_explains_layout() {
        let dir = TempDir::new().unwrap();
        let listing = format_listing(dir.path());
        assert!(listing.starts_with("No agents found.\n"));
        assert!(listing.ends_with("Create agents in .cursor/agents/ with a .cursorrules file\n"));
    }

    #[test]
    fn details_include_flags() {
        let dir = agents_fixture();
        let details = format_details(dir.path());
        assert!(details.starts_with("Available agents:\n\n**backend**\n"));
        assert!(details.contains("  Has rules: true\n  Has MCP config: true\n"));
        assert!(details.contains("**frontend**"));
    }
}
