use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt as _;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HELP_TEXT: &str = "Usage: cursor-agent [options] [command] [prompt...]

Options:
  -p, --print                  Print responses to console
  --resume [chatId]            Resume a chat session

Commands:
  help [command]               display help for command
";

/// Project directory plus a stand-in `cursor-agent` script.
struct Project {
    dir: TempDir,
}

impl Project {
    fn new(script: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("project/.cursor/agents")).unwrap();
        fs::create_dir_all(dir.path().join("home")).unwrap();
        let agent = dir.path().join("cursor-agent");
        fs::write(&agent, format!("#!/bin/sh\n{script}\n")).unwrap();
        fs::set_permissions(&agent, fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("project")
    }

    fn add_agent(&self, name: &str, description: Option<&str>) -> PathBuf {
        let path = self.root().join(".cursor/agents").join(name);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join(".cursorrules"), format!("{name} rules\n")).unwrap();
        if let Some(description) = description {
            fs::write(path.join("description.txt"), description).unwrap();
        }
        path
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cursor-subagent"));
        cmd.current_dir(self.root())
            .env("HOME", self.dir.path().join("home"))
            .env("CURSOR_AGENT_PATH", self.dir.path().join("cursor-agent"))
            .env_remove("CURSOR_SUBAGENT_DYLIB_PATH")
            .env_remove("LD_PRELOAD");
        cmd
    }
}

/// The interception library from this build, in the profile dir or `deps/`.
fn built_library() -> PathBuf {
    let path = Path::new(env!("DYLIB_PATH"));
    let deps = path.with_file_name("deps").join(path.file_name().unwrap());
    [path.to_path_buf(), deps]
        .into_iter()
        .find(|v| v.is_file())
        .unwrap_or_else(|| panic!("{} was not built", path.display()))
}

#[test]
fn test_version_output() {
    let project = Project::new("echo 2025.10.01");
    project
        .command()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!(
            "cursor-subagent {}\ncursor-agent 2025.10.01\n",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_help_includes_launcher_entries() {
    let project = Project::new(&format!("cat <<'EOF'\n{HELP_TEXT}EOF"));
    project
        .command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "  -a, --agent <name>           Use a specific agent configuration\n  --resume",
        ))
        .stdout(predicate::str::contains(
            "  list-agents                  List all available subagent configurations\n  help ",
        ));
}

#[test]
fn test_help_without_cursor_agent() {
    let project = Project::new("exit 0");
    project
        .command()
        .env("CURSOR_AGENT_PATH", project.dir.path().join("missing"))
        .arg("-h")
        .assert()
        .success()
        .stdout("cursor-agent not found. Install Cursor to use cursor-subagent.\n");
}

#[test]
fn test_list_agents() {
    let project = Project::new("exit 0");
    project
        .command()
        .arg("list-agents")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("No agents found.\n"));

    project.add_agent("backend", Some("Server-side work"));
    project.add_agent("frontend", None);
    project
        .command()
        .arg("list-agents")
        .assert()
        .success()
        .stdout("Available agents (2):\n\n  • backend\n    Server-side work\n  • frontend\n");
}

#[test]
fn test_broken_config_only_blocks_real_commands() {
    let project = Project::new("echo 2025.10.01");
    fs::write(project.root().join(".cursor-subagent.toml"), "library = [").unwrap();
    project
        .command()
        .arg("-h")
        .assert()
        .success()
        .stderr(predicate::str::contains("Config file format error"));
    project
        .command()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cursor-agent 2025.10.01\n"));
    project
        .command()
        .arg("list-agents")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: Config file format error"));
}

#[test]
fn test_arguments_are_forwarded() {
    let project = Project::new("echo \"args: $*\"\nexit 3");
    project
        .command()
        .args(["-p", "hello", "--force"])
        .assert()
        .code(3)
        .stdout("args: -p hello --force\n");
}

#[test]
fn test_missing_cursor_agent_is_an_error() {
    let project = Project::new("exit 0");
    project
        .command()
        .env("CURSOR_AGENT_PATH", project.dir.path().join("missing"))
        .arg("chat")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cursor-agent not found at"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_unknown_agent_is_an_error() {
    let project = Project::new("exit 0");
    project.add_agent("backend", None);
    project
        .command()
        .args(["-a", "nope", "-p", "hi"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Error: Agent 'nope' does not exist\nAvailable agents: backend",
        ));

    project
        .command()
        .args(["--agent", "../backend"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid agent name"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_missing_library_is_an_error() {
    let project = Project::new("exit 0");
    project.add_agent("backend", None);
    project
        .command()
        .env(
            "CURSOR_SUBAGENT_DYLIB_PATH",
            project.dir.path().join("libmissing.so"),
        )
        .args(["-a", "backend"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Dylib not found at"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_agent_sees_its_own_configuration() {
    let library = built_library();
    let project = Project::new("cat .cursor/.cursorrules\ncat .cursor/mcp.json\nexit 5");
    fs::write(project.root().join(".cursor/mcp.json"), "shared mcp\n").unwrap();
    let agent = project.add_agent("backend", None);
    fs::write(agent.join("mcp.json"), "backend mcp\n").unwrap();

    project
        .command()
        .env("CURSOR_SUBAGENT_DYLIB_PATH", &library)
        .args(["-p", "--agent", "backend"])
        .assert()
        .code(5)
        .stdout("backend rules\nbackend mcp\n");
}
