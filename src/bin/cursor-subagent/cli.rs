use clap::Parser;
use std::ffi::OsString;

/// Wrapper around `cursor-agent`.
///
/// Everything it does not recognize is handed to `cursor-agent` untouched.
#[derive(Parser, Debug)]
#[command(
    name = "cursor-subagent",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Cli {
    /// Use a specific agent configuration
    #[arg(short = 'a', long = "agent", value_name = "NAME")]
    pub agent: Option<String>,

    #[arg(short = 'v', long = "version")]
    pub version: bool,

    #[arg(short = 'h', long = "help")]
    pub help: bool,

    /// Arguments for cursor-agent
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<OsString>,
}

impl Cli {
    /// Leading forwarded word, for the launcher's own subcommands.
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().and_then(|v| v.to_str())
    }
}

/// Split launcher flags from `cursor-agent` arguments.
///
/// Launcher flags may appear anywhere before a `--`. They are moved to the
/// front and the rest is placed after a `--` so clap never interprets it.
///
/// ```text
/// cursor-subagent -p hi -a backend  -> cursor-subagent -a backend -- -p hi
/// cursor-subagent -- -a x           -> cursor-subagent -- -- -a x
/// ```
pub fn route_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut own: Vec<OsString> = args.next().into_iter().collect();
    let mut forwarded = Vec::new();

    while let Some(arg) = args.next() {
        let Some(s) = arg.to_str() else {
            forwarded.push(arg);
            continue;
        };
        match s {
            "--" => {
                forwarded.push(arg);
                forwarded.extend(args.by_ref());
            }
            "-a" | "--agent" => {
                own.push(arg);
                own.extend(args.next());
            }
            "-h" | "--help" | "-v" | "--version" => own.push(arg),
            // attached values are split so clap sees `-a NAME` before the `--`
            _ if s.starts_with("--agent=") => {
                own.push("--agent".into());
                own.push(s["--agent=".len()..].into());
            }
            _ if s.starts_with("-a") && s.len() > 2 => {
                own.push("-a".into());
                own.push(s["-a".len()..].into());
            }
            _ => forwarded.push(arg),
        }
    }

    own.push("--".into());
    own.extend(forwarded);
    own
}

const AGENT_HELP: &str = "  -a, --agent <name>           Use a specific agent configuration";
const LIST_AGENTS_HELP: &str = "  list-agents                  List all available subagent configurations";

/// Merge launcher entries into `cursor-agent --help` output.
///
/// The agent flag goes before each `--resume` line and the `list-agents`
/// command before each line starting with `help `.
pub fn inject_help(original: &str) -> String {
    if original.trim().is_empty() {
        return "cursor-agent not found. Install Cursor to use cursor-subagent.".to_string();
    }
    let mut lines = Vec::new();
    for line in original.lines() {
        if line.contains("--resume") {
            lines.push(AGENT_HELP);
        }
        if line.trim_start().starts_with("help ") {
            lines.push(LIST_AGENTS_HELP);
        }
        lines.push(line);
    }
    lines.join("\n")
}
