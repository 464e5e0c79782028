mod agents;
mod cli;
mod client;
mod config;
#[path = "../../contract.rs"]
mod contract;
mod error;
mod library;
mod mcp;

use clap::Parser as _;
use cli::Cli;
use config::Settings;
use std::env;
use std::process::{Command, Stdio, exit};
use tracing_subscriber::{
    Layer,
    filter::{EnvFilter, LevelFilter},
    prelude::*,
};

const PKG_NAME: &str = env!("CARGO_PKG_NAME");
const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .boxed();
    tracing_subscriber::registry().with(layer).init();

    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!("{e:?}");
            eprintln!("Error: {e:#}");
            1
        }
    };
    exit(code);
}

fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse_from(cli::route_args(env::args_os()));
    let settings = if cli.help || cli.version {
        Settings::load_lenient()?
    } else {
        Settings::load()?
    };

    if cli.help {
        let original = cursor_agent_output(&settings, "--help").unwrap_or_default();
        println!("{}", cli::inject_help(&original));
        return Ok(0);
    }
    if cli.version {
        print_version(&settings);
        return Ok(0);
    }

    match cli.subcommand() {
        Some("list-agents") => {
            print!("{}", agents::format_listing(&settings.agents_dir()));
            return Ok(0);
        }
        Some("mcp-server") => {
            mcp::run(settings)?;
            return Ok(0);
        }
        _ => {}
    }

    match &cli.agent {
        Some(agent) => client::run_with_agent(&settings, agent, &cli.args),
        None => client::forward(&settings, &cli.args),
    }
}

/// Captured stdout of `cursor-agent <flag>`, if it can be run.
fn cursor_agent_output(settings: &Settings, flag: &str) -> Option<String> {
    let output = Command::new(&settings.cursor_agent)
        .arg(flag)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .inspect_err(|e| tracing::debug!("cursor-agent {flag}: {e}"))
        .ok()?;
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn print_version(settings: &Settings) {
    println!("{PKG_NAME} {PKG_VERSION}");
    match cursor_agent_output(settings, "--version") {
        Some(v) if !v.trim().is_empty() => println!("cursor-agent {}", v.trim()),
        _ => println!("cursor-agent not found"),
    }
    match library::DyLib::load(&settings.library).and_then(|lib| lib.version()) {
        Ok(v) => println!("libcursor_redirect {v} ({})", settings.library.display()),
        Err(e) => tracing::debug!("{e:?}"),
    }
}
