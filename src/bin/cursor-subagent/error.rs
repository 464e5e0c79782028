use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Agent '{name}' does not exist\nAvailable agents: {available}")]
    AgentNotFound { name: String, available: String },

    #[error("Invalid agent name: {0}")]
    InvalidAgentName(String),

    #[error(
        "Dylib not found at {0}\nThis usually means cursor-subagent wasn't installed correctly."
    )]
    LibraryNotFound(PathBuf),

    #[error("cursor-agent not found at {0}\nInstall Cursor to use cursor-subagent")]
    CursorAgentNotFound(PathBuf),

    #[error("Agent isolation is only supported on Linux")]
    UnsupportedPlatform,
}
