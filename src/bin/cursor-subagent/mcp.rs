//! MCP server over stdio.
//!
//! Speaks newline-delimited JSON-RPC 2.0 and exposes two tools:
//! `list-agents` and `spawn-agent`. The latter runs this launcher again in
//! non-interactive mode with the requested agent.

use crate::agents;
use crate::config::Settings;
use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader};
use tokio::process::Command;

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "cursor-subagent";
const SPAWN_TIMEOUT: Duration = Duration::from_secs(300);

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Deserialize, Debug)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Serialize, Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Serialize, Debug)]
struct Response {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl Response {
    fn new(id: Value, result: Result<Value, RpcError>) -> Self {
        let (result, error) = match result {
            Ok(v) => (Some(v), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            jsonrpc: "2.0",
            id,
            result,
            error,
        }
    }
}

#[derive(Deserialize, Debug)]
struct SpawnArgs {
    prompt: Option<String>,
    name: Option<String>,
    model: Option<String>,
}

pub struct Server {
    settings: Settings,
    launcher: PathBuf,
    timeout: Duration,
}

impl Server {
    pub fn new(settings: Settings, launcher: PathBuf) -> Self {
        Self {
            settings,
            launcher,
            timeout: SPAWN_TIMEOUT,
        }
    }

    /// Handle one incoming line. Notifications produce no reply.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<Value>(line) {
            Err(e) => Some(Response::new(
                Value::Null,
                Err(RpcError::new(PARSE_ERROR, format!("Parse error: {e}"))),
            )),
            Ok(message) => self.handle(message).await,
        };
        response.and_then(|v| serde_json::to_string(&v).ok())
    }

    async fn handle(&self, message: Value) -> Option<Response> {
        let id = message.get("id").cloned();
        let request: Request = match serde_json::from_value(message) {
            Ok(v) => v,
            Err(e) => {
                return Some(Response::new(
                    id.unwrap_or(Value::Null),
                    Err(RpcError::new(INVALID_REQUEST, format!("Invalid request: {e}"))),
                ));
            }
        };
        let Some(id) = request.id else {
            tracing::debug!("notification: {}", request.method);
            return None;
        };
        tracing::debug!("request: {}", request.method);
        let result = match request.method.as_str() {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tools() })),
            "tools/call" => self.call_tool(&request.params).await.map(|text| {
                json!({ "content": [{ "type": "text", "text": text }] })
            }),
            other => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        };
        Some(Response::new(id, result))
    }

    async fn call_tool(&self, params: &Value) -> Result<String, RpcError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::new(INVALID_PARAMS, "Missing tool name"))?;
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
        match name {
            "list-agents" => Ok(agents::format_details(&self.settings.agents_dir())),
            "spawn-agent" => {
                let args: SpawnArgs = serde_json::from_value(arguments)
                    .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid arguments: {e}")))?;
                let prompt = args.prompt.filter(|v| !v.is_empty()).ok_or_else(|| {
                    RpcError::new(INVALID_PARAMS, "Missing required argument: prompt")
                })?;
                Ok(self
                    .spawn_agent(&prompt, args.name.as_deref(), args.model.as_deref())
                    .await)
            }
            other => Err(RpcError::new(INVALID_PARAMS, format!("Unknown tool: {other}"))),
        }
    }

    /// Run one non-interactive task; every outcome is reported as text.
    async fn spawn_agent(&self, prompt: &str, name: Option<&str>, model: Option<&str>) -> String {
        let mut command = Command::new(&self.launcher);
        if let Some(name) = name {
            command.args(["-a", name]);
        }
        if let Some(model) = model {
            command.args(["--model", model]);
        }
        command
            .args(["-p", "--output-format=text", "--force", "--approve-mcps"])
            .arg(prompt)
            .current_dir(&self.settings.project_root)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        tracing::info!("spawning agent {}", name.unwrap_or("(default)"));

        match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => {
                let minutes = self.timeout.as_secs() / 60;
                failure(format!("Task timed out after {minutes} minutes"))
            }
            Ok(Err(e)) => failure(format!("Failed to execute agent: {e}")),
            Ok(Ok(output)) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            }
            Ok(Ok(output)) => format!(
                "cursor-agent failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        }
    }
}

fn failure(error: String) -> String {
    serde_json::to_string_pretty(&json!({ "success": false, "error": error }))
        .unwrap_or(error)
}

fn tools() -> Value {
    json!([
        {
            "name": "list-agents",
            "description": "List all available subagent configurations in .cursor/agents/",
            "inputSchema": { "type": "object", "properties": {} },
        },
        {
            "name": "spawn-agent",
            "description": "Run a task with cursor-agent, optionally as a specific subagent",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "prompt": { "type": "string", "description": "The task to perform" },
                    "name": { "type": "string", "description": "Agent to use" },
                    "model": { "type": "string", "description": "Model to use" },
                },
                "required": ["prompt"],
            },
        },
    ])
}

/// Serve requests from stdin until it closes.
#[tokio::main]
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let launcher = std::env::current_exe().context("failed to get executable path")?;
    let server = Server::new(settings, launcher);
    tracing::info!("MCP server started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(reply) = server.handle_line(&line).await {
            stdout
                .write_all(format!("{reply}\n").as_bytes())
                .await
                .context("failed to write stdout")?;
            stdout.flush().await.context("failed to write stdout")?;
        }
    }
    tracing::info!("MCP server stopped");
    Ok(())
}
