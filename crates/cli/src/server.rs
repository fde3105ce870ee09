//! Line-delimited JSON tool server: one request per input line, one response
//! per output line.

use crate::tools::ToolBox;
use anyhow::{anyhow, Result};
use dirscout_core::AllowListSource;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task;
use tracing::{debug, warn};

pub const PARSE_ERROR: i64 = -32700;
pub const TOOL_ERROR: i64 = -32000;

pub struct ToolServer<S> {
    tools: Arc<ToolBox<S>>,
}

impl<S> ToolServer<S>
where
    S: AllowListSource + Send + Sync + 'static,
{
    pub fn new(tools: ToolBox<S>) -> Self {
        Self {
            tools: Arc::new(tools),
        }
    }

    /// Handles one input line. Blank lines produce no response.
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(req) => Some(self.handle_request(req).await),
            Err(err) => {
                warn!(error = %err, "unparseable request");
                Some(json!({
                    "jsonrpc": "2.0",
                    "id": Value::Null,
                    "error": { "code": PARSE_ERROR, "message": format!("parse error: {err}") }
                }))
            }
        }
    }

    pub async fn handle_request(&self, req: Value) -> Value {
        let id = req.get("id").cloned().unwrap_or(Value::Null);
        let method = req.get("method").and_then(|m| m.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));
        debug!(%id, method, "request");

        let result = match method {
            "list_tools" => serde_json::to_value(ToolBox::<S>::descriptors())
                .map(|tools| json!({ "tools": tools }))
                .map_err(|e| anyhow!(e)),
            "call_tool" => self.call_tool(params).await,
            _ => Err(anyhow!("unknown method: {method}")),
        };
        match result {
            Ok(payload) => json!({ "jsonrpc": "2.0", "id": id, "result": payload }),
            Err(err) => {
                warn!(%id, method, error = %err, "request failed");
                json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": TOOL_ERROR, "message": format!("{err:#}") }
                })
            }
        }
    }

    async fn call_tool(&self, params: Value) -> Result<Value> {
        let name = params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("missing tool name"))?
            .to_string();
        let args = params
            .get("arguments")
            .cloned()
            .unwrap_or(json!({}));
        let tools = Arc::clone(&self.tools);
        // Resolution walks the filesystem synchronously.
        let text = task::spawn_blocking(move || tools.call(&name, args)).await??;
        Ok(json!({ "content": [{ "type": "text", "text": text }] }))
    }

    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(resp) = self.handle_line(&line).await {
                writer.write_all(format!("{resp}\n").as_bytes()).await?;
                writer.flush().await?;
            }
        }
        Ok(())
    }

    pub async fn run_stdio(&self) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }
}
