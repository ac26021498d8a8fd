use std::io::{self, Write};

use revisions_core::StoreChange;
use serde::Serialize;

/// Notification method carrying applied store mutations.
pub const CHANGED_NOTIFICATION: &str = "annotations/changed";

#[derive(Serialize)]
struct JsonRpcResponse<'a> {
    jsonrpc: &'a str,
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcErrorBody>,
}

#[derive(Serialize)]
struct JsonRpcErrorBody {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct JsonRpcNotification<'a, P: Serialize> {
    jsonrpc: &'a str,
    method: &'a str,
    params: P,
}

/// Writes one JSON-RPC message per line. Stdout by default; any writer in
/// tests.
pub struct NdjsonTransport {
    out: Box<dyn Write + Send>,
}

impl Default for NdjsonTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl NdjsonTransport {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self { out: Box::new(out) }
    }

    pub fn write_response(&mut self, id: u64, result: serde_json::Value) {
        self.write_line(&JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        });
    }

    pub fn write_error(
        &mut self,
        id: u64,
        code: i32,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) {
        self.write_line(&JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcErrorBody {
                code,
                message: message.into(),
                data,
            }),
        });
    }

    pub fn write_changes(&mut self, changes: &[StoreChange]) {
        for change in changes {
            self.write_line(&JsonRpcNotification {
                jsonrpc: "2.0",
                method: CHANGED_NOTIFICATION,
                params: change,
            });
        }
    }

    fn write_line(&mut self, value: &impl Serialize) {
        if let Err(e) = serde_json::to_writer(&mut self.out, value) {
            tracing::error!("Failed to serialize: {}", e);
            return;
        }
        let _ = writeln!(self.out);
        let _ = self.out.flush();
    }
}
