//! Common test utilities for integration tests.
//!
//! `LspClient` drives the server binary over stdio. Server → client
//! requests (such as `vdoc/warmup`) are answered with `null` and recorded
//! so tests can assert on them.

use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// LSP test client for communicating with the server binary.
pub(crate) struct LspClient {
    process: Child,
    reader: BufReader<std::process::ChildStdout>,
    /// Methods of server → client requests, in order received.
    server_requests: Vec<String>,
    next_id: i64,
}

impl LspClient {
    /// Spawn the vdoc-lsp binary.
    pub(crate) fn spawn() -> Self {
        let mut process = Command::new(env!("CARGO_BIN_EXE_vdoc-lsp"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to spawn vdoc-lsp binary");

        let stdout = process.stdout.take().expect("Failed to capture stdout");

        Self {
            process,
            reader: BufReader::new(stdout),
            server_requests: Vec::new(),
            next_id: 1,
        }
    }

    #[allow(dead_code)] // Not used in all tests
    pub(crate) fn server_requests(&self) -> &[String] {
        &self.server_requests
    }

    /// Send a JSON-RPC message to the server.
    pub(crate) fn send(&mut self, message: &Value) {
        let body = serde_json::to_string(message).unwrap();
        let header = format!("Content-Length: {}\r\n\r\n", body.len());

        let stdin = self.process.stdin.as_mut().expect("stdin not captured");
        stdin.write_all(header.as_bytes()).unwrap();
        stdin.write_all(body.as_bytes()).unwrap();
        stdin.flush().unwrap();
    }

    fn read_message(&mut self) -> Value {
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            let bytes_read = self
                .reader
                .read_line(&mut line)
                .expect("Failed to read header");

            assert!(bytes_read != 0, "Server closed connection unexpectedly");

            if line == "\r\n" || line == "\n" {
                break;
            }

            if line.to_lowercase().starts_with("content-length:") {
                content_length = line
                    .split(':')
                    .nth(1)
                    .unwrap()
                    .trim()
                    .parse()
                    .expect("Invalid content length");
            }
        }

        let mut body = vec![0u8; content_length];
        self.reader
            .read_exact(&mut body)
            .expect("Failed to read body");

        serde_json::from_slice(&body).unwrap_or_else(|e| {
            panic!("Invalid JSON: {e} in: {:?}", String::from_utf8_lossy(&body))
        })
    }

    /// Reads until the response with `id` arrives.
    ///
    /// Notifications are skipped; server requests get a `null` result.
    pub(crate) fn read_response(&mut self, id: i64) -> Value {
        loop {
            let message = self.read_message();

            match (message.get("id"), message.get("method")) {
                (Some(request_id), Some(method)) => {
                    self.server_requests
                        .push(method.as_str().unwrap_or_default().to_string());
                    let reply = json!({
                        "jsonrpc": "2.0",
                        "id": request_id,
                        "result": null
                    });
                    self.send(&reply);
                }
                (Some(response_id), None) if response_id == &json!(id) => return message,
                _ => {}
            }
        }
    }

    /// Sends a request and waits for its response.
    pub(crate) fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        let mut message = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method
        });
        if !params.is_null() {
            message["params"] = params;
        }
        self.send(&message);
        self.read_response(id)
    }

    /// Initialize the LSP session.
    pub(crate) fn initialize(&mut self, options: Value) -> Value {
        let response = self.request(
            "initialize",
            json!({
                "processId": null,
                "capabilities": {},
                "rootUri": "file:///tmp",
                "workspaceFolders": null,
                "initializationOptions": options
            }),
        );

        self.send(&json!({
            "jsonrpc": "2.0",
            "method": "initialized",
            "params": {}
        }));

        response
    }

    /// Open a text document.
    pub(crate) fn did_open(&mut self, uri: &str, text: &str) {
        self.send(&json!({
            "jsonrpc": "2.0",
            "method": "textDocument/didOpen",
            "params": {
                "textDocument": {
                    "uri": uri,
                    "languageId": "quarto",
                    "version": 1,
                    "text": text
                }
            }
        }));
    }

    #[allow(dead_code)] // Not used in all tests
    pub(crate) fn did_close(&mut self, uri: &str) {
        self.send(&json!({
            "jsonrpc": "2.0",
            "method": "textDocument/didClose",
            "params": {
                "textDocument": { "uri": uri }
            }
        }));
    }

    pub(crate) fn execute_command(&mut self, command: &str, arguments: Value) -> Value {
        self.request(
            "workspace/executeCommand",
            json!({
                "command": command,
                "arguments": [arguments]
            }),
        )
    }

    /// Shutdown the server.
    pub(crate) fn shutdown(&mut self) -> Value {
        self.request("shutdown", Value::Null)
    }
}

impl Drop for LspClient {
    fn drop(&mut self) {
        let _ = self.process.kill();
    }
}

pub(crate) fn file_uri(path: &Path) -> String {
    tower_lsp_server::ls_types::Uri::from_file_path(path)
        .expect("absolute path")
        .as_str()
        .to_string()
}
