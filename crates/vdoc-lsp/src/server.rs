use crate::commands;
use crate::config::VdocConfig;
use crate::document::{
    Engine, ServerState, handle_document_change, handle_document_close, handle_document_open,
};
use std::sync::Arc;
use tower_lsp_server::ls_types::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    ExecuteCommandOptions, ExecuteCommandParams, InitializeParams, InitializeResult,
    InitializedParams, MessageType, ServerCapabilities, ServerInfo, TextDocumentSyncCapability,
    TextDocumentSyncKind,
};
use tower_lsp_server::{Client, LanguageServer, jsonrpc::Result};

pub struct Backend {
    client: Client,
    state: Arc<ServerState>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            state: Arc::new(ServerState::new(Some(client.clone()))),
            client,
        }
    }

    fn server_capabilities() -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
            execute_command_provider: Some(ExecuteCommandOptions {
                commands: commands::ALL.iter().map(|c| (*c).into()).collect(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("initializing vdoc-lsp server");

        if let Some(init_options) = params.initialization_options {
            match serde_json::from_value::<VdocConfig>(init_options) {
                Ok(config) => {
                    tracing::debug!("loaded configuration: {:?}", config);
                    let engine = Engine::new(&config, Some(self.client.clone()));
                    self.state.replace_engine(engine).await;
                }
                Err(e) => {
                    tracing::warn!("ignoring invalid initialization options: {}", e);
                }
            }
        }

        Ok(InitializeResult {
            capabilities: Self::server_capabilities(),
            server_info: Some(ServerInfo {
                name: "vdoc-lsp".into(),
                version: Some(env!("CARGO_PKG_VERSION").into()),
            }),
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let languages = self.state.engine().await.registry.len();
        tracing::info!("vdoc-lsp server initialized with {} languages", languages);
        self.client
            .log_message(MessageType::INFO, "vdoc-lsp ready")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("shutting down vdoc-lsp server");
        self.state.shutdown().await;
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        tracing::info!("document opened: {:?}", doc.uri);
        handle_document_open(&self.state, doc.uri, doc.text, Some(doc.version)).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        if let Some(change) = params.content_changes.into_iter().next_back() {
            handle_document_change(&self.state, uri, change.text, Some(version)).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::info!("document closed: {:?}", uri);
        handle_document_close(&self.state, &uri).await;
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Option<serde_json::Value>> {
        tracing::info!("execute_command: {:?}", params.command);

        match commands::execute(&self.state, &params.command, &params.arguments).await {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::error!("{} failed: {}", params.command, e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_capabilities_text_document_sync() {
        let caps = Backend::server_capabilities();

        match caps.text_document_sync {
            Some(TextDocumentSyncCapability::Kind(kind)) => {
                assert_eq!(kind, TextDocumentSyncKind::FULL);
            }
            _ => panic!("Expected text document sync kind to be FULL"),
        }
    }

    #[test]
    fn test_server_capabilities_execute_command() {
        let caps = Backend::server_capabilities();

        let execute = caps
            .execute_command_provider
            .expect("execute command provider should exist");
        assert_eq!(execute.commands.len(), 3);
        assert!(execute.commands.contains(&commands::VIRTUAL_DOCUMENT.to_string()));
        assert!(execute.commands.contains(&commands::RELEASE.to_string()));
        assert!(execute.commands.contains(&commands::TO_COMPOSITE.to_string()));
    }

    #[test]
    fn test_server_advertises_no_language_features() {
        let caps = Backend::server_capabilities();
        assert!(caps.completion_provider.is_none());
        assert!(caps.hover_provider.is_none());
        assert!(caps.definition_provider.is_none());
    }

    #[tokio::test]
    async fn test_backend_state_initialization() {
        let (service, _socket) = tower_lsp_server::LspService::build(Backend::new).finish();
        let backend = service.inner();

        assert_eq!(backend.state.document_count(), 0);
        assert_eq!(backend.state.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_backend_engine_defaults() {
        let (service, _socket) = tower_lsp_server::LspService::build(Backend::new).finish();
        let backend = service.inner();

        let engine = backend.state.engine().await;
        assert!(engine.registry.get("python").is_some());
        assert_eq!(engine.documents.extensions, vec!["qmd", "md", "rmd"]);
        assert!(engine.cache.storage().root_path().is_none());
    }

    #[tokio::test]
    async fn test_initialize_applies_options() {
        let (service, _socket) = tower_lsp_server::LspService::build(Backend::new).finish();
        let backend = service.inner();

        let params: InitializeParams = serde_json::from_value(serde_json::json!({
            "capabilities": {},
            "initializationOptions": {
                "warmup": { "enabled": false },
                "documents": { "extensions": ["qmd"] }
            }
        }))
        .unwrap();

        let result = backend.initialize(params).await.unwrap();
        assert_eq!(result.server_info.unwrap().name, "vdoc-lsp");

        let engine = backend.state.engine().await;
        assert_eq!(engine.documents.extensions, vec!["qmd".to_string()]);
    }

    #[tokio::test]
    async fn test_initialize_ignores_invalid_options() {
        let (service, _socket) = tower_lsp_server::LspService::build(Backend::new).finish();
        let backend = service.inner();

        let params: InitializeParams = serde_json::from_value(serde_json::json!({
            "capabilities": {},
            "initializationOptions": { "warmup": { "enabled": "sometimes" } }
        }))
        .unwrap();

        assert!(backend.initialize(params).await.is_ok());
        let engine = backend.state.engine().await;
        assert_eq!(engine.documents.extensions.len(), 3);
    }
}
