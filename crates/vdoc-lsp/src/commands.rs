//! `workspace/executeCommand` handlers.
//!
//! | command                | arguments                                  | result                     |
//! |------------------------|--------------------------------------------|----------------------------|
//! | `vdoc.virtualDocument` | `{uri, position, action?, blockLine?}`     | `VirtualDocumentResult?`   |
//! | `vdoc.release`         | `{handleId}`                               | `null`                     |
//! | `vdoc.toComposite`     | `{language, range}`                        | `Range`                    |

use crate::document::{ServerState, ensure_document_loaded};
use crate::error::{Result, ServerError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use tower_lsp_server::ls_types::{Position, Range, Uri};
use vdoc_core::{
    ActionKind, VdocError, VirtualDocumentAddress, locate_at, project_virtual_document,
    to_composite_range, to_virtual,
};

pub const VIRTUAL_DOCUMENT: &str = "vdoc.virtualDocument";
pub const RELEASE: &str = "vdoc.release";
pub const TO_COMPOSITE: &str = "vdoc.toComposite";

pub const ALL: [&str; 3] = [VIRTUAL_DOCUMENT, RELEASE, TO_COMPOSITE];

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualDocumentArgs {
    pub uri: Uri,
    pub position: Position,
    #[serde(default)]
    pub action: ActionKind,
    /// Any line of the block to project alone, instead of every block of
    /// the language.
    #[serde(default)]
    pub block_line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AddressInfo {
    Content { uri: Uri },
    File { uri: Uri, path: PathBuf },
}

impl From<&VirtualDocumentAddress> for AddressInfo {
    fn from(address: &VirtualDocumentAddress) -> Self {
        match address {
            VirtualDocumentAddress::Content(uri) => Self::Content { uri: uri.clone() },
            VirtualDocumentAddress::File { uri, path } => Self::File {
                uri: uri.clone(),
                path: path.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualDocumentResult {
    pub language: String,
    pub extension: String,
    pub address: AddressInfo,
    /// Projected text, present for content-backed languages that have no
    /// file to read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub virtual_position: Position,
    pub preamble_lines: u32,
    /// Set when the document is request-scoped; pass to `vdoc.release`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseArgs {
    pub handle_id: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToCompositeArgs {
    pub language: String,
    pub range: Range,
}

/// Dispatches a command by name.
pub async fn execute(state: &ServerState, command: &str, arguments: &[Value]) -> Result<Value> {
    match command {
        VIRTUAL_DOCUMENT => {
            let result = virtual_document(state, parse_args(arguments)?).await?;
            Ok(serde_json::to_value(result)?)
        }
        RELEASE => {
            release(state, parse_args(arguments)?).await?;
            Ok(Value::Null)
        }
        TO_COMPOSITE => {
            let range = to_composite(state, parse_args(arguments)?).await?;
            Ok(serde_json::to_value(range)?)
        }
        other => Err(ServerError::UnknownCommand(other.to_string())),
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(arguments: &[Value]) -> Result<T> {
    let first = arguments
        .first()
        .ok_or_else(|| ServerError::InvalidArguments("expected one argument object".into()))?;
    serde_json::from_value(first.clone()).map_err(|e| ServerError::InvalidArguments(e.to_string()))
}

/// Projects and resolves the virtual document under `args.position`.
///
/// Returns `None` when the position is outside every executable block or
/// the block's language is not registered.
pub async fn virtual_document(
    state: &ServerState,
    args: VirtualDocumentArgs,
) -> Result<Option<VirtualDocumentResult>> {
    let doc = ensure_document_loaded(state, &args.uri).await?;
    let engine = state.engine().await;

    let explicit = args
        .block_line
        .and_then(|line| locate_at(&doc.blocks, Position::new(line, 0)));

    let Some(vdoc) = project_virtual_document(
        &doc.document,
        args.position,
        &doc.blocks,
        &engine.registry,
        explicit,
    ) else {
        tracing::debug!("no embedded language at {:?} in {:?}", args.position, args.uri);
        return Ok(None);
    };

    let handle = engine.cache.resolve(&vdoc, &args.uri, args.action).await?;
    let language = &vdoc.language;

    let mut result = VirtualDocumentResult {
        language: language.name().to_string(),
        extension: language.extension.clone(),
        address: AddressInfo::from(handle.address()),
        content: None,
        virtual_position: to_virtual(language, args.position),
        preamble_lines: language.preamble_len(),
        handle_id: None,
    };

    if matches!(handle.address(), VirtualDocumentAddress::Content(_)) {
        result.content = Some(vdoc.content.clone());
    }

    if handle.has_cleanup() {
        result.handle_id = Some(state.park_handle(args.uri.clone(), handle));
    }

    tracing::debug!(
        "resolved {} virtual document for {:?} ({:?})",
        result.language,
        args.uri,
        args.action
    );
    Ok(Some(result))
}

pub async fn release(state: &ServerState, args: ReleaseArgs) -> Result<()> {
    let handle = state
        .take_handle(args.handle_id)
        .ok_or(ServerError::UnknownHandle(args.handle_id))?;
    handle.release().await?;
    Ok(())
}

pub async fn to_composite(state: &ServerState, args: ToCompositeArgs) -> Result<Range> {
    let engine = state.engine().await;
    let language = engine
        .registry
        .get(&args.language)
        .ok_or_else(|| VdocError::UnknownLanguage(args.language.clone()))?;
    Ok(to_composite_range(&language, args.range))
}
