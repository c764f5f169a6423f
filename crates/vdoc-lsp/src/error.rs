use thiserror::Error;
use tower_lsp_server::jsonrpc;
use tower_lsp_server::ls_types::Uri;
use vdoc_core::VdocError;

/// Error types for the vdoc-lsp server.
///
/// Command handlers return these; they are converted into JSON-RPC errors at
/// the protocol boundary so the client sees the message.
///
/// # Examples
///
/// ```
/// use vdoc_lsp::error::ServerError;
/// use tower_lsp_server::jsonrpc::ErrorCode;
///
/// let err = ServerError::InvalidArguments("missing uri".into());
/// let rpc: tower_lsp_server::jsonrpc::Error = err.into();
/// assert_eq!(rpc.code, ErrorCode::InvalidParams);
/// ```
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("document is not open: {0:?}")]
    UnknownDocument(Uri),

    #[error("invalid command arguments: {0}")]
    InvalidArguments(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("no pending virtual document with id {0}")]
    UnknownHandle(u64),

    #[error(transparent)]
    Vdoc(#[from] VdocError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for `Result<T, ServerError>`.
pub type Result<T> = std::result::Result<T, ServerError>;

impl From<ServerError> for jsonrpc::Error {
    fn from(err: ServerError) -> Self {
        let message = err.to_string();
        match err {
            ServerError::InvalidArguments(_)
            | ServerError::UnknownDocument(_)
            | ServerError::UnknownHandle(_)
            | ServerError::Json(_) => Self::invalid_params(message),
            ServerError::UnknownCommand(_) => Self::method_not_found(),
            ServerError::Vdoc(_) => Self {
                code: jsonrpc::ErrorCode::InternalError,
                message: message.into(),
                data: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_backing_error_message_reaches_client() {
        let err = ServerError::from(VdocError::backing_io(
            PathBuf::from("/tmp/vdoc/py/intellisense.py"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        ));
        let rpc: jsonrpc::Error = err.into();
        assert_eq!(rpc.code, jsonrpc::ErrorCode::InternalError);
        assert!(rpc.message.contains("could not prepare analysis buffer"));
    }

    #[test]
    fn test_unknown_command() {
        let rpc: jsonrpc::Error = ServerError::UnknownCommand("x".into()).into();
        assert_eq!(rpc.code, jsonrpc::ErrorCode::MethodNotFound);
    }

    #[test]
    fn test_unknown_handle_message() {
        assert_eq!(
            ServerError::UnknownHandle(7).to_string(),
            "no pending virtual document with id 7"
        );
    }
}
