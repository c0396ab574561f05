//! Error taxonomy shared by the metadata and bulk-data transports.

/// Operation errors surfaced by the namespace client.
///
/// Every failure is returned to the caller; nothing is swallowed. Transport
/// errors keep the underlying message, parse errors carry the offending line.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("not implemented: {0}")]
    Unimplemented(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tonic::Status> for ClientError {
    fn from(status: tonic::Status) -> Self {
        let msg = status.message().to_string();
        match status.code() {
            tonic::Code::NotFound => ClientError::NotFound(msg),
            tonic::Code::PermissionDenied => ClientError::PermissionDenied(msg),
            tonic::Code::DeadlineExceeded => ClientError::Timeout(msg),
            tonic::Code::Unimplemented => ClientError::Unimplemented(msg),
            _ => ClientError::Transport(status.to_string()),
        }
    }
}

impl From<tonic::transport::Error> for ClientError {
    fn from(err: tonic::transport::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}
