use revisions_core::RevisionsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine not initialized: call initialize first")]
    NotInitialized,
    #[error("Invalid params: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Revisions(#[from] RevisionsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn code(&self) -> &str {
        match self {
            Self::NotInitialized => "REVISIONS_NOT_INITIALIZED",
            Self::InvalidParams(_) => "REVISIONS_INVALID_PARAMS",
            Self::Revisions(e) => e.code(),
            Self::Io(_) => "REVISIONS_IO_ERROR",
            Self::Json(_) => "REVISIONS_JSON_ERROR",
        }
    }

    pub fn to_json_rpc_error(&self) -> serde_json::Value {
        serde_json::json!({
            "revisionsCode": self.code(),
            "message": self.to_string(),
        })
    }
}
