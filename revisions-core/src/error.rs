use thiserror::Error;

#[derive(Debug, Error)]
pub enum RevisionsError {
	#[error("Annotation already exists: {0}")]
	AlreadyExists(String),
	#[error("Annotation not found: {0}")]
	NotFound(String),
}

impl RevisionsError {
	pub fn code(&self) -> &str {
		match self {
			Self::AlreadyExists(_) => "REVISIONS_ALREADY_EXISTS",
			Self::NotFound(_) => "REVISIONS_NOT_FOUND",
		}
	}

	pub fn to_json_rpc_error(&self) -> serde_json::Value {
		serde_json::json!({
			"revisionsCode": self.code(),
			"message": self.to_string(),
		})
	}
}
