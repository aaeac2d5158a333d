use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ClearanceError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    /// The record store could not answer. Never folded into a 0% reading.
    #[error("record store unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl ClearanceError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "bad_params",
            Self::Forbidden(_) => "forbidden",
            Self::Unauthorized(_) => "unauthorized",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::NotFound { entity, id } => Some(json!({ "entity": entity, "id": id })),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for ClearanceError {
    fn from(e: rusqlite::Error) -> Self {
        // Constraint failures are bad input (duplicate id, dangling owner), not an outage.
        if let rusqlite::Error::SqliteFailure(ref f, _) = e {
            if f.code == rusqlite::ErrorCode::ConstraintViolation {
                return Self::Validation(e.to_string());
            }
        }
        Self::UpstreamUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClearanceError>;
