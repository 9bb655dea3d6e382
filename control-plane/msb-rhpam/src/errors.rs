use std::time::Duration;

use thiserror::Error;

use crate::cluster::ResourceKind;

pub type ClusterResult<T> = Result<T, ClusterError>;

/// Failure reported by a [`crate::cluster::ClusterClient`].
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: String, name: String },

    #[error("API request failed with status {code} ({reason}): {message}")]
    Api {
        code: u16,
        reason: String,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid object: {0}")]
    InvalidObject(String),
}

impl ClusterError {
    pub fn not_found(kind: &ResourceKind, name: &str) -> Self {
        ClusterError::NotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    pub fn already_exists(kind: &ResourceKind, name: &str) -> Self {
        ClusterError::AlreadyExists {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    /// Map a kube client error, keeping the resource identity for 404/409.
    pub fn from_kube(kind: &ResourceKind, name: &str, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => {
                ClusterError::not_found(kind, name)
            }
            kube::Error::Api(ae)
                if ae.code == 409 && ae.reason == "AlreadyExists" =>
            {
                ClusterError::already_exists(kind, name)
            }
            kube::Error::Api(ae) => ClusterError::Api {
                code: ae.code,
                reason: ae.reason.clone(),
                message: ae.message.clone(),
            },
            other => ClusterError::Transport(other.to_string()),
        }
    }

    /// Rejections the server issues before doing any work, so a create that
    /// failed this way left nothing behind.
    pub fn is_uncommitted(&self) -> bool {
        matches!(self, ClusterError::Api { code: 429 | 503, .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClusterError::AlreadyExists { .. })
    }

    /// Server-side and transport failures that a later attempt may not see.
    pub fn is_transient(&self) -> bool {
        match self {
            ClusterError::Api { code, .. } => *code == 429 || *code >= 500,
            ClusterError::Transport(_) => true,
            _ => false,
        }
    }
}

/// A fatal step failure, tagged with the step that produced it.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("instance {instance_id}: {verb} {kind} '{name}' failed: {source}")]
    Step {
        instance_id: String,
        verb: &'static str,
        kind: String,
        name: String,
        #[source]
        source: ClusterError,
    },

    #[error(
        "instance {instance_id}: {verb} {kind} '{name}' timed out after {after:?}"
    )]
    Timeout {
        instance_id: String,
        verb: &'static str,
        kind: String,
        name: String,
        after: Duration,
    },
}

impl PipelineError {
    /// The target of a create already existed where it was expected not to.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            PipelineError::Step { source, .. } if source.is_already_exists()
        )
    }

    pub fn cluster_error(&self) -> Option<&ClusterError> {
        match self {
            PipelineError::Step { source, .. } => Some(source),
            PipelineError::Timeout { .. } => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum DeployerError {
    #[error("invalid instance id '{0}': {1}")]
    InvalidInstanceId(String, String),

    #[error("service instance not found: {instance_id}")]
    NotFound { instance_id: String },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Broker API error code plus description, e.g. `AsyncRequired`.
    #[error("Unprocessable entity ({0}): {1}")]
    UnprocessableEntity(&'static str, String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl From<DeployerError> for ApiError {
    fn from(err: DeployerError) -> Self {
        match err {
            DeployerError::InvalidInstanceId(..) => {
                ApiError::BadRequest(err.to_string())
            }
            DeployerError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DeployerError::Pipeline(ref pe) if pe.is_conflict() => {
                ApiError::Conflict(err.to_string())
            }
            other => ApiError::InternalServerError(other.to_string()),
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use axum::{Json, http::StatusCode};
        use serde_json::json;

        let (status, code, description) = match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BadRequest", msg)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NotFound", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", msg),
            ApiError::UnprocessableEntity(code, msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, code, msg)
            }
            ApiError::InternalServerError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", msg)
            }
        };

        let body = Json(json!({
            "error": code,
            "description": description,
        }));

        (status, body).into_response()
    }
}
