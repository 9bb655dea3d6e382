use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Symbolic name of an asynchronous broker operation.
///
/// Identifies which pipeline ran, not a particular run. Values other than
/// `deploy` and `remove` are kept verbatim so they can be reported back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationToken {
    Deploy,
    Remove,
    Unknown(String),
}

impl OperationToken {
    pub fn as_str(&self) -> &str {
        match self {
            OperationToken::Deploy => "deploy",
            OperationToken::Remove => "remove",
            OperationToken::Unknown(s) => s.as_str(),
        }
    }
}

impl From<&str> for OperationToken {
    fn from(value: &str) -> Self {
        match value {
            "deploy" => OperationToken::Deploy,
            "remove" => OperationToken::Remove,
            other => OperationToken::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for OperationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OperationToken {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OperationToken {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(OperationToken::from(raw.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LastOperationState {
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
}

/// Body of `GET /v2/service_instances/{instance_id}/last_operation`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LastOperationResponse {
    pub state: LastOperationState,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl LastOperationResponse {
    pub fn new(state: LastOperationState, description: impl Into<String>) -> Self {
        Self {
            state,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LastOperationQuery {
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub plan_id: Option<String>,
}
