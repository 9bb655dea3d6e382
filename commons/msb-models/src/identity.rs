use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header carrying the identity of the user that triggered a broker request.
pub const ORIGINATING_IDENTITY_HEADER: &str =
    "X-Broker-API-Originating-Identity";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum IdentityError {
    #[error("originating identity header is malformed: {0}")]
    Malformed(String),
    #[error("originating identity value is not valid base64: {0}")]
    Encoding(String),
    #[error("originating identity payload is not valid JSON: {0}")]
    Payload(String),
    #[error("originating identity has no username")]
    MissingUsername,
}

/// Kubernetes-style user info embedded in the originating identity header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserInfo {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OriginatingIdentity {
    pub platform: String,
    pub user: UserInfo,
}

impl OriginatingIdentity {
    /// Parse `<platform> <base64(json)>` as sent by the platform.
    pub fn parse(header: &str) -> Result<Self, IdentityError> {
        let mut parts = header.trim().splitn(2, ' ');
        let platform = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| IdentityError::Malformed(header.to_string()))?;
        let encoded = parts
            .next()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| IdentityError::Malformed(header.to_string()))?;

        let raw = STANDARD
            .decode(encoded)
            .map_err(|e| IdentityError::Encoding(e.to_string()))?;
        let user: UserInfo = serde_json::from_slice(&raw)
            .map_err(|e| IdentityError::Payload(e.to_string()))?;
        if user.username.is_empty() {
            return Err(IdentityError::MissingUsername);
        }

        Ok(Self {
            platform: platform.to_string(),
            user,
        })
    }

    pub fn encode(&self) -> String {
        let payload = serde_json::to_vec(&self.user).unwrap_or_default();
        format!("{} {}", self.platform, STANDARD.encode(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kubernetes_identity() {
        let raw = STANDARD.encode(r#"{"username":"alice","groups":["devs"]}"#);
        let id = OriginatingIdentity::parse(&format!("kubernetes {raw}"))
            .expect("parse");
        assert_eq!(id.platform, "kubernetes");
        assert_eq!(id.user.username, "alice");
        assert_eq!(id.user.groups, vec!["devs".to_string()]);
    }

    #[test]
    fn encode_is_accepted_by_parse() {
        let id = OriginatingIdentity {
            platform: "kubernetes".into(),
            user: UserInfo {
                username: "bob".into(),
                ..Default::default()
            },
        };
        assert_eq!(OriginatingIdentity::parse(&id.encode()), Ok(id));
    }

    #[test]
    fn rejects_missing_payload() {
        assert!(matches!(
            OriginatingIdentity::parse("kubernetes"),
            Err(IdentityError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_bad_base64() {
        assert!(matches!(
            OriginatingIdentity::parse("kubernetes !!!"),
            Err(IdentityError::Encoding(_))
        ));
    }

    #[test]
    fn rejects_empty_username() {
        let raw = STANDARD.encode(r#"{"uid":"1"}"#);
        assert_eq!(
            OriginatingIdentity::parse(&format!("kubernetes {raw}")),
            Err(IdentityError::MissingUsername)
        );
    }
}
