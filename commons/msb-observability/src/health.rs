use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthCheck {
    pub fn healthy(service: &str, version: &str) -> Self {
        Self {
            status: HealthStatus::Healthy,
            service: service.to_string(),
            version: version.to_string(),
            message: None,
            details: BTreeMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_detail(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_check_serializes_lowercase_status() {
        let check = HealthCheck::healthy("svc", "0.1.0").with_detail("k", "v");
        let v = serde_json::to_value(&check).unwrap();
        assert_eq!(v["status"], "healthy");
        assert_eq!(v["details"]["k"], "v");
        assert!(v["timestamp"].is_string());
    }
}
