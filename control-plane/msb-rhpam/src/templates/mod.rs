//! Desired-state builders for everything a tenant instance owns.
//!
//! Builders are pure: the same config, namespace and identity always yield
//! the same objects.

pub mod catalog;
pub mod custom;
pub mod rbac;
pub mod workload;

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

pub use catalog::broker_catalog;

/// Name shared by the operator service account, role and Deployment.
pub const OPERATOR_NAME: &str = "rhpam-dev-operator";
pub const USER_ROLE_NAME: &str = "rhpam-user";
pub const DEFAULT_SERVICE_PREFIX: &str = "rhpam";
pub const DEFAULT_OPERATOR_IMAGE: &str =
    "quay.io/integreatly/rhpam-dev-operator:v0.0.2";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateConfig {
    pub service_prefix: String,
    /// Cluster route domain; also `RhpamDev.spec.domain`.
    pub route_suffix: Option<String>,
    pub sso_namespace: String,
    pub sso_admin_credentials_secret: String,
    pub operator_image: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_PREFIX)
    }
}

impl TemplateConfig {
    pub fn new(service_prefix: &str) -> Self {
        Self {
            service_prefix: service_prefix.to_string(),
            route_suffix: None,
            sso_namespace: String::new(),
            sso_admin_credentials_secret: String::new(),
            operator_image: DEFAULT_OPERATOR_IMAGE.to_string(),
        }
    }

    pub fn namespace_for(&self, instance_id: &str) -> String {
        format!("{}-{}", self.service_prefix, instance_id)
    }

    pub fn dashboard_url(&self, namespace: &str) -> String {
        match &self.route_suffix {
            Some(suffix) => format!("https://rhpam-bc-{namespace}.{suffix}"),
            None => format!("https://rhpam-bc-{namespace}"),
        }
    }
}

/// Name of the per-instance cluster role and its binding.
pub fn cluster_scoped_name(namespace: &str) -> String {
    format!("{OPERATOR_NAME}-{namespace}")
}

pub(crate) fn operator_labels() -> BTreeMap<String, String> {
    BTreeMap::from([("name".to_string(), OPERATOR_NAME.to_string())])
}

pub(crate) fn named(name: &str, namespace: Option<&str>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        ..Default::default()
    }
}

pub(crate) fn generated(prefix: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        generate_name: Some(prefix.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_and_dashboard_naming() {
        let mut cfg = TemplateConfig::default();
        let ns = cfg.namespace_for("abc123");
        assert_eq!(ns, "rhpam-abc123");
        assert_eq!(cfg.dashboard_url(&ns), "https://rhpam-bc-rhpam-abc123");
        cfg.route_suffix = Some("apps.example.com".into());
        assert_eq!(
            cfg.dashboard_url(&ns),
            "https://rhpam-bc-rhpam-abc123.apps.example.com"
        );
        assert_eq!(cluster_scoped_name(&ns), "rhpam-dev-operator-rhpam-abc123");
    }
}
