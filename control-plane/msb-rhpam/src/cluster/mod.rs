//! Cluster resource access used by the provisioning pipelines.
//!
//! [`ClusterClient`] is the only seam between the pipelines and the
//! orchestration platform. Well-known kinds travel as typed `k8s-openapi`
//! objects; tenant custom resources travel as [`CustomResourceRecord`]s
//! addressed by group/version/kind because their schema is owned by the
//! operator that reconciles them.

pub mod kube_client;
pub mod memory;
pub mod record;
pub mod retry;

use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, ServiceAccount};
use k8s_openapi::api::rbac::v1::{
    ClusterRole, ClusterRoleBinding, Role, RoleBinding,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use kube::core::{ApiResource, GroupVersionKind};

pub use crate::errors::{ClusterError, ClusterResult};
pub use kube_client::KubeClusterClient;
pub use memory::{Fault, JournalEntry, MemoryClusterClient, Verb};
pub use record::CustomResourceRecord;
pub use retry::{RetryConfig, RetryingClusterClient, retry_with_backoff};

/// Group/version/kind of a custom resource whose schema is not compiled in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CustomKind {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
}

impl CustomKind {
    pub fn of<K: Resource<DynamicType = ()>>() -> Self {
        Self {
            group: K::group(&()).into_owned(),
            version: K::version(&()).into_owned(),
            kind: K::kind(&()).into_owned(),
            plural: K::plural(&()).into_owned(),
        }
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    pub fn api_resource(&self) -> ApiResource {
        let gvk = GroupVersionKind::gvk(&self.group, &self.version, &self.kind);
        ApiResource::from_gvk_with_plural(&gvk, &self.plural)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Namespace,
    ServiceAccount,
    Role,
    RoleBinding,
    ClusterRole,
    ClusterRoleBinding,
    Deployment,
    Custom(CustomKind),
}

impl ResourceKind {
    pub fn is_cluster_scoped(&self) -> bool {
        matches!(
            self,
            ResourceKind::Namespace
                | ResourceKind::ClusterRole
                | ResourceKind::ClusterRoleBinding
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Namespace => "Namespace",
            ResourceKind::ServiceAccount => "ServiceAccount",
            ResourceKind::Role => "Role",
            ResourceKind::RoleBinding => "RoleBinding",
            ResourceKind::ClusterRole => "ClusterRole",
            ResourceKind::ClusterRoleBinding => "ClusterRoleBinding",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Custom(c) => c.kind.as_str(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A desired-state object ready to be created.
#[derive(Debug, Clone, PartialEq)]
pub enum DesiredObject {
    Namespace(Namespace),
    ServiceAccount(ServiceAccount),
    Role(Role),
    RoleBinding(RoleBinding),
    ClusterRole(ClusterRole),
    ClusterRoleBinding(ClusterRoleBinding),
    Deployment(Deployment),
    Custom(CustomResourceRecord),
}

impl DesiredObject {
    pub fn kind(&self) -> ResourceKind {
        match self {
            DesiredObject::Namespace(_) => ResourceKind::Namespace,
            DesiredObject::ServiceAccount(_) => ResourceKind::ServiceAccount,
            DesiredObject::Role(_) => ResourceKind::Role,
            DesiredObject::RoleBinding(_) => ResourceKind::RoleBinding,
            DesiredObject::ClusterRole(_) => ResourceKind::ClusterRole,
            DesiredObject::ClusterRoleBinding(_) => {
                ResourceKind::ClusterRoleBinding
            }
            DesiredObject::Deployment(_) => ResourceKind::Deployment,
            DesiredObject::Custom(r) => ResourceKind::Custom(r.kind.clone()),
        }
    }

    fn metadata(&self) -> Option<&ObjectMeta> {
        match self {
            DesiredObject::Namespace(o) => Some(&o.metadata),
            DesiredObject::ServiceAccount(o) => Some(&o.metadata),
            DesiredObject::Role(o) => Some(&o.metadata),
            DesiredObject::RoleBinding(o) => Some(&o.metadata),
            DesiredObject::ClusterRole(o) => Some(&o.metadata),
            DesiredObject::ClusterRoleBinding(o) => Some(&o.metadata),
            DesiredObject::Deployment(o) => Some(&o.metadata),
            DesiredObject::Custom(_) => None,
        }
    }

    fn metadata_mut(&mut self) -> Option<&mut ObjectMeta> {
        match self {
            DesiredObject::Namespace(o) => Some(&mut o.metadata),
            DesiredObject::ServiceAccount(o) => Some(&mut o.metadata),
            DesiredObject::Role(o) => Some(&mut o.metadata),
            DesiredObject::RoleBinding(o) => Some(&mut o.metadata),
            DesiredObject::ClusterRole(o) => Some(&mut o.metadata),
            DesiredObject::ClusterRoleBinding(o) => Some(&mut o.metadata),
            DesiredObject::Deployment(o) => Some(&mut o.metadata),
            DesiredObject::Custom(_) => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            DesiredObject::Custom(r) => r.name.as_deref(),
            _ => self.metadata().and_then(|m| m.name.as_deref()),
        }
    }

    pub fn generate_name(&self) -> Option<&str> {
        match self {
            DesiredObject::Custom(r) => r.generate_name.as_deref(),
            _ => self.metadata().and_then(|m| m.generate_name.as_deref()),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            DesiredObject::Custom(r) => Some(r.namespace.as_str()),
            _ => self.metadata().and_then(|m| m.namespace.as_deref()),
        }
    }

    /// Fix the object name, clearing any `generateName`.
    pub fn assign_name(&mut self, name: &str) {
        match self {
            DesiredObject::Custom(r) => {
                r.name = Some(name.to_string());
                r.generate_name = None;
            }
            _ => {
                if let Some(meta) = self.metadata_mut() {
                    meta.name = Some(name.to_string());
                    meta.generate_name = None;
                }
            }
        }
    }

    /// Name for logs and errors; `generateName` prefixes end in `*`.
    pub fn display_name(&self) -> String {
        match (self.name(), self.generate_name()) {
            (Some(n), _) => n.to_string(),
            (None, Some(g)) => format!("{g}*"),
            (None, None) => "<unnamed>".to_string(),
        }
    }
}

/// Generic create/exists/list/delete against the cluster.
///
/// Namespaced kinds need `namespace`; cluster-scoped kinds ignore it.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Create `object` and return the name the server assigned to it.
    async fn create(&self, object: &DesiredObject) -> ClusterResult<String>;

    async fn exists(
        &self,
        kind: &ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> ClusterResult<bool>;

    async fn list_custom(
        &self,
        kind: &CustomKind,
        namespace: &str,
    ) -> ClusterResult<Vec<CustomResourceRecord>>;

    async fn delete(
        &self,
        kind: &ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> ClusterResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{RhpamDev, RhpamUser};

    #[test]
    fn custom_kind_from_crd() {
        let k = CustomKind::of::<RhpamDev>();
        assert_eq!(k.api_version(), "rhpam.integreatly.org/v1alpha1");
        assert_eq!(k.kind, "RhpamDev");
        assert_eq!(k.plural, "rhpamdevs");
        let ar = CustomKind::of::<RhpamUser>().api_resource();
        assert_eq!(ar.plural, "rhpamusers");
        assert_eq!(ar.api_version, "rhpam.integreatly.org/v1alpha1");
    }

    #[test]
    fn scope_of_builtin_kinds() {
        assert!(ResourceKind::Namespace.is_cluster_scoped());
        assert!(ResourceKind::ClusterRoleBinding.is_cluster_scoped());
        assert!(!ResourceKind::RoleBinding.is_cluster_scoped());
        assert!(
            !ResourceKind::Custom(CustomKind::of::<RhpamDev>())
                .is_cluster_scoped()
        );
    }

    #[test]
    fn assign_name_clears_generate_name() {
        let mut obj = DesiredObject::RoleBinding(RoleBinding {
            metadata: ObjectMeta {
                generate_name: Some("rhpam-dev-operator:view-".into()),
                ..Default::default()
            },
            ..Default::default()
        });
        assert_eq!(obj.display_name(), "rhpam-dev-operator:view-*");
        obj.assign_name("rhpam-dev-operator:view-x1");
        assert_eq!(obj.name(), Some("rhpam-dev-operator:view-x1"));
        assert_eq!(obj.generate_name(), None);
    }
}
