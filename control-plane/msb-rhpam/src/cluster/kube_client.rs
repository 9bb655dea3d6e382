use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, ServiceAccount};
use k8s_openapi::api::rbac::v1::{
    ClusterRole, ClusterRoleBinding, Role, RoleBinding,
};
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, PostParams};
use kube::{Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};

use super::{
    ClusterClient, CustomKind, CustomResourceRecord, DesiredObject,
    ResourceKind,
};
use crate::errors::{ClusterError, ClusterResult};

/// [`ClusterClient`] talking to the API server through kube-rs.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect with the in-cluster service account or the local kubeconfig.
    pub async fn try_default() -> ClusterResult<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| ClusterError::Transport(e.to_string()))?;
        Ok(Self::new(client))
    }

    fn namespaced<K>(
        &self,
        kind: &ResourceKind,
        namespace: Option<&str>,
    ) -> ClusterResult<Api<K>>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        let ns = namespace.ok_or_else(|| {
            ClusterError::InvalidObject(format!("{kind} requires a namespace"))
        })?;
        Ok(Api::namespaced(self.client.clone(), ns))
    }

    fn cluster<K>(&self) -> Api<K>
    where
        K: Resource,
        K::DynamicType: Default,
    {
        Api::all(self.client.clone())
    }

    fn custom(&self, kind: &CustomKind, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(
            self.client.clone(),
            namespace,
            &kind.api_resource(),
        )
    }
}

async fn create_in<K>(
    api: Api<K>,
    kind: &ResourceKind,
    object: &K,
) -> ClusterResult<String>
where
    K: Resource + Clone + Debug + Serialize + DeserializeOwned,
{
    let requested = object
        .meta()
        .name
        .clone()
        .or_else(|| object.meta().generate_name.clone())
        .unwrap_or_default();
    let created = api
        .create(&PostParams::default(), object)
        .await
        .map_err(|e| ClusterError::from_kube(kind, &requested, e))?;
    created.meta().name.clone().ok_or_else(|| {
        ClusterError::InvalidObject(format!(
            "server returned {kind} '{requested}' without a name"
        ))
    })
}

async fn exists_in<K>(
    api: Api<K>,
    kind: &ResourceKind,
    name: &str,
) -> ClusterResult<bool>
where
    K: Resource + Clone + Debug + DeserializeOwned,
{
    api.get_opt(name)
        .await
        .map(|found| found.is_some())
        .map_err(|e| ClusterError::from_kube(kind, name, e))
}

async fn delete_in<K>(
    api: Api<K>,
    kind: &ResourceKind,
    name: &str,
) -> ClusterResult<()>
where
    K: Resource + Clone + Debug + DeserializeOwned,
{
    api.delete(name, &DeleteParams::default())
        .await
        .map(|_| ())
        .map_err(|e| ClusterError::from_kube(kind, name, e))
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    #[instrument(level = "debug", skip(self, object), fields(kind = %object.kind(), name = %object.display_name()))]
    async fn create(&self, object: &DesiredObject) -> ClusterResult<String> {
        let kind = object.kind();
        let ns = object.namespace();
        let name = match object {
            DesiredObject::Namespace(o) => {
                create_in(self.cluster::<Namespace>(), &kind, o).await?
            }
            DesiredObject::ServiceAccount(o) => {
                let api = self.namespaced::<ServiceAccount>(&kind, ns)?;
                create_in(api, &kind, o).await?
            }
            DesiredObject::Role(o) => {
                let api = self.namespaced::<Role>(&kind, ns)?;
                create_in(api, &kind, o).await?
            }
            DesiredObject::RoleBinding(o) => {
                let api = self.namespaced::<RoleBinding>(&kind, ns)?;
                create_in(api, &kind, o).await?
            }
            DesiredObject::ClusterRole(o) => {
                create_in(self.cluster::<ClusterRole>(), &kind, o).await?
            }
            DesiredObject::ClusterRoleBinding(o) => {
                create_in(self.cluster::<ClusterRoleBinding>(), &kind, o)
                    .await?
            }
            DesiredObject::Deployment(o) => {
                let api = self.namespaced::<Deployment>(&kind, ns)?;
                create_in(api, &kind, o).await?
            }
            DesiredObject::Custom(rec) => {
                let api = self.custom(&rec.kind, &rec.namespace);
                create_in(api, &kind, &rec.to_dynamic()).await?
            }
        };
        debug!(%kind, %name, "created");
        Ok(name)
    }

    async fn exists(
        &self,
        kind: &ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> ClusterResult<bool> {
        trace!(%kind, ?namespace, name, "exists");
        match kind {
            ResourceKind::Namespace => {
                exists_in(self.cluster::<Namespace>(), kind, name).await
            }
            ResourceKind::ServiceAccount => {
                let api = self.namespaced::<ServiceAccount>(kind, namespace)?;
                exists_in(api, kind, name).await
            }
            ResourceKind::Role => {
                let api = self.namespaced::<Role>(kind, namespace)?;
                exists_in(api, kind, name).await
            }
            ResourceKind::RoleBinding => {
                let api = self.namespaced::<RoleBinding>(kind, namespace)?;
                exists_in(api, kind, name).await
            }
            ResourceKind::ClusterRole => {
                exists_in(self.cluster::<ClusterRole>(), kind, name).await
            }
            ResourceKind::ClusterRoleBinding => {
                exists_in(self.cluster::<ClusterRoleBinding>(), kind, name)
                    .await
            }
            ResourceKind::Deployment => {
                let api = self.namespaced::<Deployment>(kind, namespace)?;
                exists_in(api, kind, name).await
            }
            ResourceKind::Custom(ck) => {
                let ns = namespace.ok_or_else(|| {
                    ClusterError::InvalidObject(format!(
                        "{kind} requires a namespace"
                    ))
                })?;
                exists_in(self.custom(ck, ns), kind, name).await
            }
        }
    }

    async fn list_custom(
        &self,
        kind: &CustomKind,
        namespace: &str,
    ) -> ClusterResult<Vec<CustomResourceRecord>> {
        let list = self
            .custom(kind, namespace)
            .list(&ListParams::default())
            .await
            .map_err(|e| {
                ClusterError::from_kube(
                    &ResourceKind::Custom(kind.clone()),
                    namespace,
                    e,
                )
            })?;
        trace!(kind = %kind.kind, namespace, count = list.items.len(), "listed");
        Ok(list
            .items
            .into_iter()
            .map(|obj| CustomResourceRecord::from_dynamic(kind, obj))
            .collect())
    }

    #[instrument(level = "debug", skip(self), fields(kind = %kind))]
    async fn delete(
        &self,
        kind: &ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> ClusterResult<()> {
        match kind {
            ResourceKind::Namespace => {
                delete_in(self.cluster::<Namespace>(), kind, name).await
            }
            ResourceKind::ServiceAccount => {
                let api = self.namespaced::<ServiceAccount>(kind, namespace)?;
                delete_in(api, kind, name).await
            }
            ResourceKind::Role => {
                let api = self.namespaced::<Role>(kind, namespace)?;
                delete_in(api, kind, name).await
            }
            ResourceKind::RoleBinding => {
                let api = self.namespaced::<RoleBinding>(kind, namespace)?;
                delete_in(api, kind, name).await
            }
            ResourceKind::ClusterRole => {
                delete_in(self.cluster::<ClusterRole>(), kind, name).await
            }
            ResourceKind::ClusterRoleBinding => {
                delete_in(self.cluster::<ClusterRoleBinding>(), kind, name)
                    .await
            }
            ResourceKind::Deployment => {
                let api = self.namespaced::<Deployment>(kind, namespace)?;
                delete_in(api, kind, name).await
            }
            ResourceKind::Custom(ck) => {
                let ns = namespace.ok_or_else(|| {
                    ClusterError::InvalidObject(format!(
                        "{kind} requires a namespace"
                    ))
                })?;
                delete_in(self.custom(ck, ns), kind, name).await
            }
        }
    }
}
