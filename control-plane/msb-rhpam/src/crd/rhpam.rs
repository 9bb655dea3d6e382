use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const RHPAM_GROUP: &str = "rhpam.integreatly.org";
pub const RHPAM_VERSION: &str = "v1alpha1";

/// Phase value the rhpam operator reports once a `RhpamDev` is fully rolled out.
pub const PHASE_COMPLETE: &str = "complete";

/// Developer environment reconciled by the rhpam-dev operator.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "rhpam.integreatly.org",
    version = "v1alpha1",
    kind = "RhpamDev",
    plural = "rhpamdevs",
    namespaced,
    status = "RhpamDevStatus"
)]
pub struct RhpamDevSpec {
    /// Route domain used when exposing Business Central and KIE server.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<RhpamConfig>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
pub struct RhpamDevStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct RhpamConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<RhpamDatabaseConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_central: Option<RhpamBusinessCentralConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kie_server: Option<RhpamKieServerConfig>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct RhpamDatabaseConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_buffers: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct RhpamBusinessCentralConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct RhpamKieServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<String>,
}

/// Users and groups seeded into a provisioned developer environment.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "rhpam.integreatly.org",
    version = "v1alpha1",
    kind = "RhpamUser",
    plural = "rhpamusers",
    namespaced,
    status = "RhpamUserStatus"
)]
pub struct RhpamUserSpec {
    #[serde(default)]
    pub roles: Vec<RhpamRole>,
    #[serde(default)]
    pub users: Vec<RhpamUserEntry>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
pub struct RhpamUserStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct RhpamRole {
    pub name: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
pub struct RhpamUserEntry {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}
