use k8s_openapi::api::core::v1::{Namespace, ServiceAccount};
use k8s_openapi::api::rbac::v1::{
    ClusterRole, ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef,
    Subject,
};

use super::{
    OPERATOR_NAME, USER_ROLE_NAME, cluster_scoped_name, generated, named,
};
use crate::crd::RHPAM_GROUP;

const RBAC_GROUP: &str = "rbac.authorization.k8s.io";

const CORE_RESOURCES: &[&str] = &[
    "pods",
    "services",
    "endpoints",
    "persistentvolumeclaims",
    "configmaps",
    "secrets",
    "serviceaccounts",
];
const RHPAM_RESOURCES: &[&str] = &[
    "rhpamdevs",
    "rhpamdevs/finalizers",
    "rhpamusers",
    "rhpamusers/finalizers",
];
const MANAGE: &[&str] = &[
    "create",
    "delete",
    "deletecollection",
    "get",
    "list",
    "update",
    "watch",
];
const READ: &[&str] = &["get", "list", "watch"];

/// Built-in cluster roles granted to the operator and the requesting user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessLevel {
    View,
    Edit,
}

impl AccessLevel {
    pub fn cluster_role(&self) -> &'static str {
        match self {
            AccessLevel::View => "view",
            AccessLevel::Edit => "edit",
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn rule(group: &str, resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(vec![group.to_string()]),
        resources: Some(strings(resources)),
        verbs: strings(verbs),
        ..Default::default()
    }
}

fn role_ref(kind: &str, name: &str) -> RoleRef {
    RoleRef {
        api_group: RBAC_GROUP.to_string(),
        kind: kind.to_string(),
        name: name.to_string(),
    }
}

fn service_account_subject(name: &str, namespace: &str) -> Subject {
    Subject {
        kind: "ServiceAccount".to_string(),
        name: name.to_string(),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

fn user_subject(username: &str) -> Subject {
    Subject {
        kind: "User".to_string(),
        name: username.to_string(),
        api_group: Some(RBAC_GROUP.to_string()),
        ..Default::default()
    }
}

pub fn namespace(name: &str) -> Namespace {
    Namespace {
        metadata: named(name, None),
        ..Default::default()
    }
}

pub fn operator_service_account(namespace: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: named(OPERATOR_NAME, Some(namespace)),
        ..Default::default()
    }
}

pub fn operator_role(namespace: &str) -> Role {
    Role {
        metadata: named(OPERATOR_NAME, Some(namespace)),
        rules: Some(vec![
            rule("", CORE_RESOURCES, MANAGE),
            rule("", &["events"], &["get", "list"]),
            rule("", &["namespaces"], &["get"]),
            rule("apps", &["deployments"], MANAGE),
            rule("route.openshift.io", &["routes"], MANAGE),
            rule(RHPAM_GROUP, RHPAM_RESOURCES, MANAGE),
        ]),
    }
}

/// Lets the requesting user inspect the environment the operator manages.
pub fn user_role(namespace: &str) -> Role {
    Role {
        metadata: named(USER_ROLE_NAME, Some(namespace)),
        rules: Some(vec![
            rule(RHPAM_GROUP, &["rhpamdevs", "rhpamusers"], READ),
            rule("route.openshift.io", &["routes"], READ),
        ]),
    }
}

/// Platform bindings every build-capable namespace carries. These commonly
/// exist already, created by the platform itself.
pub fn system_role_bindings(namespace: &str) -> Vec<RoleBinding> {
    let pullers = Subject {
        kind: "Group".to_string(),
        name: format!("system:serviceaccounts:{namespace}"),
        api_group: Some(RBAC_GROUP.to_string()),
        ..Default::default()
    };
    vec![
        RoleBinding {
            metadata: named("system:deployers", Some(namespace)),
            role_ref: role_ref("ClusterRole", "system:deployer"),
            subjects: Some(vec![service_account_subject("deployer", namespace)]),
        },
        RoleBinding {
            metadata: named("system:image-builders", Some(namespace)),
            role_ref: role_ref("ClusterRole", "system:image-builder"),
            subjects: Some(vec![service_account_subject("builder", namespace)]),
        },
        RoleBinding {
            metadata: named("system:image-pullers", Some(namespace)),
            role_ref: role_ref("ClusterRole", "system:image-puller"),
            subjects: Some(vec![pullers]),
        },
    ]
}

pub fn install_role_binding(namespace: &str) -> RoleBinding {
    RoleBinding {
        metadata: named(&format!("{OPERATOR_NAME}:install"), Some(namespace)),
        role_ref: role_ref("Role", OPERATOR_NAME),
        subjects: Some(vec![service_account_subject(OPERATOR_NAME, namespace)]),
    }
}

pub fn user_role_binding(namespace: &str, username: &str) -> RoleBinding {
    RoleBinding {
        metadata: generated(&format!("{USER_ROLE_NAME}-"), namespace),
        role_ref: role_ref("Role", USER_ROLE_NAME),
        subjects: Some(vec![user_subject(username)]),
    }
}

/// `rhpam-dev-operator:<level>`: the operator account on a built-in role.
pub fn operator_access_binding(
    namespace: &str,
    level: AccessLevel,
) -> RoleBinding {
    let role = level.cluster_role();
    RoleBinding {
        metadata: named(&format!("{OPERATOR_NAME}:{role}"), Some(namespace)),
        role_ref: role_ref("ClusterRole", role),
        subjects: Some(vec![service_account_subject(OPERATOR_NAME, namespace)]),
    }
}

/// `rhpam-dev-operator:<level>-<suffix>`: the requesting user on a
/// built-in role.
pub fn user_access_binding(
    namespace: &str,
    username: &str,
    level: AccessLevel,
) -> RoleBinding {
    let role = level.cluster_role();
    RoleBinding {
        metadata: generated(&format!("{OPERATOR_NAME}:{role}-"), namespace),
        role_ref: role_ref("ClusterRole", role),
        subjects: Some(vec![user_subject(username)]),
    }
}

/// Read access the operator needs outside its own namespace.
pub fn operator_cluster_role(namespace: &str) -> ClusterRole {
    ClusterRole {
        metadata: named(&cluster_scoped_name(namespace), None),
        rules: Some(vec![
            rule(RHPAM_GROUP, RHPAM_RESOURCES, READ),
            rule("", CORE_RESOURCES, READ),
            rule("apps", &["deployments"], READ),
        ]),
        ..Default::default()
    }
}

pub fn operator_cluster_role_binding(namespace: &str) -> ClusterRoleBinding {
    let name = cluster_scoped_name(namespace);
    ClusterRoleBinding {
        metadata: named(&name, None),
        role_ref: role_ref("ClusterRole", &name),
        subjects: Some(vec![service_account_subject(OPERATOR_NAME, namespace)]),
    }
}
