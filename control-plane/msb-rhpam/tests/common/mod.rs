#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use msb_models::{OriginatingIdentity, UserInfo};
use msb_rhpam::{
    ApiServer,
    cluster::{ClusterClient, CustomKind, MemoryClusterClient},
    config::ProvisionPlan,
    crd::RhpamDev,
    deployer::RhpamDeployer,
    templates::TemplateConfig,
};

const ID_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o',
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3',
    '4', '5', '6', '7', '8', '9',
];

/// A random instance id that is also a valid namespace suffix.
pub fn fresh_id() -> String {
    nanoid::nanoid!(12, &ID_ALPHABET)
}

pub fn identity(username: &str) -> OriginatingIdentity {
    OriginatingIdentity {
        platform: "kubernetes".to_string(),
        user: UserInfo {
            username: username.to_string(),
            ..Default::default()
        },
    }
}

pub fn deployer_with(
    mem: &MemoryClusterClient,
    plan: ProvisionPlan,
    step_timeout: Duration,
) -> RhpamDeployer {
    RhpamDeployer::new(
        Arc::new(mem.clone()),
        TemplateConfig::default(),
        plan,
        step_timeout,
    )
}

pub fn deployer(mem: &MemoryClusterClient, plan: ProvisionPlan) -> RhpamDeployer {
    deployer_with(mem, plan, Duration::from_secs(5))
}

pub fn test_app(mem: &MemoryClusterClient) -> Router {
    let deployer = Arc::new(deployer(mem, ProvisionPlan::Standard));
    ApiServer::new(deployer, 0).into_router()
}

/// Name the server gave the instance's `RhpamDev`.
pub async fn rhpam_dev_name(mem: &MemoryClusterClient, namespace: &str) -> String {
    mem.list_custom(&CustomKind::of::<RhpamDev>(), namespace)
        .await
        .expect("list rhpamdevs")
        .into_iter()
        .next()
        .and_then(|r| r.name)
        .expect("rhpamdev exists")
}

/// Mark the instance's `RhpamDev` as reconciled.
pub async fn complete_rhpam_dev(mem: &MemoryClusterClient, namespace: &str) {
    let name = rhpam_dev_name(mem, namespace).await;
    assert!(
        mem.set_phase(&CustomKind::of::<RhpamDev>(), namespace, &name, "complete")
            .await
    );
}
