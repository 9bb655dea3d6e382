mod common;

use std::time::Duration;

use common::{deployer, deployer_with, fresh_id, identity};
use msb_models::OperationToken;
use msb_rhpam::{
    Deployer,
    cluster::{
        ClusterClient, DesiredObject, Fault, MemoryClusterClient, ResourceKind,
        RetryConfig, RetryingClusterClient, Verb,
    },
    config::ProvisionPlan,
    deployer::RhpamDeployer,
    errors::{ClusterError, DeployerError, PipelineError},
    templates::{TemplateConfig, rbac},
};
use std::sync::Arc;

fn created_kinds(journal: &[msb_rhpam::cluster::JournalEntry]) -> Vec<String> {
    let mut kinds: Vec<String> = Vec::new();
    for e in journal.iter().filter(|e| e.verb == Verb::Create && e.succeeded) {
        let k = e.kind.to_string();
        if kinds.last() != Some(&k) {
            kinds.push(k);
        }
    }
    kinds
}

#[test_log::test(tokio::test)]
async fn provisions_abc123_in_dependency_order() {
    let mem = MemoryClusterClient::new();
    let d = deployer(&mem, ProvisionPlan::DevOnly);

    let outcome = d.provision("abc123", &identity("dev")).await.unwrap();
    assert_eq!(outcome.operation, OperationToken::Deploy);
    assert_eq!(outcome.dashboard_url, "https://rhpam-bc-rhpam-abc123");

    let journal = mem.journal().await;
    assert_eq!(
        created_kinds(&journal),
        [
            "Namespace",
            "ServiceAccount",
            "Role",
            "RoleBinding",
            "ClusterRole",
            "ClusterRoleBinding",
            "Deployment",
            "RhpamDev",
        ]
    );
    let last = journal.last().unwrap();
    assert_eq!(last.namespace.as_deref(), Some("rhpam-abc123"));
    assert!(last.name.starts_with("rhpamdev-"));
    assert!(
        mem.exists(&ResourceKind::Namespace, None, "rhpam-abc123")
            .await
            .unwrap()
    );
}

#[test_log::test(tokio::test)]
async fn standard_plan_seeds_user_resources() {
    let mem = MemoryClusterClient::new();
    let d = deployer(&mem, ProvisionPlan::Standard);
    let id = fresh_id();
    let ns = format!("rhpam-{id}");

    d.provision(&id, &identity("alice")).await.unwrap();

    let objects = mem.objects().await;
    let kinds: Vec<String> = objects.iter().map(|o| o.kind().to_string()).collect();
    assert_eq!(kinds.last().map(String::as_str), Some("RhpamUser"));
    assert!(
        mem.get(&ResourceKind::Role, Some(&ns), "rhpam-user")
            .await
            .is_some()
    );

    let user_bindings: Vec<_> = objects
        .iter()
        .filter_map(|o| match o {
            DesiredObject::RoleBinding(rb) => Some(rb),
            _ => None,
        })
        .filter(|rb| {
            rb.subjects
                .as_ref()
                .is_some_and(|s| s.iter().any(|s| s.kind == "User" && s.name == "alice"))
        })
        .collect();
    assert_eq!(user_bindings.len(), 3);
}

#[test_log::test(tokio::test)]
async fn existing_namespace_is_a_conflict() {
    let mem = MemoryClusterClient::new();
    let d = deployer(&mem, ProvisionPlan::Standard);
    mem.create(&DesiredObject::Namespace(rbac::namespace("rhpam-taken")))
        .await
        .unwrap();

    let err = d.provision("taken", &identity("dev")).await.unwrap_err();
    match &err {
        DeployerError::Pipeline(pe) => assert!(pe.is_conflict()),
        other => panic!("expected pipeline conflict, got {other:?}"),
    }
    assert_eq!(mem.calls(Verb::Create).await, 2);
}

#[test_log::test(tokio::test)]
async fn preexisting_system_bindings_are_tolerated() {
    let mem = MemoryClusterClient::new();
    let d = deployer(&mem, ProvisionPlan::Standard);
    let id = fresh_id();
    let ns = format!("rhpam-{id}");

    // The platform creates these itself as soon as the namespace appears.
    mem.inject_fault(
        Verb::Create,
        ResourceKind::RoleBinding,
        Fault::api(409, "AlreadyExists"),
        3,
    )
    .await;
    d.provision(&id, &identity("dev")).await.unwrap();

    assert!(
        mem.get(&ResourceKind::RoleBinding, Some(&ns), "system:deployers")
            .await
            .is_none()
    );
    assert!(
        mem.get(&ResourceKind::RoleBinding, Some(&ns), "rhpam-dev-operator:install")
            .await
            .is_some()
    );
    assert!(
        mem.get(&ResourceKind::Deployment, Some(&ns), "rhpam-dev-operator")
            .await
            .is_some()
    );
}

#[test_log::test(tokio::test)]
async fn failing_step_stops_later_steps() {
    let mem = MemoryClusterClient::new();
    let d = deployer(&mem, ProvisionPlan::Standard);
    let id = fresh_id();
    mem.inject_fault(
        Verb::Create,
        ResourceKind::ClusterRole,
        Fault::api(403, "Forbidden"),
        1,
    )
    .await;

    let err = d.provision(&id, &identity("dev")).await.unwrap_err();
    assert!(err.to_string().contains("ClusterRole"), "{err}");

    let kinds: Vec<ResourceKind> =
        mem.objects().await.iter().map(|o| o.kind()).collect();
    assert!(kinds.contains(&ResourceKind::RoleBinding));
    assert!(!kinds.contains(&ResourceKind::ClusterRoleBinding));
    assert!(!kinds.contains(&ResourceKind::Deployment));
    assert!(!kinds.iter().any(|k| matches!(k, ResourceKind::Custom(_))));
}

#[test_log::test(tokio::test(start_paused = true))]
async fn stalled_step_fails_after_deadline() {
    let mem = MemoryClusterClient::new();
    let d = deployer_with(&mem, ProvisionPlan::Standard, Duration::from_secs(3));
    mem.inject_fault(
        Verb::Create,
        ResourceKind::Deployment,
        Fault::Delay(Duration::from_secs(120)),
        1,
    )
    .await;

    let err = d.provision(&fresh_id(), &identity("dev")).await.unwrap_err();
    assert!(matches!(
        err,
        DeployerError::Pipeline(PipelineError::Timeout { .. })
    ));
}

#[test_log::test(tokio::test)]
async fn transient_errors_are_retried_below_the_pipeline() {
    let mem = MemoryClusterClient::new();
    let retrying = RetryingClusterClient::new(
        mem.clone(),
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            backoff_multiplier: 2.0,
        },
    );
    let d = RhpamDeployer::new(
        Arc::new(retrying),
        TemplateConfig::default(),
        ProvisionPlan::DevOnly,
        Duration::from_secs(5),
    );
    mem.inject_fault(
        Verb::Create,
        ResourceKind::ServiceAccount,
        Fault::api(503, "ServiceUnavailable"),
        2,
    )
    .await;

    d.provision(&fresh_id(), &identity("dev")).await.unwrap();
    let sa_calls = mem
        .journal()
        .await
        .iter()
        .filter(|e| e.verb == Verb::Create && e.kind == ResourceKind::ServiceAccount)
        .count();
    assert_eq!(sa_calls, 3);
}

#[test_log::test(tokio::test)]
async fn semantic_errors_are_not_retried() {
    let mem = MemoryClusterClient::new();
    let retrying = RetryingClusterClient::new(mem.clone(), RetryConfig::with_max_attempts(5));
    let d = RhpamDeployer::new(
        Arc::new(retrying),
        TemplateConfig::default(),
        ProvisionPlan::DevOnly,
        Duration::from_secs(5),
    );
    mem.inject_fault(
        Verb::Create,
        ResourceKind::ServiceAccount,
        Fault::api(422, "Invalid"),
        5,
    )
    .await;

    let err = d.provision(&fresh_id(), &identity("dev")).await.unwrap_err();
    assert!(matches!(
        err,
        DeployerError::Pipeline(PipelineError::Step {
            source: ClusterError::Api { code: 422, .. },
            ..
        })
    ));
    assert_eq!(mem.calls(Verb::Create).await, 2);
}

#[test_log::test(tokio::test)]
async fn invalid_instance_id_never_reaches_the_cluster() {
    let mem = MemoryClusterClient::new();
    let d = deployer(&mem, ProvisionPlan::Standard);
    let err = d.provision("Not_Valid", &identity("dev")).await.unwrap_err();
    assert!(matches!(err, DeployerError::InvalidInstanceId(..)));
    assert!(mem.journal().await.is_empty());
}
