//! Provision, poll, deprovision, poll: the full tenant lifecycle against the
//! in-memory cluster.

mod common;

use common::{complete_rhpam_dev, deployer, fresh_id, identity};
use msb_models::{LastOperationState, OperationToken};
use msb_rhpam::{
    Deployer,
    cluster::{
        ClusterClient, CustomKind, Fault, MemoryClusterClient, ResourceKind, Verb,
    },
    config::ProvisionPlan,
    crd::RhpamUser,
    errors::DeployerError,
};

#[test_log::test(tokio::test)]
async fn abc123_lifecycle() {
    let mem = MemoryClusterClient::new();
    mem.hold_namespace_deletion(true).await;
    let d = deployer(&mem, ProvisionPlan::DevOnly);

    d.provision("abc123", &identity("dev")).await.unwrap();

    let status = d
        .last_operation("abc123", &OperationToken::Deploy)
        .await
        .unwrap();
    assert_eq!(status.state, LastOperationState::InProgress);
    assert_eq!(status.description, "rhpam is deploying");

    complete_rhpam_dev(&mem, "rhpam-abc123").await;
    for _ in 0..2 {
        let status = d
            .last_operation("abc123", &OperationToken::Deploy)
            .await
            .unwrap();
        assert_eq!(status.state, LastOperationState::Succeeded);
        assert_eq!(status.description, "rhpam deployed successfully");
    }

    let op = d.deprovision("abc123").await.unwrap();
    assert_eq!(op, OperationToken::Remove);
    assert!(mem.is_terminating("rhpam-abc123").await);

    let status = d
        .last_operation("abc123", &OperationToken::Remove)
        .await
        .unwrap();
    assert_eq!(status.state, LastOperationState::InProgress);
    assert_eq!(status.description, "rhpam is deleting");

    mem.finish_namespace_deletion("rhpam-abc123").await;
    let status = d
        .last_operation("abc123", &OperationToken::Remove)
        .await
        .unwrap();
    assert_eq!(status.state, LastOperationState::Succeeded);
    assert_eq!(status.description, "rhpam has been deleted");
}

#[test_log::test(tokio::test)]
async fn deprovision_removes_custom_and_cluster_resources() {
    let mem = MemoryClusterClient::new();
    let d = deployer(&mem, ProvisionPlan::Standard);
    let id = fresh_id();
    let ns = format!("rhpam-{id}");
    let cluster_name = format!("rhpam-dev-operator-{ns}");

    d.provision(&id, &identity("dev")).await.unwrap();
    assert!(
        mem.exists(&ResourceKind::ClusterRole, None, &cluster_name)
            .await
            .unwrap()
    );

    d.deprovision(&id).await.unwrap();

    let journal = mem.journal().await;
    let deletes: Vec<String> = journal
        .iter()
        .filter(|e| e.verb == Verb::Delete)
        .map(|e| e.kind.to_string())
        .collect();
    assert_eq!(
        deletes,
        [
            "RhpamUser",
            "RhpamDev",
            "ClusterRoleBinding",
            "ClusterRole",
            "Namespace"
        ]
    );
    for kind in [ResourceKind::ClusterRole, ResourceKind::ClusterRoleBinding] {
        assert!(!mem.exists(&kind, None, &cluster_name).await.unwrap());
    }
    assert!(mem.objects().await.is_empty());
}

#[test_log::test(tokio::test)]
async fn deprovision_of_unknown_instance_is_a_no_op() {
    let mem = MemoryClusterClient::new();
    let d = deployer(&mem, ProvisionPlan::Standard);

    let op = d.deprovision(&fresh_id()).await.unwrap();
    assert_eq!(op, OperationToken::Remove);
    assert_eq!(mem.calls(Verb::Create).await, 0);
}

#[test_log::test(tokio::test)]
async fn deprovision_fails_on_server_error() {
    let mem = MemoryClusterClient::new();
    let d = deployer(&mem, ProvisionPlan::Standard);
    let id = fresh_id();
    d.provision(&id, &identity("dev")).await.unwrap();

    mem.inject_fault(
        Verb::List,
        ResourceKind::Custom(CustomKind::of::<RhpamUser>()),
        Fault::api(500, "InternalError"),
        1,
    )
    .await;
    let err = d.deprovision(&id).await.unwrap_err();
    assert!(matches!(err, DeployerError::Pipeline(_)));
    assert!(
        mem.exists(&ResourceKind::Namespace, None, &format!("rhpam-{id}"))
            .await
            .unwrap()
    );
}

#[test_log::test(tokio::test)]
async fn never_provisioned_instance_is_not_found() {
    let mem = MemoryClusterClient::new();
    let d = deployer(&mem, ProvisionPlan::Standard);
    let id = fresh_id();

    let err = d
        .last_operation(&id, &OperationToken::Deploy)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployerError::NotFound { .. }));

    let err = d
        .last_operation(&id, &OperationToken::from("rollback"))
        .await
        .unwrap_err();
    assert!(matches!(err, DeployerError::NotFound { .. }));
}

#[test_log::test(tokio::test)]
async fn unknown_token_is_reported_as_failed() {
    let mem = MemoryClusterClient::new();
    let d = deployer(&mem, ProvisionPlan::Standard);
    let id = fresh_id();
    d.provision(&id, &identity("dev")).await.unwrap();

    let status = d
        .last_operation(&id, &OperationToken::from("rollback"))
        .await
        .unwrap();
    assert_eq!(status.state, LastOperationState::Failed);
    assert_eq!(status.description, "unknown operation: rollback");
}

#[test_log::test(tokio::test)]
async fn concurrent_polls_agree() {
    let mem = MemoryClusterClient::new();
    let d = deployer(&mem, ProvisionPlan::Standard);
    let id = fresh_id();
    d.provision(&id, &identity("dev")).await.unwrap();
    complete_rhpam_dev(&mem, &format!("rhpam-{id}")).await;

    let polls = (0..8).map(|_| d.last_operation(&id, &OperationToken::Deploy));
    let results = futures_util::future::join_all(polls).await;
    assert!(results.into_iter().all(|r| {
        r.map(|s| s.state == LastOperationState::Succeeded)
            .unwrap_or(false)
    }));
}

#[test_log::test(tokio::test)]
async fn racing_provisions_yield_one_winner() {
    let mem = MemoryClusterClient::new();
    let d = deployer(&mem, ProvisionPlan::Standard);
    let id = fresh_id();
    let who = identity("dev");

    let (a, b) = tokio::join!(d.provision(&id, &who), d.provision(&id, &who));
    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1);
    let loser = a.err().or(b.err()).unwrap();
    match loser {
        DeployerError::Pipeline(pe) => assert!(pe.is_conflict()),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[test_log::test(tokio::test)]
async fn non_dns_instance_id_has_nothing_to_remove() {
    let mem = MemoryClusterClient::new();
    let d = deployer(&mem, ProvisionPlan::Standard);
    let id = "8A5F1C2E-9D4B-4F7E-B1A3-0C6D2E9F7B11";

    let op = d.deprovision(id).await.unwrap();
    assert_eq!(op, OperationToken::Remove);

    let status = d.last_operation(id, &OperationToken::Remove).await.unwrap();
    assert_eq!(status.state, LastOperationState::Succeeded);
    assert_eq!(status.description, "rhpam has been deleted");

    for token in [OperationToken::Deploy, OperationToken::from("rollback")] {
        let err = d.last_operation(id, &token).await.unwrap_err();
        assert!(matches!(err, DeployerError::NotFound { .. }));
    }
    assert!(mem.journal().await.is_empty());
}
