use msb_models::OperationToken;
use tracing::info;

use super::RhpamDeployer;
use crate::cluster::{CustomKind, ResourceKind};
use crate::crd::{RhpamDev, RhpamUser};
use crate::errors::DeployerError;
use crate::pipeline::Step;
use crate::templates::cluster_scoped_name;

/// Teardown in reverse dependency order. Everything is delete-if-present, so
/// running it against a partial or empty instance succeeds.
pub fn deprovision_steps(namespace: &str) -> Vec<Step> {
    let cluster_name = cluster_scoped_name(namespace);
    vec![
        Step::remove_all(CustomKind::of::<RhpamUser>(), namespace),
        Step::remove_all(CustomKind::of::<RhpamDev>(), namespace),
        Step::remove(ResourceKind::ClusterRoleBinding, None, &cluster_name),
        Step::remove(ResourceKind::ClusterRole, None, &cluster_name),
        Step::remove(ResourceKind::Namespace, None, namespace),
    ]
}

impl RhpamDeployer {
    pub(crate) async fn run_deprovision(
        &self,
        instance_id: &str,
        namespace: &str,
    ) -> Result<OperationToken, DeployerError> {
        let report = self
            .runner
            .run(instance_id, &deprovision_steps(namespace))
            .await?;
        info!(
            instance_id,
            namespace,
            already_absent = report.skipped(),
            "rhpam deprovisioning accepted"
        );
        Ok(OperationToken::Remove)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_resources_go_first_and_namespace_last() {
        let steps = deprovision_steps("rhpam-abc123");
        assert!(matches!(
            &steps[0],
            Step::DeleteAllCustom { kind, .. } if kind.kind == "RhpamUser"
        ));
        assert!(matches!(
            &steps[1],
            Step::DeleteAllCustom { kind, .. } if kind.kind == "RhpamDev"
        ));
        assert!(matches!(
            steps.last(),
            Some(Step::Delete { kind: ResourceKind::Namespace, name, .. })
                if name == "rhpam-abc123"
        ));
    }
}
