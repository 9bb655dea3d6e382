use msb_models::OperationToken;
use tracing::info;

use super::RhpamDeployer;
use crate::cluster::{CustomKind, DesiredObject, ResourceKind};
use crate::config::ProvisionPlan;
use crate::crd::RhpamDev;
use crate::errors::{ClusterResult, DeployerError};
use crate::pipeline::Step;
use crate::templates::rbac::{self, AccessLevel};
use crate::templates::{TemplateConfig, custom, workload};

#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionOutcome {
    pub operation: OperationToken,
    pub dashboard_url: String,
}

/// Ordered creation steps for one tenant namespace.
///
/// Every prerequisite (accounts, roles, bindings, operator) precedes the
/// custom resources the operator reconciles.
pub fn provision_steps(
    cfg: &TemplateConfig,
    plan: ProvisionPlan,
    namespace: &str,
    username: &str,
) -> ClusterResult<Vec<Step>> {
    let standard = plan == ProvisionPlan::Standard;
    let mut steps = vec![
        Step::create(DesiredObject::Namespace(rbac::namespace(namespace))),
        Step::create(DesiredObject::ServiceAccount(
            rbac::operator_service_account(namespace),
        )),
        Step::create(DesiredObject::Role(rbac::operator_role(namespace))),
    ];
    if standard {
        steps.push(Step::create(DesiredObject::Role(rbac::user_role(namespace))));
    }

    steps.extend(
        rbac::system_role_bindings(namespace)
            .into_iter()
            .map(|rb| Step::ensure(DesiredObject::RoleBinding(rb))),
    );
    steps.push(Step::ensure(DesiredObject::RoleBinding(
        rbac::install_role_binding(namespace),
    )));
    if standard {
        steps.push(Step::ensure(DesiredObject::RoleBinding(
            rbac::user_role_binding(namespace, username),
        )));
    }

    let mut access = vec![
        rbac::operator_access_binding(namespace, AccessLevel::View),
        rbac::operator_access_binding(namespace, AccessLevel::Edit),
        rbac::user_access_binding(namespace, username, AccessLevel::View),
    ];
    if standard {
        access.push(rbac::user_access_binding(
            namespace,
            username,
            AccessLevel::Edit,
        ));
    }
    steps.push(Step::Concurrent(
        access
            .into_iter()
            .map(|rb| Step::ensure(DesiredObject::RoleBinding(rb)))
            .collect(),
    ));

    steps.push(Step::create(DesiredObject::ClusterRole(
        rbac::operator_cluster_role(namespace),
    )));
    steps.push(Step::create(DesiredObject::ClusterRoleBinding(
        rbac::operator_cluster_role_binding(namespace),
    )));
    steps.push(Step::create(DesiredObject::Deployment(
        workload::operator_deployment(cfg, namespace),
    )));

    steps.push(Step::create(DesiredObject::Custom(custom::rhpam_dev_record(
        cfg, namespace,
    )?)));
    if standard {
        steps.push(Step::create(DesiredObject::Custom(
            custom::rhpam_user_record(namespace)?,
        )));
    }
    Ok(steps)
}

impl RhpamDeployer {
    pub(crate) async fn run_provision(
        &self,
        instance_id: &str,
        namespace: &str,
        username: &str,
    ) -> Result<ProvisionOutcome, DeployerError> {
        let steps = provision_steps(&self.templates, self.plan, namespace, username)?;
        let report = self.runner.run(instance_id, &steps).await?;

        let dashboard_url = self.templates.dashboard_url(namespace);
        let rhpam_dev = ResourceKind::Custom(CustomKind::of::<RhpamDev>());
        info!(
            instance_id,
            namespace,
            %dashboard_url,
            rhpamdev = report.created_name(&rhpam_dev).unwrap_or("-"),
            "rhpam provisioning accepted"
        );
        Ok(ProvisionOutcome {
            operation: OperationToken::Deploy,
            dashboard_url,
        })
    }
}
