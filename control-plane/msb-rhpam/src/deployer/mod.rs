//! Tenant lifecycle: provision, deprovision and operation polling.

pub mod deprovision;
pub mod provision;
pub mod status;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use msb_models::{
    CatalogResponse, LastOperationResponse, OperationToken, OriginatingIdentity,
};
use tracing::{debug, info, instrument};

use crate::cluster::ClusterClient;
use crate::config::{BrokerConfig, ProvisionPlan};
use crate::errors::DeployerError;
use crate::pipeline::PipelineRunner;
use crate::templates::{TemplateConfig, broker_catalog};

pub use provision::ProvisionOutcome;

const MAX_NAMESPACE_LEN: usize = 63;

/// What the broker front end needs from a service deployer.
#[async_trait]
pub trait Deployer: Send + Sync {
    fn catalog(&self) -> CatalogResponse;

    async fn provision(
        &self,
        instance_id: &str,
        identity: &OriginatingIdentity,
    ) -> Result<ProvisionOutcome, DeployerError>;

    async fn deprovision(
        &self,
        instance_id: &str,
    ) -> Result<OperationToken, DeployerError>;

    async fn last_operation(
        &self,
        instance_id: &str,
        operation: &OperationToken,
    ) -> Result<LastOperationResponse, DeployerError>;
}

#[derive(Clone)]
pub struct RhpamDeployer {
    runner: PipelineRunner,
    templates: TemplateConfig,
    plan: ProvisionPlan,
}

impl RhpamDeployer {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        templates: TemplateConfig,
        plan: ProvisionPlan,
        step_timeout: Duration,
    ) -> Self {
        Self {
            runner: PipelineRunner::new(client, step_timeout),
            templates,
            plan,
        }
    }

    pub fn from_config(
        client: Arc<dyn ClusterClient>,
        config: &BrokerConfig,
    ) -> Self {
        Self::new(
            client,
            config.template_config(),
            config.plan,
            config.step_timeout(),
        )
    }

    /// Tenant namespace for `instance_id`, checked to be a valid DNS label.
    pub fn namespace_for(&self, instance_id: &str) -> Result<String, DeployerError> {
        let invalid = |reason: &str| {
            DeployerError::InvalidInstanceId(
                instance_id.to_string(),
                reason.to_string(),
            )
        };
        if instance_id.is_empty() {
            return Err(invalid("must not be empty"));
        }
        let ns = self.templates.namespace_for(instance_id);
        if ns.len() > MAX_NAMESPACE_LEN {
            return Err(invalid("namespace name exceeds 63 characters"));
        }
        if !ns
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(invalid(
                "only lowercase letters, digits and '-' are allowed",
            ));
        }
        if ns.starts_with('-') || ns.ends_with('-') {
            return Err(invalid("must start and end with a letter or digit"));
        }
        Ok(ns)
    }
}

#[async_trait]
impl Deployer for RhpamDeployer {
    fn catalog(&self) -> CatalogResponse {
        broker_catalog()
    }

    #[instrument(skip(self, identity), fields(plan = self.plan.as_str()))]
    async fn provision(
        &self,
        instance_id: &str,
        identity: &OriginatingIdentity,
    ) -> Result<ProvisionOutcome, DeployerError> {
        let namespace = self.namespace_for(instance_id)?;
        info!(%namespace, user = %identity.user.username, "provisioning rhpam");
        self.run_provision(instance_id, &namespace, &identity.user.username)
            .await
    }

    #[instrument(skip(self))]
    async fn deprovision(
        &self,
        instance_id: &str,
    ) -> Result<OperationToken, DeployerError> {
        // An id that cannot name a namespace never had one to remove.
        let namespace = match self.namespace_for(instance_id) {
            Ok(ns) => ns,
            Err(e) => {
                debug!(error = %e, "nothing to deprovision");
                return Ok(OperationToken::Remove);
            }
        };
        info!(%namespace, "deprovisioning rhpam");
        self.run_deprovision(instance_id, &namespace).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn last_operation(
        &self,
        instance_id: &str,
        operation: &OperationToken,
    ) -> Result<LastOperationResponse, DeployerError> {
        let namespace = match self.namespace_for(instance_id) {
            Ok(ns) => ns,
            Err(e) => {
                debug!(error = %e, "instance has no namespace");
                return status::resolve_absent(instance_id, operation);
            }
        };
        status::resolve(
            self.runner.client().as_ref(),
            instance_id,
            &namespace,
            operation,
        )
        .await
    }
}
