//! Ordered cluster steps and the single interpreter that runs them.
//!
//! A pipeline is plain data: a slice of [`Step`]s executed in order. The first
//! fatal failure stops the run. Nothing already created is rolled back.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::try_join_all;
use tracing::{debug, error, info, warn};

use crate::cluster::{ClusterClient, CustomKind, DesiredObject, ResourceKind};
use crate::errors::{ClusterResult, PipelineError};

/// Which client error, if any, a step treats as success.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepPolicy {
    Fatal,
    TolerateAlreadyExists,
    TolerateNotFound,
}

#[derive(Clone, Debug)]
pub enum Step {
    Create {
        object: DesiredObject,
        policy: StepPolicy,
    },
    Delete {
        kind: ResourceKind,
        namespace: Option<String>,
        name: String,
        policy: StepPolicy,
    },
    /// List every object of `kind` in `namespace`, then delete each one.
    /// Absence at either stage counts as done.
    DeleteAllCustom {
        kind: CustomKind,
        namespace: String,
    },
    /// Independent steps run together; the first failure fails the group.
    Concurrent(Vec<Step>),
}

impl Step {
    pub fn create(object: DesiredObject) -> Self {
        Step::Create {
            object,
            policy: StepPolicy::Fatal,
        }
    }

    pub fn ensure(object: DesiredObject) -> Self {
        Step::Create {
            object,
            policy: StepPolicy::TolerateAlreadyExists,
        }
    }

    pub fn remove(kind: ResourceKind, namespace: Option<&str>, name: &str) -> Self {
        Step::Delete {
            kind,
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
            policy: StepPolicy::TolerateNotFound,
        }
    }

    pub fn remove_all(kind: CustomKind, namespace: &str) -> Self {
        Step::DeleteAllCustom {
            kind,
            namespace: namespace.to_string(),
        }
    }

    /// Leaf steps in execution order, with concurrent groups flattened.
    pub fn leaves(steps: &[Step]) -> Vec<&Step> {
        let mut out = Vec::new();
        for step in steps {
            match step {
                Step::Concurrent(inner) => out.extend(Step::leaves(inner)),
                leaf => out.push(leaf),
            }
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Created { kind: ResourceKind, name: String },
    Deleted { kind: ResourceKind, name: String },
    /// The tolerated error case: already there, or already gone.
    Skipped { kind: ResourceKind, name: String },
}

#[derive(Clone, Debug, Default)]
pub struct PipelineReport {
    pub outcomes: Vec<StepOutcome>,
}

impl PipelineReport {
    /// Server-assigned name of the first created object of `kind`.
    pub fn created_name(&self, kind: &ResourceKind) -> Option<&str> {
        self.outcomes.iter().find_map(|o| match o {
            StepOutcome::Created { kind: k, name } if k == kind => {
                Some(name.as_str())
            }
            _ => None,
        })
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, StepOutcome::Skipped { .. }))
            .count()
    }
}

type StepFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<StepOutcome>, PipelineError>> + Send + 'a>>;

#[derive(Clone)]
pub struct PipelineRunner {
    client: Arc<dyn ClusterClient>,
    step_timeout: Duration,
}

impl PipelineRunner {
    pub fn new(client: Arc<dyn ClusterClient>, step_timeout: Duration) -> Self {
        Self {
            client,
            step_timeout,
        }
    }

    pub fn client(&self) -> &Arc<dyn ClusterClient> {
        &self.client
    }

    pub async fn run(
        &self,
        instance_id: &str,
        steps: &[Step],
    ) -> Result<PipelineReport, PipelineError> {
        info!(instance_id, steps = steps.len(), "pipeline started");
        let mut report = PipelineReport::default();
        for step in steps {
            match self.run_step(instance_id, step).await {
                Ok(outcomes) => report.outcomes.extend(outcomes),
                Err(e) => {
                    error!(instance_id, error = %e, "pipeline aborted");
                    return Err(e);
                }
            }
        }
        info!(
            instance_id,
            steps = report.outcomes.len(),
            skipped = report.skipped(),
            "pipeline finished"
        );
        Ok(report)
    }

    fn run_step<'a>(&'a self, instance_id: &'a str, step: &'a Step) -> StepFuture<'a> {
        Box::pin(async move {
            match step {
                Step::Create { object, policy } => self
                    .create(instance_id, object, *policy)
                    .await
                    .map(|o| vec![o]),
                Step::Delete {
                    kind,
                    namespace,
                    name,
                    policy,
                } => self
                    .delete(instance_id, kind, namespace.as_deref(), name, *policy)
                    .await
                    .map(|o| vec![o]),
                Step::DeleteAllCustom { kind, namespace } => {
                    self.delete_all(instance_id, kind, namespace).await
                }
                Step::Concurrent(group) => {
                    let results = try_join_all(
                        group.iter().map(|s| self.run_step(instance_id, s)),
                    )
                    .await?;
                    Ok(results.into_iter().flatten().collect())
                }
            }
        })
    }

    /// Run one client call under the step deadline.
    async fn guarded<T>(
        &self,
        instance_id: &str,
        verb: &'static str,
        kind: &ResourceKind,
        name: &str,
        call: impl Future<Output = ClusterResult<T>>,
    ) -> Result<ClusterResult<T>, PipelineError> {
        tokio::time::timeout(self.step_timeout, call)
            .await
            .map_err(|_| {
                error!(instance_id, verb, %kind, name, "step deadline exceeded");
                PipelineError::Timeout {
                    instance_id: instance_id.to_string(),
                    verb,
                    kind: kind.to_string(),
                    name: name.to_string(),
                    after: self.step_timeout,
                }
            })
    }

    async fn create(
        &self,
        instance_id: &str,
        object: &DesiredObject,
        policy: StepPolicy,
    ) -> Result<StepOutcome, PipelineError> {
        let kind = object.kind();
        let display_name = object.display_name();
        debug!(instance_id, %kind, name = %display_name, "create");
        match self
            .guarded(instance_id, "create", &kind, &display_name, self.client.create(object))
            .await?
        {
            Ok(name) => Ok(StepOutcome::Created { kind, name }),
            Err(e)
                if policy == StepPolicy::TolerateAlreadyExists
                    && e.is_already_exists() =>
            {
                warn!(instance_id, %kind, name = %display_name, "already exists, continuing");
                Ok(StepOutcome::Skipped {
                    kind,
                    name: display_name,
                })
            }
            Err(source) => Err(PipelineError::Step {
                instance_id: instance_id.to_string(),
                verb: "create",
                kind: kind.to_string(),
                name: display_name,
                source,
            }),
        }
    }

    async fn delete(
        &self,
        instance_id: &str,
        kind: &ResourceKind,
        namespace: Option<&str>,
        name: &str,
        policy: StepPolicy,
    ) -> Result<StepOutcome, PipelineError> {
        debug!(instance_id, %kind, name, "delete");
        match self
            .guarded(
                instance_id,
                "delete",
                kind,
                name,
                self.client.delete(kind, namespace, name),
            )
            .await?
        {
            Ok(()) => Ok(StepOutcome::Deleted {
                kind: kind.clone(),
                name: name.to_string(),
            }),
            Err(e) if policy == StepPolicy::TolerateNotFound && e.is_not_found() => {
                debug!(instance_id, %kind, name, "already gone");
                Ok(StepOutcome::Skipped {
                    kind: kind.clone(),
                    name: name.to_string(),
                })
            }
            Err(source) => Err(PipelineError::Step {
                instance_id: instance_id.to_string(),
                verb: "delete",
                kind: kind.to_string(),
                name: name.to_string(),
                source,
            }),
        }
    }

    async fn delete_all(
        &self,
        instance_id: &str,
        kind: &CustomKind,
        namespace: &str,
    ) -> Result<Vec<StepOutcome>, PipelineError> {
        let rk = ResourceKind::Custom(kind.clone());
        let listed = self
            .guarded(
                instance_id,
                "list",
                &rk,
                namespace,
                self.client.list_custom(kind, namespace),
            )
            .await?;
        let records = match listed {
            Ok(records) => records,
            Err(e) if e.is_not_found() => {
                debug!(instance_id, %rk, namespace, "nothing to list");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(PipelineError::Step {
                    instance_id: instance_id.to_string(),
                    verb: "list",
                    kind: rk.to_string(),
                    name: namespace.to_string(),
                    source,
                });
            }
        };

        let mut outcomes = Vec::with_capacity(records.len());
        for name in records.iter().filter_map(|r| r.name.as_deref()) {
            outcomes.push(
                self.delete(
                    instance_id,
                    &rk,
                    Some(namespace),
                    name,
                    StepPolicy::TolerateNotFound,
                )
                .await?,
            );
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{Fault, MemoryClusterClient, Verb};
    use crate::templates::rbac;

    fn runner(mem: &MemoryClusterClient, timeout: Duration) -> PipelineRunner {
        PipelineRunner::new(Arc::new(mem.clone()), timeout)
    }

    #[tokio::test]
    async fn tolerated_conflict_continues() {
        let mem = MemoryClusterClient::new();
        let ns = "rhpam-t";
        let steps = vec![
            Step::create(DesiredObject::Namespace(rbac::namespace(ns))),
            Step::ensure(DesiredObject::RoleBinding(rbac::install_role_binding(ns))),
            Step::ensure(DesiredObject::RoleBinding(rbac::install_role_binding(ns))),
        ];
        let report = runner(&mem, Duration::from_secs(5))
            .run("t", &steps)
            .await
            .unwrap();
        assert_eq!(report.skipped(), 1);
        assert_eq!(
            report.created_name(&ResourceKind::RoleBinding),
            Some("rhpam-dev-operator:install")
        );
        assert_eq!(report.created_name(&ResourceKind::Deployment), None);
    }

    #[tokio::test]
    async fn fatal_conflict_stops_pipeline() {
        let mem = MemoryClusterClient::new();
        let ns = "rhpam-t";
        let steps = vec![
            Step::create(DesiredObject::Namespace(rbac::namespace(ns))),
            Step::create(DesiredObject::Namespace(rbac::namespace(ns))),
            Step::create(DesiredObject::ServiceAccount(
                rbac::operator_service_account(ns),
            )),
        ];
        let err = runner(&mem, Duration::from_secs(5))
            .run("t", &steps)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(
            mem.get(&ResourceKind::ServiceAccount, Some(ns), "rhpam-dev-operator")
                .await
                .is_none()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_step_times_out() {
        let mem = MemoryClusterClient::new();
        mem.inject_fault(
            Verb::Create,
            ResourceKind::Namespace,
            Fault::Delay(Duration::from_secs(60)),
            1,
        )
        .await;
        let steps = vec![Step::create(DesiredObject::Namespace(rbac::namespace(
            "rhpam-t",
        )))];
        let err = runner(&mem, Duration::from_secs(2))
            .run("t", &steps)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { verb: "create", .. }));
    }

    #[tokio::test]
    async fn concurrent_group_fails_as_a_whole() {
        let mem = MemoryClusterClient::new();
        let ns = "rhpam-t";
        mem.create(&DesiredObject::Namespace(rbac::namespace(ns)))
            .await
            .unwrap();
        mem.inject_fault(
            Verb::Create,
            ResourceKind::RoleBinding,
            Fault::api(403, "Forbidden"),
            1,
        )
        .await;
        let steps = vec![Step::Concurrent(vec![
            Step::ensure(DesiredObject::RoleBinding(rbac::operator_access_binding(
                ns,
                rbac::AccessLevel::View,
            ))),
            Step::ensure(DesiredObject::RoleBinding(rbac::operator_access_binding(
                ns,
                rbac::AccessLevel::Edit,
            ))),
        ])];
        let err = runner(&mem, Duration::from_secs(5))
            .run("t", &steps)
            .await
            .unwrap_err();
        assert!(matches!(
            err.cluster_error(),
            Some(crate::errors::ClusterError::Api { code: 403, .. })
        ));
    }

    #[test]
    fn leaves_flatten_groups() {
        let ns = "rhpam-t";
        let steps = vec![
            Step::create(DesiredObject::Namespace(rbac::namespace(ns))),
            Step::Concurrent(vec![
                Step::remove(ResourceKind::ClusterRole, None, "a"),
                Step::remove(ResourceKind::ClusterRoleBinding, None, "b"),
            ]),
        ];
        assert_eq!(Step::leaves(&steps).len(), 3);
    }
}
