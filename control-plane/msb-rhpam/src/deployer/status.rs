use msb_models::{LastOperationResponse, LastOperationState, OperationToken};
use tracing::debug;

use crate::cluster::{
    ClusterClient, CustomKind, CustomResourceRecord, ResourceKind,
};
use crate::crd::RhpamDev;
use crate::errors::DeployerError;

pub const DEPLOYED: &str = "rhpam deployed successfully";
pub const DEPLOYING: &str = "rhpam is deploying";
pub const DELETED: &str = "rhpam has been deleted";
pub const DELETING: &str = "rhpam is deleting";

/// The `RhpamDev` that stands for the whole instance: the first one listed.
async fn representative(
    client: &dyn ClusterClient,
    namespace: &str,
) -> Result<Option<CustomResourceRecord>, DeployerError> {
    match client
        .list_custom(&CustomKind::of::<RhpamDev>(), namespace)
        .await
    {
        Ok(records) => Ok(records.into_iter().next()),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Map cluster state onto the broker view of an asynchronous operation.
///
/// Read-only: concurrent polls need no coordination.
pub async fn resolve(
    client: &dyn ClusterClient,
    instance_id: &str,
    namespace: &str,
    operation: &OperationToken,
) -> Result<LastOperationResponse, DeployerError> {
    let not_found = || DeployerError::NotFound {
        instance_id: instance_id.to_string(),
    };

    let response = match operation {
        OperationToken::Deploy => {
            let record = representative(client, namespace)
                .await?
                .ok_or_else(not_found)?;
            debug!(instance_id, phase = ?record.phase(), "rhpamdev phase");
            if record.is_complete() {
                LastOperationResponse::new(LastOperationState::Succeeded, DEPLOYED)
            } else {
                LastOperationResponse::new(
                    LastOperationState::InProgress,
                    DEPLOYING,
                )
            }
        }
        OperationToken::Remove => {
            if client
                .exists(&ResourceKind::Namespace, None, namespace)
                .await?
            {
                LastOperationResponse::new(
                    LastOperationState::InProgress,
                    DELETING,
                )
            } else {
                LastOperationResponse::new(LastOperationState::Succeeded, DELETED)
            }
        }
        OperationToken::Unknown(token) => {
            representative(client, namespace)
                .await?
                .ok_or_else(not_found)?;
            LastOperationResponse::new(
                LastOperationState::Failed,
                format!("unknown operation: {token}"),
            )
        }
    };
    Ok(response)
}

/// Status of an instance that cannot have any cluster state.
pub fn resolve_absent(
    instance_id: &str,
    operation: &OperationToken,
) -> Result<LastOperationResponse, DeployerError> {
    match operation {
        OperationToken::Remove => Ok(LastOperationResponse::new(
            LastOperationState::Succeeded,
            DELETED,
        )),
        _ => Err(DeployerError::NotFound {
            instance_id: instance_id.to_string(),
        }),
    }
}
