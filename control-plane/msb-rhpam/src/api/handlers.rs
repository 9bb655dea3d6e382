use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use msb_models::{
    CatalogResponse, DeprovisionResponse, InstanceQuery, LastOperationQuery,
    LastOperationResponse, ORIGINATING_IDENTITY_HEADER, OperationToken,
    OriginatingIdentity, ProvisionRequest, ProvisionResponse,
};
use msb_observability::HealthCheck;
use tracing::{error, info, warn};

use crate::{errors::ApiError, server::AppState};

pub async fn get_catalog(State(state): State<AppState>) -> Json<CatalogResponse> {
    Json(state.deployer.catalog())
}

fn originating_identity(
    headers: &HeaderMap,
) -> Result<OriginatingIdentity, ApiError> {
    let raw = headers
        .get(ORIGINATING_IDENTITY_HEADER)
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "missing {ORIGINATING_IDENTITY_HEADER} header"
            ))
        })?
        .to_str()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    OriginatingIdentity::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub async fn provision_instance(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(query): Query<InstanceQuery>,
    headers: HeaderMap,
    body: Option<Json<ProvisionRequest>>,
) -> Result<(StatusCode, Json<ProvisionResponse>), ApiError> {
    if query.accepts_incomplete != Some(true) {
        return Err(ApiError::UnprocessableEntity(
            "AsyncRequired",
            "This service plan requires client support for asynchronous service operations."
                .to_string(),
        ));
    }

    if let Some(Json(req)) = body.as_ref() {
        if !req.service_id.is_empty() {
            let catalog = state.deployer.catalog();
            let plan_known = catalog
                .find_service(&req.service_id)
                .map(|svc| req.plan_id.is_empty() || svc.find_plan(&req.plan_id).is_some());
            match plan_known {
                Some(true) => {}
                Some(false) => {
                    return Err(ApiError::BadRequest(format!(
                        "unknown plan '{}'",
                        req.plan_id
                    )));
                }
                None => {
                    return Err(ApiError::BadRequest(format!(
                        "unknown service '{}'",
                        req.service_id
                    )));
                }
            }
        }
    }

    let identity = originating_identity(&headers)?;
    info!(
        "API: Provisioning instance {} for {} via {}",
        instance_id, identity.user.username, identity.platform
    );

    let outcome = state
        .deployer
        .provision(&instance_id, &identity)
        .await
        .map_err(|e| {
            error!("Failed to provision instance {}: {}", instance_id, e);
            ApiError::from(e)
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ProvisionResponse {
            dashboard_url: Some(outcome.dashboard_url),
            operation: Some(outcome.operation),
        }),
    ))
}

pub async fn deprovision_instance(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(query): Query<InstanceQuery>,
) -> Result<(StatusCode, Json<DeprovisionResponse>), ApiError> {
    info!(
        "API: Deprovisioning instance {} (service={:?}, plan={:?})",
        instance_id, query.service_id, query.plan_id
    );

    let operation = state
        .deployer
        .deprovision(&instance_id)
        .await
        .map_err(|e| {
            error!("Failed to deprovision instance {}: {}", instance_id, e);
            ApiError::from(e)
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DeprovisionResponse {
            operation: Some(operation),
        }),
    ))
}

pub async fn get_last_operation(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(query): Query<LastOperationQuery>,
) -> Result<Json<LastOperationResponse>, ApiError> {
    let token = query
        .operation
        .as_deref()
        .filter(|op| !op.is_empty())
        .map(OperationToken::from)
        .ok_or_else(|| {
            ApiError::BadRequest("operation query parameter is required".into())
        })?;

    let status = state
        .deployer
        .last_operation(&instance_id, &token)
        .await
        .map_err(|e| {
            warn!("Last operation for {} ({}) failed: {}", instance_id, token, e);
            ApiError::from(e)
        })?;

    Ok(Json(status))
}

pub async fn health_check() -> Json<HealthCheck> {
    Json(HealthCheck::healthy(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    ))
}
