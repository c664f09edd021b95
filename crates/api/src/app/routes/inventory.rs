use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, OriginalUri, Query, rejection::{JsonRejection, QueryRejection}},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use minimart_auth::permissions::{INVENTORY_ADJUST, INVENTORY_READ};

use crate::app::{AppServices, dto, errors};
use crate::authz::require_permission;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_inventory))
        .route("/low-stock", get(list_low_stock))
        .route("/movements", get(list_movements))
        .route("/adjust", post(adjust_stock))
}

/// Every live product with its current stock, ordered by name.
pub async fn list_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    if let Err(denied) = require_permission(&services, &principal, uri.path(), &INVENTORY_READ).await {
        return denied;
    }

    match services.list_with_stock().await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_low_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    if let Err(denied) = require_permission(&services, &principal, uri.path(), &INVENTORY_READ).await {
        return denied;
    }

    match services.list_low_stock().await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Movement history, newest first. `limit`/`offset` are optional.
pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    OriginalUri(uri): OriginalUri,
    query: Result<Query<dto::MovementsQuery>, QueryRejection>,
) -> Response {
    if let Err(denied) = require_permission(&services, &principal, uri.path(), &INVENTORY_READ).await {
        return denied;
    }

    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return errors::validation_error(e.body_text()),
    };

    match services.list_movements(query.into()).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<dto::AdjustStockRequest>, JsonRejection>,
) -> Response {
    if let Err(denied) = require_permission(&services, &principal, uri.path(), &INVENTORY_ADJUST).await {
        return denied;
    }

    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::validation_error(e.body_text()),
    };

    let raw = match body.into_raw() {
        Ok(raw) => raw,
        Err(msg) => return errors::validation_error(msg),
    };

    match services.adjust(raw, Some(principal.user_id())).await {
        Ok(outcome) => Json(json!({
            "success": true,
            "movement": outcome.movement,
            "before": outcome.before,
            "after": outcome.after,
        }))
        .into_response(),
        Err(e) => errors::adjust_error_to_response(e),
    }
}
