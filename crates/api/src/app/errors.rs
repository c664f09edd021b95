use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use minimart_infra::{AdjustError, LedgerStoreError};

const STORAGE_FAILURE: &str = "storage failure";

pub fn adjust_error_to_response(err: AdjustError) -> axum::response::Response {
    match err {
        AdjustError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        AdjustError::InsufficientStock {
            requested,
            available,
        } => (
            StatusCode::CONFLICT,
            axum::Json(json!({
                "error": "insufficient_stock",
                "message": "Stock cannot go negative",
                "requested": requested,
                "available": available,
            })),
        )
            .into_response(),
        AdjustError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        AdjustError::Storage(_) | AdjustError::Timeout(_) => {
            tracing::error!(error = %err, "stock adjustment failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", STORAGE_FAILURE)
        }
    }
}

pub fn store_error_to_response(err: LedgerStoreError) -> axum::response::Response {
    match err {
        LedgerStoreError::ProductNotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("product {id} not found"))
        }
        other => {
            tracing::error!(error = %other, "ledger read failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", STORAGE_FAILURE)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn validation_error(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}
