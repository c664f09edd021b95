//! API-side authorization guard.
//!
//! Handlers call `require_permission` before touching the ledger. A denial is
//! answered with 403 and recorded as a `FORBIDDEN_ACCESS` audit entry; the
//! audit write is best effort.

use axum::http::StatusCode;
use axum::response::Response;

use minimart_auth::{Permission, authorize};
use minimart_infra::AuditEntry;

use crate::app::AppServices;
use crate::app::errors::json_error;
use crate::context::PrincipalContext;

pub async fn require_permission(
    services: &AppServices,
    principal: &PrincipalContext,
    path: &str,
    permission: &Permission,
) -> Result<(), Response> {
    let Err(e) = authorize(principal.principal(), permission) else {
        return Ok(());
    };

    tracing::warn!(
        user_id = %principal.user_id(),
        role = %principal.role(),
        path,
        "FORBIDDEN_ACCESS"
    );

    let entry = AuditEntry::forbidden_access(
        Some(principal.user_id()),
        path,
        principal.role().as_str(),
    );
    if let Err(audit_err) = services.record_audit(entry).await {
        tracing::warn!(error = %audit_err, "failed to record FORBIDDEN_ACCESS audit entry");
    }

    Err(json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
}
