//! Role gates and ownership checks for mutating routes.

use serde_json::Value;
use tracing::warn;

use super::Principal;
use crate::database::schema::Document;
use crate::error::ApiError;
use crate::types::Role;

pub const OWNER_FIELD: &str = "user";

/// Owners may change their own documents; admins may change anything.
pub fn can_modify(principal: &Principal, owner: Option<&str>) -> bool {
    principal.is_admin() || owner == Some(principal.id.as_str())
}

/// Gate on the owner reference stored in `doc`.
pub fn ensure_owner(principal: &Principal, doc: &Document, action: &str) -> Result<(), ApiError> {
    let owner = doc.get(OWNER_FIELD).and_then(Value::as_str);
    if can_modify(principal, owner) {
        return Ok(());
    }
    warn!(user = %principal.id, ?owner, action, "Ownership check denied");
    Err(ApiError::forbidden(format!(
        "User {} is not authorized to {}",
        principal.id, action
    )))
}

pub fn ensure_role(principal: &Principal, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&principal.role) {
        return Ok(());
    }
    warn!(user = %principal.id, role = %principal.role, "Role check denied");
    Err(ApiError::forbidden(format!(
        "User role {} is not authorized to access this route",
        principal.role
    )))
}
