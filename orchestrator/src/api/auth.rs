// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Bearer-token extraction for the Intake API's handlers.

use axum::http::HeaderMap;

use inference_mesh_core::api::{ApiError, ApiResult, AuthService, Role};

/// Extracts and resolves the `Authorization: Bearer <token>` header,
/// requiring at least `required` role.
pub fn require_role(headers: &HeaderMap, auth: &AuthService, required: Role) -> ApiResult<Role> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

    let role = auth
        .resolve(token)
        .ok_or_else(|| ApiError::Unauthorized("unrecognized bearer token".to_string()))?;

    if !AuthService::satisfies(role, required) {
        return Err(ApiError::Forbidden(format!(
            "role {role:?} does not satisfy required role {required:?}"
        )));
    }

    Ok(role)
}
