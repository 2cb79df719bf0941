use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::common::{MarketError, Principal};
use crate::domains::auth::JwtService;
use crate::server::error::ApiError;

/// JWT authentication middleware
///
/// Extracts the bearer token from the Authorization header, verifies it, and
/// adds the `Principal` to request extensions. Requests without a valid token
/// continue unauthenticated; routes that need a caller use [`AuthPrincipal`].
pub async fn jwt_auth_middleware(
    jwt_service: Arc<JwtService>,
    mut request: Request,
    next: Next,
) -> Response {
    match extract_principal(&request, &jwt_service) {
        Some(principal) => {
            debug!(account_id = %principal.account_id, role = %principal.role, "Authenticated request");
            request.extensions_mut().insert(principal);
        }
        None => debug!("No valid authentication token"),
    }

    next.run(request).await
}

/// Extract and verify the token from a request
fn extract_principal(request: &Request, jwt_service: &JwtService) -> Option<Principal> {
    let auth_header = request.headers().get("authorization")?;
    let auth_str = auth_header.to_str().ok()?;

    // Handle both "Bearer <token>" and a raw token
    let token = auth_str.strip_prefix("Bearer ").unwrap_or(auth_str);

    let claims = jwt_service.verify_token(token).ok()?;
    Some(claims.principal())
}

/// Extractor for routes that require an authenticated caller
#[derive(Debug, Clone, Copy)]
pub struct AuthPrincipal(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .map(AuthPrincipal)
            .ok_or(ApiError(MarketError::Unauthenticated))
    }
}
