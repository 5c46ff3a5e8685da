use crate::auth::auth::AuthUser;
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;

/// Verifies the bearer token once per request and stores the `AuthUser`
/// in the request extensions for the handlers.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let auth_user = match AuthUser::from_header(header, &config.jwt_secret) {
        Ok(user) => user,
        Err(message) => {
            tracing::debug!(path = req.path(), reason = %message, "Rejected unauthenticated request");
            let resp = HttpResponse::Unauthorized()
                .json(json!({"error": "unauthorized", "message": message}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    tracing::debug!(user = %auth_user.username, role = ?auth_user.role, "Authenticated request");
    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
