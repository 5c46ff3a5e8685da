use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::{
    model::role::Role,
    models::{Claims, TokenType},
};
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, HttpResponse, dev::Payload, error::InternalError,
    http::StatusCode, web::Data,
};
use futures::future::{Ready, ready};
use serde_json::json;

/// JSON error in the same shape as service errors.
pub fn auth_error(status: StatusCode, kind: &str, message: &str) -> actix_web::Error {
    let body = json!({ "error": kind, "message": message });
    InternalError::from_response(message.to_string(), HttpResponse::build(status).json(body)).into()
}

fn unauthorized(message: &str) -> actix_web::Error {
    auth_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

fn forbidden(message: &str) -> actix_web::Error {
    auth_error(StatusCode::FORBIDDEN, "forbidden", message)
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to a staff record
    pub person_id: Option<u64>,
}

impl AuthUser {
    pub fn from_claims(claims: Claims) -> Result<Self, &'static str> {
        if claims.token_type != TokenType::Access {
            return Err("Refresh tokens cannot be used for API calls");
        }
        let role = Role::from_id(claims.role).ok_or("Invalid role")?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            person_id: claims.employee_id,
        })
    }

    /// Parses `Authorization: Bearer <token>` and verifies it.
    pub fn from_header(header: Option<&str>, secret: &str) -> Result<Self, String> {
        let header = header.ok_or("Missing Authorization header")?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or("Authorization header must start with Bearer")?;
        let claims =
            verify_token(token, secret).map_err(|e| format!("Invalid or expired token: {e}"))?;
        Self::from_claims(claims).map_err(str::to_string)
    }

    /// Staff id the attendance records belong to.
    pub fn person_id(&self) -> actix_web::Result<u64> {
        self.person_id
            .ok_or_else(|| forbidden("No staff profile linked to this account"))
    }

    pub fn is_reviewer(&self) -> bool {
        self.role.can_review()
    }

    pub fn require_reviewer(&self) -> actix_web::Result<()> {
        if self.is_reviewer() {
            Ok(())
        } else {
            Err(forbidden("HR/Admin only"))
        }
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // already verified by the middleware
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        ready(AuthUser::from_header(header, &config.jwt_secret).map_err(|e| unauthorized(&e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::testing::{SECRET, access_token, token};

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[test]
    fn staff_token_carries_person_id() {
        let header = bearer(&access_token(9, 3, Some(1000)));
        let user = AuthUser::from_header(Some(&header), SECRET).unwrap();

        assert_eq!(user.role, Role::Staff);
        assert_eq!(user.person_id, Some(1000));
        assert!(!user.is_reviewer());
    }

    #[test]
    fn hr_and_admin_can_review() {
        for role in [1, 2] {
            let header = bearer(&access_token(1, role, None));
            let user = AuthUser::from_header(Some(&header), SECRET).unwrap();
            assert!(user.require_reviewer().is_ok());
            assert!(user.person_id().is_err());
        }
    }

    #[test]
    fn refresh_tokens_are_refused() {
        let header = bearer(&token(9, 3, Some(1000), TokenType::Refresh));
        let err = AuthUser::from_header(Some(&header), SECRET).unwrap_err();
        assert!(err.contains("Refresh"));
    }

    #[test]
    fn malformed_headers_are_refused() {
        assert!(AuthUser::from_header(None, SECRET).is_err());
        assert!(AuthUser::from_header(Some("Token abc"), SECRET).is_err());
        assert!(AuthUser::from_header(Some("Bearer not-a-jwt"), SECRET).is_err());
        let unknown_role = bearer(&access_token(9, 42, Some(1)));
        assert_eq!(
            AuthUser::from_header(Some(&unknown_role), SECRET).unwrap_err(),
            "Invalid role"
        );
    }
}
