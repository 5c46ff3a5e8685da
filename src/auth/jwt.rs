use crate::models::Claims;
use jsonwebtoken::{DecodingKey, Validation, decode};

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::models::TokenType;

    #[test]
    fn valid_token_yields_claims() {
        let claims = verify_token(&access_token(5, 3, Some(1000)), SECRET).unwrap();
        assert_eq!(claims.user_id, 5);
        assert_eq!(claims.employee_id, Some(1000));
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        assert!(verify_token(&access_token(5, 3, None), "other-secret").is_err());
    }
}
