use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::warn;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::entity::user;
use crate::error::AppError;

/// Session claims: the local user id plus an expiry.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i64,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let db = match req.app_data::<web::Data<DatabaseConnection>>() {
            Some(db) => db.clone(),
            None => {
                return Box::pin(async { Err(AppError::system_exception().into()) });
            }
        };
        let config = match req.app_data::<web::Data<AppConfig>>() {
            Some(cfg) => cfg.clone(),
            None => {
                return Box::pin(async { Err(AppError::system_exception().into()) });
            }
        };
        let token = extract_token(req, &config);

        Box::pin(async move {
            let token = token.ok_or_else(AppError::invalid_token)?;
            let auth = authenticate_token(&db, &config, &token).await?;
            Ok(auth)
        })
    }
}

/// Reads the token header, dropping an optional `Bearer ` prefix.
pub fn extract_token(req: &HttpRequest, config: &AppConfig) -> Option<String> {
    req.headers()
        .get(config.token_header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            let v = v.trim();
            v.strip_prefix("Bearer ").unwrap_or(v).trim().to_string()
        })
        .filter(|v| !v.is_empty())
}

async fn authenticate_token(
    db: &DatabaseConnection,
    config: &AppConfig,
    token: &str,
) -> Result<AuthUser, AppError> {
    let claims = decode_token(config, token)?;
    let exists = user::Entity::find_by_id(claims.id).one(db).await?.is_some();
    if !exists {
        warn!("token for unknown user {}", claims.id);
        return Err(AppError::invalid_token());
    }
    Ok(AuthUser { user_id: claims.id })
}

pub fn issue_token(config: &AppConfig, user_id: i64) -> Result<String, AppError> {
    let exp = (Utc::now() + Duration::days(config.token_ttl_days)).timestamp() as usize;
    let claims = Claims { id: user_id, exp: Some(exp) };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|_| AppError::system_exception())
}

/// Tokens without `exp` are accepted; an `exp` in the past is not.
pub fn decode_token(config: &AppConfig, token: &str) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::invalid_token())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            server_port: 0,
            sqlite_path: String::new(),
            database_url: None,
            jwt_secret: "test-secret".to_string(),
            token_header: "Authorization".to_string(),
            token_ttl_days: 1,
            kakao_api_url: String::new(),
            listing_api_url: String::new(),
        }
    }

    #[test]
    fn issued_token_carries_user_id() {
        let cfg = config();
        let token = issue_token(&cfg, 42).unwrap();
        let claims = decode_token(&cfg, &token).unwrap();
        assert_eq!(claims.id, 42);
        assert!(claims.exp.is_some());
    }

    #[test]
    fn token_without_expiry_is_accepted() {
        let cfg = config();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Claims { id: 1, exp: None },
            &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
        )
        .unwrap();
        assert_eq!(decode_token(&cfg, &token).unwrap().id, 1);
    }

    #[test]
    fn expired_token_is_rejected() {
        let cfg = config();
        let exp = (Utc::now() - Duration::days(2)).timestamp() as usize;
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Claims { id: 1, exp: Some(exp) },
            &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
        )
        .unwrap();
        let err = decode_token(&cfg, &token).unwrap_err();
        assert_eq!(err.msg(), "INVALID_TOKEN");
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let cfg = config();
        let mut other = config();
        other.jwt_secret = "other".to_string();
        let token = issue_token(&other, 7).unwrap();
        assert!(decode_token(&cfg, &token).is_err());
    }
}
