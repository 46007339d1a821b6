use actix_web::{Error, HttpMessage, dev::ServiceRequest, web};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::utils::error::CustomError;

/// Token lifetime in hours
const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub id: String,
    pub exp: usize,
}

fn jwt_secret(req: &ServiceRequest) -> String {
    match req.app_data::<web::Data<AppConfig>>() {
        Some(config) => config.jwt_secret.clone(),
        None => std::env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string()),
    }
}

/// Verify the bearer JWT and stash its claims in the request extensions
pub async fn verify_token(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let secret = jwt_secret(&req);

    match decode::<Claims>(
        credentials.token(),
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => {
            req.extensions_mut().insert(data.claims);
            Ok(req)
        }
        Err(e) => {
            log::debug!("Rejected bearer token: {}", e);
            let err = CustomError::UnauthorizedError("Not authenticated.".to_string());
            Err((err.into(), req))
        }
    }
}

/// Issue a signed token for `user_id`
pub fn create_token(user_id: &str, secret: &str) -> Result<String, CustomError> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(TOKEN_TTL_HOURS))
        .ok_or_else(|| CustomError::InternalServerError("Invalid token expiry".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        id: user_id.to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| CustomError::InternalServerError("Token generation failed".to_string()))
}

/// Authenticated user id (use after auth middleware)
pub fn get_user_id_from_request(req: &actix_web::HttpRequest) -> Result<ObjectId, CustomError> {
    let user_id = req
        .extensions()
        .get::<Claims>()
        .map(|claims| claims.id.clone())
        .ok_or_else(|| CustomError::UnauthorizedError("Not authenticated.".to_string()))?;

    ObjectId::parse_str(&user_id)
        .map_err(|_| CustomError::BadRequestError("Invalid user id in token".to_string()))
}
