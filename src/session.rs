//! Bearer credential issuance and verification.
//!
//! Credentials are HS256 JWTs. Student logins additionally rotate an
//! opaque per-account session token that is embedded in the claims at
//! issuance time; verification compares it against the token currently
//! stored on the user row, which is what enforces the one-active-session
//! rule for students. Other roles carry no session token and can hold any
//! number of valid credentials.

use crate::errors::AppError;
use crate::gate::{Actor, Role};
use crate::model::user::User;
use crate::schema::{course_assignments::dsl as ca_dsl, users::dsl as users_dsl};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::password_hash::rand_core::OsRng;
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use diesel::prelude::*;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_hours: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    /// Opaque session token, present only on student credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("Failed to hash password: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        AppError::InternalServerError(anyhow::anyhow!("Invalid password hash format: {e}"))
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// A fresh opaque session token. Rotated on every student login.
pub fn generate_session_token() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn issue_token(
    user_id: i64,
    session_token: Option<String>,
    config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        session_token,
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(config.expiry_hours)).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("Failed to sign token: {e}")))
}

pub fn decode_token(token: &str, config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!("Token decode failed: {e}");
        AppError::Unauthorized("Not authorized to access this route".to_string())
    })
}

/// Enforces the single-active-session rule for students: the token
/// embedded at issuance must equal the token currently stored on the user
/// row. Non-student roles always pass.
pub fn check_session(role: Role, claims: &Claims, stored: Option<&str>) -> Result<(), AppError> {
    if role != Role::Student {
        return Ok(());
    }
    match (claims.session_token.as_deref(), stored) {
        (Some(embedded), Some(current)) if embedded == current => Ok(()),
        _ => Err(AppError::SessionSuperseded(
            "Session expired. You have been logged in from another device.".to_string(),
        )),
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Not authorized to access this route".to_string()))
}

impl FromRequestParts<crate::AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &crate::AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = decode_token(token, &state.jwt)?;

        let user_id = claims.sub;
        let user: Option<User> = crate::api::helper::run_query(&state.pool, move |conn| {
            users_dsl::users
                .find(user_id)
                .select(User::as_select())
                .first::<User>(conn)
                .optional()
        })
        .await?;

        let Some(user) = user else {
            warn!("Credential references missing user id {user_id}");
            return Err(AppError::Unauthorized("User not found".to_string()));
        };

        if !user.is_active {
            return Err(AppError::Unauthorized(
                "User account is deactivated".to_string(),
            ));
        }

        let role = Role::parse(&user.role).ok_or_else(|| {
            AppError::InternalServerError(anyhow::anyhow!(
                "User {} has unknown role '{}'",
                user.id,
                user.role
            ))
        })?;

        check_session(role, &claims, user.session_token.as_deref())?;

        let assigned_courses = if role.is_instructor() {
            crate::api::helper::run_query(&state.pool, move |conn| {
                ca_dsl::course_assignments
                    .filter(ca_dsl::user_id.eq(user_id))
                    .select(ca_dsl::course_id)
                    .load::<i64>(conn)
            })
            .await?
        } else {
            Vec::new()
        };

        Ok(Actor {
            id: user.id,
            role,
            assigned_courses,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            expiry_hours: 24,
        }
    }

    #[test]
    fn token_round_trips() {
        let cfg = config();
        let token = issue_token(42, Some("abc".to_string()), &cfg).unwrap();
        let claims = decode_token(&token, &cfg).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.session_token.as_deref(), Some("abc"));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(42, None, &config()).unwrap();
        let other = JwtConfig {
            secret: "different".to_string(),
            expiry_hours: 24,
        };
        assert!(matches!(
            decode_token(&token, &other),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn student_session_must_match_stored_token() {
        let cfg = config();
        let first = issue_token(1, Some("token-a".to_string()), &cfg).unwrap();
        let second = issue_token(1, Some("token-b".to_string()), &cfg).unwrap();

        // After the second login, "token-b" is the stored value: the first
        // credential is superseded, the second verifies.
        let first_claims = decode_token(&first, &cfg).unwrap();
        assert!(matches!(
            check_session(Role::Student, &first_claims, Some("token-b")),
            Err(AppError::SessionSuperseded(_))
        ));

        let second_claims = decode_token(&second, &cfg).unwrap();
        assert!(check_session(Role::Student, &second_claims, Some("token-b")).is_ok());
    }

    #[test]
    fn logged_out_student_is_superseded() {
        let cfg = config();
        let claims = decode_token(
            &issue_token(1, Some("token-a".to_string()), &cfg).unwrap(),
            &cfg,
        )
        .unwrap();
        assert!(matches!(
            check_session(Role::Student, &claims, None),
            Err(AppError::SessionSuperseded(_))
        ));
    }

    #[test]
    fn non_student_roles_skip_the_session_check() {
        let cfg = config();
        let claims = decode_token(&issue_token(1, None, &cfg).unwrap(), &cfg).unwrap();
        for role in [Role::Admin, Role::SuperInstructor, Role::Instructor] {
            assert!(check_session(role, &claims, None).is_ok());
        }
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct-horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct-horse", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn session_tokens_are_unique() {
        assert_ne!(generate_session_token(), generate_session_token());
    }
}
