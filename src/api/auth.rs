use super::helper;
use crate::AppState;
use crate::errors::AppError;
use crate::gate::{Actor, Role};
use crate::model::user::{LoginResponse, NewUser, User, UserSummary};
use crate::payloads::auth::{LoginPayload, RegisterPayload};
use crate::response::ApiResponse;
use crate::schema::users::dsl as users_dsl;
use crate::session;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use diesel::prelude::*;
use tracing::log::warn;
use tracing::{debug, info, instrument};

/// Creates a new account.
///
/// Request Body: `RegisterPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `UserSummary`: The created user (201 Created).
/// * `400 Bad Request`: If a field is missing, the email is malformed, the
///   password is too short or the role is not one of the known roles.
/// * `409 Conflict`: If a user already exists with the given email.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<ApiResponse<UserSummary>, AppError> {
    let name = payload.name.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    info!("Attempting to register user with email: {}", email);

    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    if !email.contains('@') || email.len() < 3 {
        return Err(AppError::BadRequest(
            "Please provide a valid email".to_string(),
        ));
    }
    if payload.password.len() < 6 {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    let Some(role) = Role::parse(&payload.role) else {
        return Err(AppError::BadRequest("Invalid role".to_string()));
    };

    let password_hash = session::hash_password(&payload.password)?;

    let new_user = NewUser {
        name,
        email: email.clone(),
        password_hash,
        role: role.as_str().to_string(),
    };

    let insert_result = helper::run_query(&state.pool, move |conn| {
        diesel::insert_into(users_dsl::users)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result::<User>(conn)
    })
    .await;

    match insert_result {
        Ok(user) => {
            info!("Registered user {} with role {}", user.id, user.role);
            Ok(ApiResponse::success(
                StatusCode::CREATED,
                UserSummary::from(user),
            ))
        }
        Err(err) if helper::is_unique_violation(&err) => {
            warn!("Registration rejected, email already in use: {}", email);
            Err(AppError::Conflict(
                "User already exists with this email".to_string(),
            ))
        }
        Err(err) => Err(err),
    }
}

/// Authenticates a user and issues a bearer credential.
///
/// For student accounts a fresh opaque session token is generated and
/// stored on the user row before issuance, superseding every previously
/// issued student credential.
///
/// Request Body: `LoginPayload`
///
/// Returns (wrapped in `ApiResponse`)
/// * `LoginResponse`: Token plus user summary (200 OK).
/// * `401 Unauthorized`: If credentials are invalid or the account is
///   deactivated.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<ApiResponse<LoginResponse>, AppError> {
    let email = payload.email.trim().to_lowercase();
    info!("Login attempt for email: {}", email);

    let lookup_email = email.clone();
    let user: Option<User> = helper::run_query(&state.pool, move |conn| {
        users_dsl::users
            .filter(users_dsl::email.eq(lookup_email))
            .select(User::as_select())
            .first::<User>(conn)
            .optional()
    })
    .await?;

    let Some(user) = user else {
        warn!("Login failed, no account for email: {}", email);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    };

    if !user.is_active {
        warn!("Login rejected for deactivated account {}", user.id);
        return Err(AppError::Unauthorized(
            "Account is deactivated. Please contact admin.".to_string(),
        ));
    }

    if !session::verify_password(&payload.password, &user.password_hash)? {
        warn!("Login failed, bad password for user {}", user.id);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let role = Role::parse(&user.role).ok_or_else(|| {
        AppError::InternalServerError(anyhow::anyhow!(
            "User {} has unknown role '{}'",
            user.id,
            user.role
        ))
    })?;

    // Students get a rotated session token; any previously issued
    // credential for the account stops verifying from here on.
    let session_token = if role == Role::Student {
        let token = session::generate_session_token();
        let user_id = user.id;
        let stored = token.clone();
        helper::run_query(&state.pool, move |conn| {
            diesel::update(users_dsl::users.find(user_id))
                .set(users_dsl::session_token.eq(Some(stored)))
                .execute(conn)
        })
        .await?;
        debug!("Rotated session token for student {}", user_id);
        Some(token)
    } else {
        None
    };

    let token = session::issue_token(user.id, session_token, &state.jwt)?;

    info!("User {} logged in", user.id);
    Ok(ApiResponse::ok(LoginResponse {
        token,
        user: UserSummary::from(user),
    }))
}

/// Ends the current session.
///
/// Clears the stored session token for students, invalidating their
/// outstanding credential. A no-op for other roles, whose credentials
/// simply age out.
///
/// Returns (wrapped in `ApiResponse`)
/// * `()` on success (200 OK).
/// * `401 Unauthorized`: If the credential is missing or invalid.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor))]
pub async fn logout(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<ApiResponse<()>, AppError> {
    if actor.role == Role::Student {
        let user_id = actor.id;
        helper::run_query(&state.pool, move |conn| {
            diesel::update(users_dsl::users.find(user_id))
                .set(users_dsl::session_token.eq(None::<String>))
                .execute(conn)
        })
        .await?;
        info!("Cleared session token for student {}", actor.id);
    }
    Ok(ApiResponse::ok(()))
}

/// Returns the authenticated user's own record.
///
/// Returns (wrapped in `ApiResponse`)
/// * `UserSummary` (200 OK).
/// * `401 Unauthorized`: If the credential is missing or invalid.
/// * `500 Internal Server Error`: If a database error occurs.
#[instrument(skip(state, actor))]
pub async fn me(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<ApiResponse<UserSummary>, AppError> {
    let user_id = actor.id;
    let user = helper::run_query(&state.pool, move |conn| {
        users_dsl::users
            .find(user_id)
            .select(User::as_select())
            .first::<User>(conn)
    })
    .await?;
    Ok(ApiResponse::ok(UserSummary::from(user)))
}
