use chrono::Duration;
use serde::Deserialize;
use spin_sdk::http::{Request, Response};
use tracing::{debug, info};

use crate::config::*;
use crate::core::db::Db;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{
    bearer_token, char_len, hash_password, is_valid_email, json_response, new_id, now, parse_body,
    sanitize_text, verify_password,
};
use crate::core::media::default_avatar;
use crate::models::models::User;
use crate::models::views::{AccountView, AuthResponse};

/// An authenticated request: the caller's user record and the token used.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct SignupRequest {
    pub fullname: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

fn validate_signup(req: &SignupRequest) -> ApiResult<()> {
    let username = req.username.trim();
    let username_len = char_len(username);
    let fullname = sanitize_text(&req.fullname);
    if fullname.is_empty() {
        return Err(ApiError::BadRequest("Full name is required".to_string()));
    }
    if char_len(&fullname) > MAX_FULLNAME_LENGTH {
        return Err(ApiError::BadRequest("Full name too long".to_string()));
    }
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }
    if username_len < MIN_USERNAME_LENGTH || username_len > MAX_USERNAME_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Username must be {}-{} characters",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        )));
    }
    if username.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(ApiError::BadRequest("Username contains invalid characters".to_string()));
    }
    if !is_valid_email(req.email.trim()) {
        return Err(ApiError::BadRequest("A valid email is required".to_string()));
    }
    if char_len(&req.password) < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

pub fn signup(db: &Db, req: SignupRequest) -> ApiResult<AuthResponse> {
    validate_signup(&req)?;

    let mut user = User {
        id: new_id(),
        fullname: sanitize_text(&req.fullname),
        email: req.email.trim().to_lowercase(),
        username: req.username.trim().to_string(),
        password: hash_password(&req.password)?,
        avatar: default_avatar()?,
        bio: None,
        is_public: true,
        followers: Vec::new(),
        followers_count: 0,
        following: Vec::new(),
        following_count: 0,
        posts: Vec::new(),
        post_count: 0,
        saved_posts: Vec::new(),
        tokens: Vec::new(),
        created_at: now(),
    };

    let token = db.write_txn(|batch| {
        // Uniqueness is checked under the write lock so racing signups can't both win.
        if db.find_user_by_username(&user.username)?.is_some() {
            return Err(ApiError::Conflict("Username already taken".to_string()));
        }
        if db.find_user_by_email(&user.email)?.is_some() {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }
        db.stage_new_user(batch, &user)?;
        db.stage_new_token(batch, &mut user)
    })?;

    info!(user_id = %user.id, username = %user.username, "user signed up");
    Ok(AuthResponse {
        user: AccountView::from(&user),
        token,
    })
}

pub fn login(db: &Db, req: LoginRequest) -> ApiResult<AuthResponse> {
    let bad_credentials = || ApiError::Unauthorized("Invalid username or password".to_string());

    let candidate = db
        .find_user_by_username(&req.username)?
        .ok_or_else(bad_credentials)?;
    if !verify_password(&req.password, &candidate.password) {
        return Err(bad_credentials());
    }

    let (user, token) = db.write_txn(|batch| {
        let mut user = db.require_user(&candidate.id)?;
        let token = db.stage_new_token(batch, &mut user)?;
        Ok((user, token))
    })?;

    info!(user_id = %user.id, sessions = user.tokens.len(), "user logged in");
    Ok(AuthResponse {
        user: AccountView::from(&user),
        token,
    })
}

/// Resolves a bearer token to its live session.
pub fn authenticate(db: &Db, token: &str) -> ApiResult<Session> {
    let data = db.token(token)?.ok_or_else(ApiError::unauthorized)?;

    let age = now() - data.created_at;
    if age > Duration::hours(token_expiration_hours()) {
        debug!(user_id = %data.user_id, age_minutes = age.num_minutes(), "rejected expired token");
        return Err(ApiError::unauthorized());
    }

    let user = db.user(&data.user_id)?.ok_or_else(ApiError::unauthorized)?;
    // The user's token list is authoritative: a revoked token may still
    // have a stale index entry.
    if !user.has_token(token) {
        return Err(ApiError::unauthorized());
    }

    Ok(Session {
        user,
        token: token.to_string(),
    })
}

pub fn validate_token(db: &Db, req: &Request) -> ApiResult<Session> {
    let token = bearer_token(req).ok_or_else(ApiError::unauthorized)?;
    authenticate(db, &token)
}

pub fn logout(db: &Db, session: &Session) -> ApiResult<()> {
    db.write_txn(|batch| {
        let mut user = db.require_user(&session.user.id)?;
        user.tokens.retain(|t| t != &session.token);
        batch.put_user(&user)?;
        batch.delete(token_key(&session.token));
        Ok(())
    })?;
    info!(user_id = %session.user.id, "session revoked");
    Ok(())
}

pub fn logout_all(db: &Db, session: &Session) -> ApiResult<()> {
    let revoked = db.write_txn(|batch| {
        let mut user = db.require_user(&session.user.id)?;
        let tokens = std::mem::take(&mut user.tokens);
        for token in &tokens {
            batch.delete(token_key(token));
        }
        batch.put_user(&user)?;
        Ok(tokens.len())
    })?;
    info!(user_id = %session.user.id, revoked, "all sessions revoked");
    Ok(())
}

// === HTTP Handlers ===

pub fn signup_user(db: &Db, req: Request) -> ApiResult<Response> {
    let body: SignupRequest = parse_body(&req)?;
    json_response(201, &signup(db, body)?)
}

pub fn login_user(db: &Db, req: Request) -> ApiResult<Response> {
    let body: LoginRequest = parse_body(&req)?;
    json_response(200, &login(db, body)?)
}

pub fn logout_user(db: &Db, req: Request) -> ApiResult<Response> {
    let session = validate_token(db, &req)?;
    logout(db, &session)?;
    json_response(200, &serde_json::json!({ "success": true }))
}

pub fn logout_all_sessions(db: &Db, req: Request) -> ApiResult<Response> {
    let session = validate_token(db, &req)?;
    logout_all(db, &session)?;
    json_response(200, &serde_json::json!({ "success": true }))
}
