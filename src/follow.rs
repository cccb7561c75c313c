use rand::seq::SliceRandom;
use serde::Deserialize;
use spin_sdk::http::{Request, Response};
use tracing::info;

use crate::auth::validate_token;
use crate::config::SUGGESTION_SAMPLE_SIZE;
use crate::core::db::Db;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{json_response, parse_body};
use crate::models::views::UserSummary;

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct UsernameRequest {
    pub username: String,
}

/// Adds the edge actor → target on both records. Following someone twice
/// leaves a single edge.
pub fn follow_user(db: &Db, actor_id: &str, target_username: &str) -> ApiResult<()> {
    db.write_txn(|batch| {
        let mut target = db
            .find_user_by_username(target_username)?
            .ok_or_else(|| ApiError::NotFound("No user exists".to_string()))?;
        if target.id == actor_id {
            return Err(ApiError::InvalidOperation("You can't follow yourself".to_string()));
        }
        let mut actor = db.require_user(actor_id)?;

        let added = actor.add_following(&target.id);
        target.add_follower(&actor.id);
        if added {
            info!(follower = %actor.id, followee = %target.id, "follow");
        }

        batch.put_user(&actor)?;
        batch.put_user(&target)
    })
}

pub fn unfollow_user(db: &Db, actor_id: &str, target_username: &str) -> ApiResult<()> {
    db.write_txn(|batch| {
        let mut target = db
            .find_user_by_username(target_username)?
            .ok_or_else(|| ApiError::NotFound("No user exists".to_string()))?;
        if target.id == actor_id {
            return Err(ApiError::InvalidOperation("You can't unfollow yourself".to_string()));
        }
        let mut actor = db.require_user(actor_id)?;

        actor.remove_following(&target.id);
        target.remove_follower(&actor.id);
        info!(follower = %actor.id, followee = %target.id, "unfollow");

        batch.put_user(&actor)?;
        batch.put_user(&target)
    })
}

/// Random sample of people the viewer doesn't follow yet. The pool is
/// filtered before sampling, so a full sample is returned whenever enough
/// candidates exist.
pub fn get_suggestions(db: &Db, viewer_id: &str) -> ApiResult<Vec<UserSummary>> {
    let viewer = db.require_user(viewer_id)?;
    let candidates: Vec<_> = db
        .all_users()?
        .into_iter()
        .filter(|u| u.id != viewer.id && !viewer.is_following(&u.id))
        .collect();

    let mut rng = rand::thread_rng();
    Ok(candidates
        .choose_multiple(&mut rng, SUGGESTION_SAMPLE_SIZE)
        .map(UserSummary::from)
        .collect())
}

// === HTTP Handlers ===

fn target_username(req: &Request) -> ApiResult<String> {
    let body: UsernameRequest = parse_body(req)?;
    let username = body.username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }
    Ok(username)
}

pub fn handle_follow(db: &Db, req: Request) -> ApiResult<Response> {
    let session = validate_token(db, &req)?;
    follow_user(db, &session.user.id, &target_username(&req)?)?;
    json_response(200, &serde_json::json!({ "success": true }))
}

pub fn handle_unfollow(db: &Db, req: Request) -> ApiResult<Response> {
    let session = validate_token(db, &req)?;
    unfollow_user(db, &session.user.id, &target_username(&req)?)?;
    json_response(200, &serde_json::json!({ "success": true }))
}

pub fn handle_suggestions(db: &Db, req: Request) -> ApiResult<Response> {
    let session = validate_token(db, &req)?;
    let suggestions = get_suggestions(db, &session.user.id)?;
    json_response(200, &serde_json::json!({ "suggestions": suggestions }))
}
