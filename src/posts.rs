use serde::{Deserialize, Serialize};
use spin_sdk::http::{Request, Response};
use tracing::info;

use crate::auth::validate_token;
use crate::config::*;
use crate::core::db::Db;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{
    char_len, decode_base64_upload, json_response, new_id, now, parse_body, path_id,
    sanitize_text,
};
use crate::core::media::normalize_post_image;
use crate::models::models::{Comment, Post};
use crate::models::views::{CommentView, UserSummary};

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct CreatePostRequest {
    pub caption: String,
    /// Base64 image, optionally as a `data:` URI.
    pub image: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct AddCommentRequest {
    pub id: String,
    pub comment: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub liked: bool,
    pub likes_count: u64,
}

fn validate_caption(caption: &str) -> ApiResult<String> {
    let caption = sanitize_text(caption);
    if caption.is_empty() {
        return Err(ApiError::BadRequest("Caption is required".to_string()));
    }
    if char_len(&caption) > MAX_CAPTION_LENGTH {
        return Err(ApiError::BadRequest("Caption too long".to_string()));
    }
    Ok(caption)
}

pub fn create_post(db: &Db, actor_id: &str, caption: &str, image: &[u8]) -> ApiResult<Post> {
    let caption = validate_caption(caption)?;
    let image = normalize_post_image(image)?;

    let post = db.write_txn(|batch| {
        let mut owner = db.require_user(actor_id)?;
        let post = Post {
            id: new_id(),
            user_id: owner.id.clone(),
            caption,
            image,
            likes: Vec::new(),
            likes_count: 0,
            comments: Vec::new(),
            comments_count: 0,
            created_at: now(),
        };
        owner.add_post(&post.id);
        batch.put_post(&post)?;
        batch.put_user(&owner)?;
        Ok(post)
    })?;

    info!(post_id = %post.id, user_id = %actor_id, bytes = post.image.len(), "post created");
    Ok(post)
}

pub fn toggle_like(db: &Db, actor_id: &str, post_id: &str) -> ApiResult<LikeState> {
    db.write_txn(|batch| {
        let mut post = db.require_post(post_id)?;
        let liked = post.toggle_like(actor_id);
        batch.put_post(&post)?;
        Ok(LikeState {
            liked,
            likes_count: post.likes_count,
        })
    })
}

/// Flips the post in the actor's saved list and returns the new state.
pub fn toggle_save(db: &Db, actor_id: &str, post_id: &str) -> ApiResult<bool> {
    db.write_txn(|batch| {
        let post = db.require_post(post_id)?;
        let mut actor = db.require_user(actor_id)?;
        let saved = actor.toggle_saved(&post.id);
        batch.put_user(&actor)?;
        Ok(saved)
    })
}

/// Comments of a post newest-first, each with its author. Comments whose
/// author no longer resolves are skipped.
pub fn comment_views(db: &Db, post: &Post) -> ApiResult<Vec<CommentView>> {
    let mut views = Vec::new();
    for comment in db.comments_newest_first(post)? {
        if let Some(author) = db.user(&comment.user_id)? {
            views.push(CommentView::new(comment, UserSummary::from(&author)));
        }
    }
    Ok(views)
}

pub fn add_comment(db: &Db, actor_id: &str, post_id: &str, text: &str) -> ApiResult<Vec<CommentView>> {
    let text = sanitize_text(text);
    if text.is_empty() {
        return Err(ApiError::BadRequest("Comment is required".to_string()));
    }
    if char_len(&text) > MAX_COMMENT_LENGTH {
        return Err(ApiError::BadRequest("Comment too long".to_string()));
    }

    let post = db.write_txn(|batch| {
        let mut post = db.require_post(post_id)?;
        let comment = Comment {
            id: new_id(),
            user_id: actor_id.to_string(),
            post_id: post.id.clone(),
            text,
            created_at: now(),
        };
        post.add_comment(&comment.id);
        batch.put_comment(&comment)?;
        batch.put_post(&post)?;
        Ok(post)
    })?;

    comment_views(db, &post)
}

/// Deletes a post owned by the actor, together with its comments and every
/// saved-post reference to it.
pub fn delete_post(db: &Db, actor_id: &str, post_id: &str) -> ApiResult<()> {
    let removed_refs = db.write_txn(|batch| {
        let post = db.require_post(post_id)?;
        if post.user_id != actor_id {
            return Err(ApiError::Forbidden);
        }

        let mut removed_refs = 0;
        for mut user in db.all_users()? {
            let mut changed = false;
            if user.id == post.user_id {
                user.remove_post(&post.id);
                changed = true;
            }
            if user.has_saved(&post.id) {
                user.saved_posts.retain(|id| id != &post.id);
                removed_refs += 1;
                changed = true;
            }
            if changed {
                batch.put_user(&user)?;
            }
        }

        for comment_id in &post.comments {
            batch.delete(comment_key(comment_id));
        }
        batch.delete(post_key(&post.id));
        Ok(removed_refs)
    })?;

    info!(post_id = %post_id, user_id = %actor_id, removed_refs, "post deleted");
    Ok(())
}

// === HTTP Handlers ===

pub fn handle_create_post(db: &Db, req: Request) -> ApiResult<Response> {
    let session = validate_token(db, &req)?;
    let body: CreatePostRequest = parse_body(&req)?;
    if body.image.trim().is_empty() {
        return Err(ApiError::BadRequest("Image is required".to_string()));
    }
    let image = decode_base64_upload(&body.image)?;
    let post = create_post(db, &session.user.id, &body.caption, &image)?;
    json_response(201, &serde_json::json!({ "post": post }))
}

pub fn handle_toggle_like(db: &Db, req: Request) -> ApiResult<Response> {
    let session = validate_token(db, &req)?;
    let post_id = path_id(req.path())?;
    let state = toggle_like(db, &session.user.id, &post_id)?;
    json_response(
        200,
        &serde_json::json!({
            "success": true,
            "liked": state.liked,
            "likesCount": state.likes_count,
        }),
    )
}

pub fn handle_toggle_save(db: &Db, req: Request) -> ApiResult<Response> {
    let session = validate_token(db, &req)?;
    let post_id = path_id(req.path())?;
    let saved = toggle_save(db, &session.user.id, &post_id)?;
    json_response(200, &serde_json::json!({ "success": true, "saved": saved }))
}

pub fn handle_add_comment(db: &Db, req: Request) -> ApiResult<Response> {
    let session = validate_token(db, &req)?;
    let body: AddCommentRequest = parse_body(&req)?;
    if body.id.trim().is_empty() {
        return Err(ApiError::BadRequest("Post ID required".to_string()));
    }
    let comments = add_comment(db, &session.user.id, body.id.trim(), &body.comment)?;
    json_response(200, &serde_json::json!({ "comment": comments }))
}

pub fn handle_delete_post(db: &Db, req: Request) -> ApiResult<Response> {
    let session = validate_token(db, &req)?;
    let post_id = path_id(req.path())?;
    delete_post(db, &session.user.id, &post_id)?;
    json_response(200, &serde_json::json!({ "status": true }))
}
