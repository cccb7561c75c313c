use serde::Deserialize;
use spin_sdk::http::{Request, Response};
use tracing::info;

use crate::auth::validate_token;
use crate::config::*;
use crate::core::db::Db;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{
    char_len, decode_base64_upload, json_response, parse_body, sanitize_text,
};
use crate::core::media::normalize_avatar;
use crate::follow::UsernameRequest;
use crate::models::models::User;
use crate::models::views::{
    AccountView, MeResponse, PostThumb, RelatedUser, SelfProfile, UserProfile, UserSummary,
};

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub fullname: Option<String>,
    pub bio: Option<String>,
    pub is_public: Option<bool>,
    /// Base64 image, optionally as a `data:` URI.
    pub avatar: Option<String>,
}

fn summaries(db: &Db, ids: &[String]) -> ApiResult<Vec<UserSummary>> {
    Ok(db.users(ids)?.iter().map(UserSummary::from).collect())
}

fn related(db: &Db, ids: &[String], viewer: &User) -> ApiResult<Vec<RelatedUser>> {
    Ok(db
        .users(ids)?
        .iter()
        .map(|u| RelatedUser {
            summary: UserSummary::from(u),
            is_following: viewer.is_following(&u.id),
        })
        .collect())
}

pub fn me(db: &Db, viewer_id: &str) -> ApiResult<MeResponse> {
    let user = db.require_user(viewer_id)?;
    let posts = db.posts_newest_first(&user.posts)?;
    let saved_posts = db.posts_newest_first(&user.saved_posts)?;

    Ok(MeResponse {
        user: SelfProfile {
            id: user.id.clone(),
            email: user.email.clone(),
            fullname: user.fullname.clone(),
            username: user.username.clone(),
            bio: user.bio.clone(),
            avatar: user.avatar.clone(),
            is_public: user.is_public,
            post_count: user.post_count,
            followers_count: user.followers_count,
            followers: summaries(db, &user.followers)?,
            following_count: user.following_count,
            following: summaries(db, &user.following)?,
            is_me: true,
        },
        posts,
        saved_posts,
    })
}

pub fn get_user_profile(db: &Db, viewer_id: &str, username: &str) -> ApiResult<UserProfile> {
    let viewer = db.require_user(viewer_id)?;
    let user = db
        .find_user_by_username(username)?
        .ok_or_else(|| ApiError::NotFound("No User Found".to_string()))?;

    let thumbs = |ids: &[String]| -> ApiResult<Vec<PostThumb>> {
        Ok(db.posts_newest_first(ids)?.iter().map(PostThumb::from).collect())
    };

    Ok(UserProfile {
        posts: thumbs(&user.posts)?,
        saved_posts: thumbs(&user.saved_posts)?,
        followers: related(db, &user.followers, &viewer)?,
        following: related(db, &user.following, &viewer)?,
        is_following: user.followers.iter().any(|id| id == &viewer.id),
        is_me: user.id == viewer.id,
        id: user.id,
        fullname: user.fullname,
        username: user.username,
        bio: user.bio,
        avatar: user.avatar,
        is_public: user.is_public,
        post_count: user.post_count,
        followers_count: user.followers_count,
        following_count: user.following_count,
        created_at: user.created_at,
    })
}

pub fn update_profile(db: &Db, viewer_id: &str, req: UpdateProfileRequest) -> ApiResult<AccountView> {
    let fullname = match req.fullname.as_deref().map(sanitize_text) {
        Some(name) if name.is_empty() => {
            return Err(ApiError::BadRequest("Full name can't be empty".to_string()))
        }
        Some(name) if char_len(&name) > MAX_FULLNAME_LENGTH => {
            return Err(ApiError::BadRequest("Full name too long".to_string()))
        }
        other => other,
    };
    let bio = match req.bio.as_deref().map(sanitize_text) {
        Some(bio) if char_len(&bio) > MAX_BIO_LENGTH => {
            return Err(ApiError::BadRequest(format!(
                "Bio too long (max {} chars)",
                MAX_BIO_LENGTH
            )))
        }
        other => other,
    };
    let avatar = match req.avatar.as_deref().map(str::trim) {
        Some(encoded) if !encoded.is_empty() => {
            Some(normalize_avatar(&decode_base64_upload(encoded)?)?)
        }
        _ => None,
    };

    let user = db.write_txn(|batch| {
        let mut user = db.require_user(viewer_id)?;
        if let Some(fullname) = fullname {
            user.fullname = fullname;
        }
        if let Some(bio) = bio {
            user.bio = if bio.is_empty() { None } else { Some(bio) };
        }
        if let Some(is_public) = req.is_public {
            user.is_public = is_public;
        }
        if let Some(avatar) = avatar {
            user.avatar = avatar;
        }
        batch.put_user(&user)?;
        Ok(user)
    })?;

    info!(user_id = %user.id, "profile updated");
    Ok(AccountView::from(&user))
}

// === HTTP Handlers ===

pub fn get_profile(db: &Db, req: Request) -> ApiResult<Response> {
    let session = validate_token(db, &req)?;
    json_response(200, &me(db, &session.user.id)?)
}

pub fn get_user_details(db: &Db, req: Request) -> ApiResult<Response> {
    let session = validate_token(db, &req)?;
    let body: UsernameRequest = parse_body(&req)?;
    if body.username.trim().is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }
    let profile = get_user_profile(db, &session.user.id, &body.username)?;
    json_response(200, &serde_json::json!({ "user": profile }))
}

pub fn handle_update_profile(db: &Db, req: Request) -> ApiResult<Response> {
    let session = validate_token(db, &req)?;
    let body: UpdateProfileRequest = parse_body(&req)?;
    json_response(200, &update_profile(db, &session.user.id, body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AVATAR_SIZE;
    use crate::core::db::test_db;
    use crate::core::media::sample_png;
    use crate::follow::follow_user;
    use crate::posts::{create_post, toggle_save};
    use crate::testutil::{refresh, session_for};
    use base64::{engine::general_purpose::STANDARD, Engine};

    #[test]
    fn me_resolves_lists() {
        let db = test_db();
        let a = session_for(&db, "alice");
        let b = session_for(&db, "bobby");
        follow_user(&db, &a.user.id, "bobby").unwrap();
        follow_user(&db, &b.user.id, "alice").unwrap();
        let mine = create_post(&db, &a.user.id, "mine", &sample_png(4, 4)).unwrap();
        let theirs = create_post(&db, &b.user.id, "theirs", &sample_png(4, 4)).unwrap();
        toggle_save(&db, &a.user.id, &theirs.id).unwrap();

        let resp = me(&db, &a.user.id).unwrap();
        assert!(resp.user.is_me);
        assert_eq!(resp.user.email, "alice@example.com");
        assert_eq!(resp.user.followers[0].username, "bobby");
        assert_eq!(resp.user.following[0].username, "bobby");
        assert_eq!(resp.posts[0].id, mine.id);
        assert_eq!(resp.saved_posts[0].id, theirs.id);
    }

    #[test]
    fn profile_flags_are_relative_to_viewer() {
        let db = test_db();
        let viewer = session_for(&db, "viewer");
        let target = session_for(&db, "target");
        let mutual = session_for(&db, "mutual");
        follow_user(&db, &viewer.user.id, "target").unwrap();
        follow_user(&db, &viewer.user.id, "mutual").unwrap();
        follow_user(&db, &mutual.user.id, "target").unwrap();
        create_post(&db, &target.user.id, "hello", &sample_png(4, 4)).unwrap();

        let profile = get_user_profile(&db, &viewer.user.id, "target").unwrap();
        assert!(profile.is_following);
        assert!(!profile.is_me);
        assert_eq!(profile.posts.len(), 1);
        assert_eq!(profile.followers_count, 2);
        assert!(profile.followers.iter().all(|f| f.is_following || f.summary.username == "viewer"));

        let own = get_user_profile(&db, &target.user.id, "target").unwrap();
        assert!(own.is_me);
        assert!(!own.is_following);

        assert!(matches!(
            get_user_profile(&db, &viewer.user.id, "ghost"),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn update_changes_only_given_fields() {
        let db = test_db();
        let a = session_for(&db, "alice");
        let view = update_profile(
            &db,
            &a.user.id,
            UpdateProfileRequest {
                bio: Some("  <i>photos</i> ".into()),
                is_public: Some(false),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(view.bio.as_deref(), Some("photos"));
        assert!(!view.is_public);
        assert_eq!(view.summary.fullname, "alice Name");

        let stored = refresh(&db, &a).user;
        assert_eq!(stored.avatar, a.user.avatar);
        assert_eq!(stored.tokens, a.user.tokens);
    }

    #[test]
    fn avatar_upload_is_resized() {
        let db = test_db();
        let a = session_for(&db, "alice");
        let encoded = format!("data:image/png;base64,{}", STANDARD.encode(sample_png(30, 90)));
        update_profile(
            &db,
            &a.user.id,
            UpdateProfileRequest {
                avatar: Some(encoded),
                ..Default::default()
            },
        )
        .unwrap();

        let stored = refresh(&db, &a).user;
        let img = image::load_from_memory(&stored.avatar).unwrap();
        assert_eq!((img.width(), img.height()), (AVATAR_SIZE, AVATAR_SIZE));
    }

    #[test]
    fn update_rejects_empty_name() {
        let db = test_db();
        let a = session_for(&db, "alice");
        let result = update_profile(
            &db,
            &a.user.id,
            UpdateProfileRequest {
                fullname: Some("   ".into()),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }
}
