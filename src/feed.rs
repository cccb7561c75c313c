//! Explore grid, following feed and the single-post view.

use std::collections::{HashMap, HashSet};

use spin_sdk::http::{Request, Response};
use tracing::debug;

use crate::auth::validate_token;
use crate::core::db::Db;
use crate::core::errors::ApiResult;
use crate::core::helpers::{json_response, path_id};
use crate::models::models::{Post, User};
use crate::models::views::{FeedPost, PostDetail, PostThumb, PostWithComments, UserSummary};
use crate::posts::comment_views;

/// Union of the users' post ids, first occurrence wins.
fn post_pool(users: &[User]) -> Vec<String> {
    let mut seen = HashSet::new();
    users
        .iter()
        .flat_map(|u| u.posts.iter())
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

fn annotate(post: Post, author: UserSummary, viewer: &User) -> FeedPost {
    FeedPost {
        is_liked: post.is_liked_by(&viewer.id),
        is_saved: viewer.has_saved(&post.id),
        user: author,
        post,
    }
}

/// Posts of every public user except the viewer, newest-first, trimmed.
pub fn explore(db: &Db, viewer_id: &str) -> ApiResult<Vec<PostThumb>> {
    let authors: Vec<User> = db
        .all_users()?
        .into_iter()
        .filter(|u| u.is_public && u.id != viewer_id)
        .collect();

    let posts = db.posts_newest_first(&post_pool(&authors))?;
    debug!(viewer = %viewer_id, authors = authors.len(), posts = posts.len(), "explore assembled");
    Ok(posts.iter().map(PostThumb::from).collect())
}

/// Posts of the viewer and everyone they follow, newest-first, with
/// per-viewer like/save flags.
pub fn feed(db: &Db, viewer_id: &str) -> ApiResult<Vec<FeedPost>> {
    let viewer = db.require_user(viewer_id)?;
    let mut ids = viewer.following.clone();
    ids.push(viewer.id.clone());
    let authors = db.users(&ids)?;

    let summaries: HashMap<String, UserSummary> = authors
        .iter()
        .map(|u| (u.id.clone(), UserSummary::from(u)))
        .collect();

    let posts = db.posts_newest_first(&post_pool(&authors))?;
    debug!(viewer = %viewer_id, authors = authors.len(), posts = posts.len(), "feed assembled");
    Ok(posts
        .into_iter()
        .filter_map(|post| {
            let author = summaries.get(&post.user_id)?.clone();
            Some(annotate(post, author, &viewer))
        })
        .collect())
}

pub fn get_post(db: &Db, viewer_id: &str, post_id: &str) -> ApiResult<PostWithComments> {
    let viewer = db.require_user(viewer_id)?;
    let post = db.require_post(post_id)?;
    let author = db.require_user(&post.user_id)?;
    let comments = comment_views(db, &post)?;

    let detail = PostDetail {
        is_following: viewer.is_following(&author.id),
        is_mine: author.id == viewer.id,
        post: annotate(post, UserSummary::from(&author), &viewer),
    };
    Ok(PostWithComments {
        post: detail,
        comments,
    })
}

// === HTTP Handlers ===

pub fn handle_explore(db: &Db, req: Request) -> ApiResult<Response> {
    let session = validate_token(db, &req)?;
    let posts = explore(db, &session.user.id)?;
    json_response(200, &serde_json::json!({ "posts": posts }))
}

pub fn handle_feed(db: &Db, req: Request) -> ApiResult<Response> {
    let session = validate_token(db, &req)?;
    let posts = feed(db, &session.user.id)?;
    json_response(200, &serde_json::json!({ "posts": posts }))
}

pub fn handle_get_post(db: &Db, req: Request) -> ApiResult<Response> {
    let session = validate_token(db, &req)?;
    let post_id = path_id(req.path())?;
    json_response(200, &get_post(db, &session.user.id, &post_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::test_db;
    use crate::core::errors::ApiError;
    use crate::core::helpers::new_id;
    use crate::core::media::sample_png;
    use crate::follow::follow_user;
    use crate::posts::{add_comment, create_post, toggle_like, toggle_save};
    use crate::testutil::session_for;

    fn make_private(db: &Db, user_id: &str) {
        db.write_txn(|batch| {
            let mut user = db.require_user(user_id)?;
            user.is_public = false;
            batch.put_user(&user)
        })
        .unwrap();
    }

    #[test]
    fn explore_skips_private_users_and_viewer() {
        let db = test_db();
        let viewer = session_for(&db, "viewer");
        let public = session_for(&db, "public");
        let hidden = session_for(&db, "hidden");
        make_private(&db, &hidden.user.id);

        let own = create_post(&db, &viewer.user.id, "mine", &sample_png(4, 4)).unwrap();
        let p1 = create_post(&db, &public.user.id, "one", &sample_png(4, 4)).unwrap();
        let p2 = create_post(&db, &public.user.id, "two", &sample_png(4, 4)).unwrap();
        let secret = create_post(&db, &hidden.user.id, "secret", &sample_png(4, 4)).unwrap();

        let ids: Vec<_> = explore(&db, &viewer.user.id)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![p2.id, p1.id]);
        assert!(!ids.contains(&own.id));
        assert!(!ids.contains(&secret.id));
    }

    #[test]
    fn feed_is_viewer_plus_following() {
        let db = test_db();
        let viewer = session_for(&db, "viewer");
        let followed = session_for(&db, "followed");
        let stranger = session_for(&db, "stranger");
        follow_user(&db, &viewer.user.id, "followed").unwrap();

        let own = create_post(&db, &viewer.user.id, "mine", &sample_png(4, 4)).unwrap();
        let theirs = create_post(&db, &followed.user.id, "theirs", &sample_png(4, 4)).unwrap();
        create_post(&db, &stranger.user.id, "nope", &sample_png(4, 4)).unwrap();

        let posts = feed(&db, &viewer.user.id).unwrap();
        let ids: Vec<_> = posts.iter().map(|p| p.post.id.clone()).collect();
        assert_eq!(ids, vec![theirs.id, own.id]);
        assert_eq!(posts[0].user.username, "followed");
    }

    #[test]
    fn feed_flags_match_direct_lookups() {
        let db = test_db();
        let viewer = session_for(&db, "viewer");
        let followed = session_for(&db, "followed");
        follow_user(&db, &viewer.user.id, "followed").unwrap();
        let liked = create_post(&db, &followed.user.id, "liked", &sample_png(4, 4)).unwrap();
        let saved = create_post(&db, &followed.user.id, "saved", &sample_png(4, 4)).unwrap();
        toggle_like(&db, &viewer.user.id, &liked.id).unwrap();
        toggle_save(&db, &viewer.user.id, &saved.id).unwrap();

        let viewer_now = db.require_user(&viewer.user.id).unwrap();
        for item in feed(&db, &viewer.user.id).unwrap() {
            let stored = db.require_post(&item.post.id).unwrap();
            assert_eq!(item.is_liked, stored.is_liked_by(&viewer_now.id));
            assert_eq!(item.is_saved, viewer_now.has_saved(&stored.id));
        }
    }

    #[test]
    fn get_post_annotates_and_joins_comments() {
        let db = test_db();
        let viewer = session_for(&db, "viewer");
        let author = session_for(&db, "author");
        follow_user(&db, &viewer.user.id, "author").unwrap();
        let post = create_post(&db, &author.user.id, "look", &sample_png(6, 3)).unwrap();
        add_comment(&db, &viewer.user.id, &post.id, "wow").unwrap();
        toggle_like(&db, &viewer.user.id, &post.id).unwrap();

        let view = get_post(&db, &viewer.user.id, &post.id).unwrap();
        assert!(view.post.is_following);
        assert!(!view.post.is_mine);
        assert!(view.post.post.is_liked);
        assert!(!view.post.post.is_saved);
        assert_eq!(view.post.post.post.caption, "look");
        assert_eq!(view.post.post.post.image, post.image);
        assert_eq!(view.comments.len(), 1);
        assert_eq!(view.comments[0].user.username, "viewer");

        let own = get_post(&db, &author.user.id, &post.id).unwrap();
        assert!(own.post.is_mine);
        assert!(!own.post.is_following);

        assert!(matches!(
            get_post(&db, &viewer.user.id, &new_id()),
            Err(ApiError::NotFound(_))
        ));
    }
}
