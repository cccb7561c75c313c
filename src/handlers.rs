use spin_sdk::http::{Request, Response};
use tracing::{debug, warn};

use crate::core::db::Db;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::json_response;
use crate::{auth, feed, follow, posts, users};

fn health() -> ApiResult<Response> {
    json_response(
        200,
        &serde_json::json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }),
    )
}

fn route(db: &Db, req: Request) -> ApiResult<Response> {
    let method = req.method().to_string();
    let path = req.path().to_string();

    match (method.as_str(), path.as_str()) {
        ("GET", "/health") => health(),
        ("POST", "/signup") => auth::signup_user(db, req),
        ("POST", "/login") => auth::login_user(db, req),
        ("GET", "/user/me/logout") => auth::logout_user(db, req),
        ("GET", "/user/me/logoutall") => auth::logout_all_sessions(db, req),
        ("GET", "/user/me") => users::get_profile(db, req),
        ("POST", "/user/update") => users::handle_update_profile(db, req),
        ("POST", "/getuser") => users::get_user_details(db, req),
        ("GET", "/getsuggestions") => follow::handle_suggestions(db, req),
        ("POST", "/user/follow") => follow::handle_follow(db, req),
        ("POST", "/user/unfollow") => follow::handle_unfollow(db, req),
        ("GET", "/posts") => feed::handle_explore(db, req),
        ("GET", "/feed") => feed::handle_feed(db, req),
        ("GET", p) if p.starts_with("/getpost/") => feed::handle_get_post(db, req),
        ("POST", "/addpost") => posts::handle_create_post(db, req),
        ("GET", p) if p.starts_with("/post/togglelike/") => posts::handle_toggle_like(db, req),
        ("GET", p) if p.starts_with("/savepost/") => posts::handle_toggle_save(db, req),
        ("POST", "/addcomment") => posts::handle_add_comment(db, req),
        ("DELETE", p) if p.starts_with("/post/delete/") => posts::handle_delete_post(db, req),
        _ => Err(ApiError::NotFound("No route found".to_string())),
    }
}

/// Entry point shared by the Spin component and the native server. Errors
/// are rendered as `{"error": ...}` responses here.
pub fn dispatch(db: &Db, req: Request) -> Response {
    let method = req.method().to_string();
    let path = req.path().to_string();

    match route(db, req) {
        Ok(resp) => {
            debug!(%method, %path, status = *resp.status(), "handled");
            resp
        }
        Err(err) => {
            if err.status() < 500 {
                warn!(%method, %path, status = err.status(), error = %err, "request rejected");
            }
            err.into()
        }
    }
}
