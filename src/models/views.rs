//! Response shapes. Each view exposes only the fields one endpoint returns.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::helpers::base64_bytes;
use crate::models::models::{Comment, Post, User};

/// Public-facing user fields: used for authors, commenters, suggestions and
/// follower lists.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub fullname: String,
    #[serde(with = "base64_bytes")]
    pub avatar: Vec<u8>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            fullname: user.fullname.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// Returned by signup, login and profile update.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    #[serde(flatten)]
    pub summary: UserSummary,
    pub bio: Option<String>,
    pub is_public: bool,
}

impl From<&User> for AccountView {
    fn from(user: &User) -> Self {
        Self {
            summary: UserSummary::from(user),
            bio: user.bio.clone(),
            is_public: user.is_public,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct AuthResponse {
    pub user: AccountView,
    pub token: String,
}

/// Trimmed post used by explore and profile grids.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PostThumb {
    pub id: String,
    #[serde(with = "base64_bytes")]
    pub image: Vec<u8>,
    pub likes_count: u64,
    pub comments_count: u64,
}

impl From<&Post> for PostThumb {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id.clone(),
            image: post.image.clone(),
            likes_count: post.likes_count,
            comments_count: post.comments_count,
        }
    }
}

/// Full post joined with its author and the viewer's like/save flags.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FeedPost {
    #[serde(flatten)]
    pub post: Post,
    pub user: UserSummary,
    pub is_liked: bool,
    pub is_saved: bool,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: FeedPost,
    pub is_following: bool,
    pub is_mine: bool,
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub post_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub user: UserSummary,
}

impl CommentView {
    pub fn new(comment: Comment, author: UserSummary) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            text: comment.text,
            created_at: comment.created_at,
            user: author,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct PostWithComments {
    pub post: PostDetail,
    pub comments: Vec<CommentView>,
}

/// Summary of a related user plus whether the viewer follows them.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RelatedUser {
    #[serde(flatten)]
    pub summary: UserSummary,
    pub is_following: bool,
}

/// The viewer's own profile, `GET /user/me`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SelfProfile {
    pub id: String,
    pub email: String,
    pub fullname: String,
    pub username: String,
    pub bio: Option<String>,
    #[serde(with = "base64_bytes")]
    pub avatar: Vec<u8>,
    pub is_public: bool,
    pub post_count: u64,
    pub followers_count: u64,
    pub followers: Vec<UserSummary>,
    pub following_count: u64,
    pub following: Vec<UserSummary>,
    pub is_me: bool,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: SelfProfile,
    pub posts: Vec<Post>,
    pub saved_posts: Vec<Post>,
}

/// Someone else's profile as seen by the viewer, `POST /getuser`.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub fullname: String,
    pub username: String,
    pub bio: Option<String>,
    #[serde(with = "base64_bytes")]
    pub avatar: Vec<u8>,
    pub is_public: bool,
    pub post_count: u64,
    pub posts: Vec<PostThumb>,
    pub saved_posts: Vec<PostThumb>,
    pub followers_count: u64,
    pub followers: Vec<RelatedUser>,
    pub following_count: u64,
    pub following: Vec<RelatedUser>,
    pub is_following: bool,
    pub is_me: bool,
    pub created_at: DateTime<Utc>,
}
