use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::helpers::base64_bytes;

/// Full user document as stored. Never serialized to clients directly:
/// it carries the password hash and live session tokens.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub fullname: String,
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(with = "base64_bytes")]
    pub avatar: Vec<u8>,
    pub bio: Option<String>,
    pub is_public: bool,
    pub followers: Vec<String>,
    pub followers_count: u64,
    pub following: Vec<String>,
    pub following_count: u64,
    pub posts: Vec<String>,
    pub post_count: u64,
    pub saved_posts: Vec<String>,
    pub tokens: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_following(&self, user_id: &str) -> bool {
        self.following.iter().any(|id| id == user_id)
    }

    pub fn has_saved(&self, post_id: &str) -> bool {
        self.saved_posts.iter().any(|id| id == post_id)
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Returns false when the edge already existed.
    pub fn add_following(&mut self, user_id: &str) -> bool {
        let added = push_unique(&mut self.following, user_id);
        self.following_count = self.following.len() as u64;
        added
    }

    pub fn remove_following(&mut self, user_id: &str) {
        self.following.retain(|id| id != user_id);
        self.following_count = self.following.len() as u64;
    }

    pub fn add_follower(&mut self, user_id: &str) -> bool {
        let added = push_unique(&mut self.followers, user_id);
        self.followers_count = self.followers.len() as u64;
        added
    }

    pub fn remove_follower(&mut self, user_id: &str) {
        self.followers.retain(|id| id != user_id);
        self.followers_count = self.followers.len() as u64;
    }

    pub fn add_post(&mut self, post_id: &str) {
        push_unique(&mut self.posts, post_id);
        self.post_count = self.posts.len() as u64;
    }

    pub fn remove_post(&mut self, post_id: &str) {
        self.posts.retain(|id| id != post_id);
        self.post_count = self.posts.len() as u64;
    }

    /// Flips the saved state of a post and returns the new state.
    pub fn toggle_saved(&mut self, post_id: &str) -> bool {
        if self.has_saved(post_id) {
            self.saved_posts.retain(|id| id != post_id);
            false
        } else {
            self.saved_posts.push(post_id.to_string());
            true
        }
    }

    pub fn counters_consistent(&self) -> bool {
        self.followers_count == self.followers.len() as u64
            && self.following_count == self.following.len() as u64
            && self.post_count == self.posts.len() as u64
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub caption: String,
    #[serde(with = "base64_bytes")]
    pub image: Vec<u8>,
    pub likes: Vec<String>,
    pub likes_count: u64,
    pub comments: Vec<String>,
    pub comments_count: u64,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|id| id == user_id)
    }

    /// Flips the like of `user_id` and returns the new state.
    pub fn toggle_like(&mut self, user_id: &str) -> bool {
        let liked = if self.is_liked_by(user_id) {
            self.likes.retain(|id| id != user_id);
            false
        } else {
            self.likes.push(user_id.to_string());
            true
        };
        self.likes_count = self.likes.len() as u64;
        liked
    }

    pub fn add_comment(&mut self, comment_id: &str) {
        push_unique(&mut self.comments, comment_id);
        self.comments_count = self.comments.len() as u64;
    }

    pub fn counters_consistent(&self) -> bool {
        self.likes_count == self.likes.len() as u64
            && self.comments_count == self.comments.len() as u64
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub user_id: String,
    pub post_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

fn push_unique(list: &mut Vec<String>, id: &str) -> bool {
    if list.iter().any(|existing| existing == id) {
        return false;
    }
    list.push(id.to_string());
    true
}
