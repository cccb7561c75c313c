use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::*;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::{hash_password, new_id, now};
use crate::core::media::default_avatar;
use crate::core::store::{DocumentStore, WriteOp};
use crate::models::models::{Comment, Post, TokenData, User};

/// Typed access to the document store.
#[derive(Clone)]
pub struct Db {
    store: Arc<dyn DocumentStore>,
    write_lock: Arc<Mutex<()>>,
}

/// Writes staged inside `Db::write_txn`.
#[derive(Default)]
pub struct Batch {
    ops: Vec<WriteOp>,
}

impl Batch {
    pub fn put<T: Serialize>(&mut self, key: String, value: &T) -> ApiResult<()> {
        self.ops.push(WriteOp::Put(key, serde_json::to_vec(value)?));
        Ok(())
    }

    pub fn put_user(&mut self, user: &User) -> ApiResult<()> {
        self.put(user_key(&user.id), user)
    }

    pub fn put_post(&mut self, post: &Post) -> ApiResult<()> {
        self.put(post_key(&post.id), post)
    }

    pub fn put_comment(&mut self, comment: &Comment) -> ApiResult<()> {
        self.put(comment_key(&comment.id), comment)
    }

    pub fn delete(&mut self, key: String) {
        self.ops.push(WriteOp::Delete(key));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl Db {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Runs `f` under the process-wide write lock and applies its staged
    /// writes as one batch. Nothing is written if `f` fails.
    pub fn write_txn<T>(&self, f: impl FnOnce(&mut Batch) -> ApiResult<T>) -> ApiResult<T> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| ApiError::InternalError("write lock poisoned".to_string()))?;
        let mut batch = Batch::default();
        let out = f(&mut batch)?;
        if !batch.is_empty() {
            tracing::debug!(writes = batch.len(), "applying batch");
            self.store.apply(batch.ops)?;
        }
        Ok(out)
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> ApiResult<Option<T>> {
        match self.store.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    // === Users ===

    pub fn user_ids(&self) -> ApiResult<Vec<String>> {
        Ok(self.get_json(USERS_LIST_KEY)?.unwrap_or_default())
    }

    pub fn user(&self, id: &str) -> ApiResult<Option<User>> {
        self.get_json(&user_key(id))
    }

    pub fn require_user(&self, id: &str) -> ApiResult<User> {
        self.user(id)?
            .ok_or_else(|| ApiError::NotFound("No user exists".to_string()))
    }

    /// Loads users in the order given, skipping ids with no document.
    pub fn users(&self, ids: &[String]) -> ApiResult<Vec<User>> {
        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(u) = self.user(id)? {
                users.push(u);
            }
        }
        Ok(users)
    }

    pub fn all_users(&self) -> ApiResult<Vec<User>> {
        self.users(&self.user_ids()?)
    }

    pub fn find_user_by_username(&self, username: &str) -> ApiResult<Option<User>> {
        let username = username.trim();
        Ok(self.all_users()?.into_iter().find(|u| u.username == username))
    }

    pub fn find_user_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self.all_users()?.into_iter().find(|u| u.email == email))
    }

    /// Stages a brand-new user and registers it in the users list.
    pub fn stage_new_user(&self, batch: &mut Batch, user: &User) -> ApiResult<()> {
        let mut ids = self.user_ids()?;
        ids.push(user.id.clone());
        batch.put_user(user)?;
        batch.put(USERS_LIST_KEY.to_string(), &ids)
    }

    // === Sessions ===

    pub fn token(&self, token: &str) -> ApiResult<Option<TokenData>> {
        self.get_json(&token_key(token))
    }

    /// Issues a session token for `user`, staging both the user and the index.
    pub fn stage_new_token(&self, batch: &mut Batch, user: &mut User) -> ApiResult<String> {
        let token = new_id();
        user.tokens.push(token.clone());
        batch.put(
            token_key(&token),
            &TokenData {
                user_id: user.id.clone(),
                created_at: now(),
            },
        )?;
        batch.put_user(user)?;
        Ok(token)
    }

    // === Posts ===

    pub fn post(&self, id: &str) -> ApiResult<Option<Post>> {
        self.get_json(&post_key(id))
    }

    pub fn require_post(&self, id: &str) -> ApiResult<Post> {
        self.post(id)?
            .ok_or_else(|| ApiError::NotFound("No post found".to_string()))
    }

    /// Loads posts newest-first, skipping dangling ids. Equal timestamps
    /// keep reverse insertion order.
    pub fn posts_newest_first(&self, ids: &[String]) -> ApiResult<Vec<Post>> {
        let mut posts = Vec::with_capacity(ids.len());
        for id in ids.iter().rev() {
            if let Some(p) = self.post(id)? {
                posts.push(p);
            }
        }
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    // === Comments ===

    pub fn comment(&self, id: &str) -> ApiResult<Option<Comment>> {
        self.get_json(&comment_key(id))
    }

    pub fn comments_newest_first(&self, post: &Post) -> ApiResult<Vec<Comment>> {
        let mut comments = Vec::with_capacity(post.comments.len());
        for id in post.comments.iter().rev() {
            if let Some(c) = self.comment(id)? {
                comments.push(c);
            }
        }
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments)
    }
}

// === Demo data ===

fn demo_user(username: &str, fullname: &str, bio: &str) -> ApiResult<User> {
    Ok(User {
        id: new_id(),
        fullname: fullname.to_string(),
        email: format!("{}@example.com", username),
        username: username.to_string(),
        password: hash_password(username)?,
        avatar: default_avatar()?,
        bio: Some(bio.to_string()),
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
    })
}

fn demo_post(owner: &mut User, caption: &str) -> ApiResult<Post> {
    let post = Post {
        id: new_id(),
        user_id: owner.id.clone(),
        caption: caption.to_string(),
        image: default_avatar()?,
        likes: Vec::new(),
        likes_count: 0,
        comments: Vec::new(),
        comments_count: 0,
        created_at: now(),
    };
    owner.add_post(&post.id);
    Ok(post)
}

/// Seeds `test`, `alice` and `bob` (password = username) with a few posts,
/// `test` following `bob`. Does nothing once `test` exists.
pub fn init_test_data(db: &Db) -> ApiResult<()> {
    if db.find_user_by_username("test")?.is_some() {
        return Ok(());
    }

    let mut test = demo_user("test", "Test User", "Test user bio")?;
    let mut alice = demo_user("alice", "Alice", "Hello, I'm Alice!")?;
    let mut bob = demo_user("bob", "Bob", "Bob's corner of the internet")?;

    let posts = vec![
        demo_post(&mut test, "This is my first post!")?,
        demo_post(&mut alice, "Welcome to my page! Excited to share photos here.")?,
        demo_post(&mut alice, "Just finished an amazing project.")?,
        demo_post(&mut bob, "Hey everyone! Looking forward to connecting with you all.")?,
    ];

    test.add_following(&bob.id);
    bob.add_follower(&test.id);

    db.write_txn(|batch| {
        for user in [&test, &alice, &bob] {
            batch.put_user(user)?;
        }
        for post in &posts {
            batch.put_post(post)?;
        }
        let mut ids = db.user_ids()?;
        ids.extend([test.id.clone(), alice.id.clone(), bob.id.clone()]);
        batch.put(USERS_LIST_KEY.to_string(), &ids)
    })?;

    tracing::info!("seeded demo users test, alice and bob");
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_db() -> Db {
    Db::new(Arc::new(crate::core::store::MemoryStore::new()))
}
