use crate::auth::{authenticate, signup, Session, SignupRequest};
use crate::core::db::Db;

pub fn signup_as(db: &Db, username: &str) -> crate::models::views::AuthResponse {
    signup(
        db,
        SignupRequest {
            fullname: format!("{} Name", username),
            email: format!("{}@example.com", username),
            username: username.to_string(),
            password: "secret".to_string(),
        },
    )
    .unwrap()
}

pub fn session_for(db: &Db, username: &str) -> Session {
    let token = signup_as(db, username).token;
    authenticate(db, &token).unwrap()
}

/// Re-reads the session's user so tests see writes made since login.
pub fn refresh(db: &Db, session: &Session) -> Session {
    authenticate(db, &session.token).unwrap()
}
