//! Login sessions: random bearer tokens with a fixed TTL.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use croco_core::Result;
use rand::Rng;
use rusqlite::{params, OptionalExtension};

use crate::{db_err, now_unix, Store, User};

pub const SESSION_TTL_SECONDS: i64 = 60 * 60 * 24;
const TOKEN_BYTES: usize = 32;

fn new_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

impl Store {
    /// Create a session for the user and return its token.
    pub fn create_session(&self, user_id: i64) -> Result<String> {
        let token = new_token();
        let now = now_unix();

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (token, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![token, user_id, now, now + SESSION_TTL_SECONDS],
        )
        .map_err(db_err)?;

        Ok(token)
    }

    /// Resolve a session token to its account, ignoring expired sessions.
    pub fn get_user_by_session(&self, token: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT u.id, u.username, u.is_admin
             FROM sessions AS s
             JOIN users AS u ON u.id = s.user_id
             WHERE s.token = ?1 AND s.expires_at > ?2",
            params![token, now_unix()],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    is_admin: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(db_err)
    }

    /// Drop a session (logout). Unknown tokens are a no-op.
    pub fn delete_session(&self, token: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])
            .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let user_id = store.create_user("alice", "pw", false).unwrap();

        let token = store.create_session(user_id).unwrap();
        let user = store.get_user_by_session(&token).unwrap().unwrap();
        assert_eq!(user.id, user_id);

        store.delete_session(&token).unwrap();
        assert!(store.get_user_by_session(&token).unwrap().is_none());
    }

    #[test]
    fn test_unknown_token_is_none() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_user_by_session("nope").unwrap().is_none());
    }

    #[test]
    fn test_expired_session_is_ignored() {
        let store = Store::open_in_memory().unwrap();
        let user_id = store.create_user("alice", "pw", false).unwrap();
        let token = store.create_session(user_id).unwrap();

        // Force the session into the past.
        let conn = store.conn().unwrap();
        conn.execute(
            "UPDATE sessions SET expires_at = ?1 WHERE token = ?2",
            params![now_unix() - 1, token],
        )
        .unwrap();
        drop(conn);

        assert!(store.get_user_by_session(&token).unwrap().is_none());
    }

    #[test]
    fn test_sessions_cascade_on_user_delete() {
        let store = Store::open_in_memory().unwrap();
        let user_id = store.create_user("alice", "pw", false).unwrap();
        let token = store.create_session(user_id).unwrap();

        store.delete_user("alice").unwrap();
        assert!(store.get_user_by_session(&token).unwrap().is_none());
    }

    #[test]
    fn test_tokens_are_unique() {
        let store = Store::open_in_memory().unwrap();
        let user_id = store.create_user("alice", "pw", false).unwrap();
        let a = store.create_session(user_id).unwrap();
        let b = store.create_session(user_id).unwrap();
        assert_ne!(a, b);
    }
}
