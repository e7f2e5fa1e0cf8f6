//! Account management: PBKDF2 credentials, admin flags, bootstrap.

use croco_core::{Error, Result};
use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use rusqlite::{params, OptionalExtension};
use sha2::Sha256;

use crate::{constraint_err, db_err, now_rfc3339, Store};

const PASSWORD_ITERATIONS: u32 = 200_000;
const SALT_LEN: usize = 16;

/// An authenticated account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
}

/// Account row as shown on the admin page.
#[derive(Debug, Clone)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
    pub created_at: String,
}

fn hash_password(password: &str, salt: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PASSWORD_ITERATIONS, &mut out);
    out
}

impl Store {
    /// Create an account. Duplicate usernames are a [`Error::Conflict`].
    pub fn create_user(&self, username: &str, password: &str, is_admin: bool) -> Result<i64> {
        let salt: [u8; SALT_LEN] = rand::thread_rng().gen();
        let hash = hash_password(password, &salt);

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (username, password_salt, password_hash, created_at, is_admin)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![username, salt.as_slice(), hash.as_slice(), now_rfc3339(), is_admin],
        )
        .map_err(|e| constraint_err(e, "user already exists"))?;

        Ok(conn.last_insert_rowid())
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, username, is_admin FROM users WHERE username = ?1",
            params![username],
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

    /// Check a username/password pair, returning the account on success.
    pub fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, username, is_admin, password_salt, password_hash
                 FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok((
                        User {
                            id: row.get(0)?,
                            username: row.get(1)?,
                            is_admin: row.get(2)?,
                        },
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;

        let Some((user, salt, expected)) = row else {
            return Ok(None);
        };

        let candidate = hash_password(password, &salt);
        if candidate.as_slice() == expected.as_slice() {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Re-salt and replace an account's password.
    pub fn update_user_password(&self, username: &str, password: &str) -> Result<()> {
        let salt: [u8; SALT_LEN] = rand::thread_rng().gen();
        let hash = hash_password(password, &salt);

        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE users SET password_salt = ?1, password_hash = ?2 WHERE username = ?3",
                params![salt.as_slice(), hash.as_slice(), username],
            )
            .map_err(db_err)?;

        if changed == 0 {
            return Err(Error::NotFound(format!("user '{}'", username)));
        }
        Ok(())
    }

    pub fn update_user_admin(&self, username: &str, is_admin: bool) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE users SET is_admin = ?1 WHERE username = ?2",
                params![is_admin, username],
            )
            .map_err(db_err)?;

        if changed == 0 {
            return Err(Error::NotFound(format!("user '{}'", username)));
        }
        Ok(())
    }

    /// Delete an account. Usage and session rows cascade; words survive.
    pub fn delete_user(&self, username: &str) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn
            .execute("DELETE FROM users WHERE username = ?1", params![username])
            .map_err(db_err)?;

        if changed == 0 {
            return Err(Error::NotFound(format!("user '{}'", username)));
        }
        Ok(())
    }

    pub fn count_admins(&self) -> Result<i64> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT COUNT(*) FROM users WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )
        .map_err(db_err)
    }

    /// All accounts, admins first, then alphabetical.
    pub fn list_users(&self) -> Result<Vec<UserSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, username, is_admin, created_at
                 FROM users ORDER BY is_admin DESC, username ASC",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(UserSummary {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    is_admin: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })
            .map_err(db_err)?;

        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(db_err)
    }

    /// Idempotent startup bootstrap for the configured admin account.
    ///
    /// Relies on the unique constraint: a concurrent second attempt loses
    /// the insert race and falls through to the promote path.
    pub fn ensure_admin_user(&self, username: &str, password: &str) -> Result<()> {
        match self.create_user(username, password, true) {
            Ok(_) => {
                log::info!("created admin account '{}'", username);
                Ok(())
            }
            Err(Error::Conflict(_)) => {
                let existing = self
                    .get_user_by_username(username)?
                    .ok_or_else(|| Error::NotFound(format!("user '{}'", username)))?;
                if !existing.is_admin {
                    self.update_user_admin(username, true)?;
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_verify_credentials() {
        let store = Store::open_in_memory().unwrap();
        store.create_user("alice", "secret", false).unwrap();

        let user = store.verify_credentials("alice", "secret").unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert!(!user.is_admin);

        assert!(store.verify_credentials("alice", "wrong").unwrap().is_none());
        assert!(store.verify_credentials("nobody", "secret").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_is_conflict() {
        let store = Store::open_in_memory().unwrap();
        store.create_user("alice", "secret", false).unwrap();
        let err = store.create_user("alice", "other", false).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_password_update_rotates_salt() {
        let store = Store::open_in_memory().unwrap();
        store.create_user("alice", "old", false).unwrap();
        store.update_user_password("alice", "new").unwrap();

        assert!(store.verify_credentials("alice", "old").unwrap().is_none());
        assert!(store.verify_credentials("alice", "new").unwrap().is_some());
    }

    #[test]
    fn test_missing_user_updates_are_not_found() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.update_user_password("ghost", "x").unwrap_err(),
            Error::NotFound(_)
        ));
        assert!(matches!(
            store.update_user_admin("ghost", true).unwrap_err(),
            Error::NotFound(_)
        ));
        assert!(matches!(
            store.delete_user("ghost").unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn test_list_users_admins_first() {
        let store = Store::open_in_memory().unwrap();
        store.create_user("zoe", "x", true).unwrap();
        store.create_user("bob", "x", false).unwrap();
        store.create_user("amy", "x", true).unwrap();

        let names: Vec<String> = store
            .list_users()
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["amy", "zoe", "bob"]);
    }

    #[test]
    fn test_ensure_admin_user_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        store.ensure_admin_user("admin", "admin").unwrap();
        store.ensure_admin_user("admin", "admin").unwrap();

        assert_eq!(store.count_admins().unwrap(), 1);
        let user = store.get_user_by_username("admin").unwrap().unwrap();
        assert!(user.is_admin);
    }

    #[test]
    fn test_ensure_admin_user_promotes_existing() {
        let store = Store::open_in_memory().unwrap();
        store.create_user("admin", "pw", false).unwrap();
        store.ensure_admin_user("admin", "ignored").unwrap();

        let user = store.get_user_by_username("admin").unwrap().unwrap();
        assert!(user.is_admin);
        // Existing password is untouched by the bootstrap.
        assert!(store.verify_credentials("admin", "pw").unwrap().is_some());
    }
}
