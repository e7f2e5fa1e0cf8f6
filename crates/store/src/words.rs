//! Vocabulary words, per-user usage stamps, and the LRU selector.

use chrono::DateTime;
use croco_core::{Error, Result};
use rusqlite::params;

use crate::{constraint_err, db_err, now_rfc3339, Store};

/// Display sentinel for words a user has never been served.
pub const NEVER_USED: &str = "never used";

/// Ordering for the word listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WordOrder {
    /// Alphabetical ascending.
    #[default]
    Alpha,
    /// Newest-inserted first, ties broken alphabetically.
    CreatedDesc,
}

/// One row of the word listing, with the per-user last-used display.
#[derive(Debug, Clone)]
pub struct WordRow {
    pub id: i64,
    pub word: String,
    pub last_used: String,
}

/// Human-readable last-used timestamp, or the never-used sentinel.
fn format_last_used(value: Option<String>) -> String {
    let Some(raw) = value else {
        return NEVER_USED.to_string();
    };
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(parsed) => parsed.format("%Y.%m.%d %H:%M:%S").to_string(),
        Err(_) => NEVER_USED.to_string(),
    }
}

impl Store {
    /// Insert words that are not yet present; returns the number of
    /// genuinely new rows. Re-inserting an existing word is a no-op.
    pub fn insert_new_words(&self, words: &[String]) -> Result<usize> {
        let conn = self.conn()?;
        let now = now_rfc3339();

        let mut inserted = 0;
        for word in words {
            let changed = conn
                .execute(
                    "INSERT OR IGNORE INTO words (word, created_at) VALUES (?1, ?2)",
                    params![word, now],
                )
                .map_err(db_err)?;
            inserted += changed;
        }

        log::info!("inserted {} new words ({} offered)", inserted, words.len());
        Ok(inserted)
    }

    /// Total distinct words in the vocabulary.
    pub fn count_words(&self) -> Result<i64> {
        let conn = self.conn()?;
        conn.query_row("SELECT COUNT(*) FROM words", [], |row| row.get(0))
            .map_err(db_err)
    }

    /// A page of words with this user's last-used display.
    pub fn list_words(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
        order: WordOrder,
    ) -> Result<Vec<WordRow>> {
        let order_by = match order {
            WordOrder::Alpha => "w.word ASC",
            WordOrder::CreatedDesc => "w.created_at DESC, w.word ASC",
        };

        let conn = self.conn()?;
        let sql = format!(
            "SELECT w.id, w.word, u.last_used_at
             FROM words AS w
             LEFT JOIN user_word_usage AS u
                 ON u.word_id = w.id AND u.user_id = ?1
             ORDER BY {order_by}
             LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![user_id, limit, offset], |row| {
                Ok(WordRow {
                    id: row.get(0)?,
                    word: row.get(1)?,
                    last_used: format_last_used(row.get(2)?),
                })
            })
            .map_err(db_err)?;

        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(db_err)
    }

    /// Replace a word's text.
    ///
    /// Colliding with a different existing word is a [`Error::Conflict`];
    /// an unknown id is [`Error::NotFound`]. The two must stay distinct:
    /// the editing UI shows different messages.
    pub fn update_word(&self, word_id: i64, new_text: &str) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE words SET word = ?1 WHERE id = ?2",
                params![new_text, word_id],
            )
            .map_err(|e| constraint_err(e, "word already exists"))?;

        if changed == 0 {
            return Err(Error::NotFound(format!("word id {}", word_id)));
        }
        Ok(())
    }

    /// Select up to `n` words for the user, least recently used first.
    ///
    /// Ordering: never-used words, then ascending last-used time, then
    /// alphabetical. As a side effect every returned word's usage record is
    /// stamped with the current time (per-row upsert). Fewer words than
    /// requested is not an error.
    pub fn select_words_for_user(&self, user_id: i64, n: i64) -> Result<Vec<String>> {
        let mut conn = self.conn()?;

        let rows: Vec<(i64, String)> = {
            let mut stmt = conn
                .prepare(
                    "SELECT w.id, w.word
                     FROM words AS w
                     LEFT JOIN user_word_usage AS u
                         ON u.word_id = w.id AND u.user_id = ?1
                     ORDER BY (u.last_used_at IS NOT NULL) ASC,
                              u.last_used_at ASC,
                              w.word ASC
                     LIMIT ?2",
                )
                .map_err(db_err)?;
            let mapped = stmt
                .query_map(params![user_id, n], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })
                .map_err(db_err)?;
            mapped
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(db_err)?
        };

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let now = now_rfc3339();
        let tx = conn.transaction().map_err(db_err)?;
        {
            let mut upsert = tx
                .prepare(
                    "INSERT INTO user_word_usage (user_id, word_id, last_used_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(user_id, word_id)
                     DO UPDATE SET last_used_at = excluded.last_used_at",
                )
                .map_err(db_err)?;
            for (word_id, _) in &rows {
                upsert
                    .execute(params![user_id, word_id, now])
                    .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;

        Ok(rows.into_iter().map(|(_, word)| word).collect())
    }

    /// Delete every usage record for the user; all words become
    /// never-used for them. Irreversible.
    pub fn reset_user_usage(&self, user_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM user_word_usage WHERE user_id = ?1",
                params![user_id],
            )
            .map_err(db_err)?;
        log::info!("reset usage for user {} ({} records)", user_id, deleted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn store_with_user() -> (Store, i64) {
        let store = Store::open_in_memory().unwrap();
        let user_id = store.create_user("alice", "pw", false).unwrap();
        (store, user_id)
    }

    #[test]
    fn test_insert_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.insert_new_words(&words(&["apple"])).unwrap(), 1);
        assert_eq!(store.insert_new_words(&words(&["apple"])).unwrap(), 0);
        assert_eq!(store.count_words().unwrap(), 1);
    }

    #[test]
    fn test_insert_counts_only_new_rows() {
        let store = Store::open_in_memory().unwrap();
        store.insert_new_words(&words(&["apple", "pear"])).unwrap();
        let inserted = store
            .insert_new_words(&words(&["pear", "banana", "cherry"]))
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(store.count_words().unwrap(), 4);
    }

    #[test]
    fn test_list_alpha_with_never_used_sentinel() {
        let (store, user_id) = store_with_user();
        store.insert_new_words(&words(&["pear", "apple"])).unwrap();

        let rows = store.list_words(user_id, 10, 0, WordOrder::Alpha).unwrap();
        let listed: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.word.as_str(), r.last_used.as_str()))
            .collect();
        assert_eq!(
            listed,
            vec![("apple", NEVER_USED), ("pear", NEVER_USED)]
        );
    }

    #[test]
    fn test_list_shows_usage_for_requesting_user_only() {
        let (store, alice) = store_with_user();
        let bob = store.create_user("bob", "pw", false).unwrap();
        store.insert_new_words(&words(&["apple"])).unwrap();

        store.select_words_for_user(alice, 1).unwrap();

        let for_alice = store.list_words(alice, 10, 0, WordOrder::Alpha).unwrap();
        assert_ne!(for_alice[0].last_used, NEVER_USED);

        let for_bob = store.list_words(bob, 10, 0, WordOrder::Alpha).unwrap();
        assert_eq!(for_bob[0].last_used, NEVER_USED);
    }

    #[test]
    fn test_list_created_desc_breaks_ties_alphabetically() {
        let (store, user_id) = store_with_user();
        // Same created_at for the whole batch, so the tie-break applies.
        store
            .insert_new_words(&words(&["pear", "apple", "banana"]))
            .unwrap();

        let rows = store
            .list_words(user_id, 10, 0, WordOrder::CreatedDesc)
            .unwrap();
        let listed: Vec<&str> = rows.iter().map(|r| r.word.as_str()).collect();
        assert_eq!(listed, vec!["apple", "banana", "pear"]);
    }

    #[test]
    fn test_list_pagination() {
        let (store, user_id) = store_with_user();
        store
            .insert_new_words(&words(&["a", "b", "c", "d"]))
            .unwrap();

        let page = store.list_words(user_id, 2, 2, WordOrder::Alpha).unwrap();
        let listed: Vec<&str> = page.iter().map(|r| r.word.as_str()).collect();
        assert_eq!(listed, vec!["c", "d"]);
    }

    #[test]
    fn test_update_word_conflict_leaves_rows_unchanged() {
        let (store, user_id) = store_with_user();
        store.insert_new_words(&words(&["apple", "pear"])).unwrap();
        let rows = store.list_words(user_id, 10, 0, WordOrder::Alpha).unwrap();
        let apple_id = rows[0].id;

        let err = store.update_word(apple_id, "pear").unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let after = store.list_words(user_id, 10, 0, WordOrder::Alpha).unwrap();
        let listed: Vec<&str> = after.iter().map(|r| r.word.as_str()).collect();
        assert_eq!(listed, vec!["apple", "pear"]);
    }

    #[test]
    fn test_update_word_unknown_id_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let err = store.update_word(999, "apple").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_update_word_to_same_text_is_ok() {
        let (store, user_id) = store_with_user();
        store.insert_new_words(&words(&["apple"])).unwrap();
        let id = store.list_words(user_id, 1, 0, WordOrder::Alpha).unwrap()[0].id;
        store.update_word(id, "apple").unwrap();
    }

    #[test]
    fn test_select_prefers_never_used_then_oldest() {
        let (store, user_id) = store_with_user();
        store
            .insert_new_words(&words(&["a", "b", "c", "d"]))
            .unwrap();

        let first = store.select_words_for_user(user_id, 2).unwrap();
        assert_eq!(first, vec!["a", "b"]);

        sleep(Duration::from_millis(2));
        let second = store.select_words_for_user(user_id, 2).unwrap();
        assert_eq!(second, vec!["c", "d"]);

        // Full coverage reached; the cycle restarts with the oldest-used.
        sleep(Duration::from_millis(2));
        let third = store.select_words_for_user(user_id, 2).unwrap();
        assert_eq!(third, vec!["a", "b"]);
    }

    #[test]
    fn test_select_underfill_returns_all_words() {
        let (store, user_id) = store_with_user();
        store.insert_new_words(&words(&["apple", "pear"])).unwrap();

        let selected = store.select_words_for_user(user_id, 10).unwrap();
        assert_eq!(selected, vec!["apple", "pear"]);
    }

    #[test]
    fn test_select_on_empty_store_is_empty() {
        let (store, user_id) = store_with_user();
        assert!(store.select_words_for_user(user_id, 5).unwrap().is_empty());
    }

    #[test]
    fn test_usage_is_per_user() {
        let (store, alice) = store_with_user();
        let bob = store.create_user("bob", "pw", false).unwrap();
        store.insert_new_words(&words(&["a", "b"])).unwrap();

        store.select_words_for_user(alice, 2).unwrap();
        // Bob's ranking is untouched by Alice's usage.
        let for_bob = store.select_words_for_user(bob, 2).unwrap();
        assert_eq!(for_bob, vec!["a", "b"]);
    }

    #[test]
    fn test_reset_restores_never_used_ranking() {
        let (store, user_id) = store_with_user();
        store.insert_new_words(&words(&["a", "b", "c"])).unwrap();

        store.select_words_for_user(user_id, 2).unwrap();
        store.reset_user_usage(user_id).unwrap();

        let rows = store.list_words(user_id, 10, 0, WordOrder::Alpha).unwrap();
        assert!(rows.iter().all(|r| r.last_used == NEVER_USED));

        sleep(Duration::from_millis(2));
        let selected = store.select_words_for_user(user_id, 2).unwrap();
        assert_eq!(selected, vec!["a", "b"]);
    }

    #[test]
    fn test_usage_cascades_on_user_delete_but_words_survive() {
        let (store, user_id) = store_with_user();
        store.insert_new_words(&words(&["apple"])).unwrap();
        store.select_words_for_user(user_id, 1).unwrap();

        store.delete_user("alice").unwrap();

        assert_eq!(store.count_words().unwrap(), 1);
        let conn = store.conn().unwrap();
        let usage: i64 = conn
            .query_row("SELECT COUNT(*) FROM user_word_usage", [], |r| r.get(0))
            .unwrap();
        assert_eq!(usage, 0);
    }

    #[test]
    fn test_format_last_used() {
        assert_eq!(format_last_used(None), NEVER_USED);
        assert_eq!(format_last_used(Some("garbage".to_string())), NEVER_USED);
        assert_eq!(
            format_last_used(Some("2024-03-05T07:09:11.123456Z".to_string())),
            "2024.03.05 07:09:11"
        );
    }
}
