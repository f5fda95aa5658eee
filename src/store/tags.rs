use super::{Store, StoreTxn};
use crate::domain::{BookmarkId, Tag, TagId, normalize_tags};
use crate::error::BkmResult;
use sqlx::SqliteConnection;
use tracing::debug;

pub(super) async fn load_tags(
    conn: &mut SqliteConnection,
    bookmark: BookmarkId,
) -> Result<Vec<Tag>, sqlx::Error> {
    sqlx::query_as::<_, Tag>(
        "SELECT t.id, t.name FROM tag t
         JOIN bookmark_tag bt ON bt.tag_id = t.id
         WHERE bt.bookmark_id = ?1
         ORDER BY t.name",
    )
    .bind(bookmark)
    .fetch_all(&mut *conn)
    .await
}

/// Links `names` to a bookmark, creating the tags that do not exist yet.
pub(super) async fn attach_tags<S: AsRef<str>>(
    conn: &mut SqliteConnection,
    bookmark: BookmarkId,
    names: &[S],
) -> Result<(), sqlx::Error> {
    for name in normalize_tags(names) {
        sqlx::query("INSERT INTO tag (name) VALUES (?1) ON CONFLICT(name) DO NOTHING")
            .bind(&name)
            .execute(&mut *conn)
            .await?;

        let (tag,): (TagId,) = sqlx::query_as("SELECT id FROM tag WHERE name = ?1")
            .bind(&name)
            .fetch_one(&mut *conn)
            .await?;

        sqlx::query("INSERT OR IGNORE INTO bookmark_tag (bookmark_id, tag_id) VALUES (?1, ?2)")
            .bind(bookmark)
            .bind(tag)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

impl StoreTxn<'_> {
    /// Drops tags no bookmark refers to any more.
    pub(super) async fn remove_orphan_tags(&mut self) -> Result<(), sqlx::Error> {
        let removed = sqlx::query(
            "DELETE FROM tag WHERE id NOT IN (SELECT DISTINCT tag_id FROM bookmark_tag)",
        )
        .execute(&mut *self.tx)
        .await?;

        if removed.rows_affected() > 0 {
            debug!(removed = removed.rows_affected(), "removed orphan tags");
        }
        Ok(())
    }
}

impl Store {
    /// Every tag in use, ordered by name.
    pub async fn list_tags(&self) -> BkmResult<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, name FROM tag ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(tags)
    }

    pub async fn get_bookmark_tags(&self, bookmark: BookmarkId) -> BkmResult<Vec<Tag>> {
        let mut conn = self.pool.acquire().await?;
        Ok(load_tags(&mut conn, bookmark).await?)
    }
}
