use crate::domain::{FolderId, ROOT_TITLE};
use sqlx::SqlitePool;
use tracing::info;

pub(super) async fn create(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS folder (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            parent_id INTEGER REFERENCES folder(id) ON DELETE CASCADE,
            child_folder_count INTEGER NOT NULL DEFAULT 0
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS bookmark (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            favicon TEXT,
            starred INTEGER NOT NULL DEFAULT 0,
            folder_id INTEGER NOT NULL REFERENCES folder(id) ON DELETE CASCADE
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS tag (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS bookmark_tag (
            bookmark_id INTEGER NOT NULL REFERENCES bookmark(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tag(id) ON DELETE CASCADE,
            PRIMARY KEY (bookmark_id, tag_id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS folder_parent ON folder(parent_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS bookmark_folder ON bookmark(folder_id)")
        .execute(pool)
        .await?;

    let (folders,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM folder")
        .fetch_one(pool)
        .await?;

    if folders > 0 {
        return Ok(());
    }

    info!("folder table empty, inserting the root folder");
    sqlx::query(
        "INSERT INTO folder (id, title, parent_id, child_folder_count) VALUES (?1, ?2, NULL, 0)",
    )
    .bind(FolderId::ROOT)
    .bind(ROOT_TITLE)
    .execute(pool)
    .await?;

    Ok(())
}
