use super::folders::folder_exists;
use super::tags::{attach_tags, load_tags};
use super::{Store, StoreTxn};
use crate::domain::{Bookmark, BookmarkId, FolderId, NewBookmark, valid_title};
use crate::error::{BkmError, BkmResult, Entity, StructureError};
use sqlx::SqliteConnection;
use tracing::debug;

const SELECT_BOOKMARK: &str = "SELECT id, title, url, favicon, starred, folder_id FROM bookmark";

async fn fetch_bookmark(
    conn: &mut SqliteConnection,
    id: BookmarkId,
) -> BkmResult<Bookmark> {
    let mut bookmark = sqlx::query_as::<_, Bookmark>(&format!("{SELECT_BOOKMARK} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(BkmError::NotFound(Entity::Bookmark(id)))?;

    bookmark.tags = load_tags(conn, id).await?;
    Ok(bookmark)
}

/// Runs a bookmark listing query and fills in each bookmark's tags.
async fn fetch_bookmarks(
    conn: &mut SqliteConnection,
    sql: &str,
    bind: Option<String>,
    folder: Option<FolderId>,
) -> BkmResult<Vec<Bookmark>> {
    let mut query = sqlx::query_as::<_, Bookmark>(sql);
    if let Some(folder) = folder {
        query = query.bind(folder);
    }
    if let Some(bind) = bind {
        query = query.bind(bind);
    }

    let mut bookmarks = query.fetch_all(&mut *conn).await?;
    for bookmark in &mut bookmarks {
        bookmark.tags = load_tags(conn, bookmark.id).await?;
    }
    Ok(bookmarks)
}

/// Escapes `LIKE` wildcards so the needle matches literally.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl StoreTxn<'_> {
    pub async fn get_bookmark(&mut self, id: BookmarkId) -> BkmResult<Bookmark> {
        fetch_bookmark(&mut self.tx, id).await
    }

    /// Inserts a bookmark and its tags. A bookmark without a folder goes to
    /// the root.
    pub async fn save_bookmark(&mut self, bookmark: &NewBookmark) -> BkmResult<BookmarkId> {
        let title = valid_title(&bookmark.title)?;
        let folder = bookmark.folder.unwrap_or(FolderId::ROOT);

        if !folder_exists(&mut self.tx, folder).await? {
            return Err(StructureError::MissingFolder(folder).into());
        }

        let (id,): (BookmarkId,) = sqlx::query_as(
            "INSERT INTO bookmark (title, url, favicon, starred, folder_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id",
        )
        .bind(&title)
        .bind(&bookmark.url)
        .bind(bookmark.favicon.as_deref().filter(|f| !f.is_empty()))
        .bind(bookmark.starred)
        .bind(folder)
        .fetch_one(&mut *self.tx)
        .await?;

        attach_tags(&mut self.tx, id, &bookmark.tags).await?;

        debug!(%id, %title, url = %bookmark.url, %folder, "saved bookmark");
        Ok(id)
    }

    /// Overwrites every column of an existing bookmark and replaces its tag
    /// set with `bookmark.tags`.
    pub async fn update_bookmark(&mut self, bookmark: &Bookmark) -> BkmResult<()> {
        let title = valid_title(&bookmark.title)?;

        if !folder_exists(&mut self.tx, bookmark.folder).await? {
            return Err(StructureError::MissingFolder(bookmark.folder).into());
        }

        let updated = sqlx::query(
            "UPDATE bookmark
             SET title = ?1, url = ?2, favicon = ?3, starred = ?4, folder_id = ?5
             WHERE id = ?6",
        )
        .bind(&title)
        .bind(&bookmark.url)
        .bind(bookmark.favicon.as_deref().filter(|f| !f.is_empty()))
        .bind(bookmark.starred)
        .bind(bookmark.folder)
        .bind(bookmark.id)
        .execute(&mut *self.tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(BkmError::NotFound(Entity::Bookmark(bookmark.id)));
        }

        sqlx::query("DELETE FROM bookmark_tag WHERE bookmark_id = ?1")
            .bind(bookmark.id)
            .execute(&mut *self.tx)
            .await?;
        let names: Vec<&str> = bookmark.tag_names();
        attach_tags(&mut self.tx, bookmark.id, &names).await?;
        self.remove_orphan_tags().await?;

        debug!(id = %bookmark.id, %title, folder = %bookmark.folder, starred = bookmark.starred, "updated bookmark");
        Ok(())
    }

    pub async fn delete_bookmark(&mut self, id: BookmarkId) -> BkmResult<()> {
        let deleted = sqlx::query("DELETE FROM bookmark WHERE id = ?1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(BkmError::NotFound(Entity::Bookmark(id)));
        }
        self.remove_orphan_tags().await?;

        debug!(%id, "deleted bookmark");
        Ok(())
    }

    pub async fn set_bookmark_favicon(
        &mut self,
        id: BookmarkId,
        favicon: Option<&str>,
    ) -> BkmResult<()> {
        let updated = sqlx::query("UPDATE bookmark SET favicon = ?1 WHERE id = ?2")
            .bind(favicon.filter(|f| !f.is_empty()))
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(BkmError::NotFound(Entity::Bookmark(id)));
        }
        Ok(())
    }
}

impl Store {
    pub async fn get_bookmark(&self, id: BookmarkId) -> BkmResult<Bookmark> {
        debug!(%id, "get_bookmark");
        let mut conn = self.pool.acquire().await?;
        fetch_bookmark(&mut conn, id).await
    }

    /// Stores a new bookmark. A reference to a missing folder is rejected,
    /// never replaced with the root.
    pub async fn save_bookmark(&self, bookmark: &NewBookmark) -> BkmResult<BookmarkId> {
        let mut txn = self.begin().await?;
        let id = txn.save_bookmark(bookmark).await?;
        txn.commit().await?;
        Ok(id)
    }

    pub async fn update_bookmark(&self, bookmark: &Bookmark) -> BkmResult<()> {
        let mut txn = self.begin().await?;
        txn.update_bookmark(bookmark).await?;
        txn.commit().await
    }

    pub async fn delete_bookmark(&self, id: BookmarkId) -> BkmResult<()> {
        let mut txn = self.begin().await?;
        txn.delete_bookmark(id).await?;
        txn.commit().await
    }

    pub async fn set_bookmark_favicon(&self, id: BookmarkId, favicon: Option<&str>) -> BkmResult<()> {
        let mut txn = self.begin().await?;
        txn.set_bookmark_favicon(id, favicon).await?;
        txn.commit().await
    }

    /// Bookmarks directly inside `folder`, ordered by title.
    pub async fn list_folder_bookmarks(&self, folder: FolderId) -> BkmResult<Vec<Bookmark>> {
        debug!(%folder, "list_folder_bookmarks");
        let mut conn = self.pool.acquire().await?;

        if !folder_exists(&mut conn, folder).await? {
            return Err(BkmError::NotFound(Entity::Folder(folder)));
        }

        fetch_bookmarks(
            &mut conn,
            &format!("{SELECT_BOOKMARK} WHERE folder_id = ?1 ORDER BY title COLLATE BINARY, id"),
            None,
            Some(folder),
        )
        .await
    }

    pub async fn list_starred_bookmarks(&self) -> BkmResult<Vec<Bookmark>> {
        debug!("list_starred_bookmarks");
        let mut conn = self.pool.acquire().await?;
        fetch_bookmarks(
            &mut conn,
            &format!("{SELECT_BOOKMARK} WHERE starred ORDER BY title COLLATE BINARY, id"),
            None,
            None,
        )
        .await
    }

    /// Bookmarks whose title contains `needle` or that carry a tag whose
    /// name contains it. ASCII letters match case-insensitively.
    pub async fn search_bookmarks(&self, needle: &str) -> BkmResult<Vec<Bookmark>> {
        debug!(needle, "search_bookmarks");
        let mut conn = self.pool.acquire().await?;
        fetch_bookmarks(
            &mut conn,
            "SELECT DISTINCT b.id, b.title, b.url, b.favicon, b.starred, b.folder_id
             FROM bookmark b
             LEFT JOIN bookmark_tag bt ON bt.bookmark_id = b.id
             LEFT JOIN tag t ON t.id = bt.tag_id
             WHERE b.title LIKE ?1 ESCAPE '\\' OR t.name LIKE ?1 ESCAPE '\\'
             ORDER BY b.title COLLATE BINARY, b.id",
            Some(like_pattern(needle)),
            None,
        )
        .await
    }

    /// Bookmarks that have no favicon yet.
    pub async fn list_bookmarks_without_favicon(&self) -> BkmResult<Vec<Bookmark>> {
        let mut conn = self.pool.acquire().await?;
        fetch_bookmarks(
            &mut conn,
            &format!(
                "{SELECT_BOOKMARK} WHERE favicon IS NULL OR favicon = '' ORDER BY title COLLATE BINARY, id"
            ),
            None,
            None,
        )
        .await
    }

    pub async fn count_bookmarks(&self) -> BkmResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookmark")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
