use super::{Store, StoreTxn};
use crate::domain::{Folder, FolderId, ResolvedFolder, valid_title};
use crate::error::{BkmError, BkmResult, Entity, StructureError};
use sqlx::SqliteConnection;
use tracing::debug;

const SELECT_FOLDER: &str = "SELECT id, title, parent_id, child_folder_count FROM folder";

pub(super) async fn fetch_folder(
    conn: &mut SqliteConnection,
    id: FolderId,
) -> Result<Option<Folder>, sqlx::Error> {
    sqlx::query_as::<_, Folder>(&format!("{SELECT_FOLDER} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub(super) async fn folder_exists(
    conn: &mut SqliteConnection,
    id: FolderId,
) -> Result<bool, sqlx::Error> {
    let found: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM folder WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Loads a folder and follows its parent pointers up to the root.
///
/// One query per hop. A chain that revisits a folder or ends anywhere other
/// than the root is reported as [`StructureError::CorruptChain`].
pub(super) async fn resolve_folder(
    conn: &mut SqliteConnection,
    id: FolderId,
) -> BkmResult<ResolvedFolder> {
    let folder = fetch_folder(conn, id)
        .await?
        .ok_or(BkmError::NotFound(Entity::Folder(id)))?;

    let mut ancestors: Vec<Folder> = Vec::new();
    let mut next = folder.parent;

    while let Some(parent_id) = next {
        if parent_id == id || ancestors.iter().any(|a| a.id == parent_id) {
            return Err(StructureError::CorruptChain(id).into());
        }
        let parent = fetch_folder(conn, parent_id)
            .await?
            .ok_or(StructureError::CorruptChain(id))?;
        next = parent.parent;
        ancestors.push(parent);
    }

    let top = ancestors.last().unwrap_or(&folder);
    if !top.id.is_root() {
        return Err(StructureError::CorruptChain(id).into());
    }

    Ok(ResolvedFolder { folder, ancestors })
}

/// Rewrites a folder's counter from a live count of its children.
pub(super) async fn recount_children(
    conn: &mut SqliteConnection,
    id: FolderId,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE folder
         SET child_folder_count = (SELECT COUNT(*) FROM folder WHERE parent_id = ?1)
         WHERE id = ?1",
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

impl StoreTxn<'_> {
    /// See [`Store::get_folder`].
    pub async fn resolve_folder(&mut self, id: FolderId) -> BkmResult<ResolvedFolder> {
        resolve_folder(&mut self.tx, id).await
    }

    /// Inserts a folder with a zero counter. The parent's counter is left
    /// alone; call [`StoreTxn::recount_children`] before committing.
    pub async fn create_folder(&mut self, title: &str, parent: FolderId) -> BkmResult<FolderId> {
        let title = valid_title(title)?;

        if !folder_exists(&mut self.tx, parent).await? {
            return Err(StructureError::MissingParent(parent).into());
        }

        let id: (FolderId,) = sqlx::query_as(
            "INSERT INTO folder (title, parent_id, child_folder_count) VALUES (?1, ?2, 0)
             RETURNING id",
        )
        .bind(&title)
        .bind(parent)
        .fetch_one(&mut *self.tx)
        .await?;

        debug!(id = %id.0, %title, %parent, "created folder");
        Ok(id.0)
    }

    /// Overwrites a folder's title and parent pointer, then recomputes the
    /// counters of both the old and the new parent.
    ///
    /// The counters are recomputed even when the parent does not change.
    /// Only a folder made its own parent is rejected here; deeper cycles are
    /// checked by [`Tree::move_folder`].
    ///
    /// [`Tree::move_folder`]: crate::tree::Tree::move_folder
    pub async fn update_folder(
        &mut self,
        id: FolderId,
        title: &str,
        new_parent: FolderId,
    ) -> BkmResult<()> {
        let title = valid_title(title)?;

        if id.is_root() {
            return Err(StructureError::RootImmutable.into());
        }
        if new_parent == id {
            return Err(StructureError::Cycle {
                folder: id,
                destination: new_parent,
            }
            .into());
        }

        let current = fetch_folder(&mut self.tx, id)
            .await?
            .ok_or(BkmError::NotFound(Entity::Folder(id)))?;

        if !folder_exists(&mut self.tx, new_parent).await? {
            return Err(StructureError::MissingParent(new_parent).into());
        }

        sqlx::query("UPDATE folder SET title = ?1, parent_id = ?2 WHERE id = ?3")
            .bind(&title)
            .bind(new_parent)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if let Some(old_parent) = current.parent {
            recount_children(&mut self.tx, old_parent).await?;
        }
        recount_children(&mut self.tx, new_parent).await?;

        debug!(%id, %title, old_parent = ?current.parent, %new_parent, "updated folder");
        Ok(())
    }

    /// Deletes a folder together with every folder and bookmark below it,
    /// and recomputes the former parent's counter.
    pub async fn delete_folder(&mut self, id: FolderId) -> BkmResult<()> {
        if id.is_root() {
            return Err(StructureError::RootImmutable.into());
        }

        let folder = fetch_folder(&mut self.tx, id)
            .await?
            .ok_or(BkmError::NotFound(Entity::Folder(id)))?;

        // Descendant folders, bookmarks and bookmark_tag rows follow through
        // ON DELETE CASCADE.
        sqlx::query("DELETE FROM folder WHERE id = ?1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if let Some(parent) = folder.parent {
            recount_children(&mut self.tx, parent).await?;
        }
        self.remove_orphan_tags().await?;

        debug!(%id, title = %folder.title, "deleted folder");
        Ok(())
    }

    pub async fn recount_children(&mut self, id: FolderId) -> BkmResult<()> {
        recount_children(&mut self.tx, id).await?;
        Ok(())
    }
}

impl Store {
    /// Resolves a folder and its full ancestor chain.
    pub async fn get_folder(&self, id: FolderId) -> BkmResult<ResolvedFolder> {
        debug!(%id, "get_folder");
        let mut conn = self.pool.acquire().await?;
        resolve_folder(&mut conn, id).await
    }

    /// Creates a folder and returns its identity.
    ///
    /// The parent's `child_folder_count` is not updated here; the tree
    /// mutator's `add_folder` does both in one transaction.
    pub async fn create_folder(&self, title: &str, parent: FolderId) -> BkmResult<FolderId> {
        let mut txn = self.begin().await?;
        let id = txn.create_folder(title, parent).await?;
        txn.commit().await?;
        Ok(id)
    }

    /// Overwrites title and parent and recomputes the old and new parents'
    /// counters in the same transaction.
    pub async fn update_folder(
        &self,
        id: FolderId,
        title: &str,
        new_parent: FolderId,
    ) -> BkmResult<()> {
        let mut txn = self.begin().await?;
        txn.update_folder(id, title, new_parent).await?;
        txn.commit().await
    }

    /// Deletes a folder and everything it transitively contains.
    pub async fn delete_folder(&self, id: FolderId) -> BkmResult<()> {
        let mut txn = self.begin().await?;
        txn.delete_folder(id).await?;
        txn.commit().await
    }

    /// Direct subfolders of `id`, ordered by title.
    pub async fn list_folder_subfolders(&self, id: FolderId) -> BkmResult<Vec<Folder>> {
        debug!(%id, "list_folder_subfolders");
        let mut conn = self.pool.acquire().await?;

        if !folder_exists(&mut conn, id).await? {
            return Err(BkmError::NotFound(Entity::Folder(id)));
        }

        let folders = sqlx::query_as::<_, Folder>(&format!(
            "{SELECT_FOLDER} WHERE parent_id = ?1 ORDER BY title COLLATE BINARY, id"
        ))
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(folders)
    }

    pub async fn count_folders(&self) -> BkmResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM folder")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Number of folders whose parent is `id`, counted live rather than read
    /// from the denormalized counter.
    pub async fn count_child_folders(&self, id: FolderId) -> BkmResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM folder WHERE parent_id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Every folder, unordered. Used for invariant checks.
    pub async fn list_all_folders(&self) -> BkmResult<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(&format!("{SELECT_FOLDER} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(folders)
    }
}
