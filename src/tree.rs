//! User-facing structural operations on the bookmark tree.
//!
//! [`Tree`] wraps a [`Store`] and keeps the tree invariants while it creates,
//! moves, renames and deletes folders and bookmarks. Each operation is one
//! store transaction; the only work that outlives a call is the favicon task
//! spawned after a bookmark is added.

pub mod favicon;

use crate::domain::{
    Bookmark, BookmarkId, FolderId, NewBookmark, ResolvedFolder, Tag, TagId, normalize_tags,
};
use crate::error::{BkmResult, StructureError};
use crate::store::Store;
use favicon::{FaviconFetcher, NoFavicons};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct Tree {
    store: Store,
    favicons: Arc<dyn FaviconFetcher>,
}

impl Tree {
    pub fn new(store: Store, favicons: Arc<dyn FaviconFetcher>) -> Self {
        Self { store, favicons }
    }

    /// A tree that never fetches favicons.
    pub fn without_favicons(store: Store) -> Self {
        Self::new(store, Arc::new(NoFavicons))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub async fn get_folder(&self, id: FolderId) -> BkmResult<ResolvedFolder> {
        self.store.get_folder(id).await
    }

    pub async fn get_bookmark(&self, id: BookmarkId) -> BkmResult<Bookmark> {
        self.store.get_bookmark(id).await
    }

    /// Creates a folder under `parent` (the root when `None`) and updates the
    /// parent's counter in the same transaction.
    pub async fn add_folder(&self, title: &str, parent: Option<FolderId>) -> BkmResult<FolderId> {
        let parent = parent.unwrap_or(FolderId::ROOT);

        let mut txn = self.store.begin().await?;
        let id = txn.create_folder(title, parent).await?;
        txn.recount_children(parent).await?;
        txn.commit().await?;

        Ok(id)
    }

    /// Moves `source` under `destination` (the root when `None`).
    ///
    /// Moving a folder into itself or below one of its own descendants is
    /// rejected with [`StructureError::Cycle`] and changes nothing. Moving a
    /// folder to the parent it already has still recomputes the counters.
    pub async fn move_folder(&self, source: FolderId, destination: Option<FolderId>) -> BkmResult<()> {
        let destination = destination.unwrap_or(FolderId::ROOT);
        if source.is_root() {
            return Err(StructureError::RootImmutable.into());
        }

        let mut txn = self.store.begin().await?;
        let folder = txn.resolve_folder(source).await?;
        let target = txn.resolve_folder(destination).await?;

        if target.is_within(source) {
            warn!(%source, %destination, "rejected move that would create a cycle");
            return Err(StructureError::Cycle {
                folder: source,
                destination,
            }
            .into());
        }

        txn.update_folder(source, &folder.folder.title, destination).await?;
        txn.commit().await?;

        debug!(%source, %destination, "moved folder");
        Ok(())
    }

    /// Gives a folder a new title without moving it.
    ///
    /// The title is trimmed before it is stored.
    ///
    /// # Errors
    /// Returns [`StructureError::RootImmutable`] for the root,
    /// [`BkmError::NotFound`](crate::BkmError::NotFound) if the folder does not exist and
    /// [`BkmError::InvalidTitle`](crate::BkmError::InvalidTitle) if the title is blank.
    pub async fn rename_folder(&self, id: FolderId, title: &str) -> BkmResult<()> {
        if id.is_root() {
            return Err(StructureError::RootImmutable.into());
        }

        let mut txn = self.store.begin().await?;
        let folder = txn.resolve_folder(id).await?;
        let parent = folder.folder.parent.unwrap_or(FolderId::ROOT);
        txn.update_folder(id, title, parent).await?;
        txn.commit().await
    }

    /// Deletes a folder with everything below it.
    ///
    /// # Errors
    /// Returns [`StructureError::RootImmutable`] for the root and
    /// [`BkmError::NotFound`](crate::BkmError::NotFound) if the folder does not exist.
    pub async fn delete_folder(&self, id: FolderId) -> BkmResult<()> {
        self.store.delete_folder(id).await
    }

    /// Stores a bookmark (in the root when it names no folder) and, if it has
    /// no favicon, starts a background lookup for one.
    pub async fn add_bookmark(&self, bookmark: NewBookmark) -> BkmResult<BookmarkId> {
        let (id, _task) = self.add_bookmark_with_favicon_task(bookmark).await?;
        Ok(id)
    }

    /// Like [`Tree::add_bookmark`] but hands back the favicon task.
    ///
    /// The task makes a single attempt; its failure is logged and never
    /// affects the stored bookmark.
    pub async fn add_bookmark_with_favicon_task(
        &self,
        bookmark: NewBookmark,
    ) -> BkmResult<(BookmarkId, Option<JoinHandle<()>>)> {
        let id = self.store.save_bookmark(&bookmark).await?;

        let task = match bookmark.favicon.as_deref() {
            Some(icon) if !icon.is_empty() => None,
            _ => Some(self.spawn_favicon_task(id, bookmark.url.clone())),
        };

        Ok((id, task))
    }

    /// Moves a bookmark into `destination` (the root when `None`).
    ///
    /// # Errors
    /// Returns [`BkmError::NotFound`](crate::BkmError::NotFound) if the bookmark does not exist and
    /// [`StructureError::MissingFolder`] if the destination does not.
    pub async fn move_bookmark(&self, id: BookmarkId, destination: Option<FolderId>) -> BkmResult<()> {
        self.edit_bookmark(id, |b| b.folder = destination.unwrap_or(FolderId::ROOT))
            .await
    }

    /// Gives a bookmark a new title, trimmed before it is stored.
    ///
    /// # Errors
    /// Returns [`BkmError::NotFound`](crate::BkmError::NotFound) if the bookmark does not exist and
    /// [`BkmError::InvalidTitle`](crate::BkmError::InvalidTitle) if the title is blank.
    pub async fn rename_bookmark(&self, id: BookmarkId, title: &str) -> BkmResult<()> {
        self.edit_bookmark(id, |b| b.title = title.to_owned()).await
    }

    /// Points a bookmark at a new URL. URLs are stored as given.
    ///
    /// # Errors
    /// Returns [`BkmError::NotFound`](crate::BkmError::NotFound) if the bookmark does not exist.
    pub async fn set_bookmark_url(&self, id: BookmarkId, url: &str) -> BkmResult<()> {
        self.edit_bookmark(id, |b| b.url = url.to_owned()).await
    }

    /// Sets or clears a bookmark's starred flag.
    ///
    /// # Errors
    /// Returns [`BkmError::NotFound`](crate::BkmError::NotFound) if the bookmark does not exist.
    pub async fn star_bookmark(&self, id: BookmarkId, starred: bool) -> BkmResult<()> {
        self.edit_bookmark(id, |b| b.starred = starred).await
    }

    /// Replaces the bookmark's tags with `names`.
    ///
    /// Names are trimmed and deduplicated; tags left without a bookmark are
    /// removed.
    ///
    /// # Errors
    /// Returns [`BkmError::NotFound`](crate::BkmError::NotFound) if the bookmark does not exist.
    pub async fn set_bookmark_tags<S: AsRef<str>>(&self, id: BookmarkId, names: &[S]) -> BkmResult<()> {
        let mut txn = self.store.begin().await?;
        let mut bookmark = txn.get_bookmark(id).await?;
        // Only the names matter; update_bookmark resolves identities.
        bookmark.tags = normalize_tags(names)
            .into_iter()
            .map(|name| Tag { id: TagId(0), name })
            .collect();
        txn.update_bookmark(&bookmark).await?;
        txn.commit().await
    }

    /// Deletes a bookmark and any tag only it carried.
    ///
    /// # Errors
    /// Returns [`BkmError::NotFound`](crate::BkmError::NotFound) if the bookmark does not exist.
    pub async fn delete_bookmark(&self, id: BookmarkId) -> BkmResult<()> {
        self.store.delete_bookmark(id).await
    }

    /// Starts a favicon lookup for every bookmark that has none.
    pub async fn refresh_missing_favicons(&self) -> BkmResult<Vec<JoinHandle<()>>> {
        let bookmarks = self.store.list_bookmarks_without_favicon().await?;
        info!(count = bookmarks.len(), "refreshing missing favicons");

        Ok(bookmarks
            .into_iter()
            .map(|b| self.spawn_favicon_task(b.id, b.url))
            .collect())
    }

    /// Fills an empty database with a small sample tree. Returns false and
    /// does nothing when anything besides the root already exists.
    pub async fn populate_samples(&self) -> BkmResult<bool> {
        if self.store.count_folders().await? > 1 || self.store.count_bookmarks().await? > 0 {
            debug!("database not empty, skipping samples");
            return Ok(false);
        }

        info!("populating sample bookmarks");
        let it = self.add_folder("IT", None).await?;
        let development = self.add_folder("Development", Some(it)).await?;

        let samples = [
            NewBookmark::new("Rust", "https://www.rust-lang.org/")
                .in_folder(development)
                .starred(true)
                .with_tags(["language"]),
            NewBookmark::new("crates.io", "https://crates.io/")
                .in_folder(development)
                .with_tags(["language", "packages"]),
        ];
        for sample in &samples {
            self.store.save_bookmark(sample).await?;
        }

        Ok(true)
    }

    async fn edit_bookmark<F>(&self, id: BookmarkId, edit: F) -> BkmResult<()>
    where
        F: FnOnce(&mut Bookmark),
    {
        let mut txn = self.store.begin().await?;
        let mut bookmark = txn.get_bookmark(id).await?;
        edit(&mut bookmark);
        txn.update_bookmark(&bookmark).await?;
        txn.commit().await
    }

    fn spawn_favicon_task(&self, id: BookmarkId, url: String) -> JoinHandle<()> {
        let store = self.store.clone();
        let fetcher = Arc::clone(&self.favicons);

        tokio::spawn(async move {
            match fetcher.fetch(&url).await {
                Ok(Some(icon)) => {
                    if let Err(e) = store.set_bookmark_favicon(id, Some(&icon)).await {
                        error!(%id, error = %e, "unable to attach favicon");
                    }
                }
                Ok(None) => debug!(%id, %url, "no favicon found"),
                Err(e) => warn!(%id, %url, error = %e, "favicon lookup failed"),
            }
        })
    }
}
