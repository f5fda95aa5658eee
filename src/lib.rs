//! # bkm_core
//!
//! A bookmark manager library: a folder tree of bookmarks and tags kept in
//! SQLite, structural editing that keeps the tree consistent, and import and
//! export of Netscape bookmark files.
//!
//! ## Features
//!
//! - **Hierarchical store**: folders, bookmarks and tags with cascading deletes
//!   and a per-folder count of direct subfolders
//! - **Tree editing**: add, move, rename and delete with cycle rejection, each
//!   change applied in a single transaction
//! - **Favicons**: looked up in the background after a bookmark is added
//! - **Bookmark files**: streaming export and nested-folder import of the HTML
//!   format browsers use
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bkm_core::domain::NewBookmark;
//! use bkm_core::{Store, StoreConfig, Tree};
//!
//! # async fn run() -> bkm_core::BkmResult<()> {
//! let store = Store::open(&StoreConfig::at("bookmarks.db")).await?;
//! let tree = Tree::without_favicons(store);
//!
//! let dev = tree.add_folder("Development", None).await?;
//! tree.add_bookmark(NewBookmark::new("Rust", "https://www.rust-lang.org/").in_folder(dev))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **[`domain`]**: identities, rows and validation helpers
//! - **[`store`]**: SQLite persistence; every write is one transaction
//! - **[`tree`]**: structural operations and the favicon task
//! - **[`codec`]**: Netscape bookmark file export and import
//! - **[`config`]**: settings for opening a store
//! - **[`error`]**: the error type shared by every module
//!
//! ## Moving Folders
//!
//! A folder cannot be moved into itself or below one of its descendants.
//! Such a move fails with [`error::StructureError::Cycle`] and leaves the
//! tree as it was:
//!
//! ```rust,no_run
//! use bkm_core::{BkmError, Tree};
//! use bkm_core::error::StructureError;
//!
//! # async fn run(tree: Tree) -> bkm_core::BkmResult<()> {
//! let a = tree.add_folder("a", None).await?;
//! let b = tree.add_folder("b", Some(a)).await?;
//!
//! match tree.move_folder(a, Some(b)).await {
//!     Err(BkmError::InvalidStructure(StructureError::Cycle { .. })) => {}
//!     other => panic!("unexpected result: {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Import and Export
//!
//! ```rust,no_run
//! use bkm_core::{Tree, codec};
//! use std::path::Path;
//!
//! # async fn run(tree: Tree) -> bkm_core::BkmResult<()> {
//! codec::export_to_path(tree.store(), Path::new("bookmarks.html")).await?;
//!
//! let mut file = tokio::fs::File::open("other.html").await?;
//! let report = codec::import(&tree, &mut file).await?;
//! println!("imported {} bookmarks", report.bookmarks);
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! The library emits [`tracing`] events and never installs a subscriber.

pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod store;
pub mod tree;

/// Re-exports the most commonly used types for convenience.
pub use config::StoreConfig;
pub use error::{BkmError, BkmResult};
pub use store::Store;
pub use tree::Tree;
