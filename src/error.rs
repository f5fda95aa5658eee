use crate::domain::{BookmarkId, FolderId};
use std::fmt;
use thiserror::Error;

/// The entity a [`BkmError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Folder(FolderId),
    Bookmark(BookmarkId),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Folder(id) => write!(f, "folder {id}"),
            Entity::Bookmark(id) => write!(f, "bookmark {id}"),
        }
    }
}

/// Why a structural change was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("cannot move folder {folder} into {destination}, which is itself or one of its descendants")]
    Cycle {
        folder: FolderId,
        destination: FolderId,
    },

    #[error("parent folder {0} does not exist")]
    MissingParent(FolderId),

    #[error("bookmark folder {0} does not exist")]
    MissingFolder(FolderId),

    #[error("the root folder cannot be moved, renamed or deleted")]
    RootImmutable,

    #[error("ancestor chain of folder {0} does not reach the root")]
    CorruptChain(FolderId),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("document contains no bookmark list")]
    NoBookmarkList,

    #[error("folder heading without a title")]
    UntitledFolder,

    #[error("unable to read document: {0}")]
    Read(std::io::Error),
}

#[derive(Debug, Error)]
pub enum BkmError {
    #[error("{0} not found")]
    NotFound(Entity),

    #[error("invalid structure: {0}")]
    InvalidStructure(#[from] StructureError),

    #[error("invalid title")]
    InvalidTitle,

    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("malformed bookmark file: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("favicon fetch failed: {0}")]
    Favicon(String),
}

impl BkmError {
    /// True for the errors a caller can recover from: the operation was
    /// rejected and the tree is unchanged.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BkmError::NotFound(_) | BkmError::InvalidStructure(_) | BkmError::InvalidTitle
        )
    }
}

pub type BkmResult<T> = Result<T, BkmError>;
