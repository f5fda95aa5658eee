use crate::error::{BkmError, BkmResult};
use sqlx::FromRow;
use std::fmt;

macro_rules! identity {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

identity!(
    /// Identity of a folder row.
    FolderId
);
identity!(
    /// Identity of a bookmark row.
    BookmarkId
);
identity!(TagId);

impl FolderId {
    /// The root folder, inserted when the schema is created.
    pub const ROOT: FolderId = FolderId(1);

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

/// Title of the root folder.
pub const ROOT_TITLE: &str = "/";

/// A folder row. Parent links are identities, resolved through the store.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Folder {
    pub id: FolderId,
    pub title: String,
    #[sqlx(rename = "parent_id")]
    pub parent: Option<FolderId>,
    pub child_folder_count: i64,
}

impl Folder {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn has_child_folders(&self) -> bool {
        self.child_folder_count > 0
    }
}

/// A folder together with its ancestor chain.
///
/// `ancestors` starts with the direct parent and ends with the root; it is
/// empty for the root itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFolder {
    pub folder: Folder,
    pub ancestors: Vec<Folder>,
}

impl ResolvedFolder {
    pub fn id(&self) -> FolderId {
        self.folder.id
    }

    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    /// Returns true if `id` is this folder or any folder above it.
    pub fn is_within(&self, id: FolderId) -> bool {
        self.folder.id == id || self.ancestors.iter().any(|a| a.id == id)
    }

    /// Slash-separated titles from the root down to this folder.
    pub fn path(&self) -> String {
        let mut titles: Vec<&str> = self
            .ancestors
            .iter()
            .rev()
            .filter(|a| !a.is_root())
            .map(|a| a.title.as_str())
            .collect();
        if !self.folder.is_root() {
            titles.push(&self.folder.title);
        }
        format!("/{}", titles.join("/"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Bookmark {
    pub id: BookmarkId,
    pub title: String,
    pub url: String,
    /// Encoded image, usually a `data:` URL.
    pub favicon: Option<String>,
    pub starred: bool,
    #[sqlx(rename = "folder_id")]
    pub folder: FolderId,
    #[sqlx(skip)]
    pub tags: Vec<Tag>,
}

impl Bookmark {
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}

/// A bookmark that has not been stored yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBookmark {
    pub title: String,
    pub url: String,
    pub favicon: Option<String>,
    pub starred: bool,
    /// `None` stores the bookmark in the root folder.
    pub folder: Option<FolderId>,
    pub tags: Vec<String>,
}

impl NewBookmark {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn in_folder(mut self, folder: FolderId) -> Self {
        self.folder = Some(folder);
        self
    }

    pub fn starred(mut self, starred: bool) -> Self {
        self.starred = starred;
        self
    }

    pub fn with_favicon(mut self, favicon: impl Into<String>) -> Self {
        self.favicon = Some(favicon.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Validates a proposed folder or bookmark title.
///
/// Trims surrounding whitespace and rejects titles that end up empty.
pub fn valid_title(title: &str) -> BkmResult<String> {
    let trimmed = title.trim();

    if trimmed.is_empty() {
        return Err(BkmError::InvalidTitle);
    }

    Ok(trimmed.to_owned())
}

/// Normalizes a list of tag names: trimmed, non-empty, deduplicated, in
/// first-seen order.
pub fn normalize_tags<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref().trim();
        if !name.is_empty() && !out.iter().any(|n| n == name) {
            out.push(name.to_owned());
        }
    }
    out
}
