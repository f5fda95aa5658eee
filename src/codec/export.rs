use super::{FOOTER, HEADER, escape};
use crate::domain::{Bookmark, Folder, FolderId};
use crate::error::BkmResult;
use crate::store::Store;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub folders: usize,
    pub bookmarks: usize,
}

/// Writes the whole tree, starting at the root folder.
pub async fn export_tree<W>(store: &Store, writer: &mut W) -> BkmResult<ExportReport>
where
    W: AsyncWrite + Unpin + Send,
{
    export_folder(store, FolderId::ROOT, writer).await
}

/// Writes `root` and everything below it as a complete bookmark file.
///
/// Folders are visited depth first: a folder's heading, then its bookmarks,
/// then its subfolders, each level in title order. Only the pending
/// subfolders of the folders on the current path are held in memory.
pub async fn export_folder<W>(store: &Store, root: FolderId, writer: &mut W) -> BkmResult<ExportReport>
where
    W: AsyncWrite + Unpin + Send,
{
    let folder = store.get_folder(root).await?.folder;
    let mut report = ExportReport::default();

    writer.write_all(HEADER.as_bytes()).await?;
    write_subtree(store, folder, writer, &mut report).await?;
    writer.write_all(FOOTER.as_bytes()).await?;
    writer.flush().await?;

    info!(
        root = %root,
        folders = report.folders,
        bookmarks = report.bookmarks,
        "exported bookmarks"
    );
    Ok(report)
}

/// Exports the whole tree to `path`.
///
/// Writes to a temporary file next to `path` and renames it in place, so
/// `path` never holds a partial export.
pub async fn export_to_path(store: &Store, path: &Path) -> BkmResult<ExportReport> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let tmp = NamedTempFile::new_in(dir)?;
    let mut file = tokio::fs::File::from_std(tmp.reopen()?);

    let report = export_tree(store, &mut file).await?;
    file.sync_all().await?;
    drop(file);

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(report)
}

/// A folder whose heading and bookmarks are written and whose subfolders
/// are still pending.
struct Frame {
    depth: usize,
    subfolders: std::vec::IntoIter<Folder>,
}

/// Depth-first traversal over an explicit stack of frames, so the depth of
/// the tree never shows up on the call stack.
async fn write_subtree<W>(
    store: &Store,
    root: Folder,
    writer: &mut W,
    report: &mut ExportReport,
) -> BkmResult<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut stack = vec![open_folder(store, root, 1, writer, report).await?];

    while let Some(frame) = stack.last_mut() {
        match frame.subfolders.next() {
            Some(child) => {
                let depth = frame.depth + 1;
                stack.push(open_folder(store, child, depth, writer, report).await?);
            }
            None => {
                let indent = "\t".repeat(frame.depth);
                writer
                    .write_all(format!("{indent}</DL><p>\n").as_bytes())
                    .await?;
                stack.pop();
            }
        }
    }
    Ok(())
}

/// Writes a folder's heading and bookmarks and returns the frame holding its
/// subfolders. The closing `</DL>` is written when the frame is popped.
async fn open_folder<W>(
    store: &Store,
    folder: Folder,
    depth: usize,
    writer: &mut W,
    report: &mut ExportReport,
) -> BkmResult<Frame>
where
    W: AsyncWrite + Unpin + Send,
{
    debug!(id = %folder.id, depth, "exporting folder");
    let indent = "\t".repeat(depth);

    let heading = format!(
        "{indent}<DT><H3>{}</H3>\n{indent}<DL><p>\n",
        escape(&folder.title)
    );
    writer.write_all(heading.as_bytes()).await?;
    report.folders += 1;

    for bookmark in store.list_folder_bookmarks(folder.id).await? {
        let line = format!("{indent}\t{}\n", bookmark_line(&bookmark));
        writer.write_all(line.as_bytes()).await?;
        report.bookmarks += 1;
    }

    let subfolders = store.list_folder_subfolders(folder.id).await?;
    Ok(Frame {
        depth,
        subfolders: subfolders.into_iter(),
    })
}

fn bookmark_line(bookmark: &Bookmark) -> String {
    let mut line = format!("<DT><A HREF=\"{}\"", escape(&bookmark.url));

    if let Some(icon) = bookmark.favicon.as_deref().filter(|i| !i.is_empty()) {
        line.push_str(&format!(" ICON=\"{}\"", escape(icon)));
    }
    if !bookmark.tags.is_empty() {
        line.push_str(&format!(" TAGS=\"{}\"", escape(&bookmark.tag_names().join(","))));
    }
    if bookmark.starred {
        line.push_str(" STARRED=\"1\"");
    }

    line.push_str(&format!(">{}</A>", escape(&bookmark.title)));
    line
}
