use crate::domain::{FolderId, NewBookmark};
use crate::error::{BkmResult, ParseError};
use crate::tree::Tree;
use chrono::{Local, NaiveDate};
use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};

/// One node of a parsed bookmark file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Folder { title: String, children: Vec<Entry> },
    /// The bookmark's `folder` is ignored; it lands wherever the entry sits.
    Bookmark(NewBookmark),
}

impl Drop for Entry {
    // Flattens nested folders so dropping a deep outline stays off the
    // call stack.
    fn drop(&mut self) {
        if let Entry::Folder { children, .. } = self {
            let mut pending = std::mem::take(children);
            while let Some(mut entry) = pending.pop() {
                if let Entry::Folder { children, .. } = &mut entry {
                    pending.append(children);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    /// The folder created to hold this import.
    pub root: FolderId,
    pub folders: usize,
    pub bookmarks: usize,
}

/// Reads a bookmark file and recreates its folders and bookmarks under a
/// new `import-YYYY-MM-DD` folder below the root.
///
/// The document is fully parsed before anything is written, so a malformed
/// file creates nothing. After that every folder and bookmark is its own
/// transaction: a storage failure part way leaves what was already created
/// in place.
pub async fn import<R>(tree: &Tree, reader: &mut R) -> BkmResult<ImportReport>
where
    R: AsyncRead + Unpin,
{
    let mut raw = Vec::new();
    reader
        .read_to_end(&mut raw)
        .await
        .map_err(ParseError::Read)?;

    let outline = parse_outline(&raw)?;
    import_outline(tree, &outline, Local::now().date_naive()).await
}

/// Creates the import folder for `date` and replays `outline` into it.
pub async fn import_outline(tree: &Tree, outline: &[Entry], date: NaiveDate) -> BkmResult<ImportReport> {
    let title = format!("import-{}", date.format("%Y-%m-%d"));
    let root = tree.add_folder(&title, None).await?;

    let mut report = ImportReport {
        root,
        folders: 0,
        bookmarks: 0,
    };
    replay(tree, outline, root, &mut report).await?;

    info!(
        %root,
        folders = report.folders,
        bookmarks = report.bookmarks,
        "imported bookmarks"
    );
    Ok(report)
}

/// Creates every entry of `outline` below `root`.
///
/// Works from a list of `(entries, target)` pairs: each pair carries the
/// folder its entries belong in, and every imported folder queues its
/// children with itself as their target.
async fn replay(
    tree: &Tree,
    outline: &[Entry],
    root: FolderId,
    report: &mut ImportReport,
) -> BkmResult<()> {
    let mut pending: Vec<(&[Entry], FolderId)> = vec![(outline, root)];

    while let Some((entries, target)) = pending.pop() {
        for entry in entries {
            match entry {
                Entry::Folder { title, children } => {
                    let folder = tree.add_folder(title, Some(target)).await?;
                    report.folders += 1;
                    if !children.is_empty() {
                        pending.push((children, folder));
                    }
                }
                Entry::Bookmark(bookmark) => {
                    let bookmark = bookmark.clone().in_folder(target);
                    tree.store().save_bookmark(&bookmark).await?;
                    report.bookmarks += 1;
                }
            }
        }
    }
    Ok(())
}

/// Parses a bookmark file into an outline of folders and bookmarks.
///
/// A `<DT>` whose first element is an `<H3>` opens a folder holding whatever
/// the rest of that `<DT>` contains; a `<DT>` starting with an `<A HREF>` is
/// a bookmark. Everything else is walked through transparently.
pub fn parse_outline(document: &[u8]) -> Result<Vec<Entry>, ParseError> {
    let dom = parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .read_from(&mut &document[..])
        .map_err(ParseError::Read)?;

    if !contains_element(&dom.document, "dl") {
        return Err(ParseError::NoBookmarkList);
    }

    collect(&dom.document)
}

/// How a finished frame's entries join its parent's.
enum Nesting {
    /// Spliced into the parent's entries.
    Inline,
    /// Wrapped into a folder entry.
    Folder(String),
}

/// A node whose children are being walked.
struct Frame {
    node: Handle,
    next: usize,
    nesting: Nesting,
    entries: Vec<Entry>,
}

impl Frame {
    fn new(node: Handle, nesting: Nesting) -> Self {
        Self {
            node,
            next: 0,
            nesting,
            entries: Vec::new(),
        }
    }
}

/// Walks the DOM depth first with an explicit stack of frames, building each
/// folder's entries in its own frame.
fn collect(document: &Handle) -> Result<Vec<Entry>, ParseError> {
    let mut stack = vec![Frame::new(document.clone(), Nesting::Inline)];

    while let Some(frame) = stack.last_mut() {
        let child = frame.node.children.borrow().get(frame.next).cloned();

        if let Some(child) = child {
            frame.next += 1;
            let mut nesting = Nesting::Inline;

            if element_name(&child) == Some("dt") {
                if let Some(first) = first_element_child(&child) {
                    match element_name(&first) {
                        Some("h3") => {
                            let title = text_content(&first);
                            if title.is_empty() {
                                return Err(ParseError::UntitledFolder);
                            }
                            nesting = Nesting::Folder(title);
                        }
                        Some("a") => {
                            if let Some(bookmark) = bookmark_from_link(&first) {
                                frame.entries.push(Entry::Bookmark(bookmark));
                            }
                        }
                        _ => {}
                    }
                }
            }

            stack.push(Frame::new(child, nesting));
            continue;
        }

        let Some(done) = stack.pop() else { break };
        let Some(parent) = stack.last_mut() else {
            return Ok(done.entries);
        };
        match done.nesting {
            Nesting::Inline => parent.entries.extend(done.entries),
            Nesting::Folder(title) => parent.entries.push(Entry::Folder {
                title,
                children: done.entries,
            }),
        }
    }

    Ok(Vec::new())
}

fn bookmark_from_link(link: &Handle) -> Option<NewBookmark> {
    let Some(url) = attribute(link, "href") else {
        debug!("skipping link without href");
        return None;
    };

    let mut title = text_content(link);
    if title.is_empty() {
        title = url.clone();
    }
    if title.is_empty() {
        debug!("skipping link without text or url");
        return None;
    }

    let starred = attribute(link, "starred")
        .is_some_and(|v| v != "0" && !v.eq_ignore_ascii_case("false"));
    let tags: Vec<String> = attribute(link, "tags")
        .map(|v| v.split(',').map(|t| t.trim().to_owned()).collect())
        .unwrap_or_default();

    let mut bookmark = NewBookmark::new(title, url).starred(starred).with_tags(tags);
    bookmark.favicon = attribute(link, "icon").filter(|i| !i.is_empty());
    Some(bookmark)
}

fn element_name(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(&*name.local),
        _ => None,
    }
}

fn first_element_child(node: &Handle) -> Option<Handle> {
    node.children
        .borrow()
        .iter()
        .find(|c| element_name(c).is_some())
        .cloned()
}

fn attribute(node: &Handle, key: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == key)
            .map(|a| String::from(&*a.value)),
        _ => None,
    }
}

/// Concatenated text below `node`, with surrounding whitespace trimmed.
fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    let mut pending = vec![node.clone()];

    while let Some(node) = pending.pop() {
        if let NodeData::Text { contents } = &node.data {
            out.push_str(&contents.borrow());
        }
        pending.extend(node.children.borrow().iter().rev().cloned());
    }

    out.trim().to_owned()
}

fn contains_element(node: &Handle, tag: &str) -> bool {
    let mut pending = vec![node.clone()];

    while let Some(node) = pending.pop() {
        if element_name(&node) == Some(tag) {
            return true;
        }
        pending.extend(node.children.borrow().iter().cloned());
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder<'a>(entry: &'a Entry) -> (&'a str, &'a [Entry]) {
        match entry {
            Entry::Folder { title, children } => (title, children),
            other => panic!("expected a folder, got {other:?}"),
        }
    }

    fn bookmark(entry: &Entry) -> &NewBookmark {
        match entry {
            Entry::Bookmark(b) => b,
            other => panic!("expected a bookmark, got {other:?}"),
        }
    }

    #[test]
    fn nested_folders_keep_their_own_children() {
        let doc = br#"<!DOCTYPE NETSCAPE-Bookmark-file-1>
<DL><p>
    <DT><H3>Outer</H3>
    <DL><p>
        <DT><H3>Inner</H3>
        <DL><p>
            <DT><A HREF="https://inner.example">Inner link</A>
        </DL><p>
        <DT><A HREF="https://outer.example">Outer link</A>
    </DL><p>
    <DT><A HREF="https://top.example">Top link</A>
</DL><p>
"#;
        let outline = parse_outline(doc).unwrap();
        assert_eq!(outline.len(), 2);

        let (title, outer) = folder(&outline[0]);
        assert_eq!(title, "Outer");
        assert_eq!(outer.len(), 2);

        let (title, inner) = folder(&outer[0]);
        assert_eq!(title, "Inner");
        assert_eq!(inner.len(), 1);
        assert_eq!(bookmark(&inner[0]).url, "https://inner.example");

        // The sibling after Inner must not leak into it.
        assert_eq!(bookmark(&outer[1]).url, "https://outer.example");
        assert_eq!(bookmark(&outline[1]).url, "https://top.example");
    }

    #[test]
    fn link_attributes_are_read() {
        let doc = br#"<DL><p>
<DT><A HREF="https://example.com" ICON="data:image/png;base64,AAAA" TAGS="a, b" STARRED="1">Example &amp; co</A>
</DL><p>"#;
        let outline = parse_outline(doc).unwrap();
        let b = bookmark(&outline[0]);

        assert_eq!(b.title, "Example & co");
        assert_eq!(b.favicon.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(b.tags, vec!["a".to_owned(), "b".to_owned()]);
        assert!(b.starred);
    }

    #[test]
    fn link_without_text_uses_url_as_title() {
        let doc = br#"<DL><p><DT><A HREF="https://untitled.example"></A></DL><p>"#;
        let outline = parse_outline(doc).unwrap();
        assert_eq!(bookmark(&outline[0]).title, "https://untitled.example");
    }

    #[test]
    fn link_with_empty_href_is_kept() {
        let doc = br#"<DL><p><DT><A HREF="">blank</A></DL><p>"#;
        let outline = parse_outline(doc).unwrap();
        let b = bookmark(&outline[0]);

        assert_eq!(b.url, "");
        assert_eq!(b.title, "blank");
    }

    #[test]
    fn link_without_href_is_skipped() {
        let doc = br#"<DL><p><DT><A NAME="anchor">anchor</A></DL><p>"#;
        assert!(parse_outline(doc).unwrap().is_empty());
    }

    #[test]
    fn deeply_nested_folders_are_parsed() {
        let depth = 2000;
        let doc = "<DL><p><DT><H3>x</H3>".repeat(depth);
        let outline = parse_outline(doc.as_bytes()).unwrap();

        let mut level = outline.as_slice();
        let mut seen = 0;
        while let [Entry::Folder { title, children }] = level {
            assert_eq!(title, "x");
            seen += 1;
            level = children.as_slice();
        }
        assert_eq!(seen, depth);
        assert!(level.is_empty());
    }

    #[test]
    fn document_without_list_is_rejected() {
        let err = parse_outline(b"<html><body><p>hello</p></body></html>").unwrap_err();
        assert!(matches!(err, ParseError::NoBookmarkList));
    }

    #[test]
    fn folder_without_title_is_rejected() {
        let doc = br#"<DL><p><DT><H3></H3><DL><p></DL><p></DL><p>"#;
        assert!(matches!(
            parse_outline(doc).unwrap_err(),
            ParseError::UntitledFolder
        ));
    }
}
