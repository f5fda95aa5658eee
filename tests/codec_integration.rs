mod common;

use bkm_core::codec::{self, Entry};
use bkm_core::domain::{FolderId, NewBookmark};
use bkm_core::error::ParseError;
use bkm_core::{BkmError, BkmResult, Tree};
use chrono::NaiveDate;
use common::open_tree;
use tempfile::TempDir;

const NESTED: &str = r#"<!DOCTYPE NETSCAPE-Bookmark-file-1>
<META HTTP-EQUIV="Content-Type" CONTENT="text/html; charset=UTF-8">
<TITLE>Bookmarks</TITLE>
<H1>Bookmarks</H1>
<DL><p>
    <DT><H3>Outer</H3>
    <DL><p>
        <DT><H3>Inner</H3>
        <DL><p>
            <DT><A HREF="https://example.com/inner">Inner link</A>
        </DL><p>
    </DL><p>
</DL><p>
"#;

async fn export_string(tree: &Tree) -> BkmResult<String> {
    let mut out = Vec::new();
    codec::export_tree(tree.store(), &mut out).await?;
    Ok(String::from_utf8(out).expect("export is utf-8"))
}

#[tokio::test]
async fn export_writes_folders_and_bookmarks() -> Result<(), BkmError> {
    let tmpdir = TempDir::new()?;
    let tree = open_tree(&tmpdir).await?;

    let dev = tree.add_folder("Dev", None).await?;
    tree.add_bookmark(
        NewBookmark::new("Rust <3", "https://www.rust-lang.org/")
            .in_folder(dev)
            .starred(true)
            .with_tags(["lang"])
            .with_favicon("data:image/png;base64,AAAA"),
    )
    .await?;
    tree.add_bookmark(NewBookmark::new("Top", "https://top.example").with_favicon("x"))
        .await?;

    let html = export_string(&tree).await?;

    assert!(html.starts_with("<!DOCTYPE NETSCAPE-Bookmark-file-1>"));
    assert!(html.contains("<DT><H3>/</H3>"));
    assert!(html.contains("<DT><H3>Dev</H3>"));
    assert!(html.contains(
        r#"<DT><A HREF="https://www.rust-lang.org/" ICON="data:image/png;base64,AAAA" TAGS="lang" STARRED="1">Rust &lt;3</A>"#
    ));

    // bookmarks come before subfolders
    let top = html.find("https://top.example").unwrap();
    let dev = html.find("<H3>Dev</H3>").unwrap();
    assert!(top < dev);

    // every opened list is closed
    assert_eq!(html.matches("<DL><p>").count(), html.matches("</DL><p>").count());
    Ok(())
}

#[tokio::test]
async fn export_of_a_subtree() -> Result<(), BkmError> {
    let tmpdir = TempDir::new()?;
    let tree = open_tree(&tmpdir).await?;

    let a = tree.add_folder("A", None).await?;
    let b = tree.add_folder("B", Some(a)).await?;
    tree.add_folder("Elsewhere", None).await?;
    tree.add_bookmark(NewBookmark::new("in b", "https://b.example").in_folder(b).with_favicon("x"))
        .await?;

    let mut out = Vec::new();
    let report = codec::export_folder(tree.store(), a, &mut out).await?;
    let html = String::from_utf8(out).unwrap();

    assert_eq!(report.folders, 2);
    assert_eq!(report.bookmarks, 1);
    assert!(html.contains("https://b.example"));
    assert!(!html.contains("Elsewhere"));
    Ok(())
}

#[tokio::test]
async fn import_recreates_nested_folders() -> Result<(), BkmError> {
    let tmpdir = TempDir::new()?;
    let tree = open_tree(&tmpdir).await?;

    let report = codec::import(&tree, &mut NESTED.as_bytes()).await?;
    assert_eq!(report.folders, 2);
    assert_eq!(report.bookmarks, 1);

    let import_root = tree.get_folder(report.root).await?;
    assert!(import_root.folder.title.starts_with("import-"));
    assert_eq!(import_root.folder.parent, Some(FolderId::ROOT));
    assert_eq!(import_root.folder.child_folder_count, 1);

    let outer = tree.store().list_folder_subfolders(report.root).await?;
    assert_eq!(outer.len(), 1);
    assert_eq!(outer[0].title, "Outer");
    assert!(tree.store().list_folder_bookmarks(outer[0].id).await?.is_empty());

    let inner = tree.store().list_folder_subfolders(outer[0].id).await?;
    assert_eq!(inner.len(), 1);
    assert_eq!(inner[0].title, "Inner");

    let links = tree.store().list_folder_bookmarks(inner[0].id).await?;
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].url, "https://example.com/inner");
    assert_eq!(links[0].title, "Inner link");
    Ok(())
}

#[tokio::test]
async fn import_folder_is_named_after_the_date() -> Result<(), BkmError> {
    let tmpdir = TempDir::new()?;
    let tree = open_tree(&tmpdir).await?;

    let outline = vec![
        Entry::Bookmark(NewBookmark::new("one", "https://one.example")),
        Entry::Folder {
            title: "Empty".to_owned(),
            children: Vec::new(),
        },
    ];
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let report = codec::import_outline(&tree, &outline, date).await?;

    let root = tree.get_folder(report.root).await?;
    assert_eq!(root.folder.title, "import-2024-05-01");
    assert_eq!(tree.store().list_folder_bookmarks(report.root).await?.len(), 1);
    assert_eq!(tree.store().list_folder_subfolders(report.root).await?[0].title, "Empty");
    Ok(())
}

#[tokio::test]
async fn malformed_document_creates_nothing() -> Result<(), BkmError> {
    let tmpdir = TempDir::new()?;
    let tree = open_tree(&tmpdir).await?;

    let result = codec::import(&tree, &mut "just some text".as_bytes()).await;
    assert!(matches!(
        result,
        Err(BkmError::Parse(ParseError::NoBookmarkList))
    ));

    let untitled = "<DL><p><DT><H3> </H3><DL><p><DT><A HREF=\"https://x.example\">x</A></DL><p></DL><p>";
    let result = codec::import(&tree, &mut untitled.as_bytes()).await;
    assert!(matches!(
        result,
        Err(BkmError::Parse(ParseError::UntitledFolder))
    ));

    assert_eq!(tree.store().count_folders().await?, 1);
    assert_eq!(tree.store().count_bookmarks().await?, 0);
    Ok(())
}

#[tokio::test]
async fn export_then_import_round_trips() -> Result<(), BkmError> {
    let tmpdir = TempDir::new()?;
    let tree = open_tree(&tmpdir).await?;

    let docs = tree.add_folder("Docs & Guides", None).await?;
    tree.add_bookmark(
        NewBookmark::new("The \"Book\"", "https://doc.rust-lang.org/book/?a=1&b=2")
            .in_folder(docs)
            .starred(true)
            .with_tags(["rust", "reading"])
            .with_favicon("data:image/png;base64,AAAA"),
    )
    .await?;

    let html = export_string(&tree).await?;
    let report = codec::import(&tree, &mut html.as_bytes()).await?;

    // the exported root comes back as a folder named "/"
    let slash = tree.store().list_folder_subfolders(report.root).await?;
    assert_eq!(slash.len(), 1);
    assert_eq!(slash[0].title, "/");

    let folders = tree.store().list_folder_subfolders(slash[0].id).await?;
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].title, "Docs & Guides");

    let bookmarks = tree.store().list_folder_bookmarks(folders[0].id).await?;
    assert_eq!(bookmarks.len(), 1);
    let copy = &bookmarks[0];
    assert_eq!(copy.title, "The \"Book\"");
    assert_eq!(copy.url, "https://doc.rust-lang.org/book/?a=1&b=2");
    assert_eq!(copy.favicon.as_deref(), Some("data:image/png;base64,AAAA"));
    assert!(copy.starred);
    assert_eq!(copy.tag_names(), ["reading", "rust"]);
    Ok(())
}

#[tokio::test]
async fn export_to_path_writes_the_file() -> Result<(), BkmError> {
    let tmpdir = TempDir::new()?;
    let tree = open_tree(&tmpdir).await?;
    tree.add_bookmark(NewBookmark::new("Example", "https://example.com").with_favicon("x"))
        .await?;

    let path = tmpdir.path().join("export").join("bookmarks.html");
    tokio::fs::create_dir_all(path.parent().unwrap()).await?;

    let report = codec::export_to_path(tree.store(), &path).await?;
    assert_eq!(report.bookmarks, 1);

    let written = tokio::fs::read_to_string(&path).await?;
    assert!(written.contains("https://example.com"));
    assert!(written.ends_with("</DL><p>\n"));
    Ok(())
}

#[tokio::test]
async fn empty_url_survives_a_round_trip() -> Result<(), BkmError> {
    let tmpdir = TempDir::new()?;
    let tree = open_tree(&tmpdir).await?;

    // urls are not validated, so an empty one is a legal bookmark
    tree.add_bookmark(NewBookmark::new("blank", "").with_favicon("x"))
        .await?;

    let html = export_string(&tree).await?;
    assert!(html.contains(r#"<DT><A HREF="" ICON="x">blank</A>"#));

    let report = codec::import(&tree, &mut html.as_bytes()).await?;
    assert_eq!(report.bookmarks, 1);

    let slash = tree.store().list_folder_subfolders(report.root).await?;
    let copies = tree.store().list_folder_bookmarks(slash[0].id).await?;
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].title, "blank");
    assert_eq!(copies[0].url, "");
    Ok(())
}

#[tokio::test]
async fn deep_tree_exports_and_imports() -> Result<(), BkmError> {
    const DEPTH: usize = 1000;

    let tmpdir = TempDir::new()?;
    let tree = open_tree(&tmpdir).await?;

    // one transaction for the whole chain keeps the setup fast
    let mut txn = tree.store().begin().await?;
    let mut bottom = FolderId::ROOT;
    for level in 0..DEPTH {
        let id = txn.create_folder(&format!("level-{level}"), bottom).await?;
        txn.recount_children(bottom).await?;
        bottom = id;
    }
    txn.commit().await?;
    tree.add_bookmark(
        NewBookmark::new("bottom", "https://bottom.example")
            .in_folder(bottom)
            .with_favicon("x"),
    )
    .await?;

    let mut out = Vec::new();
    let exported = codec::export_tree(tree.store(), &mut out).await?;
    assert_eq!(exported.folders, DEPTH + 1);
    assert_eq!(exported.bookmarks, 1);

    let html = String::from_utf8(out).unwrap();
    assert_eq!(html.matches("<DL><p>").count(), html.matches("</DL><p>").count());

    let imported = codec::import(&tree, &mut html.as_bytes()).await?;
    assert_eq!(imported.folders, DEPTH + 1);
    assert_eq!(imported.bookmarks, 1);

    // walk the copy: import root, "/", then one folder per level
    let slash = tree.store().list_folder_subfolders(imported.root).await?;
    assert_eq!(slash.len(), 1);
    let mut current = slash[0].id;
    for level in 0..DEPTH {
        let children = tree.store().list_folder_subfolders(current).await?;
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].title, format!("level-{level}"));
        current = children[0].id;
    }

    let links = tree.store().list_folder_bookmarks(current).await?;
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].url, "https://bottom.example");
    Ok(())
}
