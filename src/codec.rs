//! Conversion between the bookmark tree and Netscape bookmark files.
//!
//! The format is the nested HTML most browsers export:
//!
//! ```text
//! <DL><p>
//!     <DT><H3>folder title</H3>
//!     <DL><p>
//!         <DT><A HREF="https://example.com" ICON="data:...">link title</A>
//!     </DL><p>
//! </DL><p>
//! ```
//!
//! [`export`] streams a folder and everything below it to an async writer
//! without loading the whole tree. [`import`] parses a document and replays
//! it through the [`Tree`](crate::tree::Tree) under a fresh import folder.

pub mod export;
pub mod import;

pub use export::{ExportReport, export_folder, export_to_path, export_tree};
pub use import::{Entry, ImportReport, import, import_outline, parse_outline};

pub(crate) const HEADER: &str = "<!DOCTYPE NETSCAPE-Bookmark-file-1>
<!-- This is an automatically generated file.
     It will be read and overwritten.
     DO NOT EDIT! -->
<META HTTP-EQUIV=\"Content-Type\" CONTENT=\"text/html; charset=UTF-8\">
<TITLE>Bookmarks</TITLE>
<H1>Bookmarks</H1>
<DL><p>
";

pub(crate) const FOOTER: &str = "</DL><p>\n";

/// Escapes text for use in element content or a double-quoted attribute.
pub(crate) fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape;

    #[test]
    fn escape_markup_characters() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(
            escape(r#"a <b> & "c""#),
            "a &lt;b&gt; &amp; &quot;c&quot;"
        );
    }
}
