//! Structural checks on the collected tree, run before any hashing.
//!
//! The reference scan is textual: it looks for `attr="/…"` patterns in the
//! entry-point file only and does not parse markup, so references built in
//! scripts or stylesheets are not seen.

use crate::collector::FileEntry;
use crate::error::{Error, Result};

/// Returns the entry-point file: the one named `entry_point` closest to the
/// root, ties broken by path order.
pub fn find_entry_point<'a>(files: &'a [FileEntry], entry_point: &str) -> Option<&'a FileEntry> {
    files
        .iter()
        .filter(|file| file.name() == entry_point)
        .min_by(|a, b| a.depth().cmp(&b.depth()).then_with(|| a.path.cmp(&b.path)))
}

/// Every attribute-style reference in `content` whose value starts with `/`,
/// verbatim and in order of appearance.
pub fn absolute_references(content: &str) -> Vec<String> {
    let pattern = lazy_regex::regex!(r#"[A-Za-z][\w:.-]*\s*=\s*(?:"/[^"]*"|'/[^']*')"#);
    pattern
        .find_iter(content)
        .map(|m| m.as_str().to_owned())
        .collect()
}

/// Fails unless `files` contains the entry point and that file has no
/// absolute references.
pub fn validate(files: &[FileEntry], entry_point: &str) -> Result<()> {
    let entry = find_entry_point(files, entry_point)
        .ok_or_else(|| Error::MissingEntryPoint(entry_point.into()))?;

    let content = String::from_utf8_lossy(&entry.content);
    let matches = absolute_references(&content);
    if !matches.is_empty() {
        return Err(Error::AbsolutePathReference {
            file: entry.path.clone(),
            matches,
        });
    }

    tracing::debug!(entry_point = %entry.path, "pre-flight checks passed");
    Ok(())
}
