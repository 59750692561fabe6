//! Suffix matching over a single directory listing.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::Path;

/// Return the names of entries directly inside `dir` ending in any of `extensions`.
///
/// Names come back in directory-listing order, each at most once. An empty
/// extension list matches nothing and does not read the directory.
pub fn matching_files(dir: &Path, extensions: &[String]) -> io::Result<Vec<OsString>> {
    if extensions.is_empty() {
        return Ok(Vec::new());
    }

    let mut matched = Vec::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        if has_suffix(&name, extensions) {
            matched.push(name);
        }
    }

    Ok(matched)
}

/// Byte-wise, case-sensitive suffix check.
pub fn has_suffix(name: &OsStr, extensions: &[String]) -> bool {
    let bytes = name.as_encoded_bytes();
    extensions
        .iter()
        .any(|ext| bytes.ends_with(ext.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn populate(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), b"").unwrap();
        }
    }

    fn as_set(names: Vec<OsString>) -> HashSet<OsString> {
        names.into_iter().collect()
    }

    #[test]
    fn test_matches_exactly_the_suffixed_entries() {
        let temp = TempDir::new().unwrap();
        populate(
            temp.path(),
            &["a.pdf", "b.txt", "c.PDF", "d.pdf.part", "pdf", "e.txt"],
        );

        let found = matching_files(temp.path(), &exts(&[".pdf", ".txt"])).unwrap();

        let expected: HashSet<OsString> = ["a.pdf", "b.txt", "e.txt"]
            .into_iter()
            .map(OsString::from)
            .collect();
        assert_eq!(found.len(), 3);
        assert_eq!(as_set(found), expected);
    }

    #[test]
    fn test_empty_extensions_match_nothing() {
        let temp = TempDir::new().unwrap();
        populate(temp.path(), &["a.pdf", "b.txt"]);

        assert!(matching_files(temp.path(), &[]).unwrap().is_empty());
        // No read happens, so a missing directory is not an error either
        assert!(
            matching_files(&temp.path().join("missing"), &[])
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_overlapping_extensions_report_once() {
        let temp = TempDir::new().unwrap();
        populate(temp.path(), &["backup.tar.gz", "plain.gz"]);

        let found = matching_files(temp.path(), &exts(&[".gz", ".tar.gz"])).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_order_follows_directory_listing() {
        let temp = TempDir::new().unwrap();
        populate(temp.path(), &["x.log", "y.txt", "z.log", "w.log"]);

        let listing: Vec<OsString> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| n.to_string_lossy().ends_with(".log"))
            .collect();

        let found = matching_files(temp.path(), &exts(&[".log"])).unwrap();
        assert_eq!(found, listing);
    }

    #[test]
    fn test_not_recursive() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("nested");
        fs::create_dir(&nested).unwrap();
        populate(&nested, &["inner.log"]);
        populate(temp.path(), &["outer.log"]);

        let found = matching_files(temp.path(), &exts(&[".log"])).unwrap();
        assert_eq!(found, vec![OsString::from("outer.log")]);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = matching_files(&temp.path().join("missing"), &exts(&[".log"])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
