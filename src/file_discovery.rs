//! Candidate file discovery
//!
//! Turns the input path into the ordered list of `.xml` files to validate,
//! and computes the base directory that reports are made relative to.

use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

use crate::error::{Result, ValidationError};

/// File name suffix of candidate documents, matched case-insensitively
pub const XML_SUFFIX: &str = ".xml";

/// Directory walker that selects XML documents
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    /// Follow symbolic links while descending
    follow_symlinks: bool,
}

impl FileDiscovery {
    pub fn new() -> Self {
        Self {
            follow_symlinks: false,
        }
    }

    /// Set whether to follow symbolic links
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Collect candidate files under `input`, in a stable order.
    ///
    /// A regular file yields itself iff it is an XML file. A directory is
    /// walked recursively with entries sorted by name at every level.
    /// Entries that cannot be read are skipped; an empty result is not an
    /// error.
    pub fn collect(&self, input: &Path) -> Vec<PathBuf> {
        if input.is_file() {
            return if is_xml_file(input) {
                vec![input.to_path_buf()]
            } else {
                Vec::new()
            };
        }

        let walker = WalkBuilder::new(input)
            .standard_filters(false)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            let is_file = entry.file_type().is_some_and(|t| t.is_file());
            if is_file && is_xml_file(entry.path()) {
                files.push(entry.into_path());
            }
        }

        debug!(root = %input.display(), count = files.len(), "discovery finished");
        files
    }
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

/// True if the file name ends in `.xml`, ignoring case
pub fn is_xml_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase().ends_with(XML_SUFFIX))
        .unwrap_or(false)
}

/// Make `path` absolute against the current directory and remove `.` and
/// `..` components lexically
pub fn normalize_path(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Root for relative paths in reports: the input itself when it is a
/// directory, otherwise its parent
pub fn base_directory(input: &Path) -> Result<PathBuf> {
    if input.is_dir() {
        return Ok(input.to_path_buf());
    }
    input
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| ValidationError::Config(format!("{} has no parent", input.display())))
}

/// `file` relative to `base`, or `file` unchanged when it lies outside `base`
pub fn relative_to(base: &Path, file: &Path) -> PathBuf {
    file.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| file.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_directory() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("subdir1")).unwrap();
        fs::create_dir_all(root.join("subdir2/nested")).unwrap();

        fs::write(root.join("file1.xml"), "<a/>").unwrap();
        fs::write(root.join("FILE2.XML"), "<a/>").unwrap();
        fs::write(root.join("file3.txt"), "text file").unwrap();
        fs::write(root.join(".hidden.xml"), "<a/>").unwrap();
        fs::write(root.join("subdir1/nested.xml"), "<a/>").unwrap();
        fs::write(root.join("subdir2/nested/deep.Xml"), "<a/>").unwrap();
        fs::write(root.join("subdir2/nested/other.xsd"), "schema").unwrap();
        fs::write(root.join("subdir2/notes.xml.bak"), "<a/>").unwrap();

        temp_dir
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| relative_to(root, p).to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_collect_xml_files_case_insensitive() {
        let temp_dir = create_test_directory();
        let files = FileDiscovery::new().collect(temp_dir.path());

        assert_eq!(
            names(temp_dir.path(), &files),
            vec![
                ".hidden.xml",
                "FILE2.XML",
                "file1.xml",
                "subdir1/nested.xml",
                "subdir2/nested/deep.Xml",
            ]
        );
    }

    #[test]
    fn test_collect_is_deterministic() {
        let temp_dir = create_test_directory();
        let discovery = FileDiscovery::new();

        let first = discovery.collect(temp_dir.path());
        let second = discovery.collect(temp_dir.path());
        assert_eq!(first, second);
    }

    #[test]
    fn test_collect_single_file() {
        let temp_dir = create_test_directory();
        let discovery = FileDiscovery::new();

        let xml = temp_dir.path().join("file1.xml");
        assert_eq!(discovery.collect(&xml), vec![xml.clone()]);

        let txt = temp_dir.path().join("file3.txt");
        assert!(discovery.collect(&txt).is_empty());
    }

    #[test]
    fn test_collect_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(FileDiscovery::new().collect(temp_dir.path()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_not_followed_by_default() {
        let temp_dir = create_test_directory();
        let root = temp_dir.path();
        // A cycle back to the root must not loop
        std::os::unix::fs::symlink(root, root.join("subdir1/loop")).unwrap();

        let files = FileDiscovery::new().collect(root);
        assert_eq!(files.len(), 5);
    }

    #[cfg(unix)]
    #[test]
    fn test_follow_symlinks_opt_in() {
        let temp_dir = create_test_directory();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("linked.xml"), "<a/>").unwrap();
        std::os::unix::fs::symlink(outside.path(), temp_dir.path().join("linked")).unwrap();

        let default = FileDiscovery::new().collect(temp_dir.path());
        assert_eq!(default.len(), 5);

        let followed = FileDiscovery::new()
            .with_follow_symlinks(true)
            .collect(temp_dir.path());
        assert_eq!(followed.len(), 6);
        assert!(
            names(temp_dir.path(), &followed).contains(&"linked/linked.xml".to_string())
        );
    }

    #[test]
    fn test_is_xml_file() {
        assert!(is_xml_file(Path::new("a.xml")));
        assert!(is_xml_file(Path::new("dir/B.XML")));
        assert!(!is_xml_file(Path::new("a.xsd")));
        assert!(!is_xml_file(Path::new("a.xml.bak")));
        assert!(!is_xml_file(Path::new("xml")));
    }

    #[test]
    fn test_normalize_path() {
        let normalized = normalize_path(Path::new("/data/./in/../xml")).unwrap();
        assert_eq!(normalized, PathBuf::from("/data/xml"));

        let relative = normalize_path(Path::new("some/dir")).unwrap();
        assert!(relative.is_absolute());
        assert!(relative.ends_with("some/dir"));
    }

    #[test]
    fn test_base_directory() {
        let temp_dir = create_test_directory();
        let root = temp_dir.path();

        assert_eq!(base_directory(root).unwrap(), root);
        assert_eq!(
            base_directory(&root.join("subdir1/nested.xml")).unwrap(),
            root.join("subdir1")
        );
    }

    #[test]
    fn test_relative_to() {
        let base = Path::new("/input");
        assert_eq!(
            relative_to(base, Path::new("/input/sub/dir/c.xml")),
            PathBuf::from("sub/dir/c.xml")
        );
        assert_eq!(
            relative_to(base, Path::new("/elsewhere/c.xml")),
            PathBuf::from("/elsewhere/c.xml")
        );
    }
}
