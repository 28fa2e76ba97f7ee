//! Names and paths
//!
//! Bucket and object name validation shared by every adapter, plus parsing
//! of command-line paths in the format: storage/bucket[/key].
//! Local paths are passed through as-is.

use crate::error::{Error, Result};
use crate::profile::is_valid_profile_name;

/// Reject an empty bucket name
pub fn validate_bucket(bucket: &str) -> Result<()> {
    if bucket.trim().is_empty() {
        return Err(Error::Validation("bucket name cannot be empty".into()));
    }
    Ok(())
}

/// Normalize an object name by stripping a single leading `/`
///
/// Empty names and the bare `/` are rejected.
pub fn format_object_name(key: &str) -> Result<String> {
    if key.trim().is_empty() || key == "/" {
        return Err(Error::Validation(format!("invalid object name '{key}'")));
    }
    Ok(key.strip_prefix('/').unwrap_or(key).to_string())
}

/// Validate both halves of an object address and return the normalized key
pub fn object_name(bucket: &str, key: &str) -> Result<String> {
    validate_bucket(bucket)?;
    format_object_name(key)
}

/// A parsed remote path pointing to an object storage location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    /// Storage (profile) name
    pub storage: String,
    /// Bucket name
    pub bucket: String,
    /// Object key (empty for bucket root)
    pub key: String,
    /// Whether the path ends with a slash (directory semantics)
    pub is_dir: bool,
}

impl RemotePath {
    pub fn new(
        storage: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let is_dir = key.ends_with('/') || key.is_empty();
        Self {
            storage: storage.into(),
            bucket: bucket.into(),
            key,
            is_dir,
        }
    }

    /// Get the full path as a string (storage/bucket/key)
    pub fn to_full_path(&self) -> String {
        if self.key.is_empty() {
            format!("{}/{}", self.storage, self.bucket)
        } else {
            format!("{}/{}/{}", self.storage, self.bucket, self.key)
        }
    }

    /// Join a child path component
    pub fn join(&self, child: &str) -> Self {
        let base = self.key.trim_end_matches('/');
        let key = if base.is_empty() {
            child.to_string()
        } else {
            format!("{base}/{child}")
        };
        let is_dir = child.ends_with('/');
        Self {
            storage: self.storage.clone(),
            bucket: self.bucket.clone(),
            key,
            is_dir,
        }
    }

    /// Last component of the key, used as a local file name
    pub fn file_name(&self) -> Option<&str> {
        self.key
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
    }
}

impl std::fmt::Display for RemotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_full_path())
    }
}

/// Parsed path that can be either local or remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedPath {
    /// Local filesystem path
    Local(std::path::PathBuf),
    /// Remote object storage path
    Remote(RemotePath),
}

impl ParsedPath {
    pub fn is_remote(&self) -> bool {
        matches!(self, ParsedPath::Remote(_))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ParsedPath::Local(_))
    }

    pub fn as_remote(&self) -> Option<&RemotePath> {
        match self {
            ParsedPath::Remote(p) => Some(p),
            ParsedPath::Local(_) => None,
        }
    }

    pub fn as_local(&self) -> Option<&std::path::PathBuf> {
        match self {
            ParsedPath::Local(p) => Some(p),
            ParsedPath::Remote(_) => None,
        }
    }
}

/// Parse a path string into a ParsedPath
///
/// Remote paths have the format: storage/bucket[/key]
/// Local paths are anything that:
/// - Starts with / (absolute path)
/// - Starts with ./ or ../ (relative path)
/// - Is a single component containing a dot (file in current directory)
/// - Or doesn't match the storage/bucket pattern
pub fn parse_path(path: &str) -> Result<ParsedPath> {
    if path.is_empty() {
        return Err(Error::Validation("Path cannot be empty".into()));
    }

    if path.starts_with('/') || path.starts_with("./") || path.starts_with("../") {
        return Ok(ParsedPath::Local(std::path::PathBuf::from(path)));
    }

    // Windows absolute paths
    #[cfg(windows)]
    if path.len() >= 2 && path.chars().nth(1) == Some(':') {
        return Ok(ParsedPath::Local(std::path::PathBuf::from(path)));
    }

    let mut parts = path.splitn(3, '/');
    let storage = parts.next().unwrap_or_default();
    let bucket = parts.next();
    let key = parts.next().unwrap_or_default();

    let Some(bucket) = bucket else {
        if storage.contains('.') || storage.contains('\\') {
            return Ok(ParsedPath::Local(std::path::PathBuf::from(path)));
        }
        return Err(Error::Validation(format!(
            "Path '{path}' is incomplete. Use format: storage/bucket[/key]"
        )));
    };

    if !is_valid_profile_name(storage) {
        return Ok(ParsedPath::Local(std::path::PathBuf::from(path)));
    }

    if bucket.is_empty() {
        return Err(Error::Validation("Bucket name cannot be empty".into()));
    }

    Ok(ParsedPath::Remote(RemotePath::new(storage, bucket, key)))
}

/// Parse a path that must be remote
pub fn parse_remote(path: &str) -> Result<RemotePath> {
    match parse_path(path)? {
        ParsedPath::Remote(remote) => Ok(remote),
        ParsedPath::Local(_) => Err(Error::Validation(format!(
            "'{path}' is not a remote path. Use format: storage/bucket[/key]"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_bucket() {
        assert!(validate_bucket("photos").is_ok());
        assert!(matches!(validate_bucket(""), Err(Error::Validation(_))));
        assert!(matches!(validate_bucket("  "), Err(Error::Validation(_))));
    }

    #[test]
    fn test_format_object_name() {
        assert_eq!(format_object_name("a/b.txt").unwrap(), "a/b.txt");
        assert_eq!(format_object_name("/a/b.txt").unwrap(), "a/b.txt");
        // Only one leading slash is stripped
        assert_eq!(format_object_name("//a").unwrap(), "/a");

        assert!(matches!(format_object_name(""), Err(Error::Validation(_))));
        assert!(matches!(format_object_name("/"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_object_name_checks_bucket_first() {
        let err = object_name("", "key").unwrap_err();
        assert!(err.to_string().contains("bucket"));
        assert_eq!(object_name("b", "/k").unwrap(), "k");
    }

    #[test]
    fn test_parse_remote_path() {
        let path = parse_path("aliyun/bucket/file.txt").unwrap();
        assert!(path.is_remote());

        let remote = path.as_remote().unwrap();
        assert_eq!(remote.storage, "aliyun");
        assert_eq!(remote.bucket, "bucket");
        assert_eq!(remote.key, "file.txt");
        assert!(!remote.is_dir);
    }

    #[test]
    fn test_parse_remote_path_dir() {
        let path = parse_path("minio/bucket/dir/").unwrap();
        let remote = path.as_remote().unwrap();
        assert_eq!(remote.key, "dir/");
        assert!(remote.is_dir);
    }

    #[test]
    fn test_parse_remote_path_bucket_only() {
        let remote = parse_remote("minio/bucket").unwrap();
        assert_eq!(remote.storage, "minio");
        assert_eq!(remote.bucket, "bucket");
        assert_eq!(remote.key, "");
        assert!(remote.is_dir);
    }

    #[test]
    fn test_parse_local_paths() {
        let path = parse_path("/home/user/file.txt").unwrap();
        assert!(path.is_local());
        assert_eq!(
            path.as_local().unwrap().to_str().unwrap(),
            "/home/user/file.txt"
        );

        assert!(parse_path("./file.txt").unwrap().is_local());
        assert!(parse_path("../file.txt").unwrap().is_local());
        assert!(parse_path("some.file.txt").unwrap().is_local());
    }

    #[test]
    fn test_parse_invalid_paths() {
        assert!(parse_path("").is_err());
        assert!(parse_path("minio").is_err());
        assert!(parse_path("minio/").is_err());
        assert!(parse_remote("./file.txt").is_err());
    }

    #[test]
    fn test_remote_path_join_and_file_name() {
        let path = RemotePath::new("minio", "bucket", "");
        assert!(path.file_name().is_none());

        let child = path.join("dir/");
        assert_eq!(child.key, "dir/");
        assert!(child.is_dir);
        assert_eq!(child.file_name(), Some("dir"));

        let file = child.join("file.txt");
        assert_eq!(file.key, "dir/file.txt");
        assert!(!file.is_dir);
        assert_eq!(file.file_name(), Some("file.txt"));
    }

    #[test]
    fn test_remote_path_display() {
        let path = RemotePath::new("minio", "bucket", "key/file.txt");
        assert_eq!(path.to_string(), "minio/bucket/key/file.txt");
        assert_eq!(RemotePath::new("minio", "b", "").to_string(), "minio/b");
    }
}
