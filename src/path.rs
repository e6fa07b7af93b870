//! Path normalization and the `r:` remote marker.
//!
//! Paths handled by a [`Connection`](crate::connection::Connection) are plain
//! strings with forward slashes. Only `/` keeps its trailing slash.

/// Prefix that routes a path to the remote side.
pub const REMOTE_MARKER: &str = "r:";

/// Converts backslashes to slashes and drops trailing slashes.
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Splits at the final separator, like `os.path.split` on posix.
///
/// The head keeps a leading `/` when it is the only separator: `split("/a")`
/// is `("/", "a")`, `split("a")` is `("", "a")`, `split("a/")` is `("a", "")`.
pub fn split(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(pos) => {
            let head = &path[..=pos];
            let tail = &path[pos + 1..];
            let stripped = head.trim_end_matches('/');
            if stripped.is_empty() {
                (head, tail)
            } else {
                (stripped, tail)
            }
        }
        None => ("", path),
    }
}

pub fn basename(path: &str) -> &str {
    split(path).1
}

pub fn dirname(path: &str) -> &str {
    split(path).0
}

/// Joins two segments with exactly one separator.
///
/// An empty head yields the tail unchanged and an empty tail yields the head
/// with a trailing slash, so `join("a", "")` is `"a/"`.
pub fn join(head: &str, tail: &str) -> String {
    if head.is_empty() {
        tail.to_string()
    } else if head.ends_with('/') {
        format!("{}{}", head, tail)
    } else {
        format!("{}/{}", head, tail)
    }
}

/// True when `path` is `ancestor` itself or lies somewhere below it.
///
/// Both arguments are expected to be normalized.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    if path == ancestor || ancestor == "/" && path.starts_with('/') {
        return true;
    }
    path.strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// The session's base directory: `/`, `.` or the empty string.
pub fn is_root(path: &str) -> bool {
    matches!(path, "" | "." | "/")
}

/// Directory used when a dirname comes back empty.
pub fn dir_or_current(dirname: &str) -> &str {
    if dirname.is_empty() {
        "."
    } else {
        dirname
    }
}

pub fn is_remote(path: &str) -> bool {
    path.starts_with(REMOTE_MARKER)
}

pub fn strip_remote_marker(path: &str) -> &str {
    path.strip_prefix(REMOTE_MARKER).unwrap_or(path)
}

pub fn add_remote_marker(path: &str) -> String {
    format!("{}{}", REMOTE_MARKER, path)
}

/// A path tagged with the side it lives on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericPath {
    pub path: String,
    pub remote: bool,
}

impl GenericPath {
    /// Parses a user-supplied path; `r:` marks it remote. The result is normalized.
    pub fn parse(raw: &str) -> Self {
        if is_remote(raw) {
            Self::remote(strip_remote_marker(raw))
        } else {
            Self::local(raw)
        }
    }

    pub fn local(path: &str) -> Self {
        Self {
            path: normalize(path),
            remote: false,
        }
    }

    pub fn remote(path: &str) -> Self {
        Self {
            path: normalize(path),
            remote: true,
        }
    }

    /// Prepends `prefix` to remote paths; local paths are returned untouched.
    pub fn with_remote_prefix(self, prefix: &str) -> Self {
        if self.remote && !prefix.is_empty() {
            Self::remote(&format!("{}{}", prefix, self.path))
        } else {
            self
        }
    }
}

impl std::fmt::Display for GenericPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.remote {
            write!(f, "{}{}", REMOTE_MARKER, self.path)
        } else {
            f.write_str(&self.path)
        }
    }
}

/// Splits a mixed batch into `(local, remote)` path lists, keeping order.
pub fn split_by_locality<'a, I>(paths: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = &'a GenericPath>,
{
    let mut local = Vec::new();
    let mut remote = Vec::new();
    for p in paths {
        if p.remote {
            remote.push(p.path.clone());
        } else {
            local.push(p.path.clone());
        }
    }
    (local, remote)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_within() {
        assert!(is_within("/a", "/a"));
        assert!(is_within("/a/b/c", "/a"));
        assert!(is_within("/x", "/"));
        assert!(!is_within("/ab", "/a"));
        assert!(!is_within("/a", "/a/b"));
        assert!(is_within("d/e", "d"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("a\\b\\c"), "a/b/c");
        assert_eq!(normalize("/a/b/"), "/a/b");
        assert_eq!(normalize("/a/b//"), "/a/b");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("//"), "/");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_split() {
        assert_eq!(split("/a/b"), ("/a", "b"));
        assert_eq!(split("/a"), ("/", "a"));
        assert_eq!(split("a"), ("", "a"));
        assert_eq!(split("a/b/"), ("a/b", ""));
        assert_eq!(split("/"), ("/", ""));
        assert_eq!(split("a//b"), ("a", "b"));
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/a", "b"), "/a/b");
        assert_eq!(join("/", "b"), "/b");
        assert_eq!(join("", "b"), "b");
        assert_eq!(join("a", ""), "a/");
        assert_eq!(join("a/", "c"), "a/c");
    }

    #[test]
    fn test_generic_path_parse() {
        let remote = GenericPath::parse("r:/data/in/");
        assert!(remote.remote);
        assert_eq!(remote.path, "/data/in");
        assert_eq!(remote.to_string(), "r:/data/in");

        let local = GenericPath::parse("C:\\tmp\\x");
        assert!(!local.remote);
        assert_eq!(local.path, "C:/tmp/x");
    }

    #[test]
    fn test_remote_prefix() {
        let p = GenericPath::parse("r:in/x.txt").with_remote_prefix("/srv/");
        assert_eq!(p.path, "/srv/in/x.txt");

        let l = GenericPath::parse("in/x.txt").with_remote_prefix("/srv/");
        assert_eq!(l.path, "in/x.txt");
    }

    #[test]
    fn test_split_by_locality() {
        let paths = vec![
            GenericPath::parse("r:/a"),
            GenericPath::parse("b"),
            GenericPath::parse("r:/c"),
        ];
        let (local, remote) = split_by_locality(&paths);
        assert_eq!(local, vec!["b"]);
        assert_eq!(remote, vec!["/a", "/c"]);
    }
}
