//! Shell-style wildcard expansion against a connection.
//!
//! Patterns are resolved one path segment at a time, querying the connection
//! for every directory involved. Names starting with `.` only match segments
//! that start with `.` themselves, and `**` in recursive mode matches any
//! number of directories.

use crate::connection::Connection;
use crate::error::Result;
use crate::path;
use futures::future::{BoxFuture, FutureExt};
use ::glob::{MatchOptions, Pattern};

const MAGIC: &[char] = &['*', '?', '['];

const SEGMENT_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// True when `s` contains `*`, `?` or `[`.
pub fn has_magic(s: &str) -> bool {
    s.contains(MAGIC)
}

/// Escapes every wildcard character so the result only matches itself.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if MAGIC.contains(&c) {
            out.push('[');
            out.push(c);
            out.push(']');
        } else {
            out.push(c);
        }
    }
    out
}

/// Matches one name against one pattern segment.
///
/// Unlike path globbing, `**` inside a segment behaves like `*`. A pattern
/// that does not parse only matches its literal text.
pub fn fnmatch(name: &str, pattern: &str) -> bool {
    let mut collapsed = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '*' && collapsed.ends_with('*') {
            continue;
        }
        collapsed.push(c);
    }

    match Pattern::new(&collapsed) {
        Ok(compiled) => compiled.matches_with(name, SEGMENT_MATCH),
        Err(_) => name == pattern,
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn is_recursive(pattern: &str) -> bool {
    pattern == "**"
}

/// Resolves wildcard patterns on the tree behind a connection.
pub struct Globber<'c> {
    conn: &'c mut Connection,
}

impl<'c> Globber<'c> {
    pub fn new(conn: &'c mut Connection) -> Self {
        Self { conn }
    }

    /// Every path matching `pattern`, or `[pattern]` when nothing matches.
    pub async fn glob(&mut self, pattern: &str, recursive: bool) -> Result<Vec<String>> {
        tracing::info!("resolving remote wildcard {}", pattern);
        let matches = self.iglob(pattern, recursive).await?;

        if matches.is_empty() {
            tracing::warn!("wildcard {} failed resolution, returning it unchanged", pattern);
            return Ok(vec![pattern.to_string()]);
        }
        tracing::info!("wildcard {} resolved to {}", pattern, matches.join(", "));
        Ok(matches)
    }

    /// Every path matching `pattern`; empty when nothing matches.
    pub async fn iglob(&mut self, pattern: &str, recursive: bool) -> Result<Vec<String>> {
        let mut matches = self.resolve(pattern, recursive, false).await?;
        // A bare `**` also yields the empty relative path first.
        if recursive && is_recursive(pattern) && matches.first().is_some_and(|m| m.is_empty()) {
            matches.remove(0);
        }
        Ok(matches)
    }

    fn resolve<'a>(
        &'a mut self,
        pattern: &'a str,
        recursive: bool,
        dironly: bool,
    ) -> BoxFuture<'a, Result<Vec<String>>> {
        async move {
            let (dirname, basename) = path::split(pattern);

            if !has_magic(pattern) {
                let found = if basename.is_empty() {
                    // A trailing separator only matches directories.
                    self.conn.is_dir(dirname).await?
                } else {
                    self.conn.lexists(pattern).await?
                };
                return Ok(if found { vec![pattern.to_string()] } else { Vec::new() });
            }

            if dirname.is_empty() {
                return if recursive && is_recursive(basename) {
                    self.glob2(dirname, dironly).await
                } else {
                    self.glob1(dirname, basename, dironly).await
                };
            }

            let dirs = if dirname != pattern && has_magic(dirname) {
                self.resolve(dirname, recursive, true).await?
            } else {
                vec![dirname.to_string()]
            };

            let mut matches = Vec::new();
            for dir in &dirs {
                let names = if !has_magic(basename) {
                    self.glob0(dir, basename).await?
                } else if recursive && is_recursive(basename) {
                    self.glob2(dir, dironly).await?
                } else {
                    self.glob1(dir, basename, dironly).await?
                };
                matches.extend(names.iter().map(|name| path::join(dir, name)));
            }
            Ok(matches)
        }
        .boxed()
    }

    /// Literal basename inside a literal directory.
    async fn glob0(&mut self, dirname: &str, basename: &str) -> Result<Vec<String>> {
        let found = if basename.is_empty() {
            self.conn.is_dir(dirname).await?
        } else {
            self.conn.lexists(&path::join(dirname, basename)).await?
        };
        Ok(if found { vec![basename.to_string()] } else { Vec::new() })
    }

    /// Single-segment pattern inside a literal directory.
    async fn glob1(&mut self, dirname: &str, pattern: &str, dironly: bool) -> Result<Vec<String>> {
        let names = self.iterdir(dirname, dironly).await?;
        let show_hidden = is_hidden(pattern);
        Ok(names
            .into_iter()
            .filter(|name| show_hidden || !is_hidden(name))
            .filter(|name| fnmatch(name, pattern))
            .collect())
    }

    /// `**` inside a literal directory: the directory itself, then everything below it.
    async fn glob2(&mut self, dirname: &str, dironly: bool) -> Result<Vec<String>> {
        let mut names = vec![String::new()];
        names.extend(self.rlistdir(dirname, dironly).await?);
        Ok(names)
    }

    /// Entry names of `dirname`; empty when it is not a directory.
    async fn iterdir(&mut self, dirname: &str, dironly: bool) -> Result<Vec<String>> {
        let dir = path::dir_or_current(dirname);
        if !self.conn.is_dir(dir).await? {
            return Ok(Vec::new());
        }

        let names = self.conn.listdir(dir).await?;
        if !dironly {
            return Ok(names);
        }
        let mut dirs = Vec::with_capacity(names.len());
        for name in names {
            if self.conn.is_dir(&path::join(dir, &name)).await? {
                dirs.push(name);
            }
        }
        Ok(dirs)
    }

    /// Relative paths of every non-hidden descendant, parents first.
    fn rlistdir<'a>(&'a mut self, dirname: &'a str, dironly: bool) -> BoxFuture<'a, Result<Vec<String>>> {
        async move {
            let mut found = Vec::new();
            for name in self.iterdir(dirname, dironly).await? {
                if is_hidden(&name) {
                    continue;
                }
                let child = if dirname.is_empty() {
                    name.clone()
                } else {
                    path::join(dirname, &name)
                };
                let below = self.rlistdir(&child, dironly).await?;
                found.push(name.clone());
                found.extend(below.iter().map(|rest| path::join(&name, rest)));
            }
            Ok(found)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fs::FsBackend;
    use crate::settings::Settings;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn tree(files: &[&str]) -> (TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            let target = dir.path().join(file);
            fs::create_dir_all(target.parent().unwrap()).unwrap();
            fs::write(target, b"x").unwrap();
        }
        let backend = FsBackend::new(Some(dir.path().to_path_buf()));
        let conn = Connection::new(Box::new(backend), Settings::default()).unwrap();
        (dir, conn)
    }

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[test]
    fn test_has_magic() {
        assert!(has_magic("*.txt"));
        assert!(has_magic("a?c"));
        assert!(has_magic("[ab]"));
        assert!(!has_magic("/plain/path.txt"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a*b?c[d]"), "a[*]b[?]c[[]d]");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_fnmatch() {
        assert!(fnmatch("report.txt", "*.txt"));
        assert!(fnmatch("report.txt", "r?port.*"));
        assert!(fnmatch("b", "[a-c]"));
        assert!(!fnmatch("d", "[a-c]"));
        assert!(fnmatch("d", "[!a-c]"));
        assert!(fnmatch("abc", "a**c"));
        assert!(fnmatch(".hidden", "*"));
        assert!(fnmatch("[", "["));
        assert!(!fnmatch("a", "["));
    }

    #[tokio::test]
    async fn test_plain_pattern_resolves_to_itself() {
        let (_dir, mut conn) = tree(&["a/x"]);
        let mut globber = Globber::new(&mut conn);

        assert_eq!(globber.glob("a/x", true).await.unwrap(), vec!["a/x"]);
        assert_eq!(globber.glob("a/", true).await.unwrap(), vec!["a/"]);
        assert_eq!(globber.iglob("a/x/", true).await.unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_miss_returns_pattern() {
        let (_dir, mut conn) = tree(&["a/x"]);
        let mut globber = Globber::new(&mut conn);

        assert_eq!(globber.glob("a/*.pdf", true).await.unwrap(), vec!["a/*.pdf"]);
        assert!(globber.iglob("a/*.pdf", true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_star_skips_hidden_files() {
        let (_dir, mut conn) = tree(&["d/one.txt", "d/two.txt", "d/.secret.txt"]);
        let mut globber = Globber::new(&mut conn);

        assert_eq!(
            sorted(globber.glob("d/*.txt", true).await.unwrap()),
            vec!["d/one.txt", "d/two.txt"]
        );
        assert_eq!(globber.glob("d/.*", true).await.unwrap(), vec!["d/.secret.txt"]);
    }

    #[tokio::test]
    async fn test_recursive_token_matches_zero_or_more_dirs() {
        let (_dir, mut conn) = tree(&["a/b/c", "a/c"]);
        let mut globber = Globber::new(&mut conn);

        assert_eq!(
            sorted(globber.glob("a/**/c", true).await.unwrap()),
            vec!["a/b/c", "a/c"]
        );
    }

    #[tokio::test]
    async fn test_recursive_token_without_recursion_is_single_segment() {
        let (_dir, mut conn) = tree(&["a/b/c", "a/c"]);
        let mut globber = Globber::new(&mut conn);

        assert_eq!(globber.iglob("a/**/c", false).await.unwrap(), vec!["a/b/c"]);
    }

    #[tokio::test]
    async fn test_bare_recursive_token() {
        let (_dir, mut conn) = tree(&["a/b", "c"]);
        let mut globber = Globber::new(&mut conn);

        assert_eq!(
            sorted(globber.iglob("**", true).await.unwrap()),
            vec!["a", "a/b", "c"]
        );
    }

    #[tokio::test]
    async fn test_trailing_separator_matches_directories_only() {
        let (_dir, mut conn) = tree(&["d1/f", "d2/f", "file"]);
        let mut globber = Globber::new(&mut conn);

        assert_eq!(sorted(globber.iglob("*/", true).await.unwrap()), vec!["d1/", "d2/"]);
    }

    #[tokio::test]
    async fn test_magic_in_directory_segment() {
        let (_dir, mut conn) = tree(&["x1/data.csv", "x2/data.csv", "y/data.csv"]);
        let mut globber = Globber::new(&mut conn);

        assert_eq!(
            sorted(globber.iglob("/x?/data.csv", true).await.unwrap()),
            vec!["/x1/data.csv", "/x2/data.csv"]
        );
    }

    #[tokio::test]
    async fn test_escaped_pattern_matches_literal_name() {
        let (_dir, mut conn) = tree(&["odd[1].txt", "odd1.txt"]);
        let mut globber = Globber::new(&mut conn);

        let pattern = escape("odd[1].txt");
        assert_eq!(globber.iglob(&pattern, true).await.unwrap(), vec!["odd[1].txt"]);
    }
}
