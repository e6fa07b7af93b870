#![allow(dead_code)]

use assert_fs::prelude::*;
use assert_fs::TempDir;
use rfs::client::fs::FsBackend;
use rfs::{Connection, Settings};
use rstest::*;
use std::path::Path;

/// A remote tree rooted in one temp dir and a local scratch dir beside it.
pub struct Sandbox {
    pub remote_root: TempDir,
    pub local_root: TempDir,
    pub conn: Connection,
}

impl Sandbox {
    pub fn with_settings(settings: Settings) -> Self {
        let remote_root = TempDir::new().unwrap();
        let local_root = TempDir::new().unwrap();
        let backend = FsBackend::with_settings(Some(remote_root.path().to_path_buf()), &settings);
        let conn = Connection::new(Box::new(backend), settings).unwrap();
        Self {
            remote_root,
            local_root,
            conn,
        }
    }

    /// Writes a file on the remote side, creating its parents.
    pub fn remote_file(&self, path: &str, contents: &[u8]) {
        self.remote_root
            .child(path.trim_start_matches('/'))
            .write_binary(contents)
            .unwrap();
    }

    pub fn remote_dir(&self, path: &str) {
        self.remote_root
            .child(path.trim_start_matches('/'))
            .create_dir_all()
            .unwrap();
    }

    pub fn read_remote(&self, path: &str) -> Vec<u8> {
        std::fs::read(self.remote_root.path().join(path.trim_start_matches('/'))).unwrap()
    }

    pub fn remote_exists(&self, path: &str) -> bool {
        self.remote_root
            .path()
            .join(path.trim_start_matches('/'))
            .symlink_metadata()
            .is_ok()
    }

    /// Writes a file on the local side and returns its absolute path.
    pub fn local_file(&self, name: &str, contents: &[u8]) -> String {
        let child = self.local_root.child(name);
        child.write_binary(contents).unwrap();
        path_string(child.path())
    }

    /// Absolute local path for `name`, which need not exist.
    pub fn local(&self, name: &str) -> String {
        path_string(&self.local_root.path().join(name))
    }

    /// Remote file names left behind by interrupted or failed transfers.
    pub fn leftover_temporaries(&self) -> Vec<String> {
        walk(self.remote_root.path())
            .into_iter()
            .filter(|name| name.starts_with('.') && name.contains(".tmp"))
            .collect()
    }
}

fn walk(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        names.push(entry.file_name().to_string_lossy().into_owned());
        if entry.file_type().unwrap().is_dir() {
            names.extend(walk(&entry.path()));
        }
    }
    names
}

pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Sandbox with default settings.
#[fixture]
pub fn sandbox() -> Sandbox {
    Sandbox::with_settings(Settings::default())
}

/// Sandbox whose remote side stores CRLF text.
#[fixture]
pub fn text_sandbox() -> Sandbox {
    Sandbox::with_settings(Settings {
        text_transmission: true,
        remote_crlf: true,
        ..Settings::default()
    })
}
