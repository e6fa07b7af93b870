use super::Backend;
use crate::error::Result;
use crate::settings::Settings;
use crate::stat::{self, FileStat};
use async_trait::async_trait;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

/// Local filesystem backend.
///
/// With a root, every path (absolute or relative) resolves beneath it, which
/// makes the root behave like the top of a remote share.
pub struct FsBackend {
    root: Option<PathBuf>,
    #[cfg_attr(unix, allow(dead_code))]
    default_fmask: u32,
    #[cfg_attr(unix, allow(dead_code))]
    default_dmask: u32,
}

impl FsBackend {
    pub fn new(root: Option<PathBuf>) -> Self {
        let defaults = Settings::default();
        Self {
            root,
            default_fmask: defaults.default_fmask,
            default_dmask: defaults.default_dmask,
        }
    }

    pub fn with_settings(root: Option<PathBuf>, settings: &Settings) -> Self {
        Self {
            root,
            default_fmask: settings.default_fmask,
            default_dmask: settings.default_dmask,
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match &self.root {
            Some(root) => {
                let relative = path.trim_start_matches('/');
                if relative.is_empty() || relative == "." {
                    root.clone()
                } else {
                    root.join(relative)
                }
            }
            None if path.is_empty() => PathBuf::from("."),
            None => PathBuf::from(path),
        }
    }

    fn to_stat(&self, meta: &Metadata) -> FileStat {
        let modified = meta
            .modified()
            .map(stat::from_system_time)
            .unwrap_or_else(|_| chrono::Local::now());
        let mut result = FileStat::new(self.mode_of(meta), meta.len(), modified);
        if let Ok(accessed) = meta.accessed() {
            result.accessed = stat::from_system_time(accessed);
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            result.uid = meta.uid();
            result.gid = meta.gid();
            result.nlink = meta.nlink();
        }
        result
    }

    #[cfg(unix)]
    fn mode_of(&self, meta: &Metadata) -> u32 {
        use std::os::unix::fs::MetadataExt;
        meta.mode()
    }

    #[cfg(not(unix))]
    fn mode_of(&self, meta: &Metadata) -> u32 {
        if meta.file_type().is_symlink() {
            return crate::stat::S_IFLNK | 0o777;
        }
        FileStat::synthesize_mode(
            meta.is_dir(),
            meta.permissions().readonly(),
            self.default_fmask,
            self.default_dmask,
        )
    }
}

#[async_trait]
impl Backend for FsBackend {
    fn name(&self) -> &'static str {
        "FS"
    }

    async fn stat(&mut self, path: &str) -> Result<FileStat> {
        let meta = tokio::fs::metadata(self.resolve(path)).await?;
        Ok(self.to_stat(&meta))
    }

    async fn lstat(&mut self, path: &str) -> Result<FileStat> {
        let meta = tokio::fs::symlink_metadata(self.resolve(path)).await?;
        Ok(self.to_stat(&meta))
    }

    async fn list(&mut self, path: &str) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(self.resolve(path)).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => tracing::warn!("skipping {:?} in {}: name is not UTF-8", raw, path),
            }
        }
        Ok(names)
    }

    async fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        tokio::fs::rename(self.resolve(old), self.resolve(new)).await?;
        Ok(())
    }

    async fn push(&mut self, local: &Path, remote: &str) -> Result<()> {
        tokio::fs::copy(local, self.resolve(remote)).await?;
        Ok(())
    }

    async fn pull(&mut self, remote: &str, local: &Path) -> Result<()> {
        tokio::fs::copy(self.resolve(remote), local).await?;
        Ok(())
    }

    async fn is_dir(&mut self, path: &str) -> Result<bool> {
        Ok(tokio::fs::metadata(self.resolve(path)).await?.is_dir())
    }

    async fn mkdir(&mut self, path: &str) -> Result<()> {
        tokio::fs::create_dir(self.resolve(path)).await?;
        Ok(())
    }

    async fn rmdir(&mut self, path: &str) -> Result<()> {
        tokio::fs::remove_dir(self.resolve(path)).await?;
        Ok(())
    }

    async fn unlink(&mut self, path: &str) -> Result<()> {
        tokio::fs::remove_file(self.resolve(path)).await?;
        Ok(())
    }

    async fn exists(&mut self, path: &str) -> Result<bool> {
        Ok(tokio::fs::metadata(self.resolve(path)).await.is_ok())
    }

    async fn lexists(&mut self, path: &str) -> Result<bool> {
        Ok(tokio::fs::symlink_metadata(self.resolve(path)).await.is_ok())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
