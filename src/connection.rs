//! Guarded filesystem operations built from backend primitives.
//!
//! Every public operation normalizes its paths and checks its preconditions
//! before the first mutating primitive is issued, so a failed check never
//! leaves partial state behind. Batches are not atomic as a whole.

use crate::client::fs::FsBackend;
use crate::client::{Backend, BackendConfig};
use crate::error::{Error, Result, Side};
use crate::path::{self, normalize};
use crate::settings::Settings;
use crate::stat::FileStat;
use crate::transcode::{self, TextCodec};
use futures::future::{BoxFuture, FutureExt};
use rand::Rng;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// One open session to a backend, owned by a single caller.
pub struct Connection {
    backend: Box<dyn Backend>,
    settings: Settings,
    side: Side,
    closed: bool,
}

impl Connection {
    /// Connects to the backend described by `config`.
    pub async fn open(config: &BackendConfig, settings: Settings) -> Result<Self> {
        settings.validate()?;
        tracing::debug!("opening {} connection", config.kind());
        let backend = config.connect(&settings).await?;
        Self::new(backend, settings)
    }

    /// Wraps an already connected backend.
    pub fn new(backend: Box<dyn Backend>, settings: Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            backend,
            settings,
            side: Side::Remote,
            closed: false,
        })
    }

    /// A connection to the local filesystem, reported as the local side in errors.
    pub fn local(settings: Settings) -> Result<Self> {
        let backend = Box::new(FsBackend::with_settings(None, &settings));
        let mut conn = Self::new(backend, settings)?;
        conn.side = Side::Local;
        Ok(conn)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Ends the session. Later calls do nothing.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        tracing::debug!("closing {} connection", self.backend.name());
        self.backend.close().await
    }

    // Guards

    async fn check_link_existence(&mut self, path: &str) -> Result<()> {
        tracing::trace!("checking that {} link-exists", path);
        if !self.backend.lexists(path).await? {
            return Err(Error::NotFound {
                side: self.side,
                path: path.to_string(),
            });
        }
        Ok(())
    }

    async fn check_file_existence(&mut self, path: &str) -> Result<()> {
        self.check_link_existence(path).await?;
        if !self.backend.exists(path).await? {
            return Err(Error::BrokenLink {
                side: self.side,
                path: path.to_string(),
            });
        }
        Ok(())
    }

    async fn check_file_nonexistence(&mut self, path: &str) -> Result<()> {
        tracing::trace!("checking that {} does not exist", path);
        if self.backend.lexists(path).await? {
            return Err(Error::AlreadyExists {
                side: self.side,
                path: path.to_string(),
            });
        }
        Ok(())
    }

    async fn check_not_folder(&mut self, path: &str) -> Result<()> {
        self.check_file_existence(path).await?;
        if self.backend.is_dir(path).await? {
            return Err(Error::IsADirectory {
                side: self.side,
                path: path.to_string(),
            });
        }
        Ok(())
    }

    /// Passes when `path` is absent or is not a directory.
    async fn check_potential_not_folder(&mut self, path: &str) -> Result<()> {
        if self.is_dir(path).await? {
            return Err(Error::IsADirectory {
                side: self.side,
                path: path.to_string(),
            });
        }
        Ok(())
    }

    async fn check_is_folder(&mut self, path: &str) -> Result<()> {
        self.check_file_existence(path).await?;
        if !self.backend.is_dir(path).await? {
            return Err(Error::NotADirectory {
                side: self.side,
                path: path.to_string(),
            });
        }
        Ok(())
    }

    async fn check_parent_is_folder(&mut self, path: &str) -> Result<()> {
        let parent = path::dir_or_current(path::dirname(path)).to_string();
        self.check_is_folder(&parent).await
    }

    // Queries

    /// False for missing paths and broken symlinks.
    pub async fn exists(&mut self, path: &str) -> Result<bool> {
        let path = normalize(path);
        let exists = self.backend.exists(&path).await?;
        tracing::trace!("{} exists: {}", path, exists);
        Ok(exists)
    }

    /// True whenever a directory entry exists, even a broken symlink.
    pub async fn lexists(&mut self, path: &str) -> Result<bool> {
        let path = normalize(path);
        let exists = self.backend.lexists(&path).await?;
        tracing::trace!("{} lexists: {}", path, exists);
        Ok(exists)
    }

    /// False rather than an error when the path is absent.
    pub async fn is_dir(&mut self, path: &str) -> Result<bool> {
        let path = normalize(path);
        if !self.backend.exists(&path).await? {
            return Ok(false);
        }
        self.backend.is_dir(&path).await
    }

    pub async fn stat(&mut self, path: &str) -> Result<FileStat> {
        let path = normalize(path);
        self.check_file_existence(&path).await?;
        self.backend.stat(&path).await
    }

    pub async fn lstat(&mut self, path: &str) -> Result<FileStat> {
        let path = normalize(path);
        self.check_link_existence(&path).await?;
        self.backend.lstat(&path).await
    }

    /// Entry names of a directory without `.` and `..`.
    pub async fn listdir(&mut self, path: &str) -> Result<Vec<String>> {
        let path = normalize(path);
        tracing::debug!("listing {}", path);
        self.check_is_folder(&path).await?;

        let entries = self.backend.list(&path).await?;
        Ok(entries
            .into_iter()
            .filter(|name| name != "." && name != "..")
            .collect())
    }

    /// Children of a directory, or the basename of a single file.
    pub async fn ls(&mut self, path: &str) -> Result<Vec<String>> {
        let path = normalize(path);
        self.check_file_existence(&path).await?;

        let entries = if self.backend.is_dir(&path).await? {
            self.listdir(&path).await?
        } else {
            vec![path::basename(&path).to_string()]
        };
        tracing::debug!("{} contains {:?}", path, entries);
        Ok(entries)
    }

    /// Like [`ls`](Self::ls) with every child prefixed by `path`.
    pub async fn xls(&mut self, path: &str) -> Result<Vec<String>> {
        let path = normalize(path);
        if self.is_dir(&path).await? {
            let entries = self.ls(&path).await?;
            Ok(entries.iter().map(|name| path::join(&path, name)).collect())
        } else {
            Ok(vec![path])
        }
    }

    /// Depth-first listing of the tree rooted at `path`, `path` included.
    ///
    /// With `child_first` every directory comes after its contents. Symlinks
    /// are listed but never descended into.
    pub async fn find(&mut self, path: &str, child_first: bool) -> Result<Vec<String>> {
        let path = normalize(path);
        self.check_file_existence(&path).await?;

        let mut tree = Vec::new();
        self.walk(&path, child_first, &mut tree).await?;
        Ok(tree)
    }

    fn walk<'a>(
        &'a mut self,
        path: &'a str,
        child_first: bool,
        tree: &'a mut Vec<String>,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            if !self.backend.lstat(path).await?.is_dir() {
                tree.push(path.to_string());
                return Ok(());
            }

            if !child_first {
                tree.push(path.to_string());
            }
            for name in self.listdir(path).await? {
                let child = path::join(path, &name);
                self.walk(&child, child_first, tree).await?;
            }
            if child_first {
                tree.push(path.to_string());
            }
            Ok(())
        }
        .boxed()
    }

    // Directories

    /// Creates one directory; missing ancestors are an error.
    pub async fn mkdir(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        tracing::debug!("making directory {}", path);

        self.check_parent_is_folder(&path).await?;
        self.check_file_nonexistence(&path).await?;
        self.backend.mkdir(&path).await?;

        tracing::debug!("making directory {} is completed", path);
        Ok(())
    }

    /// Creates a directory and any missing ancestors. Existing directories are fine.
    pub fn pmkdir<'a>(&'a mut self, path: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            let path = normalize(path);
            if path::is_root(&path) {
                return Ok(());
            }

            if self.backend.lexists(&path).await? {
                if self.is_dir(&path).await? {
                    return Ok(());
                }
                return Err(Error::NotADirectory {
                    side: self.side,
                    path,
                });
            }

            let parent = path::dirname(&path).to_string();
            self.pmkdir(&parent).await?;
            self.mkdir(&path).await
        }
        .boxed()
    }

    /// Removes an empty directory.
    pub async fn rmdir(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        tracing::debug!("removing empty directory {}", path);

        self.check_is_folder(&path).await?;
        if !self.listdir(&path).await?.is_empty() {
            return Err(Error::NotEmpty {
                side: self.side,
                path,
            });
        }
        self.backend.rmdir(&path).await
    }

    // Removal

    pub async fn unlink(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        tracing::debug!("unlinking {}", path);

        self.check_not_folder(&path).await?;
        self.backend.unlink(&path).await
    }

    /// Removes a file, or with `recursive` a whole tree, contents first.
    pub async fn rm(&mut self, path: &str, recursive: bool) -> Result<()> {
        let path = normalize(path);
        tracing::debug!("deleting {} (recursive={})", path, recursive);
        self.check_file_existence(&path).await?;

        if !recursive {
            return self.unlink(&path).await;
        }

        for entry in self.find(&path, true).await? {
            if self.backend.lstat(&entry).await?.is_dir() {
                self.rmdir(&entry).await?;
            } else {
                // Links go away themselves; their targets stay.
                tracing::trace!("unlinking {}", entry);
                self.backend.unlink(&entry).await?;
            }
        }
        tracing::debug!("deleting {} is completed", path);
        Ok(())
    }

    // Moving

    /// Renames within the backend; the destination must not exist.
    pub async fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let (old, new) = (normalize(old), normalize(new));
        tracing::debug!("renaming {} to {}", old, new);

        self.check_file_existence(&old).await?;
        self.check_file_nonexistence(&new).await?;
        self.backend.rename(&old, &new).await
    }

    /// Moves a non-directory onto a non-directory path, replacing it.
    ///
    /// The old destination is removed before the rename, so a failure in
    /// between leaves no file at `new`.
    pub async fn fmv(&mut self, old: &str, new: &str) -> Result<()> {
        let (old, new) = (normalize(old), normalize(new));
        tracing::debug!("moving non-directory {} to {}", old, new);

        self.check_not_folder(&old).await?;
        self.check_potential_not_folder(&new).await?;
        if old == new {
            tracing::debug!("{} is already in place", old);
            return Ok(());
        }

        if self.backend.lexists(&new).await? {
            self.backend.unlink(&new).await?;
        }
        self.rename(&old, &new).await?;

        tracing::debug!("moving non-directory {} to {} is completed", old, new);
        Ok(())
    }

    /// Moves every source into `target_dir`, merging into existing directories.
    pub fn dmv<'a>(&'a mut self, old_names: &'a [String], target_dir: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            let old_names: Vec<String> = old_names.iter().map(|name| normalize(name)).collect();
            let target_dir = normalize(target_dir);
            tracing::debug!("moving {:?} into directory {}", old_names, target_dir);

            self.check_is_folder(&target_dir).await?;
            for name in &old_names {
                self.check_file_existence(name).await?;
                if self.backend.is_dir(name).await? && path::is_within(&target_dir, name) {
                    return Err(self.into_itself("move", name, &target_dir));
                }
            }
            let present = self.ls(&target_dir).await?;

            for name in &old_names {
                let basename = path::basename(name);
                let new_name = path::join(&target_dir, basename);
                if new_name == *name {
                    tracing::debug!("{} is already in {}", name, target_dir);
                    continue;
                }
                let taken = present.iter().any(|entry| entry == basename);

                if self.backend.is_dir(name).await? {
                    if taken {
                        if !self.is_dir(&new_name).await? {
                            return Err(self.overwrite(name, &new_name, false));
                        }
                        let children = self.xls(name).await?;
                        self.dmv(&children, &new_name).await?;
                        self.rmdir(name).await?;
                    } else {
                        self.rename(name, &new_name).await?;
                    }
                } else {
                    if taken && self.is_dir(&new_name).await? {
                        return Err(self.overwrite(name, &new_name, true));
                    }
                    self.fmv(name, &new_name).await?;
                }
            }

            tracing::debug!("moving {:?} into directory {} is completed", old_names, target_dir);
            Ok(())
        }
        .boxed()
    }

    /// `mv` semantics: into a directory, or a single source onto a path.
    pub async fn mv(&mut self, old_names: &[String], new_name: &str) -> Result<()> {
        let new_name = normalize(new_name);
        tracing::debug!("moving {:?} to {}", old_names, new_name);

        if self.is_dir(&new_name).await? {
            return self.dmv(old_names, &new_name).await;
        }

        match old_names {
            [] => Ok(()),
            [old] => {
                if self.is_dir(old).await? {
                    if path::is_within(&new_name, &normalize(old)) {
                        return Err(self.into_itself("move", old, &new_name));
                    }
                    self.rename(old, &new_name).await
                } else {
                    self.fmv(old, &new_name).await
                }
            }
            _ => Err(Error::TooManySources {
                verb: "move",
                target_exists: self.backend.lexists(&new_name).await?,
                target: new_name,
            }),
        }
    }

    // Copying

    /// Copies a non-directory onto a non-directory path through a local temporary.
    pub async fn fcp(&mut self, old: &str, new: &str) -> Result<()> {
        let (old, new) = (normalize(old), normalize(new));
        tracing::debug!("copying non-directory {} to {}", old, new);

        self.check_not_folder(&old).await?;
        self.check_potential_not_folder(&new).await?;
        self.check_parent_is_folder(&new).await?;

        let scratch = NamedTempFile::new()?;
        self.backend.pull(&old, scratch.path()).await?;
        self.deliver(scratch.path(), &new).await?;

        tracing::debug!("copying non-directory {} to {} is completed", old, new);
        Ok(())
    }

    /// Copies every source into `target_dir`; directories only with `recursive`.
    pub fn dcp<'a>(
        &'a mut self,
        old_names: &'a [String],
        target_dir: &'a str,
        recursive: bool,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let old_names: Vec<String> = old_names.iter().map(|name| normalize(name)).collect();
            let target_dir = normalize(target_dir);
            tracing::debug!(
                "copying {:?} into directory {} (recursive={})",
                old_names,
                target_dir,
                recursive
            );

            self.check_is_folder(&target_dir).await?;
            for name in &old_names {
                if recursive {
                    self.check_file_existence(name).await?;
                    if self.backend.is_dir(name).await? && path::is_within(&target_dir, name) {
                        return Err(self.into_itself("copy", name, &target_dir));
                    }
                } else {
                    self.check_not_folder(name).await?;
                }
            }
            let present = self.ls(&target_dir).await?;

            for name in &old_names {
                let basename = path::basename(name);
                let new_name = path::join(&target_dir, basename);
                if new_name == *name {
                    tracing::debug!("{} is already in {}", name, target_dir);
                    continue;
                }
                let taken = present.iter().any(|entry| entry == basename);

                if recursive && self.backend.is_dir(name).await? {
                    let children = self.xls(name).await?;
                    if taken {
                        if !self.is_dir(&new_name).await? {
                            return Err(self.overwrite(name, &new_name, false));
                        }
                    } else {
                        self.mkdir(&new_name).await?;
                    }
                    self.dcp(&children, &new_name, true).await?;
                } else {
                    if taken && self.is_dir(&new_name).await? {
                        return Err(self.overwrite(name, &new_name, true));
                    }
                    self.fcp(name, &new_name).await?;
                }
            }

            tracing::debug!("copying {:?} into directory {} is completed", old_names, target_dir);
            Ok(())
        }
        .boxed()
    }

    /// `cp` semantics, mirroring [`mv`](Self::mv).
    pub async fn cp(&mut self, old_names: &[String], new_name: &str, recursive: bool) -> Result<()> {
        let new_name = normalize(new_name);
        tracing::debug!("copying {:?} to {} (recursive={})", old_names, new_name, recursive);

        if self.is_dir(&new_name).await? {
            return self.dcp(old_names, &new_name, recursive).await;
        }

        match old_names {
            [] => Ok(()),
            [old] => {
                if recursive && self.is_dir(old).await? {
                    if self.backend.lexists(&new_name).await? {
                        return Err(self.overwrite(old, &new_name, false));
                    }
                    if path::is_within(&new_name, &normalize(old)) {
                        return Err(self.into_itself("copy", old, &new_name));
                    }
                    let children = self.xls(old).await?;
                    self.mkdir(&new_name).await?;
                    self.dcp(&children, &new_name, true).await
                } else {
                    self.fcp(old, &new_name).await
                }
            }
            _ => Err(Error::TooManySources {
                verb: "copy",
                target_exists: self.backend.lexists(&new_name).await?,
                target: new_name,
            }),
        }
    }

    // Transfers

    /// Uploads one local file, recoding it when text transmission asks for it.
    pub async fn push(&mut self, local: &str, remote: &str) -> Result<()> {
        let (local, remote) = (normalize(local), normalize(remote));
        tracing::debug!("pushing local file {} to remote file {}", local, remote);

        check_local_not_folder(&local).await?;
        self.check_potential_not_folder(&remote).await?;
        self.check_parent_is_folder(&remote).await?;

        let scratch = NamedTempFile::new()?;
        let codec = TextCodec::outbound(&self.settings)?;
        transcode::stage(&self.settings, codec, &local_path(&local), scratch.path()).await?;
        self.deliver(scratch.path(), &remote).await?;

        tracing::debug!("pushing local file {} to remote file {} is completed", local, remote);
        Ok(())
    }

    /// Downloads one remote file, recoding it when text transmission asks for it.
    pub async fn pull(&mut self, remote: &str, local: &str) -> Result<()> {
        let (remote, local) = (normalize(remote), normalize(local));
        tracing::debug!("pulling remote file {} to local file {}", remote, local);

        self.check_not_folder(&remote).await?;
        check_local_potential_not_folder(&local).await?;
        check_local_parent_is_folder(&local).await?;

        let scratch = NamedTempFile::new()?;
        self.backend.pull(&remote, scratch.path()).await?;

        let staged = local_path(&infolder_tmp_name(&local));
        let codec = TextCodec::inbound(&self.settings)?;
        let placed = match transcode::stage(&self.settings, codec, scratch.path(), &staged).await {
            Ok(()) => tokio::fs::rename(&staged, local_path(&local))
                .await
                .map_err(Error::from),
            Err(e) => Err(e),
        };
        if let Err(e) = placed {
            let _ = tokio::fs::remove_file(&staged).await;
            return Err(e);
        }

        tracing::debug!("pulling remote file {} to local file {} is completed", remote, local);
        Ok(())
    }

    /// Uploads a local tree, creating or reusing remote directories.
    pub fn rpush<'a>(&'a mut self, local: &'a str, remote: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            let (local, remote) = (normalize(local), normalize(remote));
            tracing::debug!("recursive pushing of local file {} to remote file {}", local, remote);

            check_local_file_existence(&local).await?;

            if local_is_dir(&local).await {
                if self.backend.lexists(&remote).await? {
                    if !self.is_dir(&remote).await? {
                        return Err(self.overwrite(&local, &remote, false));
                    }
                } else {
                    self.mkdir(&remote).await?;
                }
                for name in local_listdir(&local).await? {
                    let (from, to) = (path::join(&local, &name), path::join(&remote, &name));
                    self.rpush(&from, &to).await?;
                }
            } else {
                if self.is_dir(&remote).await? {
                    return Err(self.overwrite(&local, &remote, true));
                }
                self.push(&local, &remote).await?;
            }

            tracing::debug!("recursive pushing of local file {} to remote file {} is completed", local, remote);
            Ok(())
        }
        .boxed()
    }

    /// Downloads a remote tree, creating or reusing local directories.
    pub fn rpull<'a>(&'a mut self, remote: &'a str, local: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            let (remote, local) = (normalize(remote), normalize(local));
            tracing::debug!("recursive pulling of remote file {} to local file {}", remote, local);

            self.check_file_existence(&remote).await?;

            if self.backend.is_dir(&remote).await? {
                if local_lexists(&local).await {
                    if !local_is_dir(&local).await {
                        return Err(local_overwrite(&remote, &local, false));
                    }
                } else {
                    check_local_parent_is_folder(&local).await?;
                    tokio::fs::create_dir(local_path(&local)).await?;
                }
                for name in self.ls(&remote).await? {
                    let (from, to) = (path::join(&remote, &name), path::join(&local, &name));
                    self.rpull(&from, &to).await?;
                }
            } else {
                if local_is_dir(&local).await {
                    return Err(local_overwrite(&remote, &local, true));
                }
                self.pull(&remote, &local).await?;
            }

            tracing::debug!("recursive pulling of remote file {} to local file {} is completed", remote, local);
            Ok(())
        }
        .boxed()
    }

    /// Creates an empty file, replacing an existing non-directory.
    pub async fn touch(&mut self, path: &str) -> Result<()> {
        let scratch = NamedTempFile::new()?;
        let local = scratch.path().to_string_lossy().into_owned();
        self.push(&local, path).await
    }

    /// Uploads `local` under an in-folder temporary name, then moves it onto `remote`.
    async fn deliver(&mut self, local: &Path, remote: &str) -> Result<()> {
        let staged = infolder_tmp_name(remote);
        tracing::trace!("staging {} as {}", remote, staged);

        let result = match self.backend.push(local, &staged).await {
            Ok(()) => self.fmv(&staged, remote).await,
            Err(e) => Err(e),
        };
        if result.is_err() && self.backend.lexists(&staged).await.unwrap_or(false) {
            if let Err(e) = self.backend.unlink(&staged).await {
                tracing::warn!("cannot remove temporary {}: {}", staged, e);
            }
        }
        result
    }

    fn into_itself(&self, verb: &str, source: &str, target: &str) -> Error {
        Error::InvalidArgument(format!(
            "cannot {} {} directory {} into itself ({})",
            verb, self.side, source, target
        ))
    }

    fn overwrite(&self, source: &str, target: &str, target_is_dir: bool) -> Error {
        Error::Overwrite {
            side: self.side,
            source_path: source.to_string(),
            target: target.to_string(),
            target_is_dir,
        }
    }
}

/// Runs `f` on a fresh connection and closes it on every exit path.
pub async fn with_connection<T, F>(config: &BackendConfig, settings: Settings, f: F) -> Result<T>
where
    F: for<'c> FnOnce(&'c mut Connection) -> BoxFuture<'c, Result<T>>,
{
    let mut conn = Connection::open(config, settings).await?;
    let result = f(&mut conn).await;
    let closed = conn.close().await;
    let value = result?;
    closed?;
    Ok(value)
}

fn infolder_tmp_name(path: &str) -> String {
    let (dirname, basename) = path::split(path);
    let suffix: u32 = rand::thread_rng().gen_range(10000..=65555);
    path::join(dirname, &format!(".{}.tmp{}", basename, suffix))
}

fn local_path(path: &str) -> PathBuf {
    PathBuf::from(path::dir_or_current(path))
}

async fn local_lexists(path: &str) -> bool {
    tokio::fs::symlink_metadata(local_path(path)).await.is_ok()
}

async fn local_exists(path: &str) -> bool {
    tokio::fs::metadata(local_path(path)).await.is_ok()
}

async fn local_is_dir(path: &str) -> bool {
    tokio::fs::metadata(local_path(path))
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

async fn local_listdir(path: &str) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(local_path(path)).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => tracing::warn!("skipping local entry {:?} in {}: name is not UTF-8", raw, path),
        }
    }
    names.sort();
    Ok(names)
}

async fn check_local_file_existence(path: &str) -> Result<()> {
    if !local_lexists(path).await {
        return Err(Error::NotFound {
            side: Side::Local,
            path: path.to_string(),
        });
    }
    if !local_exists(path).await {
        return Err(Error::BrokenLink {
            side: Side::Local,
            path: path.to_string(),
        });
    }
    Ok(())
}

async fn check_local_not_folder(path: &str) -> Result<()> {
    check_local_file_existence(path).await?;
    if local_is_dir(path).await {
        return Err(Error::IsADirectory {
            side: Side::Local,
            path: path.to_string(),
        });
    }
    Ok(())
}

async fn check_local_parent_is_folder(path: &str) -> Result<()> {
    let parent = path::dir_or_current(path::dirname(path)).to_string();
    check_local_file_existence(&parent).await?;
    if !local_is_dir(&parent).await {
        return Err(Error::NotADirectory {
            side: Side::Local,
            path: parent,
        });
    }
    Ok(())
}

async fn check_local_potential_not_folder(path: &str) -> Result<()> {
    if local_is_dir(path).await {
        return Err(Error::IsADirectory {
            side: Side::Local,
            path: path.to_string(),
        });
    }
    Ok(())
}

fn local_overwrite(source: &str, target: &str, target_is_dir: bool) -> Error {
    Error::Overwrite {
        side: Side::Local,
        source_path: source.to_string(),
        target: target.to_string(),
        target_is_dir,
    }
}
