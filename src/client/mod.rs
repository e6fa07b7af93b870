pub mod fs;
pub mod ftp;
pub mod sftp;
pub mod smb;

use crate::error::Result;
use crate::settings::Settings;
use crate::stat::FileStat;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Primitive operations every protocol backend supplies.
///
/// Behavior outside the documented precondition is up to the backend;
/// [`Connection`](crate::connection::Connection) checks preconditions before
/// calling any of these.
#[async_trait]
pub trait Backend: Send {
    /// Human-readable protocol name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Metadata following symlinks. Requires: path exists and is not a broken link.
    async fn stat(&mut self, path: &str) -> Result<FileStat>;

    /// Metadata of the entry itself. Requires: path link-exists.
    async fn lstat(&mut self, path: &str) -> Result<FileStat>;

    /// Raw entry names, possibly including `.` and `..`. Requires: path is a directory.
    async fn list(&mut self, path: &str) -> Result<Vec<String>>;

    /// Requires: `old` exists, `new` does not link-exist.
    async fn rename(&mut self, old: &str, new: &str) -> Result<()>;

    /// Byte copy of a local file. Requires: local is a file, remote parent exists, remote absent.
    async fn push(&mut self, local: &Path, remote: &str) -> Result<()>;

    /// Byte copy of a remote file. Requires: remote is a file, local parent exists.
    async fn pull(&mut self, remote: &str, local: &Path) -> Result<()>;

    /// Requires: path exists.
    async fn is_dir(&mut self, path: &str) -> Result<bool>;

    /// Requires: path does not link-exist and its parent is a directory.
    async fn mkdir(&mut self, path: &str) -> Result<()>;

    /// Requires: path is an empty directory.
    async fn rmdir(&mut self, path: &str) -> Result<()>;

    /// Requires: path is not a directory.
    async fn unlink(&mut self, path: &str) -> Result<()>;

    /// False for missing paths and broken symlinks.
    async fn exists(&mut self, path: &str) -> Result<bool>;

    /// True whenever a directory entry exists, even a broken symlink.
    async fn lexists(&mut self, path: &str) -> Result<bool>;

    /// Ends the session. Calling it more than once does nothing.
    async fn close(&mut self) -> Result<()>;
}

/// How to authenticate an SFTP session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SftpAuth {
    Password(String),
    KeyFile(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SftpOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: SftpAuth,
    pub host_key_checking: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub tls: bool,
    pub passive_mode: bool,
}

/// SMB dialect family, which decides the smbclient protocol range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmbDialect {
    /// SMB1 or SMB2, NetBIOS session service on port 139 by default.
    Smb12,
    /// SMB2 or SMB3, direct TCP on port 445 by default.
    Smb23,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmbOptions {
    pub dialect: SmbDialect,
    pub host: String,
    pub port: u16,
    pub service_name: String,
    pub username: String,
    pub password: String,
    pub client_name: String,
    pub use_ntlm_v1: bool,
    pub enable_encryption: bool,
    pub require_signing: bool,
}

/// Every supported backend together with what it needs to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Local filesystem, optionally rooted at a base directory.
    Fs { root: Option<PathBuf> },
    Sftp(SftpOptions),
    Ftp(FtpOptions),
    Smb(SmbOptions),
}

impl BackendConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fs { .. } => "FS",
            Self::Sftp(_) => "SFTP",
            Self::Ftp(o) if o.tls => "FTPS",
            Self::Ftp(_) => "FTP",
            Self::Smb(o) if o.dialect == SmbDialect::Smb12 => "SMB12",
            Self::Smb(_) => "SMB23",
        }
    }

    /// Opens the session described by this configuration.
    pub async fn connect(&self, settings: &Settings) -> Result<Box<dyn Backend>> {
        let backend: Box<dyn Backend> = match self {
            Self::Fs { root } => Box::new(fs::FsBackend::with_settings(root.clone(), settings)),
            Self::Sftp(options) => Box::new(sftp::SftpBackend::connect(options).await?),
            Self::Ftp(options) => Box::new(ftp::FtpBackend::connect(options, settings).await?),
            Self::Smb(options) => Box::new(smb::SmbBackend::connect(options, settings).await?),
        };
        Ok(backend)
    }
}

/// Protocol default port for each connection type.
pub mod default_port {
    pub const SFTP: u16 = 22;
    pub const FTP: u16 = 21;
    pub const FTPS: u16 = 990;
    pub const SMB12: u16 = 139;
    pub const SMB23: u16 = 445;
}
