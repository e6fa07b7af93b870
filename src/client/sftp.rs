use super::{Backend, SftpAuth, SftpOptions};
use crate::error::{Error, Result};
use crate::path;
use crate::stat::{self, FileStat};
use async_trait::async_trait;
use russh::client;
use russh_keys::key::PublicKey;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::FileAttributes;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const NAME: &str = "SFTP";

struct HostKeyPolicy {
    host: String,
    port: u16,
    checking: bool,
}

#[async_trait]
impl client::Handler for HostKeyPolicy {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        if !self.checking {
            return Ok(true);
        }
        match russh_keys::check_known_hosts(&self.host, self.port, server_public_key) {
            Ok(known) => {
                if !known {
                    tracing::error!("host key of {}:{} is not in known_hosts", self.host, self.port);
                }
                Ok(known)
            }
            Err(e) => {
                tracing::error!("host key verification of {} failed: {}", self.host, e);
                Ok(false)
            }
        }
    }
}

/// SFTP backend over an SSH session.
pub struct SftpBackend {
    session: Option<client::Handle<HostKeyPolicy>>,
    sftp: Option<SftpSession>,
}

impl SftpBackend {
    pub async fn connect(options: &SftpOptions) -> Result<Self> {
        let host = format!("{}:{}", options.host, options.port);
        let failure = |reason: String| Error::ConnectionFailure {
            backend: NAME,
            host: host.clone(),
            reason,
        };

        if !options.host_key_checking {
            tracing::warn!("DANGER! Strict host key checking is disabled.");
        }

        let policy = HostKeyPolicy {
            host: options.host.clone(),
            port: options.port,
            checking: options.host_key_checking,
        };
        let config = Arc::new(client::Config::default());
        let mut session = client::connect(config, (options.host.as_str(), options.port), policy)
            .await
            .map_err(|e| failure(e.to_string()))?;

        let authenticated = match &options.auth {
            SftpAuth::Password(password) => session
                .authenticate_password(options.username.as_str(), password.as_str())
                .await
                .map_err(|e| failure(e.to_string()))?,
            SftpAuth::KeyFile(keyfile) => {
                let key = russh_keys::load_secret_key(keyfile, None)
                    .map_err(|e| failure(format!("cannot load key {}: {}", keyfile.display(), e)))?;
                session
                    .authenticate_publickey(options.username.as_str(), Arc::new(key))
                    .await
                    .map_err(|e| failure(e.to_string()))?
            }
        };
        if !authenticated {
            return Err(failure(format!("authentication of {} rejected", options.username)));
        }

        let channel = session
            .channel_open_session()
            .await
            .map_err(|e| failure(e.to_string()))?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| failure(e.to_string()))?;
        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| failure(e.to_string()))?;

        tracing::debug!("SFTP session to {} established", host);
        Ok(Self {
            session: Some(session),
            sftp: Some(sftp),
        })
    }

    fn sftp(&self) -> Result<&SftpSession> {
        self.sftp
            .as_ref()
            .ok_or_else(|| Error::backend(NAME, "connection is closed"))
    }

    fn target(path: &str) -> String {
        if path.is_empty() {
            ".".to_string()
        } else {
            path.to_string()
        }
    }
}

fn sftp_err(err: russh_sftp::client::error::Error) -> Error {
    Error::backend(NAME, err)
}

fn to_stat(attrs: &FileAttributes) -> FileStat {
    let modified = stat::from_unix_seconds(i64::from(attrs.mtime.unwrap_or(0)));
    let mut result = FileStat::new(attrs.permissions.unwrap_or(0), attrs.size.unwrap_or(0), modified);
    if let Some(atime) = attrs.atime {
        result.accessed = stat::from_unix_seconds(i64::from(atime));
    }
    result.uid = attrs.uid.unwrap_or(0);
    result.gid = attrs.gid.unwrap_or(0);
    result
}

#[async_trait]
impl Backend for SftpBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn stat(&mut self, path: &str) -> Result<FileStat> {
        let attrs = self.sftp()?.metadata(Self::target(path)).await.map_err(sftp_err)?;
        Ok(to_stat(&attrs))
    }

    async fn lstat(&mut self, path: &str) -> Result<FileStat> {
        let attrs = self
            .sftp()?
            .symlink_metadata(Self::target(path))
            .await
            .map_err(sftp_err)?;
        Ok(to_stat(&attrs))
    }

    async fn list(&mut self, dir: &str) -> Result<Vec<String>> {
        let entries = self.sftp()?.read_dir(Self::target(dir)).await.map_err(sftp_err)?;
        Ok(entries.map(|entry| entry.file_name()).collect())
    }

    async fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        self.sftp()?
            .rename(Self::target(old), Self::target(new))
            .await
            .map_err(sftp_err)
    }

    async fn push(&mut self, local: &Path, remote: &str) -> Result<()> {
        let data = tokio::fs::read(local).await?;
        let mut file = self.sftp()?.create(Self::target(remote)).await.map_err(sftp_err)?;
        file.write_all(&data).await?;
        file.shutdown().await?;
        Ok(())
    }

    async fn pull(&mut self, remote: &str, local: &Path) -> Result<()> {
        let mut file = self.sftp()?.open(Self::target(remote)).await.map_err(sftp_err)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).await?;
        tokio::fs::write(local, data).await?;
        Ok(())
    }

    async fn is_dir(&mut self, path: &str) -> Result<bool> {
        match self.sftp()?.metadata(Self::target(path)).await {
            Ok(attrs) => Ok(attrs.is_dir()),
            Err(_) => Ok(false),
        }
    }

    async fn mkdir(&mut self, path: &str) -> Result<()> {
        self.sftp()?.create_dir(Self::target(path)).await.map_err(sftp_err)
    }

    async fn rmdir(&mut self, path: &str) -> Result<()> {
        self.sftp()?.remove_dir(Self::target(path)).await.map_err(sftp_err)
    }

    async fn unlink(&mut self, path: &str) -> Result<()> {
        self.sftp()?.remove_file(Self::target(path)).await.map_err(sftp_err)
    }

    async fn exists(&mut self, path: &str) -> Result<bool> {
        if path::is_root(path) {
            return Ok(true);
        }
        Ok(self.sftp()?.metadata(Self::target(path)).await.is_ok())
    }

    async fn lexists(&mut self, path: &str) -> Result<bool> {
        if path::is_root(path) {
            return Ok(true);
        }
        Ok(self
            .sftp()?
            .symlink_metadata(Self::target(path))
            .await
            .is_ok())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(sftp) = self.sftp.take() {
            sftp.close().await.map_err(sftp_err)?;
        }
        if let Some(session) = self.session.take() {
            session
                .disconnect(russh::Disconnect::ByApplication, "", "en")
                .await
                .map_err(|e| Error::backend(NAME, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stat::{S_IFDIR, S_IFREG};

    #[test]
    fn test_to_stat_defaults_missing_fields() {
        let attrs = FileAttributes {
            size: Some(42),
            permissions: Some(S_IFREG | 0o600),
            mtime: Some(1_700_000_000),
            ..FileAttributes::default()
        };
        let stat = to_stat(&attrs);

        assert_eq!(stat.size, 42);
        assert!(stat.is_file());
        assert_eq!(stat.permissions(), 0o600);
        assert_eq!(stat.accessed, stat.modified);
        assert_eq!(stat.uid, 0);
        assert_eq!(stat.gid, 0);
    }

    #[test]
    fn test_to_stat_directory() {
        let attrs = FileAttributes {
            permissions: Some(S_IFDIR | 0o755),
            uid: Some(1000),
            gid: Some(100),
            ..FileAttributes::default()
        };
        let stat = to_stat(&attrs);
        assert!(stat.is_dir());
        assert_eq!(stat.uid, 1000);
        assert_eq!(stat.gid, 100);
    }

    #[test]
    fn test_empty_path_targets_home() {
        assert_eq!(SftpBackend::target(""), ".");
        assert_eq!(SftpBackend::target("/a"), "/a");
    }
}
