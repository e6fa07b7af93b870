use super::{Backend, FtpOptions};
use crate::error::{Error, Result};
use crate::path;
use crate::settings::Settings;
use crate::stat::{self, FileStat, S_IFLNK};
use async_trait::async_trait;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use suppaftp::list::File as ListEntry;
use suppaftp::native_tls::TlsConnector;
use suppaftp::{FtpError, FtpStream, Mode, NativeTlsConnector, NativeTlsFtpStream};

const NAME: &str = "FTP";

enum FtpSession {
    Plain(FtpStream),
    Secure(NativeTlsFtpStream),
}

// Both stream types expose the same inherent API.
macro_rules! on_stream {
    ($session:expr, $ftp:ident => $body:expr) => {
        match $session {
            FtpSession::Plain($ftp) => $body,
            FtpSession::Secure($ftp) => $body,
        }
    };
}

impl FtpSession {
    fn list(&mut self, dir: &str) -> Result<Vec<String>, FtpError> {
        let target = if path::is_root(dir) && dir != "/" { None } else { Some(dir) };
        on_stream!(self, ftp => ftp.list(target))
    }

    fn mkdir(&mut self, path: &str) -> Result<(), FtpError> {
        on_stream!(self, ftp => ftp.mkdir(path))
    }

    fn rmdir(&mut self, path: &str) -> Result<(), FtpError> {
        on_stream!(self, ftp => ftp.rmdir(path))
    }

    fn rm(&mut self, path: &str) -> Result<(), FtpError> {
        on_stream!(self, ftp => ftp.rm(path))
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), FtpError> {
        on_stream!(self, ftp => ftp.rename(from, to))
    }

    fn put(&mut self, path: &str, data: &[u8]) -> Result<u64, FtpError> {
        on_stream!(self, ftp => ftp.put_file(path, &mut &data[..]))
    }

    fn retr(&mut self, path: &str) -> Result<Vec<u8>, std::io::Error> {
        let mut reader = on_stream!(self, ftp => ftp.retr_as_buffer(path))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(data)
    }

    fn quit(&mut self) -> Result<(), FtpError> {
        on_stream!(self, ftp => ftp.quit())
    }
}

/// FTP and FTPS backend over one persistent control connection.
pub struct FtpBackend {
    host: String,
    session: Arc<Mutex<Option<FtpSession>>>,
    default_fmask: u32,
    default_dmask: u32,
}

impl FtpBackend {
    pub async fn connect(options: &FtpOptions, settings: &Settings) -> Result<Self> {
        let address = format!("{}:{}", options.host, options.port);
        let opts = options.clone();

        let session = tokio::task::spawn_blocking(move || Self::open_session(&opts))
            .await
            .map_err(|e| Error::backend(NAME, e))?
            .map_err(|e| Error::ConnectionFailure {
                backend: if options.tls { "FTPS" } else { NAME },
                host: address.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!("FTP session to {} established", address);
        Ok(Self {
            host: address,
            session: Arc::new(Mutex::new(Some(session))),
            default_fmask: settings.default_fmask,
            default_dmask: settings.default_dmask,
        })
    }

    fn open_session(options: &FtpOptions) -> std::result::Result<FtpSession, Box<dyn std::error::Error + Send + Sync>> {
        let address = format!("{}:{}", options.host, options.port);
        let mode = if options.passive_mode {
            Mode::Passive
        } else {
            Mode::Active
        };

        let mut session = if options.tls {
            let connector = NativeTlsConnector::from(TlsConnector::new()?);
            let ftp = NativeTlsFtpStream::connect(&address)?.into_secure(connector, &options.host)?;
            FtpSession::Secure(ftp)
        } else {
            FtpSession::Plain(FtpStream::connect(&address)?)
        };

        on_stream!(&mut session, ftp => {
            ftp.login(options.username.as_str(), options.password.as_str())?;
            ftp.set_mode(mode);
        });
        Ok(session)
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut FtpSession) -> Result<T> + Send + 'static,
    {
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            let mut guard = session
                .lock()
                .map_err(|_| Error::backend(NAME, "session lock poisoned"))?;
            let ftp = guard
                .as_mut()
                .ok_or_else(|| Error::backend(NAME, "connection is closed"))?;
            op(ftp)
        })
        .await
        .map_err(|e| Error::backend(NAME, e))?
    }

    fn parse_entries(lines: &[String]) -> Vec<ListEntry> {
        lines
            .iter()
            .filter_map(|line| ListEntry::from_str(line).ok())
            .filter(|entry| entry.name() != "." && entry.name() != "..")
            .collect()
    }

    /// Looks a path up in its parent's listing.
    async fn entry(&self, target: &str) -> Result<Option<ListEntry>> {
        let (dirname, basename) = path::split(target);
        if basename.is_empty() {
            return Ok(None);
        }
        let dir = path::dir_or_current(dirname).to_string();
        let name = basename.to_string();

        self.run(move |ftp| {
            // A missing parent is reported as a failed LIST.
            let lines = match ftp.list(&dir) {
                Ok(lines) => lines,
                Err(_) => return Ok(None),
            };
            Ok(Self::parse_entries(&lines)
                .into_iter()
                .find(|entry| entry.name() == name))
        })
        .await
    }

    fn to_stat(&self, entry: &ListEntry) -> FileStat {
        let mode = if entry.is_symlink() {
            S_IFLNK | 0o777
        } else {
            FileStat::synthesize_mode(
                entry.is_directory(),
                false,
                self.default_fmask,
                self.default_dmask,
            )
        };
        let mut result = FileStat::new(
            mode,
            entry.size() as u64,
            stat::from_system_time(entry.modified()),
        );
        result.uid = entry.uid().unwrap_or(0);
        result.gid = entry.gid().unwrap_or(0);
        result
    }

    fn root_stat(&self) -> FileStat {
        let mode = FileStat::synthesize_mode(true, false, self.default_fmask, self.default_dmask);
        FileStat::new(mode, 0, chrono::Local::now())
    }

    async fn lookup(&self, target: &str) -> Result<FileStat> {
        if path::is_root(target) {
            return Ok(self.root_stat());
        }
        match self.entry(target).await? {
            Some(entry) => Ok(self.to_stat(&entry)),
            None => Err(Error::backend(NAME, format!("{} not found on {}", target, self.host))),
        }
    }
}

fn ftp_err(err: FtpError) -> Error {
    Error::backend(NAME, err)
}

#[async_trait]
impl Backend for FtpBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn stat(&mut self, path: &str) -> Result<FileStat> {
        self.lookup(path).await
    }

    // LIST shows the link itself, so stat and lstat agree.
    async fn lstat(&mut self, path: &str) -> Result<FileStat> {
        self.lookup(path).await
    }

    async fn list(&mut self, dir: &str) -> Result<Vec<String>> {
        let dir = dir.to_string();
        self.run(move |ftp| {
            let lines = ftp.list(&dir).map_err(ftp_err)?;
            Ok(Self::parse_entries(&lines)
                .into_iter()
                .map(|entry| entry.name().to_string())
                .collect())
        })
        .await
    }

    async fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let (old, new) = (old.to_string(), new.to_string());
        self.run(move |ftp| ftp.rename(&old, &new).map_err(ftp_err)).await
    }

    async fn push(&mut self, local: &Path, remote: &str) -> Result<()> {
        let local = local.to_path_buf();
        let remote = remote.to_string();
        self.run(move |ftp| {
            let mut data = Vec::new();
            File::open(&local)?.read_to_end(&mut data)?;
            ftp.put(&remote, &data).map_err(ftp_err)?;
            Ok(())
        })
        .await
    }

    async fn pull(&mut self, remote: &str, local: &Path) -> Result<()> {
        let local: PathBuf = local.to_path_buf();
        let remote = remote.to_string();
        self.run(move |ftp| {
            let data = ftp.retr(&remote)?;
            let mut file = File::create(&local)?;
            file.write_all(&data)?;
            Ok(())
        })
        .await
    }

    async fn is_dir(&mut self, path: &str) -> Result<bool> {
        if path::is_root(path) {
            return Ok(true);
        }
        Ok(self
            .entry(path)
            .await?
            .map(|entry| entry.is_directory())
            .unwrap_or(false))
    }

    async fn mkdir(&mut self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.run(move |ftp| ftp.mkdir(&path).map_err(ftp_err)).await
    }

    async fn rmdir(&mut self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.run(move |ftp| ftp.rmdir(&path).map_err(ftp_err)).await
    }

    async fn unlink(&mut self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.run(move |ftp| ftp.rm(&path).map_err(ftp_err)).await
    }

    // FTP cannot tell whether a link target exists; links count as present.
    async fn exists(&mut self, path: &str) -> Result<bool> {
        self.lexists(path).await
    }

    async fn lexists(&mut self, path: &str) -> Result<bool> {
        if path::is_root(path) {
            return Ok(true);
        }
        Ok(self.entry(path).await?.is_some())
    }

    async fn close(&mut self) -> Result<()> {
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            let taken = session
                .lock()
                .map_err(|_| Error::backend(NAME, "session lock poisoned"))?
                .take();
            if let Some(mut ftp) = taken {
                ftp.quit().map_err(ftp_err)?;
            }
            Ok(())
        })
        .await
        .map_err(|e| Error::backend(NAME, e))?
    }
}
