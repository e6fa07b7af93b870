use super::{Backend, SmbDialect, SmbOptions};
use crate::error::{Error, Result};
use crate::path;
use crate::settings::Settings;
use crate::stat::FileStat;
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, TimeZone};
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::process::Command as TokioCommand;

const NAME: &str = "SMB";

/// Characters that can never appear in an SMB path component.
const ILLEGAL_CHARS: &[char] = &['?', '<', '>', '\\', ':', '*', '|'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthProtocol {
    #[default]
    Negotiate,
    Ntlm,
    Kerberos,
}

/// Client configuration shared by every SMB2/3 connection in the process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Smb23ClientConfig {
    /// Used when a connection is opened without a username.
    pub username: Option<String>,
    /// Used when a connection is opened without a password.
    pub password: Option<String>,
    /// Workgroup or domain sent during authentication.
    pub domain: Option<String>,
    pub auth_protocol: AuthProtocol,
}

static SMB23_CONFIG: Mutex<Option<Smb23ClientConfig>> = Mutex::new(None);
static SMB23_LIVE: AtomicUsize = AtomicUsize::new(0);

/// Installs the SMB2/3 client configuration.
///
/// Must run before the first SMB2/3 connection is opened. Replacing it with a
/// different value while SMB2/3 connections are alive is refused.
pub fn configure_smb23(config: Smb23ClientConfig) -> Result<()> {
    let mut current = SMB23_CONFIG
        .lock()
        .map_err(|_| Error::backend(NAME, "client configuration lock poisoned"))?;
    if SMB23_LIVE.load(Ordering::SeqCst) > 0 && current.as_ref() != Some(&config) {
        return Err(Error::InvalidArgument(
            "SMB2/3 client configuration cannot change while connections are open".to_string(),
        ));
    }
    *current = Some(config);
    Ok(())
}

fn smb23_config() -> Smb23ClientConfig {
    SMB23_CONFIG
        .lock()
        .ok()
        .and_then(|config| config.clone())
        .unwrap_or_default()
}

/// One line of `smbclient ls` output.
#[derive(Debug, Clone, PartialEq)]
struct SmbEntry {
    name: String,
    is_dir: bool,
    read_only: bool,
    size: u64,
    modified: Option<chrono::DateTime<Local>>,
}

/// SMB backend driving the `smbclient` executable, one invocation per primitive.
pub struct SmbBackend {
    dialect: SmbDialect,
    host: String,
    port: u16,
    share: String,
    username: String,
    password: String,
    client_name: String,
    use_ntlm_v1: bool,
    enable_encryption: bool,
    require_signing: bool,
    default_fmask: u32,
    default_dmask: u32,
    open: bool,
}

impl SmbBackend {
    pub fn new(options: &SmbOptions, settings: &Settings) -> Self {
        let mut username = options.username.clone();
        let mut password = options.password.clone();
        if options.dialect == SmbDialect::Smb23 {
            let global = smb23_config();
            if username.is_empty() {
                username = global.username.unwrap_or_default();
            }
            if password.is_empty() {
                password = global.password.unwrap_or_default();
            }
        }

        Self {
            dialect: options.dialect,
            host: options.host.clone(),
            port: options.port,
            share: options.service_name.clone(),
            username,
            password,
            client_name: options.client_name.clone(),
            use_ntlm_v1: options.use_ntlm_v1,
            enable_encryption: options.enable_encryption,
            require_signing: options.require_signing,
            default_fmask: settings.default_fmask,
            default_dmask: settings.default_dmask,
            open: false,
        }
    }

    pub async fn connect(options: &SmbOptions, settings: &Settings) -> Result<Self> {
        let mut backend = Self::new(options, settings);
        let failure = |reason: String| Error::ConnectionFailure {
            backend: NAME,
            host: format!("{}:{}", options.host, options.port),
            reason,
        };

        Self::check_smbclient_available().map_err(|e| failure(e.to_string()))?;

        // Test connection by listing the share root
        backend
            .run_smbclient_command("ls")
            .await
            .map_err(|e| failure(e.to_string()))?;

        backend.open = true;
        if backend.dialect == SmbDialect::Smb23 {
            SMB23_LIVE.fetch_add(1, Ordering::SeqCst);
        }
        Ok(backend)
    }

    fn check_smbclient_available() -> Result<()> {
        let output = Command::new("smbclient").arg("--version").output();

        match output {
            Ok(output) if output.status.success() => Ok(()),
            _ => Err(Error::backend(
                NAME,
                "smbclient not found. Please install samba-client package",
            )),
        }
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("//{}/{}", self.host, self.share),
            "-p".to_string(),
            self.port.to_string(),
            "-U".to_string(),
            format!("{}%{}", self.username, self.password),
        ];

        match self.dialect {
            SmbDialect::Smb12 => {
                args.push("--option=client min protocol=NT1".to_string());
                args.push("-m".to_string());
                args.push("SMB2".to_string());
                args.push("-n".to_string());
                args.push(self.client_name.clone());
                if self.use_ntlm_v1 {
                    args.push("--option=client ntlmv2 auth=no".to_string());
                }
            }
            SmbDialect::Smb23 => {
                args.push("--option=client min protocol=SMB2".to_string());
                args.push("-m".to_string());
                args.push("SMB3".to_string());
                if self.enable_encryption {
                    args.push("-e".to_string());
                }
                let global = smb23_config();
                if let Some(domain) = global.domain {
                    args.push("-W".to_string());
                    args.push(domain);
                }
                match global.auth_protocol {
                    AuthProtocol::Negotiate => {}
                    AuthProtocol::Ntlm => args.push("--option=client use spnego=no".to_string()),
                    AuthProtocol::Kerberos => args.push("-k".to_string()),
                }
            }
        }

        if self.require_signing {
            args.push("--option=client signing=mandatory".to_string());
        }
        args
    }

    async fn run_smbclient_command(&self, command: &str) -> Result<String> {
        let mut cmd = TokioCommand::new("smbclient");
        cmd.args(self.base_args());
        cmd.arg("-c").arg(command);

        let output = cmd.output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        if !output.status.success() || stdout.contains("NT_STATUS_") {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::backend(
                NAME,
                format!("command `{}` failed: {}{}", command, stdout.trim(), stderr.trim()),
            ));
        }

        Ok(stdout)
    }

    fn share_path(path: &str) -> String {
        path.trim_start_matches('/').to_string()
    }

    fn quote(path: &str) -> String {
        format!("\"{}\"", Self::share_path(path))
    }

    fn contains_illegal_char(path: &str) -> bool {
        path.chars().any(|c| ILLEGAL_CHARS.contains(&c))
    }

    fn parse_list(output: &str) -> Vec<SmbEntry> {
        output.lines().filter_map(Self::parse_list_line).collect()
    }

    // smbclient prints `  <name>  <attrs>  <size>  <weekday month day hh:mm:ss year>`;
    // the name may contain spaces, so the line is taken apart from the right.
    fn parse_list_line(line: &str) -> Option<SmbEntry> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.contains("blocks of size") || trimmed.contains("blocks available") {
            return None;
        }

        let mut rest = trimmed;
        let mut date = Vec::with_capacity(5);
        for _ in 0..5 {
            let (head, token) = pop_token(rest)?;
            date.push(token);
            rest = head;
        }
        date.reverse();

        let (head, size) = pop_token(rest)?;
        let size = size.parse::<u64>().ok()?;
        rest = head;

        let mut attributes = "";
        if let Some((head, token)) = pop_token(rest) {
            if token.chars().all(|c| "ADHSRNVLIO".contains(c)) {
                attributes = token;
                rest = head;
            }
        }

        let name = rest.trim();
        if name.is_empty() || name == "." || name == ".." {
            return None;
        }

        let modified = NaiveDateTime::parse_from_str(&date.join(" "), "%a %b %e %H:%M:%S %Y")
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).single());

        let is_dir = attributes.contains('D');
        Some(SmbEntry {
            name: name.to_string(),
            is_dir,
            read_only: attributes.contains('R'),
            size: if is_dir { 0 } else { size },
            modified,
        })
    }

    async fn entry(&self, target: &str) -> Result<Option<SmbEntry>> {
        let (dirname, basename) = path::split(target);
        if basename.is_empty() || Self::contains_illegal_char(target) {
            return Ok(None);
        }

        let listing = if path::is_root(dirname) {
            "ls".to_string()
        } else {
            format!("cd {}; ls", Self::quote(dirname))
        };
        // A failing listing means the parent does not exist.
        let output = match self.run_smbclient_command(&listing).await {
            Ok(output) => output,
            Err(_) => return Ok(None),
        };
        Ok(Self::parse_list(&output)
            .into_iter()
            .find(|entry| entry.name == basename))
    }

    fn to_stat(&self, entry: &SmbEntry) -> FileStat {
        let mode = FileStat::synthesize_mode(
            entry.is_dir,
            entry.read_only,
            self.default_fmask,
            self.default_dmask,
        );
        FileStat::new(mode, entry.size, entry.modified.unwrap_or_else(Local::now))
    }

    async fn lookup(&self, target: &str) -> Result<FileStat> {
        if path::is_root(target) {
            let mode = FileStat::synthesize_mode(true, false, self.default_fmask, self.default_dmask);
            return Ok(FileStat::new(mode, 0, Local::now()));
        }
        match self.entry(target).await? {
            Some(entry) => Ok(self.to_stat(&entry)),
            None => Err(Error::backend(NAME, format!("{} not found on //{}/{}", target, self.host, self.share))),
        }
    }

    fn release(&mut self) {
        if self.open {
            self.open = false;
            if self.dialect == SmbDialect::Smb23 {
                SMB23_LIVE.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }
}

impl Drop for SmbBackend {
    fn drop(&mut self) {
        self.release();
    }
}

fn pop_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_end();
    if s.is_empty() {
        return None;
    }
    match s.rfind(char::is_whitespace) {
        Some(idx) => Some((&s[..idx], &s[idx + 1..])),
        None => Some(("", s)),
    }
}

#[async_trait]
impl Backend for SmbBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn stat(&mut self, path: &str) -> Result<FileStat> {
        self.lookup(path).await
    }

    // smbclient exposes no link information.
    async fn lstat(&mut self, path: &str) -> Result<FileStat> {
        self.lookup(path).await
    }

    async fn list(&mut self, dir: &str) -> Result<Vec<String>> {
        let command = if path::is_root(dir) {
            "ls".to_string()
        } else {
            format!("cd {}; ls", Self::quote(dir))
        };
        let output = self.run_smbclient_command(&command).await?;
        Ok(Self::parse_list(&output).into_iter().map(|e| e.name).collect())
    }

    async fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let command = format!("rename {} {}", Self::quote(old), Self::quote(new));
        self.run_smbclient_command(&command).await?;
        Ok(())
    }

    async fn push(&mut self, local: &Path, remote: &str) -> Result<()> {
        let command = format!("put \"{}\" {}", local.to_string_lossy(), Self::quote(remote));
        self.run_smbclient_command(&command).await?;
        Ok(())
    }

    async fn pull(&mut self, remote: &str, local: &Path) -> Result<()> {
        let command = format!("get {} \"{}\"", Self::quote(remote), local.to_string_lossy());
        self.run_smbclient_command(&command).await?;
        Ok(())
    }

    async fn is_dir(&mut self, path: &str) -> Result<bool> {
        if path::is_root(path) {
            return Ok(true);
        }
        Ok(self.entry(path).await?.map(|e| e.is_dir).unwrap_or(false))
    }

    async fn mkdir(&mut self, path: &str) -> Result<()> {
        self.run_smbclient_command(&format!("mkdir {}", Self::quote(path))).await?;
        Ok(())
    }

    async fn rmdir(&mut self, path: &str) -> Result<()> {
        self.run_smbclient_command(&format!("rmdir {}", Self::quote(path))).await?;
        Ok(())
    }

    async fn unlink(&mut self, path: &str) -> Result<()> {
        self.run_smbclient_command(&format!("del {}", Self::quote(path))).await?;
        Ok(())
    }

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
        // Nothing to do for SMB - each command is a separate connection
        self.release();
        Ok(())
    }
}
