use crate::client::smb::{AuthProtocol, Smb23ClientConfig};
use crate::client::{
    default_port, BackendConfig, FtpOptions, SftpAuth, SftpOptions, SmbDialect, SmbOptions,
};
use crate::error::{Error, Result as RfsResult};
use crate::settings::Settings;
use anyhow::Result;
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted connection profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub connection_type: ConnectionType,
    pub host: String,
    /// Protocol default when unset.
    pub port: Option<u16>,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// SFTP private key, used when no password is given.
    pub keyfile: Option<PathBuf>,
    /// SMB share name.
    pub service_name: Option<String>,
    /// Prepended to every remote path.
    pub remote_prefix: String,
    /// Base directory of an FS pseudo-connection.
    pub root: Option<PathBuf>,
    pub passive_mode: bool,
    pub no_host_key_checking: bool,
    pub client_name: String,
    pub use_ntlm_v1: bool,
    pub enable_encryption: bool,
    pub dont_require_signing: bool,
    pub smb23: Smb23Profile,
    pub settings: Settings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionType {
    #[default]
    Fs,
    Sftp,
    Ftp,
    Ftps,
    Smb12,
    Smb23,
}

/// SMB2/3 options applied process-wide before connecting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Smb23Profile {
    pub domain: Option<String>,
    pub auth_protocol: Smb23Auth,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Smb23Auth {
    #[default]
    Negotiate,
    Ntlm,
    Kerberos,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            connection_type: ConnectionType::Fs,
            host: String::new(),
            port: None,
            username: String::new(),
            password: None,
            keyfile: None,
            service_name: None,
            remote_prefix: String::new(),
            root: None,
            passive_mode: true,
            no_host_key_checking: false,
            client_name: "RFS".to_string(),
            use_ntlm_v1: false,
            enable_encryption: false,
            dont_require_signing: false,
            smb23: Smb23Profile::default(),
            settings: Settings::default(),
        }
    }
}

impl Profile {
    /// Loads `path`, or the profile in the platform config directory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::config_path(),
        };
        if let Some(config_path) = config_path {
            if config_path.exists() {
                let content = fs::read_to_string(config_path)?;
                let profile: Profile = serde_json::from_str(&content)?;
                return Ok(profile);
            }
        }
        Ok(Self::default())
    }

    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()
                .ok_or_else(|| anyhow::anyhow!("no configuration directory on this platform"))?,
        };
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, content)?;
        Ok(config_path)
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "rfstools", "rfs").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Whether connecting needs a password nobody has supplied yet.
    pub fn needs_password(&self) -> bool {
        match self.connection_type {
            ConnectionType::Fs => false,
            ConnectionType::Sftp => false,
            _ => self.password.is_none(),
        }
    }

    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(match self.connection_type {
            ConnectionType::Fs => 0,
            ConnectionType::Sftp => default_port::SFTP,
            ConnectionType::Ftp => default_port::FTP,
            ConnectionType::Ftps => default_port::FTPS,
            ConnectionType::Smb12 => default_port::SMB12,
            ConnectionType::Smb23 => default_port::SMB23,
        })
    }

    /// The profile as JSON with the password masked, for logs.
    pub fn redacted(&self) -> String {
        let mut shown = self.clone();
        shown.password = None;
        let mut text = serde_json::to_string(&shown).unwrap_or_default();
        if self.password.is_some() {
            text.push_str(" (password: ******)");
        }
        text
    }

    pub fn smb23_client_config(&self) -> Smb23ClientConfig {
        Smb23ClientConfig {
            username: None,
            password: None,
            domain: self.smb23.domain.clone(),
            auth_protocol: match self.smb23.auth_protocol {
                Smb23Auth::Negotiate => AuthProtocol::Negotiate,
                Smb23Auth::Ntlm => AuthProtocol::Ntlm,
                Smb23Auth::Kerberos => AuthProtocol::Kerberos,
            },
        }
    }

    fn require<'a>(&self, name: &str, value: Option<&'a str>) -> RfsResult<&'a str> {
        match value {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(Error::InvalidArgument(format!(
                "connection type {:?} needs {}",
                self.connection_type, name
            ))),
        }
    }

    /// Validates the fields the connection type needs and builds its backend configuration.
    pub fn backend_config(&self) -> RfsResult<BackendConfig> {
        if self.connection_type == ConnectionType::Fs {
            return Ok(BackendConfig::Fs {
                root: self.root.clone(),
            });
        }

        let host = self.require("host", Some(self.host.as_str()))?.to_string();
        let username = self.require("username", Some(self.username.as_str()))?.to_string();
        let port = self.effective_port();

        if self.connection_type == ConnectionType::Sftp {
            let auth = match &self.password {
                Some(password) => SftpAuth::Password(password.clone()),
                None => SftpAuth::KeyFile(self.keyfile.clone().unwrap_or_else(default_keyfile)),
            };
            return Ok(BackendConfig::Sftp(SftpOptions {
                host,
                port,
                username,
                auth,
                host_key_checking: !self.no_host_key_checking,
            }));
        }

        let password = self.require("password", self.password.as_deref())?.to_string();

        match self.connection_type {
            ConnectionType::Ftp | ConnectionType::Ftps => Ok(BackendConfig::Ftp(FtpOptions {
                host,
                port,
                username,
                password,
                tls: self.connection_type == ConnectionType::Ftps,
                passive_mode: self.passive_mode,
            })),
            _ => {
                let service_name = self
                    .require("service_name", self.service_name.as_deref())?
                    .to_string();
                let dialect = if self.connection_type == ConnectionType::Smb12 {
                    SmbDialect::Smb12
                } else {
                    SmbDialect::Smb23
                };
                Ok(BackendConfig::Smb(SmbOptions {
                    dialect,
                    host,
                    port,
                    service_name,
                    username,
                    password,
                    client_name: self.client_name.clone(),
                    use_ntlm_v1: self.use_ntlm_v1,
                    enable_encryption: self.enable_encryption,
                    require_signing: !self.dont_require_signing,
                }))
            }
        }
    }
}

fn default_keyfile() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".ssh").join("id_rsa"))
        .unwrap_or_else(|| PathBuf::from("~/.ssh/id_rsa"))
}
