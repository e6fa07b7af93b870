#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::significant_drop_tightening
)]

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use rfs::client::smb::configure_smb23;
use rfs::config::{ConnectionType, Profile, Smb23Auth};
use rfs::dispatch::{self, connection_for};
use rfs::glob::Globber;
use rfs::path::{self, GenericPath};
use rfs::{Connection, FileStat, Settings};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Helper function to ensure the profile has a password, prompting if needed
fn ensure_password(profile: &mut Profile) -> Result<()> {
    if profile.needs_password() {
        use std::io::Write;

        print!("Password for {}@{} (hidden): ", profile.username, profile.host);
        std::io::stdout().flush()?;

        // Try to read password securely, fallback to regular input if needed
        match rpassword::prompt_password("") {
            Ok(password) => {
                profile.password = Some(password);
            }
            Err(_) => {
                let mut password = String::new();
                std::io::stdin().read_line(&mut password)?;
                profile.password = Some(password.trim().to_string());
            }
        }
    }
    Ok(())
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Configuration file path
    #[arg(short = 'c', long, global = true, env = "RFSTOOLS_CONFIG")]
    config_file: Option<PathBuf>,

    /// Connection type
    #[arg(short = 'T', long, global = true, ignore_case = true, env = "RFSTOOLS_CONNECTION_TYPE")]
    connection_type: Option<ConnectionType>,

    /// Address of the server
    #[arg(short = 'H', long, global = true, env = "RFSTOOLS_HOST")]
    host: Option<String>,

    /// Port, defaults to the protocol's standard port
    #[arg(short = 'P', long, global = true, env = "RFSTOOLS_PORT")]
    port: Option<u16>,

    #[arg(short = 'U', long, global = true, env = "RFSTOOLS_USERNAME")]
    username: Option<String>,

    /// Password (will prompt if needed and not provided)
    #[arg(short = 'W', long, global = true, env = "RFSTOOLS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// SFTP private key, used when no password is given (default ~/.ssh/id_rsa)
    #[arg(short = 'K', long, global = true, env = "RFSTOOLS_KEYFILE")]
    keyfile: Option<PathBuf>,

    /// SMB shared folder
    #[arg(short = 'S', long, global = true, env = "RFSTOOLS_SHARED_FOLDER")]
    service_name: Option<String>,

    /// Prefix prepended to every remote path
    #[arg(short = 'Z', long, global = true, env = "RFSTOOLS_REMOTE_PREFIX")]
    remote_prefix: Option<String>,

    /// Base directory of an FS connection
    #[arg(long, global = true, env = "RFSTOOLS_ROOT")]
    root: Option<PathBuf>,

    /// Accept any SFTP host key
    #[arg(long, global = true, env = "RFSTOOLS_NO_HOST_KEY_CHECKING")]
    no_host_key_checking: bool,

    /// Use active instead of passive FTP
    #[arg(long, global = true, env = "RFSTOOLS_FTP_ACTIVE")]
    active_mode: bool,

    /// NetBIOS name announced by SMB1/2
    #[arg(long, global = true, env = "RFSTOOLS_CLIENT_NAME")]
    client_name: Option<String>,

    #[arg(long, global = true, env = "RFSTOOLS_USE_NTLM_V1")]
    use_ntlm_v1: bool,

    /// Encrypt SMB3 traffic
    #[arg(long, global = true, env = "RFSTOOLS_ENABLE_ENCRYPTION")]
    enable_encryption: bool,

    #[arg(long, global = true, env = "RFSTOOLS_DONT_REQUIRE_SIGNING")]
    dont_require_signing: bool,

    /// SMB2/3 workgroup or domain
    #[arg(long, global = true, env = "RFSTOOLS_SMB_DOMAIN")]
    smb_domain: Option<String>,

    /// SMB2/3 authentication protocol
    #[arg(long, global = true, ignore_case = true, env = "RFSTOOLS_SMB_AUTH")]
    smb_auth: Option<Smb23Auth>,

    /// Enables verbose mode
    #[arg(short = 'v', long, global = true, env = "RFSTOOLS_VERBOSE")]
    verbose: bool,

    /// Enables debug mode. Implies verbose mode
    #[arg(short = 'D', long, global = true, env = "RFSTOOLS_DEBUG")]
    debug_mode: bool,

    /// Redirect all log messages to a file
    #[arg(short = 'L', long, global = true, env = "RFSTOOLS_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Args, Clone, Default)]
struct TextArgs {
    /// Transmit files as text, converting encoding and line endings
    #[arg(short = 'X', long, env = "RFSTOOLS_TEXT_TRANSMISSION")]
    text_transmission: bool,

    /// Remote side uses CRLF instead of LF
    #[arg(short = 'C', long, env = "RFSTOOLS_REMOTE_CRLF")]
    remote_crlf: bool,

    /// Encoding of remote text files (eg. UTF8, UTF16, cp1250)
    #[arg(short = 'E', long, env = "RFSTOOLS_REMOTE_ENCODING")]
    remote_encoding: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy files; remote paths start with r:
    Cp {
        /// Sources followed by the destination (unless -t is given)
        #[arg(required = true)]
        paths: Vec<String>,

        /// Use this folder as the destination
        #[arg(short = 't', long)]
        target_folder: Option<String>,

        /// Copy directories recursively
        #[arg(short, long)]
        recursive: bool,

        #[command(flatten)]
        text: TextArgs,
    },

    /// Move files; remote paths start with r:
    Mv {
        /// Sources followed by the destination (unless -t is given)
        #[arg(required = true)]
        paths: Vec<String>,

        /// Use this folder as the destination
        #[arg(short = 't', long)]
        target_folder: Option<String>,

        #[command(flatten)]
        text: TextArgs,
    },

    /// Remove files
    Rm {
        #[arg(required = true)]
        files: Vec<String>,

        /// Remove directories and their contents
        #[arg(short, long)]
        recursive: bool,
    },

    /// List directories
    Ls {
        #[arg(required = true)]
        files: Vec<String>,

        /// Show mode, owner, size and modification time
        #[arg(short, long)]
        long: bool,
    },

    /// Create directories
    Mkdir {
        #[arg(required = true)]
        files: Vec<String>,

        /// Create missing parents, no error if existing
        #[arg(short, long)]
        parents: bool,
    },

    /// Remove empty directories
    Rmdir {
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Print the tree below a path, depth first
    Find {
        file: String,

        /// Print directory contents before the directory
        #[arg(long)]
        child_first: bool,
    },

    /// Show file metadata
    Stat {
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Create empty files
    Touch {
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Expand a remote wildcard
    Glob {
        pattern: String,

        /// Treat ** as an ordinary wildcard
        #[arg(long)]
        no_recursive: bool,
    },

    /// Save the connection options as the default profile
    Config {
        /// Print the effective profile instead of saving it
        #[arg(long)]
        show: bool,
    },
}

impl Commands {
    fn text(&self) -> TextArgs {
        match self {
            Self::Cp { text, .. } | Self::Mv { text, .. } => text.clone(),
            _ => TextArgs::default(),
        }
    }
}

impl GlobalArgs {
    /// The saved profile with command-line options layered on top.
    fn profile(&self) -> Result<Profile> {
        let mut profile = Profile::load(self.config_file.as_deref())?;

        if let Some(kind) = self.connection_type {
            profile.connection_type = kind;
        }
        if let Some(host) = &self.host {
            profile.host = host.clone();
        }
        if self.port.is_some() {
            profile.port = self.port;
        }
        if let Some(username) = &self.username {
            profile.username = username.clone();
        }
        if self.password.is_some() {
            profile.password = self.password.clone();
        }
        if self.keyfile.is_some() {
            profile.keyfile = self.keyfile.clone();
        }
        if self.service_name.is_some() {
            profile.service_name = self.service_name.clone();
        }
        if let Some(prefix) = &self.remote_prefix {
            profile.remote_prefix = prefix.clone();
        }
        if self.root.is_some() {
            profile.root = self.root.clone();
        }
        if let Some(name) = &self.client_name {
            profile.client_name = name.clone();
        }
        if self.smb_domain.is_some() {
            profile.smb23.domain = self.smb_domain.clone();
        }
        if let Some(auth) = self.smb_auth {
            profile.smb23.auth_protocol = auth;
        }
        profile.no_host_key_checking |= self.no_host_key_checking;
        profile.passive_mode &= !self.active_mode;
        profile.use_ntlm_v1 |= self.use_ntlm_v1;
        profile.enable_encryption |= self.enable_encryption;
        profile.dont_require_signing |= self.dont_require_signing;
        Ok(profile)
    }
}

fn init_logging(args: &GlobalArgs) -> Result<()> {
    let level = if args.debug_mode {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match &args.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn apply_text_args(settings: &mut Settings, text: &TextArgs) {
    settings.text_transmission |= text.text_transmission;
    settings.remote_crlf |= text.remote_crlf;
    if let Some(encoding) = &text.remote_encoding {
        settings.remote_encoding = encoding.clone();
    }
}

/// Splits `paths` into sources and destination, honoring `-t`.
fn sources_and_destination(paths: &[String], target_folder: Option<&String>) -> Result<(Vec<String>, String)> {
    if let Some(target) = target_folder {
        return Ok((paths.to_vec(), target.clone()));
    }
    match paths.split_last() {
        Some((dest, sources)) if !sources.is_empty() => Ok((sources.to_vec(), dest.clone())),
        _ => bail!("missing destination file operand"),
    }
}

fn print_long(name: &str, stat: &FileStat) {
    let size = if stat.is_dir() {
        "DIR".to_string()
    } else {
        human_bytes::human_bytes(stat.size as f64)
    };
    println!(
        "{} {:>3} {:>6} {:>6} {:>10} {} {}",
        stat.mode_string(),
        stat.nlink,
        stat.uid,
        stat.gid,
        size,
        stat.modified.format("%Y-%m-%d %H:%M:%S"),
        name
    );
}

async fn run(conn: &mut Connection, command: Commands, profile: &Profile) -> Result<()> {
    let prefix = profile.remote_prefix.as_str();
    let destination = |raw: &str| GenericPath::parse(raw).with_remote_prefix(prefix);

    match command {
        Commands::Cp {
            paths,
            target_folder,
            recursive,
            ..
        } => {
            let (sources, dest) = sources_and_destination(&paths, target_folder.as_ref())?;
            let sources = dispatch::expand_paths(conn, &sources, prefix, true).await?;
            dispatch::generic_cp(conn, &sources, &destination(&dest), recursive).await?;
        }
        Commands::Mv {
            paths,
            target_folder,
            ..
        } => {
            let (sources, dest) = sources_and_destination(&paths, target_folder.as_ref())?;
            let sources = dispatch::expand_paths(conn, &sources, prefix, true).await?;
            dispatch::generic_mv(conn, &sources, &destination(&dest)).await?;
        }
        Commands::Rm { files, recursive } => {
            let files = dispatch::expand_paths(conn, &files, prefix, true).await?;
            dispatch::generic_rm(conn, &files, recursive).await?;
        }
        Commands::Ls { files, long } => {
            let files = dispatch::expand_paths(conn, &files, prefix, true).await?;
            let listings = dispatch::generic_ls(conn, &files).await?;
            let mut local = dispatch::local_connection(conn)?;
            let many = listings.len() > 1;

            for (target, entries) in listings {
                if many {
                    println!("{}:", target);
                }
                let side = connection_for(conn, &mut local, &target);
                let is_dir = side.is_dir(&target.path).await?;
                for name in entries {
                    if long {
                        let full = if is_dir {
                            path::join(&target.path, &name)
                        } else {
                            target.path.clone()
                        };
                        print_long(&name, &side.lstat(&full).await?);
                    } else {
                        println!("{}", name);
                    }
                }
            }
        }
        Commands::Mkdir { files, parents } => {
            let files: Vec<GenericPath> = files.iter().map(|f| destination(f)).collect();
            dispatch::generic_mkdir(conn, &files, parents).await?;
        }
        Commands::Rmdir { files } => {
            let files = dispatch::expand_paths(conn, &files, prefix, true).await?;
            let mut local = dispatch::local_connection(conn)?;
            for target in &files {
                connection_for(conn, &mut local, target).rmdir(&target.path).await?;
            }
        }
        Commands::Find { file, child_first } => {
            let target = destination(&file);
            let mut local = dispatch::local_connection(conn)?;
            let tree = connection_for(conn, &mut local, &target)
                .find(&target.path, child_first)
                .await?;
            for entry in tree {
                let shown = GenericPath {
                    path: entry,
                    remote: target.remote,
                };
                println!("{}", shown);
            }
        }
        Commands::Stat { files } => {
            let files = dispatch::expand_paths(conn, &files, prefix, true).await?;
            let mut local = dispatch::local_connection(conn)?;
            for target in &files {
                let stat = connection_for(conn, &mut local, target).lstat(&target.path).await?;
                println!("  File: {}", target);
                println!("  Size: {:<12} Links: {}", stat.size, stat.nlink);
                println!("Access: ({:04o}/{})  Uid: {}  Gid: {}", stat.permissions(), stat.mode_string(), stat.uid, stat.gid);
                println!("Access: {}", stat.accessed.format("%Y-%m-%d %H:%M:%S %z"));
                println!("Modify: {}", stat.modified.format("%Y-%m-%d %H:%M:%S %z"));
            }
        }
        Commands::Touch { files } => {
            let mut local = dispatch::local_connection(conn)?;
            for raw in &files {
                let target = destination(raw);
                connection_for(conn, &mut local, &target).touch(&target.path).await?;
            }
        }
        Commands::Glob {
            pattern,
            no_recursive,
        } => {
            let target = destination(&pattern);
            for found in Globber::new(conn).glob(&target.path, !no_recursive).await? {
                println!("{}", path::add_remote_marker(&found));
            }
        }
        // Saved or shown before connecting.
        Commands::Config { .. } => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.global)?;

    let mut profile = cli.global.profile()?;
    tracing::info!("starting rfs {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("effective profile: {}", profile.redacted());

    if let Commands::Config { show } = cli.command {
        if show {
            println!("{}", serde_json::to_string_pretty(&profile)?);
        } else {
            let saved = profile.save(cli.global.config_file.as_deref())?;
            println!("Configuration saved to {}", saved.display());
        }
        return Ok(());
    }

    ensure_password(&mut profile)?;
    let backend = profile.backend_config()?;
    if profile.connection_type == ConnectionType::Smb23 {
        configure_smb23(profile.smb23_client_config())?;
    }

    let mut settings = profile.settings.clone();
    apply_text_args(&mut settings, &cli.command.text());

    let mut conn = Connection::open(&backend, settings).await?;
    let result = run(&mut conn, cli.command, &profile).await;
    let closed = conn.close().await;

    result?;
    closed?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sources_and_destination() {
        let paths = vec!["a".to_string(), "b".to_string(), "r:/dst".to_string()];
        let (sources, dest) = sources_and_destination(&paths, None).unwrap();
        assert_eq!(sources, vec!["a", "b"]);
        assert_eq!(dest, "r:/dst");

        let target = "r:/t".to_string();
        let (sources, dest) = sources_and_destination(&paths, Some(&target)).unwrap();
        assert_eq!(sources.len(), 3);
        assert_eq!(dest, "r:/t");

        assert!(sources_and_destination(&paths[..1], None).is_err());
    }

    #[test]
    fn test_text_args_override_settings() {
        let mut settings = Settings::default();
        apply_text_args(
            &mut settings,
            &TextArgs {
                text_transmission: true,
                remote_crlf: true,
                remote_encoding: Some("cp1250".to_string()),
            },
        );
        assert!(settings.text_transmission);
        assert!(settings.remote_crlf);
        assert_eq!(settings.remote_encoding, "cp1250");
    }

    #[test]
    fn test_parse_cp_with_global_options() {
        let cli = Cli::try_parse_from([
            "rfs", "-T", "sftp", "-H", "example.org", "cp", "-r", "-X", "src", "r:/dst",
        ])
        .unwrap();
        assert_eq!(cli.global.connection_type, Some(ConnectionType::Sftp));
        match cli.command {
            Commands::Cp { paths, recursive, text, .. } => {
                assert_eq!(paths, vec!["src", "r:/dst"]);
                assert!(recursive);
                assert!(text.text_transmission);
            }
            _ => panic!("expected cp"),
        }
    }
}
