use chrono::{DateTime, Local, TimeZone};
use std::time::SystemTime;

pub const S_IFMT: u32 = 0o170_000;
pub const S_IFDIR: u32 = 0o040_000;
pub const S_IFREG: u32 = 0o100_000;
pub const S_IFLNK: u32 = 0o120_000;

/// Backend-neutral metadata of one entry. Produced on demand, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub mode: u32,
    pub size: u64,
    pub modified: DateTime<Local>,
    pub accessed: DateTime<Local>,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u64,
}

impl FileStat {
    /// Metadata with only type, size and modification time known.
    pub fn new(mode: u32, size: u64, modified: DateTime<Local>) -> Self {
        Self {
            mode,
            size,
            modified,
            accessed: modified,
            uid: 0,
            gid: 0,
            nlink: 0,
        }
    }

    /// Builds a mode from the default masks for backends that report no permissions.
    pub fn synthesize_mode(is_dir: bool, read_only: bool, fmask: u32, dmask: u32) -> u32 {
        let mut mask = if is_dir { dmask } else { fmask };
        if read_only {
            mask |= 0o222;
        }
        let perm = !mask & 0o777;
        if is_dir {
            perm | S_IFDIR
        } else {
            perm | S_IFREG
        }
    }

    pub fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    pub fn is_file(&self) -> bool {
        self.mode & S_IFMT == S_IFREG
    }

    pub fn is_symlink(&self) -> bool {
        self.mode & S_IFMT == S_IFLNK
    }

    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }

    /// `ls -l` style permission string, e.g. `drwxr-xr-x`.
    pub fn mode_string(&self) -> String {
        let kind = if self.is_dir() {
            'd'
        } else if self.is_symlink() {
            'l'
        } else {
            '-'
        };
        let mut out = String::with_capacity(10);
        out.push(kind);
        for shift in [6, 3, 0] {
            let bits = (self.mode >> shift) & 0o7;
            out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
            out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        }
        out
    }
}

pub(crate) fn from_system_time(time: SystemTime) -> DateTime<Local> {
    DateTime::<Local>::from(time)
}

pub(crate) fn from_unix_seconds(secs: i64) -> DateTime<Local> {
    Local
        .timestamp_opt(secs, 0)
        .single()
        .unwrap_or_else(|| from_system_time(SystemTime::UNIX_EPOCH))
}
