use crate::error::{Error, Result};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

/// Behavior shared by every backend, attached once when a connection is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Recode transferred files between local and remote encodings and line endings.
    pub text_transmission: bool,
    pub local_encoding: String,
    pub remote_encoding: String,
    /// Local text files use CRLF instead of LF.
    pub local_crlf: bool,
    pub remote_crlf: bool,
    /// Mask applied when a backend cannot report a file's permissions.
    pub default_fmask: u32,
    /// Mask applied when a backend cannot report a directory's permissions.
    pub default_dmask: u32,
    /// Reserved: push straight into the destination instead of an in-folder temporary.
    pub direct_write: bool,
    /// Reserved: skip precondition checks.
    pub skip_validation: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            text_transmission: false,
            local_encoding: "UTF8".to_string(),
            remote_encoding: "UTF8".to_string(),
            local_crlf: false,
            remote_crlf: false,
            default_fmask: 0o133,
            default_dmask: 0o022,
            direct_write: false,
            skip_validation: false,
        }
    }
}

impl Settings {
    /// Checks that both encoding labels are known.
    pub fn validate(&self) -> Result<()> {
        lookup_encoding(&self.local_encoding)?;
        lookup_encoding(&self.remote_encoding)?;
        Ok(())
    }

    /// True when transfers have to be recoded at all.
    pub fn needs_transcoding(&self) -> bool {
        if !self.text_transmission {
            return false;
        }
        let same_encoding = match (
            lookup_encoding(&self.local_encoding),
            lookup_encoding(&self.remote_encoding),
        ) {
            (Ok(local), Ok(remote)) => local == remote,
            _ => self.local_encoding.eq_ignore_ascii_case(&self.remote_encoding),
        };
        !(same_encoding && self.local_crlf == self.remote_crlf)
    }
}

/// Resolves an encoding label such as `UTF8`, `utf-16le` or `cp1250`.
pub fn lookup_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.as_bytes())
        .or_else(|| match label.to_ascii_lowercase().as_str() {
            "utf16" => Some(encoding_rs::UTF_16LE),
            "utf16be" => Some(encoding_rs::UTF_16BE),
            "utf16le" => Some(encoding_rs::UTF_16LE),
            _ => None,
        })
        .ok_or_else(|| Error::InvalidArgument(format!("unknown encoding {}", label)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.text_transmission);
        assert_eq!(settings.default_fmask, 0o133);
        assert_eq!(settings.default_dmask, 0o022);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_no_transcoding_when_sides_agree() {
        let settings = Settings {
            text_transmission: true,
            local_encoding: "utf-8".to_string(),
            remote_encoding: "UTF8".to_string(),
            ..Settings::default()
        };
        assert!(!settings.needs_transcoding());

        let crlf = Settings {
            remote_crlf: true,
            ..settings.clone()
        };
        assert!(crlf.needs_transcoding());

        let disabled = Settings {
            text_transmission: false,
            ..crlf
        };
        assert!(!disabled.needs_transcoding());
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let settings = Settings {
            remote_encoding: "klingon".to_string(),
            ..Settings::default()
        };
        let err = settings.validate().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"remote_encoding": "cp1250", "remote_crlf": true}"#).unwrap();
        assert_eq!(settings.remote_encoding, "cp1250");
        assert!(settings.remote_crlf);
        assert_eq!(settings.local_encoding, "UTF8");
        assert_eq!(settings.default_fmask, 0o133);
    }
}
