//! Text transmission: charset and line-ending conversion around transfers.

use crate::error::{Error, Result};
use crate::settings::{lookup_encoding, Settings};
use encoding_rs::Encoding;
use std::path::Path;

/// Direction-bound converter between two text conventions.
#[derive(Debug, Clone, Copy)]
pub struct TextCodec {
    from: &'static Encoding,
    to: &'static Encoding,
    from_crlf: bool,
    to_crlf: bool,
}

impl TextCodec {
    /// Local to remote, used before a push.
    pub fn outbound(settings: &Settings) -> Result<Self> {
        Ok(Self {
            from: lookup_encoding(&settings.local_encoding)?,
            to: lookup_encoding(&settings.remote_encoding)?,
            from_crlf: settings.local_crlf,
            to_crlf: settings.remote_crlf,
        })
    }

    /// Remote to local, used after a pull.
    pub fn inbound(settings: &Settings) -> Result<Self> {
        Ok(Self {
            from: lookup_encoding(&settings.remote_encoding)?,
            to: lookup_encoding(&settings.local_encoding)?,
            from_crlf: settings.remote_crlf,
            to_crlf: settings.local_crlf,
        })
    }

    pub fn is_identity(&self) -> bool {
        self.from == self.to && self.from_crlf == self.to_crlf
    }

    /// Converts a whole buffer; `origin` only names the data in errors.
    pub fn convert(&self, bytes: &[u8], origin: &str) -> Result<Vec<u8>> {
        if self.is_identity() {
            return Ok(bytes.to_vec());
        }

        let (text, had_errors) = self.from.decode_without_bom_handling(bytes);
        if had_errors {
            return Err(Error::Transcode {
                path: origin.to_string(),
                encoding: self.from.name().to_string(),
            });
        }

        let text = match (self.from_crlf, self.to_crlf) {
            (true, false) => text.replace("\r\n", "\n"),
            (false, true) => lf_to_crlf(&text),
            _ => text.into_owned(),
        };

        encode(self.to, &text, origin)
    }

    /// Reads `from`, converts it and writes the result to `to`.
    pub async fn convert_file(&self, from: &Path, to: &Path) -> Result<()> {
        let input = tokio::fs::read(from).await?;
        let output = self.convert(&input, &from.to_string_lossy())?;
        tokio::fs::write(to, output).await?;
        Ok(())
    }
}

fn lf_to_crlf(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 16);
    let mut prev = '\0';
    for c in text.chars() {
        if c == '\n' && prev != '\r' {
            out.push('\r');
        }
        out.push(c);
        prev = c;
    }
    out
}

// encoding_rs never encodes into UTF-16, so those two are written by hand.
fn encode(to: &'static Encoding, text: &str, origin: &str) -> Result<Vec<u8>> {
    if to == encoding_rs::UTF_16LE {
        return Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect());
    }
    if to == encoding_rs::UTF_16BE {
        return Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect());
    }

    let (bytes, used, had_errors) = to.encode(text);
    if had_errors || used != to {
        return Err(Error::Transcode {
            path: origin.to_string(),
            encoding: to.name().to_string(),
        });
    }
    Ok(bytes.into_owned())
}

/// Copies `from` to `to`, recoding only when the settings ask for it.
pub async fn stage(settings: &Settings, codec: TextCodec, from: &Path, to: &Path) -> Result<()> {
    if settings.needs_transcoding() {
        codec.convert_file(from, to).await
    } else {
        tokio::fs::copy(from, to).await?;
        Ok(())
    }
}
