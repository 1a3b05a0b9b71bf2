//! Server charset conversion.
//!
//! SQL Server and Sybase report their character set by name during login
//! (`iso_1`, `cp850`, `cp932`, ...). Non-Unicode character data on the wire
//! is encoded in that charset, and formal parameter type inference needs to
//! know how many bytes a string occupies in it and whether it can be
//! represented at all.
//!
//! Codecs are served from a process-wide registry keyed by the server
//! charset name, seeded once on first access and lazily extended when the
//! server reports a charset outside the seed set.

use std::collections::HashMap;

use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::PrepareError;

/// Text/bytes conversion service for one server charset.
///
/// Cheap to clone; the underlying encoding tables are static.
#[derive(Debug, Clone)]
pub struct CharsetCodec {
    /// Server-side charset name this codec was looked up under.
    name: &'static str,
    encoding: &'static Encoding,
    /// Whether the charset may use more than one byte per character.
    multi_byte: bool,
}

impl CharsetCodec {
    const fn new(name: &'static str, encoding: &'static Encoding, multi_byte: bool) -> Self {
        Self {
            name,
            encoding,
            multi_byte,
        }
    }

    /// Look up the codec for a server-reported charset name.
    ///
    /// Names outside the seed set are resolved through the encoding label
    /// registry and cached for subsequent lookups.
    pub fn for_server_charset(name: &str) -> Result<Self, PrepareError> {
        if let Some(codec) = REGISTRY.read().get(name) {
            return Ok(codec.clone());
        }

        // Not seeded; try to resolve the name as an encoding label and
        // remember the result. Double-check under the write lock in case
        // another thread resolved the same name first.
        let mut registry = REGISTRY.write();
        if let Some(codec) = registry.get(name) {
            return Ok(codec.clone());
        }
        let encoding =
            Encoding::for_label(name.as_bytes()).ok_or_else(|| PrepareError::UnknownCharset {
                name: name.to_string(),
            })?;
        tracing::debug!(charset = name, encoding = encoding.name(), "registered server charset");
        let codec = Self {
            name: encoding.name(),
            encoding,
            multi_byte: !encoding.is_single_byte(),
        };
        registry.insert(name.to_string(), codec.clone());
        Ok(codec)
    }

    /// The charset name this codec answers for.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name
    }

    /// Translate text into the server's encoding.
    ///
    /// Characters the charset cannot represent are substituted, matching
    /// the server's own behavior for unrepresentable data.
    #[must_use]
    pub fn bytes(&self, value: &str) -> Vec<u8> {
        let (bytes, _, _) = self.encoding.encode(value);
        bytes.into_owned()
    }

    /// Measure how many bytes the text occupies in the server's encoding.
    ///
    /// Characters the charset cannot represent count as one byte, the width
    /// of the substitution character the server would store. This differs
    /// from `bytes(value).len()`, where a substituted character expands to
    /// a multi-byte escape.
    #[must_use]
    pub fn byte_length(&self, value: &str) -> usize {
        let mut buf = [0u8; 4];
        value
            .chars()
            .map(|ch| {
                let (bytes, _, had_errors) = self.encoding.encode(ch.encode_utf8(&mut buf));
                if had_errors { 1 } else { bytes.len() }
            })
            .sum()
    }

    /// Translate part of a byte buffer from the server's encoding.
    ///
    /// Decodes the subslice starting at `offset` and extending `len` bytes.
    pub fn text(&self, value: &[u8], offset: usize, len: usize) -> Result<String, PrepareError> {
        let slice = offset
            .checked_add(len)
            .and_then(|end| value.get(offset..end))
            .ok_or_else(|| PrepareError::InvalidEncoding {
                charset: self.name.to_string(),
            })?;
        let (text, _, had_errors) = self.encoding.decode(slice);
        if had_errors {
            return Err(PrepareError::InvalidEncoding {
                charset: self.name.to_string(),
            });
        }
        Ok(text.into_owned())
    }

    /// Does this charset need more than one byte per character?
    #[must_use]
    pub fn is_multi_byte(&self) -> bool {
        self.multi_byte
    }

    /// Can the given text be converted to the server's charset without
    /// substitution?
    ///
    /// Only meaningful for single-byte charsets.
    #[must_use]
    pub fn is_representable(&self, value: &str) -> bool {
        debug_assert!(
            !self.multi_byte,
            "is_representable is undefined for multi-byte charsets"
        );
        let (_, _, had_errors) = self.encoding.encode(value);
        !had_errors
    }
}

/// Process-wide codec registry keyed by server charset name.
static REGISTRY: Lazy<RwLock<HashMap<String, CharsetCodec>>> = Lazy::new(|| {
    // The multi-byte flags mirror the server's DBCS charsets: Thai,
    // Japanese, Simplified Chinese, Korean, Traditional Chinese.
    let seed: &[(&str, CharsetCodec)] = &[
        ("iso_1", CharsetCodec::new("iso_1", encoding_rs::WINDOWS_1252, false)),
        ("cp1250", CharsetCodec::new("cp1250", encoding_rs::WINDOWS_1250, false)),
        ("cp1251", CharsetCodec::new("cp1251", encoding_rs::WINDOWS_1251, false)),
        ("cp1252", CharsetCodec::new("cp1252", encoding_rs::WINDOWS_1252, false)),
        ("cp1253", CharsetCodec::new("cp1253", encoding_rs::WINDOWS_1253, false)),
        ("cp1254", CharsetCodec::new("cp1254", encoding_rs::WINDOWS_1254, false)),
        ("cp1255", CharsetCodec::new("cp1255", encoding_rs::WINDOWS_1255, false)),
        ("cp1256", CharsetCodec::new("cp1256", encoding_rs::WINDOWS_1256, false)),
        ("cp1257", CharsetCodec::new("cp1257", encoding_rs::WINDOWS_1257, false)),
        ("cp874", CharsetCodec::new("cp874", encoding_rs::WINDOWS_874, true)),
        ("cp932", CharsetCodec::new("cp932", encoding_rs::SHIFT_JIS, true)),
        ("cp936", CharsetCodec::new("cp936", encoding_rs::GB18030, true)),
        ("cp949", CharsetCodec::new("cp949", encoding_rs::EUC_KR, true)),
        ("cp950", CharsetCodec::new("cp950", encoding_rs::BIG5, true)),
    ];
    RwLock::new(
        seed.iter()
            .map(|(name, codec)| (name.to_string(), codec.clone()))
            .collect(),
    )
});
