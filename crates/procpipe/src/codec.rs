//! Output decoding

use std::fmt;

use serde::{Deserialize, Serialize};

/// How captured output is turned into a result value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// UTF-8, invalid sequences replaced with U+FFFD
    #[default]
    Utf8,
    /// ISO-8859-1, one char per byte
    Latin1,
    /// Keep the bytes as they are
    Raw,
}

impl Encoding {
    /// Decode captured bytes
    pub fn decode(self, bytes: Vec<u8>) -> Output {
        match self {
            Self::Utf8 => Output::Text(match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
            }),
            Self::Latin1 => Output::Text(bytes.iter().map(|&b| char::from(b)).collect()),
            Self::Raw => Output::Bytes(bytes),
        }
    }
}

/// Captured content of a stdout or stderr stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Decoded text
    Text(String),
    /// Undecoded bytes
    Bytes(Vec<u8>),
}

impl Output {
    /// Text content, `None` for raw bytes
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bytes(_) => None,
        }
    }

    /// Content as bytes (text is UTF-8 encoded)
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    /// Consume into bytes
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    /// Whether this holds decoded text
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether nothing was captured
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Strip surrounding whitespace; raw bytes are never trimmed
    pub(crate) fn trimmed(self) -> Self {
        match self {
            Self::Text(text) => {
                let trimmed = text.trim();
                if trimmed.len() == text.len() {
                    Self::Text(text)
                } else {
                    Self::Text(trimmed.to_string())
                }
            }
            bytes @ Self::Bytes(_) => bytes,
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Bytes(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
        }
    }
}
