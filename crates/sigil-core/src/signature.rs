use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A byte pattern with wildcard positions, parsed from text.
///
/// Tokens are two hex digits for a literal byte or `??`/`**` for a wildcard.
/// Whitespace is stripped before tokenizing, so `"48 8D 0D ?? ?? ?? ??"` and
/// `"488D0D????????"` describe the same pattern.
///
/// Equality and hashing use the exact textual encoding: the text is the
/// cache key, and two spellings of the same byte pattern are distinct keys.
#[derive(Debug, Clone)]
pub struct Signature {
    text: String,
    pattern: Vec<Option<u8>>,
}

impl Signature {
    pub fn parse(text: &str) -> Result<Self> {
        let pattern = parse_pattern(text)?;
        Ok(Self {
            text: text.to_string(),
            pattern,
        })
    }

    /// The textual encoding as supplied by the caller.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bytes(&self) -> &[Option<u8>] {
        &self.pattern
    }

    /// Pattern length in bytes.
    pub fn len(&self) -> usize {
        self.pattern.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    /// Whether the pattern matches `window` starting at its first byte.
    /// `window` must be at least as long as the pattern.
    pub fn matches(&self, window: &[u8]) -> bool {
        window.len() >= self.pattern.len()
            && self
                .pattern
                .iter()
                .zip(window)
                .all(|(p, b)| p.is_none_or(|value| value == *b))
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Signature {}

impl std::hash::Hash for Signature {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl FromStr for Signature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_pattern(&self.pattern))
    }
}

/// Parse a pattern string into fixed bytes and wildcards.
pub fn parse_pattern(text: &str) -> Result<Vec<Option<u8>>> {
    let stripped: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if stripped.is_empty() {
        return Err(Error::InvalidSignature("pattern is empty".to_string()));
    }
    if !stripped.len().is_multiple_of(2) {
        return Err(Error::InvalidSignature(format!(
            "pattern \"{text}\" has a dangling half-byte token"
        )));
    }

    let mut bytes = Vec::with_capacity(stripped.len() / 2);
    for pair in stripped.as_bytes().chunks(2) {
        if pair == b"??" || pair == b"**" {
            bytes.push(None);
            continue;
        }
        let token = std::str::from_utf8(pair)
            .map_err(|_| Error::InvalidSignature(format!("non-hex token in \"{text}\"")))?;
        let value = u8::from_str_radix(token, 16).map_err(|e| {
            Error::InvalidSignature(format!("invalid token '{token}' in \"{text}\": {e}"))
        })?;
        bytes.push(Some(value));
    }

    Ok(bytes)
}

/// Canonical rendering: space-separated uppercase hex with `??` wildcards.
pub fn format_pattern(bytes: &[Option<u8>]) -> String {
    bytes
        .iter()
        .map(|b| match b {
            Some(value) => format!("{value:02X}"),
            None => "??".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
