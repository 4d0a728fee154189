//! Identifier newtypes shared by every layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Short public identifier assigned to an identity at registration.
///
/// Codes are handed out sequentially and zero-padded below 10 (`"01"`,
/// `"02"`, ..., `"09"`, `"10"`, ...). The wire form is a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Code(String);

impl Code {
    /// Wrap a raw code string.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Format the code for a registration sequence number.
    pub fn from_sequence(seq: u64) -> Self {
        if seq < 10 { Self(format!("0{seq}")) } else { Self(seq.to_string()) }
    }

    /// Borrow the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Code {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// Opaque unique group identifier (`g_` followed by 12 hex characters when
/// minted by the server).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    /// Prefix carried by every server-minted group id.
    pub const PREFIX: &'static str = "g_";

    /// Wrap a raw group id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build a group id from six random bytes.
    pub fn from_random(bytes: [u8; 6]) -> Self {
        let mut id = String::with_capacity(Self::PREFIX.len() + 12);
        id.push_str(Self::PREFIX);
        for byte in bytes {
            id.push_str(&format!("{byte:02x}"));
        }
        Self(id)
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
