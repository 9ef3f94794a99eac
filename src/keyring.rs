use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 64-bit PGP key ID, stored and displayed as 16 uppercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyId(pub u64);

impl KeyId {
    /// High 32 bits, as printed first in the legacy two-word form.
    pub fn hi(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Low 32 bits. Individual report files and the report page identify
    /// keys by this short form.
    pub fn lo(self) -> u32 {
        self.0 as u32
    }

    pub fn short_hex(self) -> String {
        format!("{:08X}", self.lo())
    }

    /// Two-word form used by the raw MSD listing: "XXXXXXXX XXXXXXXX".
    pub fn spaced_hex(self) -> String {
        format!("{:08X} {:08X}", self.hi(), self.lo())
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

impl FromStr for KeyId {
    type Err = KeyringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 16 {
            return Err(KeyringError::BadKeyId(s.to_string()));
        }
        u64::from_str_radix(s, 16)
            .map(KeyId)
            .map_err(|_| KeyringError::BadKeyId(s.to_string()))
    }
}

impl TryFrom<String> for KeyId {
    type Error = KeyringError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<KeyId> for String {
    fn from(id: KeyId) -> String {
        id.to_string()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum KeyringError {
    #[error("bad key id: {0}")]
    BadKeyId(String),
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
    #[error("signature graph is empty")]
    EmptyGraph,
    #[error("no analysis summary for period {0}")]
    MissingSummary(String),
    #[error("bad period (expected YYYYMM): {0}")]
    BadPeriod(String),
}

impl KeyringError {
    /// Stable machine-readable code for the `--json` error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            KeyringError::BadKeyId(_) => "BAD_KEY_ID",
            KeyringError::MalformedRecord { .. } => "BAD_RECORD",
            KeyringError::EmptyGraph => "EMPTY_GRAPH",
            KeyringError::MissingSummary(_) => "NO_SUMMARY",
            KeyringError::BadPeriod(_) => "BAD_PERIOD",
        }
    }
}

/// One line of the preprocessed signature-graph file.
///
/// The file is a flat stream of records: a `p` line introduces a key, and
/// the `s` lines that follow name the keys that signed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphRecord {
    Key(KeyId),
    Signer(KeyId),
}

pub fn parse_graph_line(line: &str, lineno: usize) -> Result<Option<GraphRecord>, KeyringError> {
    let line = line.trim_end();
    if line.is_empty() {
        return Ok(None);
    }
    let (tag, id) = line.split_at(1);
    let id: KeyId = id
        .parse()
        .map_err(|_| KeyringError::MalformedRecord {
            line: lineno,
            reason: format!("bad key id {:?}", id),
        })?;
    match tag {
        "p" => Ok(Some(GraphRecord::Key(id))),
        "s" => Ok(Some(GraphRecord::Signer(id))),
        _ => Err(KeyringError::MalformedRecord {
            line: lineno,
            reason: format!("unknown record tag {:?}", tag),
        }),
    }
}
