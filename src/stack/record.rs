//! Line classification and session-record decoding
//!
//! A session-stack export is line-oriented: every line is classified exactly
//! once into a directory marker, a session record, or noise, and the rest of
//! the parser branches on that variant.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::StackError;

/// Shape of a session record: `name=<#code...>%field%field%...`
static SESSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^=%]+=\s?#[^%]*%").unwrap()
});

/// Directory markers carry the full path from the stack root
const DIRECTORY_PREFIX: &str = "SubRep=";

/// Minimum `%`-separated field count of a well-formed session record.
/// Field 14 (the credential file) is the highest index the decoder touches.
const MIN_RECORD_FIELDS: usize = 15;

/// Remote-control protocol of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Ssh,
    Rdp,
    /// Exported by the session manager but not a remote-control protocol
    Unknown,
}

impl Protocol {
    /// Decode a protocol code as it appears after the `=` of a session record
    pub fn from_code(code: &str) -> Self {
        if code.starts_with("#109#0") {
            Self::Ssh
        } else if code.starts_with("#91#4") {
            Self::Rdp
        } else {
            Self::Unknown
        }
    }

    /// Short tag used in search and list output
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Ssh => "[+] SSH",
            Self::Rdp => "[+] RDP",
            Self::Unknown => "[!] Not Known",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ssh => write!(f, "ssh"),
            Self::Rdp => write!(f, "rdp"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One decoded session record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Session name (text before the `=`)
    pub name: String,
    /// Decoded protocol code
    pub protocol: Protocol,
    /// Remote host
    pub host: String,
    /// Remote port
    pub port: u16,
    /// Login user
    pub user: String,
    /// Credential file name (final path component only), if key-based
    pub key_file: Option<String>,
}

impl SessionRecord {
    /// Decode a line that classified as a session record.
    ///
    /// Fields are positional in the export format: 0 holds `name=code`,
    /// 1 host, 2 port, 3 user, 14 the credential file. Short records fail
    /// with `MalformedRecord` instead of an out-of-range access.
    pub fn decode(line: &str) -> Result<Self, StackError> {
        let line = line.trim_end();
        let fields: Vec<&str> = line.split('%').collect();

        if fields.len() < MIN_RECORD_FIELDS {
            return Err(StackError::MalformedRecord(format!(
                "expected at least {} fields, got {}: '{}'",
                MIN_RECORD_FIELDS,
                fields.len(),
                line
            )));
        }

        let (name, code) = fields[0].split_once('=').ok_or_else(|| {
            StackError::MalformedRecord(format!("missing '=' in '{}'", fields[0]))
        })?;

        let port: u16 = fields[2].trim().parse().map_err(|_| {
            StackError::MalformedRecord(format!("invalid port '{}' in '{}'", fields[2], name))
        })?;

        // The credential field carries a Windows path; only the file name is kept
        let key_file = fields[14]
            .trim()
            .rsplit('\\')
            .next()
            .filter(|f| !f.is_empty())
            .map(String::from);

        Ok(Self {
            name: name.trim().to_string(),
            protocol: Protocol::from_code(code.trim()),
            host: fields[1].trim().to_string(),
            port,
            user: fields[3].trim().to_string(),
            key_file,
        })
    }
}

/// A session-stack line, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Directory marker: the full backslash-delimited path from the stack
    /// root, already split into segments. Empty means the root itself.
    Directory(Vec<String>),
    /// A decoded session record
    Session(SessionRecord),
    /// Blank or foreign line, skipped
    Unrecognized,
}

impl Line {
    /// Classify a raw line. Lines shaped like a session record that fail to
    /// decode are an error; anything not matching either pattern is noise.
    pub fn classify(raw: &str) -> Result<Self, StackError> {
        let line = raw.trim_end();

        if let Some(path) = line.strip_prefix(DIRECTORY_PREFIX) {
            let segments = path
                .trim()
                .split('\\')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            return Ok(Self::Directory(segments));
        }

        if SESSION_RE.is_match(line) {
            return SessionRecord::decode(line).map(Self::Session);
        }

        Ok(Self::Unrecognized)
    }
}
