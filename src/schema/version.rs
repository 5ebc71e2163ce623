//! Schema versions: a `major.write.minor` triple with a total order.

use super::ParseError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Version identifies one release of a schema.
///
/// Versions order field by field: the read (major) version first, then the
/// write version, then the minor version. They render zero-padded
/// (`01.02.03`) and parse from either two or three dotted components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u32,
    pub write: u32,
    pub minor: u32,
}

impl Version {
    /// Creates a version from its three components.
    pub const fn new(major: u32, write: u32, minor: u32) -> Self {
        Version {
            major,
            write,
            minor,
        }
    }

    /// Returns the greater of two versions.
    pub fn greatest(a: Version, b: Version) -> Version {
        if b > a {
            b
        } else {
            a
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then_with(|| self.write.cmp(&other.write))
            .then_with(|| self.minor.cmp(&other.minor))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}.{:02}", self.major, self.write, self.minor)
    }
}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(ParseError::invalid_version(s, "expected two or three components"));
        }

        let mut fields = [0u32; 3];
        for (slot, part) in fields.iter_mut().zip(parts.iter()) {
            *slot = part
                .parse()
                .map_err(|_| ParseError::invalid_version(s, format!("'{}' is not a number", part)))?;
        }

        // A two-part version is read.minor with an implied write version of zero.
        if parts.len() == 2 {
            fields = [fields[0], 0, fields[1]];
        }

        Ok(Version::new(fields[0], fields[1], fields[2]))
    }
}

impl TryFrom<String> for Version {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.to_string()
    }
}
