use std::fmt;
use std::str::FromStr;

use anyhow::{Error, Result, bail};

/// Server version written as digits, e.g. `106` for 10.6 and `1011` for 10.11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let digits = raw.trim();
        if digits.len() < 3 || !digits.chars().all(|ch| ch.is_ascii_digit()) {
            bail!("invalid version '{raw}': expected at least three digits such as 106 or 1011");
        }
        let (major, minor) = digits.split_at(2);
        let version = Self {
            major: major.parse()?,
            minor: minor.parse()?,
        };
        if version.major < 10 {
            bail!("invalid version '{raw}': major version must be at least 10");
        }
        Ok(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Version {
    pub fn file_suffix(&self) -> String {
        format!("{}{}", self.major, self.minor)
    }
}

/// Inclusion flag shared by help categories and help rows: `1`, `0` or a minimum version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inclusion {
    Always,
    Never,
    Since(Version),
}

impl Inclusion {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim() {
            "1" => Ok(Self::Always),
            "0" => Ok(Self::Never),
            other => Ok(Self::Since(other.parse()?)),
        }
    }

    pub fn includes(&self, target: Version) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Since(version) => *version <= target,
        }
    }
}
