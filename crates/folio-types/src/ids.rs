use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identifier of a project.
///
/// Project numbers are positive. Zero is reserved as the "no project yet"
/// value of the highest-project-number cache and never names a project.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ProjectNumber(u64);

impl ProjectNumber {
    /// Create a project number, rejecting zero.
    pub fn new(value: u64) -> Result<Self, TypeError> {
        if value == 0 {
            return Err(TypeError::InvalidProjectNumber(value.to_string()));
        }
        Ok(Self(value))
    }

    /// The raw integer value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ProjectNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProjectNumber({})", self.0)
    }
}

impl fmt::Display for ProjectNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for ProjectNumber {
    type Error = TypeError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProjectNumber> for u64 {
    fn from(number: ProjectNumber) -> Self {
        number.0
    }
}

impl FromStr for ProjectNumber {
    type Err = TypeError;

    /// Parse a decimal project number such as `"12"`.
    ///
    /// Signs, whitespace inside the digits, and zero are all rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = parse_digits(trimmed)
            .ok_or_else(|| TypeError::InvalidProjectNumber(s.to_string()))?;
        Self::new(value).map_err(|_| TypeError::InvalidProjectNumber(s.to_string()))
    }
}

/// Identifier of a version inside a project.
///
/// Versions are handed out by the per-project counter starting at 1.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionNumber(u64);

impl VersionNumber {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionNumber({})", self.0)
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for VersionNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<VersionNumber> for u64 {
    fn from(version: VersionNumber) -> Self {
        version.0
    }
}

impl FromStr for VersionNumber {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_digits(s)
            .map(Self)
            .ok_or_else(|| TypeError::InvalidVersionNumber(s.to_string()))
    }
}

/// Parse a non-empty run of ASCII digits. `u64::from_str` alone would also
/// accept a leading `+`.
pub(crate) fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_a_project() {
        assert!(ProjectNumber::new(0).is_err());
        assert_eq!(ProjectNumber::new(7).unwrap().get(), 7);
    }

    #[test]
    fn parse_project_number() {
        assert_eq!("12".parse::<ProjectNumber>().unwrap().get(), 12);
        assert_eq!(" 3 ".parse::<ProjectNumber>().unwrap().get(), 3);
        assert!("".parse::<ProjectNumber>().is_err());
        assert!("abc".parse::<ProjectNumber>().is_err());
        assert!("+4".parse::<ProjectNumber>().is_err());
        assert!("-4".parse::<ProjectNumber>().is_err());
        assert!("0".parse::<ProjectNumber>().is_err());
    }

    #[test]
    fn parse_version_number() {
        assert_eq!("007".parse::<VersionNumber>().unwrap().get(), 7);
        assert!("v1".parse::<VersionNumber>().is_err());
        assert!(".placeholder".parse::<VersionNumber>().is_err());
    }

    #[test]
    fn project_number_rejects_zero_on_deserialize() {
        assert!(serde_json::from_str::<ProjectNumber>("0").is_err());
        let n: ProjectNumber = serde_json::from_str("5").unwrap();
        assert_eq!(n.get(), 5);
        assert_eq!(serde_json::to_string(&n).unwrap(), "5");
    }

    #[test]
    fn display_is_bare_integer() {
        assert_eq!(ProjectNumber::new(42).unwrap().to_string(), "42");
        assert_eq!(VersionNumber::new(3).to_string(), "3");
    }
}
