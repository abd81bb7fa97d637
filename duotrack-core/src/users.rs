use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::{fmt::Display, str::FromStr};

use crate::error::Error;

/// One of the two fixed identities that use the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub enum UserId {
    Z,
    T,
}

impl UserId {
    pub const ALL: [UserId; 2] = [UserId::Z, UserId::T];

    /// Given a tag like `"z"`, `"T"` or `" t "`, try to return the corresponding [`UserId`].
    pub fn from_tag<S: AsRef<str>>(s: S) -> Option<Self> {
        match s.as_ref().trim().to_ascii_uppercase().as_str() {
            "Z" => Some(Self::Z),
            "T" => Some(Self::T),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::Z => Self::T,
            Self::T => Self::Z,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Z => "Z",
            Self::T => "T",
        }
    }
}

impl FromStr for UserId {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| Error::invalid(format!("unknown user `{}`", s)))
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user currently driving a panel.
///
/// Passed explicitly to whatever acts on behalf of a user instead of living in
/// shared mutable state, so two panels can act as different users side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveUser(pub UserId);

impl ActiveUser {
    pub fn id(self) -> UserId {
        self.0
    }
}

impl From<UserId> for ActiveUser {
    fn from(id: UserId) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::UserId;

    #[test]
    fn test_from_tag() {
        assert_eq!(UserId::from_tag("z"), Some(UserId::Z));
        assert_eq!(UserId::from_tag(" T "), Some(UserId::T));
        assert_eq!(UserId::from_tag("x"), None);
        assert!("".parse::<UserId>().is_err());
    }

    #[test]
    fn test_serde() {
        assert_eq!(serde_json::to_string(&UserId::T).unwrap(), "\"T\"");
        assert_eq!(serde_json::from_str::<UserId>("\"Z\"").unwrap(), UserId::Z);
        assert_eq!(UserId::Z.other(), UserId::T);
    }
}
