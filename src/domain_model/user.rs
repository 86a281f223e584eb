use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a user.
///
/// The value ends up inside revocation store keys (`uid:token_id`) and in
/// `SCAN MATCH uid:*` patterns, so the key separator, whitespace and glob
/// metacharacters are rejected.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserIdError {
    #[error("user id is empty")]
    Empty,
    #[error("user id contains reserved character {0:?}")]
    ReservedChar(char),
}

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_reserved(c: char) -> bool {
        c.is_whitespace() || matches!(c, ':' | '*' | '?' | '[' | ']' | '\\')
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = UserIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(UserIdError::Empty);
        }
        if let Some(c) = s.chars().find(|c| Self::is_reserved(*c)) {
            return Err(UserIdError::ReservedChar(c));
        }
        Ok(UserId(s.to_owned()))
    }
}

impl TryFrom<String> for UserId {
    type Error = UserIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl From<uuid::Uuid> for UserId {
    fn from(value: uuid::Uuid) -> Self {
        UserId(value.to_string())
    }
}

/// Minimal projection of a user carried inside an ID token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: UserId,
    pub email: String,
}

impl Identity {
    pub fn new(uid: UserId, email: impl Into<String>) -> Self {
        Identity {
            uid,
            email: email.into(),
        }
    }
}
