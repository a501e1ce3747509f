//! Secret key schema.

use cellar_core::SecretId;
use std::fmt;

/// Namespace shared by every secret key.
pub const SECRET_KEY_PREFIX: &str = "secrets";

/// A stored component of a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretField {
    ContentType,
    Content,
    Access,
    AccessLimit,
    ExpirationEpoch,
    Filename,
}

impl SecretField {
    /// Every field, in the order keys are listed for reads and deletes.
    pub const ALL: [Self; 6] = [
        Self::ContentType,
        Self::Content,
        Self::Access,
        Self::AccessLimit,
        Self::ExpirationEpoch,
        Self::Filename,
    ];

    /// Key suffix.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContentType => "contenttype",
            Self::Content => "content",
            Self::Access => "access",
            Self::AccessLimit => "accesslimit",
            Self::ExpirationEpoch => "expirationepoch",
            Self::Filename => "filename",
        }
    }
}

impl fmt::Display for SecretField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys of one secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretKeys {
    id: SecretId,
}

impl SecretKeys {
    pub fn new(id: &SecretId) -> Self {
        Self { id: id.clone() }
    }

    /// `secrets:{id}:{field}`
    pub fn key(&self, field: SecretField) -> String {
        format!("{SECRET_KEY_PREFIX}:{}:{}", self.id, field.as_str())
    }

    /// All six keys in [`SecretField::ALL`] order.
    pub fn all(&self) -> Vec<String> {
        SecretField::ALL.iter().map(|f| self.key(*f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_prefixed_keys() {
        let keys = SecretKeys::new(&SecretId::new("abc"));
        assert_eq!(keys.key(SecretField::Access), "secrets:abc:access");
        assert_eq!(
            keys.key(SecretField::ExpirationEpoch),
            "secrets:abc:expirationepoch"
        );
    }

    #[test]
    fn lists_all_keys_in_order() {
        let keys = SecretKeys::new(&SecretId::new("abc"));
        assert_eq!(
            keys.all(),
            vec![
                "secrets:abc:contenttype",
                "secrets:abc:content",
                "secrets:abc:access",
                "secrets:abc:accesslimit",
                "secrets:abc:expirationepoch",
                "secrets:abc:filename",
            ]
        );
    }
}
