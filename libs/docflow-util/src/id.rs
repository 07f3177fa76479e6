//! Opaque 128-bit identifiers shared across every docflow crate.
//!
//! Every entity in the data model (§3) is keyed by one of these. They are all the same
//! representation — 16 bytes, displayed as lowercase hex without hyphens, per §6.1 — but kept as
//! distinct types so the compiler catches a [`DocumentId`] passed where a [`TenantId`] was meant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
#[error("invalid id: {0}")]
pub struct IdParseError(String);

/// Generates a newtype around a 16-byte id with hex `Display`/`FromStr`, matching the
/// storage-key grammar in §6.1 ("lowercase hex-encoded 128-bit values without hyphens").
macro_rules! id_type {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(into = "String", try_from = "String")]
        pub struct $name([u8; 16]);

        impl $name {
            pub fn generate() -> Self {
                Self(*uuid::Uuid::new_v4().as_bytes())
            }

            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 16] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let decoded = hex::decode(s).map_err(|_| IdParseError(s.to_string()))?;
                let bytes: [u8; 16] = decoded
                    .try_into()
                    .map_err(|_| IdParseError(s.to_string()))?;
                Ok(Self(bytes))
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.to_string()
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdParseError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

id_type!(TenantId);
id_type!(DocumentId);
id_type!(VersionId);
id_type!(FolderId);
id_type!(UserId);
id_type!(RoleId);
id_type!(TaskId);
id_type!(EventId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_hex() {
        let id = DocumentId::generate();
        let text = id.to_string();
        assert_eq!(text.len(), 32);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        let parsed: DocumentId = text.parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!("not-an-id".parse::<TenantId>().is_err());
        assert!("deadbeef".parse::<TenantId>().is_err()); // too short
    }

    #[test]
    fn distinct_types_do_not_mix() {
        // Compile-time guarantee: this module would not compile if TenantId and
        // DocumentId were the same type and someone accidentally swapped them.
        fn takes_tenant(_: TenantId) {}
        let t = TenantId::generate();
        takes_tenant(t);
    }
}
