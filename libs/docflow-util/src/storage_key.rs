//! The storage key grammar from §6.1, shared by the object store adapter and the metadata
//! store so both sides agree on how to build and parse keys without a circular crate dependency.

use std::fmt;
use std::str::FromStr;

use crate::id::{DocumentId, FolderId, IdParseError, TenantId};

/// One of the three object-store namespaces (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Namespace {
    Temporary,
    Permanent,
    Quarantine,
}

impl Namespace {
    fn segment(self) -> &'static str {
        match self {
            Namespace::Temporary => "temp",
            Namespace::Permanent => "perm",
            Namespace::Quarantine => "quar",
        }
    }

    /// Each namespace's retention policy, consulted by callers that want to know whether a
    /// key will auto-expire (§4.1 table) without hardcoding durations at call sites.
    pub fn lifecycle(self) -> Lifecycle {
        match self {
            Namespace::Temporary => Lifecycle::ExpiresAfter(std::time::Duration::from_secs(24 * 3600)),
            Namespace::Permanent => Lifecycle::Indefinite,
            Namespace::Quarantine => Lifecycle::ExpiresAfter(std::time::Duration::from_secs(90 * 24 * 3600)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Indefinite,
    ExpiresAfter(std::time::Duration),
}

/// A parsed, validated storage key: `<namespace>/<tenant_id>/<folder_id?>/<document_id>/<version_number>`.
///
/// `folder_id` is present only for [`Namespace::Permanent`] (§6.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKey {
    pub namespace: Namespace,
    pub tenant_id: TenantId,
    pub folder_id: Option<FolderId>,
    pub document_id: DocumentId,
    pub version_number: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageKeyError {
    #[error("malformed storage key {0:?}")]
    Malformed(String),
    #[error(transparent)]
    Id(#[from] IdParseError),
    #[error("folder_id is required in the permanent namespace and forbidden elsewhere")]
    FolderPlacement,
}

impl StorageKey {
    pub fn temporary(tenant_id: TenantId, document_id: DocumentId, version_number: u32) -> Self {
        Self {
            namespace: Namespace::Temporary,
            tenant_id,
            folder_id: None,
            document_id,
            version_number,
        }
    }

    pub fn permanent(
        tenant_id: TenantId,
        folder_id: FolderId,
        document_id: DocumentId,
        version_number: u32,
    ) -> Self {
        Self {
            namespace: Namespace::Permanent,
            tenant_id,
            folder_id: Some(folder_id),
            document_id,
            version_number,
        }
    }

    pub fn quarantine(tenant_id: TenantId, document_id: DocumentId, version_number: u32) -> Self {
        Self {
            namespace: Namespace::Quarantine,
            tenant_id,
            folder_id: None,
            document_id,
            version_number,
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.folder_id {
            Some(folder_id) => write!(
                f,
                "{}/{}/{}/{}/{}",
                self.namespace.segment(),
                self.tenant_id,
                folder_id,
                self.document_id,
                self.version_number
            ),
            None => write!(
                f,
                "{}/{}/{}/{}",
                self.namespace.segment(),
                self.tenant_id,
                self.document_id,
                self.version_number
            ),
        }
    }
}

impl FromStr for StorageKey {
    type Err = StorageKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        let namespace = match parts.first() {
            Some(&"temp") => Namespace::Temporary,
            Some(&"perm") => Namespace::Permanent,
            Some(&"quar") => Namespace::Quarantine,
            _ => return Err(StorageKeyError::Malformed(s.to_string())),
        };

        match (namespace, parts.len()) {
            (Namespace::Permanent, 5) => Ok(StorageKey {
                namespace,
                tenant_id: parts[1].parse()?,
                folder_id: Some(parts[2].parse()?),
                document_id: parts[3].parse()?,
                version_number: parts[4]
                    .parse()
                    .map_err(|_| StorageKeyError::Malformed(s.to_string()))?,
            }),
            (Namespace::Temporary | Namespace::Quarantine, 4) => Ok(StorageKey {
                namespace,
                tenant_id: parts[1].parse()?,
                folder_id: None,
                document_id: parts[2].parse()?,
                version_number: parts[3]
                    .parse()
                    .map_err(|_| StorageKeyError::Malformed(s.to_string()))?,
            }),
            _ => Err(StorageKeyError::FolderPlacement),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_key_roundtrips() {
        let tenant = TenantId::generate();
        let doc = DocumentId::generate();
        let key = StorageKey::temporary(tenant, doc, 1);
        let text = key.to_string();
        assert!(text.starts_with("temp/"));
        let parsed: StorageKey = text.parse().unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn perm_key_requires_folder() {
        let tenant = TenantId::generate();
        let folder = FolderId::generate();
        let doc = DocumentId::generate();
        let key = StorageKey::permanent(tenant, folder, doc, 3);
        let text = key.to_string();
        let parsed: StorageKey = text.parse().unwrap();
        assert_eq!(parsed.folder_id, Some(folder));
    }

    #[test]
    fn perm_without_folder_segment_is_rejected() {
        let tenant = TenantId::generate();
        let doc = DocumentId::generate();
        let malformed = format!("perm/{tenant}/{doc}/1");
        assert!(malformed.parse::<StorageKey>().is_err());
    }

    #[test]
    fn unknown_namespace_is_rejected() {
        assert!("bogus/foo/bar/1".parse::<StorageKey>().is_err());
    }
}
