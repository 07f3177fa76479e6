//! Identifiers, storage-key grammar, time/backoff helpers, and logging setup shared by every
//! crate in the docflow workspace. No other crate in this workspace is supposed to duplicate
//! these: they are the one place tenant/document/version identity and the §6.1 key grammar live.

pub mod id;
pub mod logging;
pub mod storage_key;
pub mod time;

pub use id::{DocumentId, EventId, FolderId, IdParseError, RoleId, TaskId, TenantId, UserId, VersionId};
pub use storage_key::{Lifecycle, Namespace, StorageKey, StorageKeyError};
