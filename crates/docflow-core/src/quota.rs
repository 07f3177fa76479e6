//! Quota policy is delegated to the embedder (open question, resolved in DESIGN.md): this
//! crate only defines the seam and a trivial "always allow" default.

use docflow_util::TenantId;

use crate::error::CoreResult;

#[allow(async_fn_in_trait)]
pub trait QuotaChecker: Send + Sync + 'static {
    async fn check(&self, tenant_id: TenantId, additional_bytes: u64) -> CoreResult<()>;
}

/// Never rejects. The default for embedders that haven't wired a real policy yet.
pub struct NoopQuotaChecker;

impl QuotaChecker for NoopQuotaChecker {
    async fn check(&self, _tenant_id: TenantId, _additional_bytes: u64) -> CoreResult<()> {
        Ok(())
    }
}
