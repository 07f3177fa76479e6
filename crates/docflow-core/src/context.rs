//! `RequestContext`: the explicit value every orchestrator operation takes instead of reading
//! tenant/user/roles off some ambient thread-local. The transport layer is responsible for
//! extracting it from whatever token scheme it uses; the core never parses tokens (§6.4).

use docflow_util::{RoleId, TenantId, UserId};

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub roles: Vec<RoleId>,
}

impl RequestContext {
    pub fn new(tenant_id: TenantId, user_id: UserId, roles: Vec<RoleId>) -> Self {
        Self {
            tenant_id,
            user_id,
            roles,
        }
    }
}
