//! 请求上下文
//!
//! 操作人和请求元数据由调用方显式传入各业务流程，并写入审计日志。

/// 请求上下文
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// 操作人（员工/管理员）ID
    pub actor_id: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// 仅包含操作人的上下文（后台任务、测试）
    pub fn for_actor(actor_id: i64) -> Self {
        Self {
            actor_id: Some(actor_id),
            ..Default::default()
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}
