//! 审计日志
//!
//! 审计日志只允许追加：[`AuditSink`] 只有 `append` 一个操作，不提供修改和删除。
//! 数据库侧的触发器同样拒绝对 audit_logs 的 UPDATE / DELETE。
//!
//! 业务流程在自己的事务连接上写入审计记录，业务回滚时审计记录一并回滚。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgConnection;

use crate::clock::Clock;
use crate::context::RequestContext;
use crate::error::Result;

/// 审计动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// 每次风控评估
    FraudEvaluation,
    /// 高风险拦截
    FraudBlock,
    /// 中风险标记
    TransactionFlagged,
    TransactionCreated,
    RedemptionRequest,
    RedemptionCompleted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FraudEvaluation => "FRAUD_EVALUATION",
            Self::FraudBlock => "FRAUD_BLOCK",
            Self::TransactionFlagged => "TRANSACTION_FLAGGED",
            Self::TransactionCreated => "TRANSACTION_CREATED",
            Self::RedemptionRequest => "REDEMPTION_REQUEST",
            Self::RedemptionCompleted => "REDEMPTION_COMPLETED",
        }
    }
}

/// 审计对象的实体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum EntityKind {
    Member,
    Transaction,
    Redemption,
    Reward,
}

/// 审计对象
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSubject {
    pub kind: EntityKind,
    pub id: i64,
}

/// 一条待写入的审计记录
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub subject: Option<AuditSubject>,
    pub payload: Value,
    pub actor_id: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditEntry {
    pub fn new(action: AuditAction) -> Self {
        Self {
            action,
            subject: None,
            payload: Value::Object(Default::default()),
            actor_id: None,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn subject(mut self, kind: EntityKind, id: i64) -> Self {
        self.subject = Some(AuditSubject { kind, id });
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// 从请求上下文带入操作人、IP 与 UA
    pub fn context(mut self, ctx: &RequestContext) -> Self {
        self.actor_id = ctx.actor_id;
        self.ip_address = ctx.ip_address.clone();
        self.user_agent = ctx.user_agent.clone();
        self
    }
}

/// 审计日志写入端
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// 追加一条审计记录，返回记录 ID
    async fn append(&self, conn: &mut PgConnection, entry: AuditEntry) -> Result<i64>;
}

/// PostgreSQL 审计日志
pub struct PgAuditSink {
    clock: Arc<dyn Clock>,
}

impl PgAuditSink {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn append(&self, conn: &mut PgConnection, entry: AuditEntry) -> Result<i64> {
        let (subject_type, subject_id) = match entry.subject {
            Some(subject) => (Some(subject.kind), Some(subject.id)),
            None => (None, None),
        };

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO audit_logs
                (user_id, action, subject_type, subject_id, payload, ip_address, user_agent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(entry.actor_id)
        .bind(entry.action)
        .bind(subject_type)
        .bind(subject_id)
        .bind(&entry.payload)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(self.clock.now())
        .fetch_one(conn)
        .await?;

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_builder() {
        let ctx = RequestContext::for_actor(9)
            .with_ip("10.0.0.1")
            .with_user_agent("scanner/1.0");

        let entry = AuditEntry::new(AuditAction::TransactionCreated)
            .subject(EntityKind::Transaction, 77)
            .payload(json!({ "points": "60.00" }))
            .context(&ctx);

        assert_eq!(entry.action, AuditAction::TransactionCreated);
        assert_eq!(
            entry.subject,
            Some(AuditSubject {
                kind: EntityKind::Transaction,
                id: 77
            })
        );
        assert_eq!(entry.actor_id, Some(9));
        assert_eq!(entry.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(entry.user_agent.as_deref(), Some("scanner/1.0"));
        assert_eq!(entry.payload["points"], "60.00");
    }

    #[test]
    fn test_default_payload_is_empty_object() {
        let entry = AuditEntry::new(AuditAction::FraudEvaluation);
        assert_eq!(entry.payload, json!({}));
        assert!(entry.subject.is_none());
        assert!(entry.actor_id.is_none());
    }

    #[test]
    fn test_action_names() {
        assert_eq!(AuditAction::FraudBlock.as_str(), "FRAUD_BLOCK");
        assert_eq!(
            serde_json::to_string(&AuditAction::RedemptionCompleted).unwrap(),
            "\"REDEMPTION_COMPLETED\""
        );
    }
}
