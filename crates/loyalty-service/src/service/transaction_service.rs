//! 积分交易服务
//!
//! 一次积分交易在单个数据库事务内完成：
//!
//! 1. 锁定会员行 -> 2. 分类校验 -> 3. 重复交易检查 -> 4. 预计算积分
//!    -> 5. 风控评估并记录 -> 6. 累加风险分 -> 7. 风险闸门
//!    -> 8. 写入交易 -> 9. 锁定并增加余额 -> 10. 审计 -> 11. 提交
//!
//! ## 并发
//!
//! 事务开始即对会员行加 FOR NO KEY UPDATE 锁，同一会员的交易严格串行。
//! 重复交易检查与交易写入处在同一把锁下，两个并发的相同请求只会有一个通过。
//!
//! 任一步骤失败都会放弃整个事务，包括 HIGH 风险拦截。

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use loyalty_shared::config::TransactionConfig;
use loyalty_shared::observability::metrics;

use crate::audit::{AuditAction, AuditEntry, AuditSink, EntityKind};
use crate::clock::Clock;
use crate::context::RequestContext;
use crate::error::{LoyaltyError, Result};
use crate::fraud::{FraudContext, FraudEvaluation, FraudScoringService, RiskLevel};
use crate::models::{FraudRiskScore, NewPointTransaction, PointTransaction};
use crate::repository::{
    BalanceRepository, CategoryRepository, MemberRepository, RiskScoreRepository,
    TransactionRepository,
};
use crate::rules::PointsEngine;
use crate::service::dto::ProcessTransactionRequest;

/// 积分交易服务
pub struct TransactionService {
    pool: PgPool,
    fraud: FraudScoringService,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    config: TransactionConfig,
}

impl TransactionService {
    pub fn new(
        pool: PgPool,
        fraud: FraudScoringService,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
        config: TransactionConfig,
    ) -> Self {
        Self {
            pool,
            fraud,
            audit,
            clock,
            config,
        }
    }

    /// 处理一笔积分交易
    #[instrument(
        skip(self, ctx, request),
        fields(
            member_id = request.member_id,
            category_id = request.category_id,
            action = %request.action,
            created_by = request.created_by,
        )
    )]
    pub async fn process_transaction(
        &self,
        ctx: &RequestContext,
        request: ProcessTransactionRequest,
    ) -> Result<PointTransaction> {
        let started = Instant::now();
        let result = self.execute(ctx, &request).await;

        let outcome = match &result {
            Ok(_) => "committed",
            Err(LoyaltyError::FraudBlocked { .. }) => "blocked",
            Err(e) if e.is_business_error() => "rejected",
            Err(_) => "failed",
        };
        metrics::record_transaction(outcome, started.elapsed().as_secs_f64());

        result
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        request: &ProcessTransactionRequest,
    ) -> Result<PointTransaction> {
        request.validate()?;
        if request.action.trim().is_empty() {
            return Err(LoyaltyError::Validation("动作不能为空".to_string()));
        }

        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        // 1. 锁定会员
        let member = MemberRepository::lock_in_tx(&mut tx, request.member_id)
            .await?
            .ok_or(LoyaltyError::MemberNotFound(request.member_id))?;

        // 2. 分类校验
        if !CategoryRepository::exists_in_tx(&mut tx, request.category_id).await? {
            return Err(LoyaltyError::CategoryNotFound(request.category_id));
        }

        // 3. 重复交易检查
        let since = now - Duration::seconds(self.config.duplicate_window_seconds);
        if TransactionRepository::exists_duplicate_in_tx(
            &mut tx,
            member.id,
            request.amount,
            request.category_id,
            since,
        )
        .await?
        {
            warn!(member_id = member.id, amount = %request.amount, "重复交易被拒绝");
            return Err(LoyaltyError::DuplicateTransaction);
        }

        // 4. 预计算积分（风控需要）
        let points = PointsEngine::calculate_points_in_tx(
            &mut tx,
            member.id,
            request.category_id,
            &request.action,
            request.amount,
        )
        .await?;

        // 5. 风控评估，结果始终记录
        let fraud_context = FraudContext {
            amount: request.amount,
            points,
            staff_id: Some(request.created_by),
            timestamp: now,
        };
        let evaluation = self.fraud.evaluate(&mut tx, member.id, &fraud_context).await?;

        self.audit
            .append(
                &mut tx,
                AuditEntry::new(AuditAction::FraudEvaluation)
                    .subject(EntityKind::Member, member.id)
                    .payload(json!({
                        "score_delta": evaluation.score_delta,
                        "risk_level": evaluation.risk_level,
                        "reasons": evaluation.reasons,
                        "context": fraud_context,
                    }))
                    .context(ctx),
            )
            .await?;

        // 6. 累加风险分
        let risk_score = apply_risk_delta(&mut tx, member.id, evaluation.score_delta, now).await?;

        // 7. 风险闸门
        let mut notes = request.notes.clone().unwrap_or_default();
        match evaluation.risk_level {
            RiskLevel::High => {
                self.audit
                    .append(
                        &mut tx,
                        AuditEntry::new(AuditAction::FraudBlock)
                            .subject(EntityKind::Member, member.id)
                            .payload(json!({
                                "risk_level": evaluation.risk_level,
                                "reasons": evaluation.reasons,
                                "transaction_attempt": request,
                            }))
                            .context(ctx),
                    )
                    .await?;
                // 不提交，tx drop 时整体回滚
                warn!(
                    member_id = member.id,
                    score_delta = evaluation.score_delta,
                    risk_score = ?risk_score,
                    reasons = ?evaluation.reasons,
                    "高风险交易已拦截"
                );
                return Err(LoyaltyError::FraudBlocked {
                    reasons: evaluation.reasons,
                });
            }
            RiskLevel::Medium => {
                notes.push_str(&risk_flag(&evaluation));
                self.audit
                    .append(
                        &mut tx,
                        AuditEntry::new(AuditAction::TransactionFlagged)
                            .subject(EntityKind::Member, member.id)
                            .payload(json!({
                                "risk_level": evaluation.risk_level,
                                "reasons": evaluation.reasons,
                            }))
                            .context(ctx),
                    )
                    .await?;
            }
            RiskLevel::Low => {}
        }

        // 8. 写入交易
        let notes = notes.trim();
        let transaction = TransactionRepository::create_in_tx(
            &mut tx,
            &NewPointTransaction {
                member_id: member.id,
                category_id: request.category_id,
                action: request.action.clone(),
                amount: request.amount,
                points_earned: points,
                reference_no: generate_reference_no(now),
                notes: (!notes.is_empty()).then(|| notes.to_string()),
                created_by: request.created_by,
                created_at: now,
            },
        )
        .await?;

        // 9. 锁定并增加余额
        let balance = BalanceRepository::ensure_and_lock_in_tx(&mut tx, member.id, now).await?;
        let new_balance = balance.balance + points;
        BalanceRepository::set_balance_in_tx(&mut tx, balance.id, new_balance, now).await?;

        // 10. 审计
        self.audit
            .append(
                &mut tx,
                AuditEntry::new(AuditAction::TransactionCreated)
                    .subject(EntityKind::Transaction, transaction.id)
                    .payload(json!({
                        "amount": request.amount,
                        "points": points,
                        "new_balance": new_balance,
                        "risk_level": evaluation.risk_level,
                    }))
                    .context(ctx),
            )
            .await?;

        // 11. 提交
        tx.commit().await?;

        info!(
            member_id = member.id,
            transaction_id = transaction.id,
            reference_no = %transaction.reference_no,
            points = %points,
            new_balance = %new_balance,
            risk_level = evaluation.risk_level.as_str(),
            "积分交易成功"
        );

        Ok(transaction)
    }
}

/// 把本次增量叠加到会员风险分，增量为 0 时不做任何写入
async fn apply_risk_delta(
    conn: &mut PgConnection,
    member_id: i64,
    delta: i32,
    now: DateTime<Utc>,
) -> Result<Option<i32>> {
    if delta == 0 {
        return Ok(None);
    }

    let current = RiskScoreRepository::ensure_and_lock_in_tx(&mut *conn, member_id, now).await?;
    let updated = FraudRiskScore::apply_delta(current.risk_score, delta);
    RiskScoreRepository::update_in_tx(conn, current.id, updated, now).await?;

    Ok(Some(updated))
}

/// 中风险时追加到备注的标记
fn risk_flag(evaluation: &FraudEvaluation) -> String {
    format!(
        " [RISK FLAG: {} - {}]",
        evaluation.risk_level.as_str(),
        evaluation.reasons.join(", ")
    )
}

/// 生成交易流水号
///
/// 格式: TRX{yyyyMMddHHmmss}{8位大写十六进制}
fn generate_reference_no(now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "TRX{}{}",
        now.format("%Y%m%d%H%M%S"),
        random[..8].to_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_reference_no_format() {
        let now = Utc.with_ymd_and_hms(2026, 1, 3, 14, 5, 9).unwrap();
        let reference = generate_reference_no(now);

        assert!(reference.starts_with("TRX20260103140509"));
        // "TRX" + 14 位时间戳 + 8 位随机
        assert_eq!(reference.len(), 25);
        assert!(
            reference[17..]
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase())
        );

        assert_ne!(reference, generate_reference_no(now));
    }

    #[test]
    fn test_risk_flag_text() {
        let evaluation = FraudEvaluation {
            score_delta: 30,
            risk_level: RiskLevel::Medium,
            reasons: vec!["高频扫码".to_string(), "深夜交易".to_string()],
        };
        assert_eq!(
            risk_flag(&evaluation),
            " [RISK FLAG: MEDIUM - 高频扫码, 深夜交易]"
        );
    }
}
