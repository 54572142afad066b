//! 奖品兑换服务
//!
//! ## 兑换流程（单个事务）
//!
//! 1. 锁定奖品行，校验启用与库存
//! 2. 确保并锁定会员余额，校验余额
//! 3. 扣减余额与库存
//! 4. 创建待领取的兑换记录（记录当时的积分价格）
//! 5. 写入审计
//!
//! 奖品行锁让同一奖品的并发兑换串行，后到的请求能看到前一笔已提交的库存与余额变化。
//!
//! 领取确认（pending -> completed）由员工单独操作。

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use sqlx::PgPool;
use tracing::{info, instrument};

use loyalty_shared::observability::metrics;

use crate::audit::{AuditAction, AuditEntry, AuditSink, EntityKind};
use crate::clock::Clock;
use crate::context::RequestContext;
use crate::error::{LoyaltyError, Result};
use crate::models::{Redemption, RedemptionStatus};
use crate::repository::{BalanceRepository, MemberRepository, RedemptionRepository, RewardRepository};

/// 兑换记录查询的最大条数
const MAX_LIST_LIMIT: i64 = 100;

/// 奖品兑换服务
pub struct RedemptionService {
    pool: PgPool,
    redemption_repo: Arc<RedemptionRepository>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl RedemptionService {
    pub fn new(
        pool: PgPool,
        redemption_repo: Arc<RedemptionRepository>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pool,
            redemption_repo,
            audit,
            clock,
        }
    }

    /// 兑换奖品
    #[instrument(skip(self, ctx))]
    pub async fn redeem(
        &self,
        ctx: &RequestContext,
        member_id: i64,
        reward_id: i64,
    ) -> Result<Redemption> {
        let started = Instant::now();
        let result = self.execute_redeem(ctx, member_id, reward_id).await;

        let outcome = match &result {
            Ok(_) => "committed",
            Err(e) => match e {
                LoyaltyError::OutOfStock(_) => "out_of_stock",
                LoyaltyError::InsufficientBalance { .. } => "insufficient_balance",
                e if e.is_business_error() => "rejected",
                _ => "failed",
            },
        };
        metrics::record_redemption(outcome, started.elapsed().as_secs_f64());

        result
    }

    async fn execute_redeem(
        &self,
        ctx: &RequestContext,
        member_id: i64,
        reward_id: i64,
    ) -> Result<Redemption> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        MemberRepository::get_in_tx(&mut tx, member_id)
            .await?
            .ok_or(LoyaltyError::MemberNotFound(member_id))?;

        // 1. 锁定奖品
        let reward = RewardRepository::lock_in_tx(&mut tx, reward_id)
            .await?
            .ok_or(LoyaltyError::RewardNotFound(reward_id))?;
        if !reward.active {
            return Err(LoyaltyError::RewardInactive(reward_id));
        }
        if !reward.has_stock() {
            return Err(LoyaltyError::OutOfStock(reward_id));
        }

        // 2. 锁定余额
        let balance = BalanceRepository::ensure_and_lock_in_tx(&mut tx, member_id, now).await?;
        if balance.balance < reward.points_required {
            return Err(LoyaltyError::InsufficientBalance {
                required: reward.points_required,
                available: balance.balance,
            });
        }

        // 3. 扣减余额与库存
        let new_balance = balance.balance - reward.points_required;
        BalanceRepository::set_balance_in_tx(&mut tx, balance.id, new_balance, now).await?;
        let remaining_stock = RewardRepository::decrement_stock_in_tx(&mut tx, reward.id, now).await?;

        // 4. 创建兑换记录
        let redemption = RedemptionRepository::create_pending_in_tx(
            &mut tx,
            reward.id,
            member_id,
            reward.points_required,
            now,
        )
        .await?;

        // 5. 审计
        self.audit
            .append(
                &mut tx,
                AuditEntry::new(AuditAction::RedemptionRequest)
                    .subject(EntityKind::Redemption, redemption.id)
                    .payload(json!({
                        "reward_name": reward.name,
                        "points_cost": reward.points_required,
                        "new_balance": new_balance,
                    }))
                    .context(ctx),
            )
            .await?;

        tx.commit().await?;

        info!(
            member_id,
            reward_id,
            redemption_id = redemption.id,
            points_used = %redemption.points_used,
            new_balance = %new_balance,
            remaining_stock,
            "奖品兑换成功"
        );

        Ok(redemption)
    }

    /// 确认领取
    ///
    /// 只有未完成的兑换可以确认，处理人取自请求上下文且必须存在
    #[instrument(skip(self, ctx), fields(actor_id = ?ctx.actor_id))]
    pub async fn complete_redemption(
        &self,
        ctx: &RequestContext,
        redemption_id: i64,
    ) -> Result<Redemption> {
        let processed_by = ctx
            .actor_id
            .ok_or_else(|| LoyaltyError::Validation("缺少操作人".to_string()))?;

        let now = self.clock.now();
        let mut tx = self.pool.begin().await?;

        let current = RedemptionRepository::lock_in_tx(&mut tx, redemption_id)
            .await?
            .ok_or(LoyaltyError::RedemptionNotFound(redemption_id))?;
        if current.status == RedemptionStatus::Completed {
            return Err(LoyaltyError::RedemptionAlreadyCompleted(redemption_id));
        }

        let redemption =
            RedemptionRepository::mark_completed_in_tx(&mut tx, redemption_id, processed_by, now)
                .await?;

        let reward_name = RewardRepository::get_name_in_tx(&mut tx, redemption.reward_id).await?;
        let member_name = MemberRepository::get_in_tx(&mut tx, redemption.member_id)
            .await?
            .map(|member| member.name);

        self.audit
            .append(
                &mut tx,
                AuditEntry::new(AuditAction::RedemptionCompleted)
                    .subject(EntityKind::Redemption, redemption.id)
                    .payload(json!({
                        "reward_name": reward_name,
                        "member_name": member_name,
                    }))
                    .context(ctx),
            )
            .await?;

        tx.commit().await?;

        info!(redemption_id, "兑换已领取");

        Ok(redemption)
    }

    /// 查询会员兑换记录
    #[instrument(skip(self))]
    pub async fn list_member_redemptions(
        &self,
        member_id: i64,
        status: Option<RedemptionStatus>,
        limit: i64,
    ) -> Result<Vec<Redemption>> {
        let limit = limit.clamp(1, MAX_LIST_LIMIT);
        self.redemption_repo
            .list_by_member(member_id, status, limit)
            .await
    }
}
