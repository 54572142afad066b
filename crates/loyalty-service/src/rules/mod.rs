//! 积分规则引擎
//!
//! 取出 (category_id, action) 下全部启用规则，逐条计算后累加：
//!
//! 1. 设置了 min_amount 且金额低于它时跳过
//! 2. 按规则类型计算基础积分（见 [`PointRuleKind::base_points`]）
//! 3. max_points 大于 0 时封顶，0 视为未设置
//!
//! 结果保留两位小数。同样的规则集与输入总是得到同样的结果。
//! 除法或累加溢出时返回校验错误。
//!
//! [`PointRuleKind::base_points`]: crate::models::PointRuleKind::base_points

use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use crate::error::{LoyaltyError, Result};
use crate::models::PointRule;
use crate::repository::PointRuleRepository;

fn overflow() -> LoyaltyError {
    LoyaltyError::Validation("积分计算溢出".to_string())
}

/// 对一组已匹配的规则计算积分
pub fn calculate(rules: &[PointRule], amount: Decimal) -> Result<Decimal> {
    let total = rules
        .iter()
        .filter(|rule| rule.active)
        .filter(|rule| match rule.min_amount {
            Some(min_amount) => amount >= min_amount,
            None => true,
        })
        .try_fold(Decimal::ZERO, |acc, rule| {
            let points = rule
                .rule_type
                .base_points(rule.value, amount)
                .ok_or_else(overflow)?;
            let points = match rule.max_points {
                Some(cap) if cap > Decimal::ZERO && points > cap => cap,
                _ => points,
            };
            acc.checked_add(points).ok_or_else(overflow)
        })?;

    Ok(total.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// 积分计算服务
#[derive(Clone)]
pub struct PointsEngine {
    pool: PgPool,
}

impl PointsEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 计算积分（独立连接）
    #[instrument(skip(self))]
    pub async fn calculate_points(
        &self,
        member_id: i64,
        category_id: i64,
        action: &str,
        amount: Decimal,
    ) -> Result<Decimal> {
        let mut conn = self.pool.acquire().await?;
        Self::calculate_points_in_tx(&mut conn, member_id, category_id, action, amount).await
    }

    /// 在事务中计算积分
    ///
    /// member_id 目前不参与计算，保留给会员等级类规则
    pub async fn calculate_points_in_tx(
        conn: &mut PgConnection,
        member_id: i64,
        category_id: i64,
        action: &str,
        amount: Decimal,
    ) -> Result<Decimal> {
        let rules = PointRuleRepository::list_active_in_tx(conn, category_id, action).await?;
        if rules.is_empty() {
            debug!(member_id, category_id, action, "没有匹配的积分规则");
            return Ok(Decimal::ZERO);
        }

        let points = calculate(&rules, amount)?;
        debug!(
            member_id,
            category_id,
            action,
            rule_count = rules.len(),
            points = %points,
            "积分计算完成"
        );
        Ok(points)
    }
}
