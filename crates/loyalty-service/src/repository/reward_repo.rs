//! 奖品与兑换记录仓储

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::error::Result;
use crate::models::{Redemption, RedemptionStatus, Reward};

const REDEMPTION_COLUMNS: &str = r#"
    id, reward_id, member_id, points_used, status, processed_by, processed_at,
    created_at, updated_at
"#;

/// 奖品仓储
pub struct RewardRepository;

impl RewardRepository {
    /// 在事务中锁定奖品行（FOR UPDATE）
    pub async fn lock_in_tx(conn: &mut PgConnection, id: i64) -> Result<Option<Reward>> {
        let reward = sqlx::query_as::<_, Reward>(
            r#"
            SELECT id, name, description, points_required, stock, active, created_at, updated_at
            FROM rewards
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(reward)
    }

    /// 在事务中获取奖品名称
    pub async fn get_name_in_tx(conn: &mut PgConnection, id: i64) -> Result<Option<String>> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM rewards WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(name)
    }

    /// 在事务中扣减 1 个库存
    pub async fn decrement_stock_in_tx(
        conn: &mut PgConnection,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<i32> {
        let stock: i32 = sqlx::query_scalar(
            r#"
            UPDATE rewards
            SET stock = stock - 1, updated_at = $2
            WHERE id = $1
            RETURNING stock
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(stock)
    }
}

/// 兑换记录仓储
pub struct RedemptionRepository {
    pool: PgPool,
}

impl RedemptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 查询会员的兑换记录（按创建时间倒序）
    pub async fn list_by_member(
        &self,
        member_id: i64,
        status: Option<RedemptionStatus>,
        limit: i64,
    ) -> Result<Vec<Redemption>> {
        let redemptions = sqlx::query_as::<_, Redemption>(&format!(
            r#"
            SELECT {REDEMPTION_COLUMNS}
            FROM redemptions
            WHERE member_id = $1 AND ($2::varchar IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#
        ))
        .bind(member_id)
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(redemptions)
    }

    /// 在事务中创建待领取的兑换记录
    pub async fn create_pending_in_tx(
        conn: &mut PgConnection,
        reward_id: i64,
        member_id: i64,
        points_used: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Redemption> {
        let redemption = sqlx::query_as::<_, Redemption>(&format!(
            r#"
            INSERT INTO redemptions (reward_id, member_id, points_used, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {REDEMPTION_COLUMNS}
            "#
        ))
        .bind(reward_id)
        .bind(member_id)
        .bind(points_used)
        .bind(RedemptionStatus::Pending)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(redemption)
    }

    /// 在事务中锁定兑换记录（FOR UPDATE）
    pub async fn lock_in_tx(conn: &mut PgConnection, id: i64) -> Result<Option<Redemption>> {
        let redemption = sqlx::query_as::<_, Redemption>(&format!(
            "SELECT {REDEMPTION_COLUMNS} FROM redemptions WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(redemption)
    }

    /// 在事务中标记为已领取
    pub async fn mark_completed_in_tx(
        conn: &mut PgConnection,
        id: i64,
        processed_by: i64,
        now: DateTime<Utc>,
    ) -> Result<Redemption> {
        let redemption = sqlx::query_as::<_, Redemption>(&format!(
            r#"
            UPDATE redemptions
            SET status = $2, processed_by = $3, processed_at = $4, updated_at = $4
            WHERE id = $1
            RETURNING {REDEMPTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(RedemptionStatus::Completed)
        .bind(processed_by)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(redemption)
    }
}
