//! 积分余额仓储
//!
//! 余额只在积分交易（增加）和奖品兑换（扣减）中修改，修改前必须先加行锁。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::error::{LoyaltyError, Result};
use crate::models::LoyaltyBalance;

/// 积分余额仓储
pub struct BalanceRepository {
    pool: PgPool,
}

impl BalanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 查询会员余额，没有余额记录时返回 None
    pub async fn get_balance(&self, member_id: i64) -> Result<Option<Decimal>> {
        let balance: Option<Decimal> =
            sqlx::query_scalar("SELECT balance FROM loyalty_balances WHERE member_id = $1")
                .bind(member_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(balance)
    }

    /// 在事务中确保余额记录存在（初始为 0）
    pub async fn ensure_in_tx(
        conn: &mut PgConnection,
        member_id: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO loyalty_balances (member_id, balance, created_at, updated_at)
            VALUES ($1, 0, $2, $2)
            ON CONFLICT (member_id) DO NOTHING
            "#,
        )
        .bind(member_id)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// 在事务中锁定余额记录（FOR UPDATE）
    pub async fn lock_in_tx(conn: &mut PgConnection, member_id: i64) -> Result<LoyaltyBalance> {
        let balance = sqlx::query_as::<_, LoyaltyBalance>(
            r#"
            SELECT id, member_id, balance, created_at, updated_at
            FROM loyalty_balances
            WHERE member_id = $1
            FOR UPDATE
            "#,
        )
        .bind(member_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| {
            LoyaltyError::Internal(format!("余额记录缺失: member_id={}", member_id))
        })?;

        Ok(balance)
    }

    /// 确保存在后加锁
    pub async fn ensure_and_lock_in_tx(
        conn: &mut PgConnection,
        member_id: i64,
        now: DateTime<Utc>,
    ) -> Result<LoyaltyBalance> {
        Self::ensure_in_tx(&mut *conn, member_id, now).await?;
        Self::lock_in_tx(conn, member_id).await
    }

    /// 在事务中写入新余额
    pub async fn set_balance_in_tx(
        conn: &mut PgConnection,
        balance_id: i64,
        balance: Decimal,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE loyalty_balances
            SET balance = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(balance_id)
        .bind(balance)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }
}
