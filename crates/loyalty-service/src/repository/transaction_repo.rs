//! 积分交易仓储
//!
//! 交易记录只插入不更新。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;

use crate::error::Result;
use crate::models::{NewPointTransaction, PointTransaction};

/// 积分交易仓储
pub struct TransactionRepository;

impl TransactionRepository {
    /// 在事务中检查重复交易
    ///
    /// 同一会员、同一金额、同一分类且创建时间不早于 since
    pub async fn exists_duplicate_in_tx(
        conn: &mut PgConnection,
        member_id: i64,
        amount: Decimal,
        category_id: i64,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM transactions
                WHERE member_id = $1
                  AND amount = $2
                  AND category_id = $3
                  AND created_at >= $4
            )
            "#,
        )
        .bind(member_id)
        .bind(amount)
        .bind(category_id)
        .bind(since)
        .fetch_one(conn)
        .await?;

        Ok(exists)
    }

    /// 在事务中统计会员在 since 之后的交易数
    pub async fn count_since_in_tx(
        conn: &mut PgConnection,
        member_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM transactions
            WHERE member_id = $1 AND created_at >= $2
            "#,
        )
        .bind(member_id)
        .bind(since)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }

    /// 在事务中统计某员工为会员经办的交易数
    pub async fn count_with_staff_since_in_tx(
        conn: &mut PgConnection,
        member_id: i64,
        staff_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM transactions
            WHERE member_id = $1 AND created_by = $2 AND created_at >= $3
            "#,
        )
        .bind(member_id)
        .bind(staff_id)
        .bind(since)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }

    /// 在事务中写入交易记录
    pub async fn create_in_tx(
        conn: &mut PgConnection,
        transaction: &NewPointTransaction,
    ) -> Result<PointTransaction> {
        let created = sqlx::query_as::<_, PointTransaction>(
            r#"
            INSERT INTO transactions
                (member_id, category_id, action, amount, points_earned, reference_no,
                 notes, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, member_id, category_id, action, amount, points_earned,
                      reference_no, notes, created_by, created_at
            "#,
        )
        .bind(transaction.member_id)
        .bind(transaction.category_id)
        .bind(&transaction.action)
        .bind(transaction.amount)
        .bind(transaction.points_earned)
        .bind(&transaction.reference_no)
        .bind(&transaction.notes)
        .bind(transaction.created_by)
        .bind(transaction.created_at)
        .fetch_one(conn)
        .await?;

        Ok(created)
    }
}
