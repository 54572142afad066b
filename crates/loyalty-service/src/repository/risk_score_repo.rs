//! 会员风险分仓储

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::error::{LoyaltyError, Result};
use crate::models::FraudRiskScore;

const RISK_COLUMNS: &str = "id, member_id, risk_score, last_evaluated_at, created_at, updated_at";

/// 会员风险分仓储
pub struct RiskScoreRepository {
    pool: PgPool,
}

impl RiskScoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 查询会员风险分
    pub async fn get(&self, member_id: i64) -> Result<Option<FraudRiskScore>> {
        let score = sqlx::query_as::<_, FraudRiskScore>(&format!(
            "SELECT {RISK_COLUMNS} FROM fraud_risk_scores WHERE member_id = $1"
        ))
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(score)
    }

    /// 在事务中确保记录存在并加锁
    pub async fn ensure_and_lock_in_tx(
        conn: &mut PgConnection,
        member_id: i64,
        now: DateTime<Utc>,
    ) -> Result<FraudRiskScore> {
        sqlx::query(
            r#"
            INSERT INTO fraud_risk_scores (member_id, risk_score, last_evaluated_at, created_at, updated_at)
            VALUES ($1, 0, $2, $2, $2)
            ON CONFLICT (member_id) DO NOTHING
            "#,
        )
        .bind(member_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        let score = sqlx::query_as::<_, FraudRiskScore>(&format!(
            "SELECT {RISK_COLUMNS} FROM fraud_risk_scores WHERE member_id = $1 FOR UPDATE"
        ))
        .bind(member_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| {
            LoyaltyError::Internal(format!("风险分记录缺失: member_id={}", member_id))
        })?;

        Ok(score)
    }

    /// 在事务中写入新的风险分与评估时间
    pub async fn update_in_tx(
        conn: &mut PgConnection,
        id: i64,
        risk_score: i32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE fraud_risk_scores
            SET risk_score = $2, last_evaluated_at = $3, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(risk_score)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }
}
