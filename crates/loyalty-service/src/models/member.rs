//! 会员相关实体定义

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::MemberStatus;

/// 会员
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: i64,
    /// 会员编码（二维码中的 member_id）
    pub member_code: String,
    pub name: String,
    #[sqlx(default)]
    pub email: Option<String>,
    #[sqlx(default)]
    pub phone: Option<String>,
    #[sqlx(default)]
    pub branch_id: Option<i64>,
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }
}

/// 积分余额（与会员 1:1）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyBalance {
    pub id: i64,
    pub member_id: i64,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 会员风险分
///
/// 跨评估累加，始终保持在 [0, 100]
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FraudRiskScore {
    pub id: i64,
    pub member_id: i64,
    pub risk_score: i32,
    #[sqlx(default)]
    pub last_evaluated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FraudRiskScore {
    pub const MIN: i32 = 0;
    pub const MAX: i32 = 100;

    /// 叠加一次评估的分值增量，结果截断到 [0, 100]
    pub fn apply_delta(current: i32, delta: i32) -> i32 {
        current.saturating_add(delta).clamp(Self::MIN, Self::MAX)
    }
}
