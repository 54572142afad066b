//! 积分交易与兑换记录

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::RedemptionStatus;

/// 积分交易
///
/// 每次被接受的积分事件写入一条，写入后不再修改
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PointTransaction {
    pub id: i64,
    pub member_id: i64,
    pub category_id: i64,
    pub action: String,
    pub amount: Decimal,
    pub points_earned: Decimal,
    /// 唯一流水号
    pub reference_no: String,
    #[sqlx(default)]
    pub notes: Option<String>,
    /// 经办员工
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

/// 待写入的积分交易
#[derive(Debug, Clone)]
pub struct NewPointTransaction {
    pub member_id: i64,
    pub category_id: i64,
    pub action: String,
    pub amount: Decimal,
    pub points_earned: Decimal,
    pub reference_no: String,
    pub notes: Option<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

/// 兑换记录
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub id: i64,
    pub reward_id: i64,
    pub member_id: i64,
    /// 兑换时的积分价格快照
    pub points_used: Decimal,
    pub status: RedemptionStatus,
    #[sqlx(default)]
    pub processed_by: Option<i64>,
    #[sqlx(default)]
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
