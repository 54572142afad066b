//! 分类、积分规则与奖品定义

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::PointRuleKind;

/// 交易分类
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 积分规则
///
/// 同一 (category_id, action) 可以有多条启用规则，计算时累加
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PointRule {
    pub id: i64,
    pub category_id: i64,
    pub action: String,
    pub rule_type: PointRuleKind,
    /// fixed: 固定积分；multiplier: 每多少金额得 1 分
    pub value: Decimal,
    /// 最低消费金额，低于此金额不计分
    #[sqlx(default)]
    pub min_amount: Option<Decimal>,
    /// 单条规则积分上限
    #[sqlx(default)]
    pub max_points: Option<Decimal>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 奖品
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: i64,
    pub name: String,
    #[sqlx(default)]
    pub description: Option<String>,
    pub points_required: Decimal,
    pub stock: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reward {
    pub fn has_stock(&self) -> bool {
        self.stock > 0
    }
}
