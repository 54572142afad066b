//! 积分服务枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 会员状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum MemberStatus {
    /// 正常 - 可扫码积分、兑换
    #[default]
    Active,
    /// 未激活
    Inactive,
    /// 已冻结 - 运营冻结
    Suspended,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }
}

/// 积分规则类型
///
/// 新增规则类型时需要同时补充 `base_points` 的计算分支
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum PointRuleKind {
    /// 固定积分 - 每次命中获得 value 积分
    Fixed,
    /// 按金额折算 - 每 value 金额获得 1 积分（向下取整）
    Multiplier,
}

impl PointRuleKind {
    /// 计算单条规则的基础积分（未封顶），溢出时返回 None
    pub fn base_points(&self, value: Decimal, amount: Decimal) -> Option<Decimal> {
        match self {
            Self::Fixed => Some(value),
            Self::Multiplier => {
                if value > Decimal::ZERO {
                    amount.checked_div(value).map(|points| points.floor())
                } else {
                    Some(Decimal::ZERO)
                }
            }
        }
    }
}

/// 兑换状态
///
/// 当前流程只使用 Pending -> Completed；Approved / Rejected 为审批流程预留
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum RedemptionStatus {
    /// 待领取
    #[default]
    Pending,
    /// 已审批（预留）
    Approved,
    /// 已拒绝（预留）
    Rejected,
    /// 已领取
    Completed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_points_ignore_amount() {
        let points = PointRuleKind::Fixed.base_points(Decimal::new(25, 0), Decimal::new(9999, 0));
        assert_eq!(points, Some(Decimal::new(25, 0)));
    }

    #[test]
    fn test_multiplier_floors() {
        let points =
            PointRuleKind::Multiplier.base_points(Decimal::new(10, 0), Decimal::new(6059, 1));
        assert_eq!(points, Some(Decimal::new(60, 0)));
    }

    #[test]
    fn test_multiplier_overflow_is_none() {
        let points = PointRuleKind::Multiplier.base_points(Decimal::new(5, 1), Decimal::MAX);
        assert_eq!(points, None);
    }

    #[test]
    fn test_multiplier_non_positive_value_yields_zero() {
        let amount = Decimal::new(600, 0);
        assert_eq!(
            PointRuleKind::Multiplier.base_points(Decimal::ZERO, amount),
            Some(Decimal::ZERO)
        );
        assert_eq!(
            PointRuleKind::Multiplier.base_points(Decimal::new(-5, 0), amount),
            Some(Decimal::ZERO)
        );
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(
            serde_json::to_string(&RedemptionStatus::Completed).unwrap(),
            "\"COMPLETED\""
        );
        assert_eq!(
            serde_json::to_string(&PointRuleKind::Multiplier).unwrap(),
            "\"MULTIPLIER\""
        );
        assert_eq!(MemberStatus::Suspended.as_str(), "suspended");
    }
}
