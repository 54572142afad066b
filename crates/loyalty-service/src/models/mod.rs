//! 积分服务领域模型
//!
//! 包含积分系统的所有核心实体定义

pub mod catalog;
pub mod enums;
pub mod ledger;
pub mod member;

// 重新导出常用类型
pub use catalog::{Category, PointRule, Reward};
pub use enums::{MemberStatus, PointRuleKind, RedemptionStatus};
pub use ledger::{NewPointTransaction, PointTransaction, Redemption};
pub use member::{FraudRiskScore, LoyaltyBalance, Member};
