//! 积分服务错误类型
//!
//! 定义服务层的业务错误和系统错误。业务错误的文案可以直接返回给调用方，
//! 系统错误只返回通用提示。

use rust_decimal::Decimal;
use thiserror::Error;

use crate::qr::QrErrorCode;

/// 系统错误对外展示的通用提示
pub const GENERIC_SYSTEM_MESSAGE: &str = "服务内部错误，请稍后重试";

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 输入不合法，调用方问题
    Validation,
    /// 会员、奖品等资源不存在
    NotFound,
    /// 重复交易、库存或余额不足、资源未启用
    Conflict,
    /// 二维码完整性或时效校验失败
    Security,
    /// 高风险交易被拦截
    FraudBlock,
    /// 数据库、序列化等内部错误
    System,
}

/// 积分服务错误类型
#[derive(Debug, Error)]
pub enum LoyaltyError {
    // === 输入校验 ===
    #[error("参数校验失败: {0}")]
    Validation(String),

    // === 会员 ===
    #[error("会员不存在: {0}")]
    MemberNotFound(i64),

    #[error("会员不存在: member_code={0}")]
    MemberCodeNotFound(String),

    #[error("会员状态不可用: member_id={member_id}, status={status}")]
    MemberInactive { member_id: i64, status: String },

    // === 分类 ===
    #[error("交易分类不存在: {0}")]
    CategoryNotFound(i64),

    // === 交易 ===
    #[error("检测到重复交易，请稍后再试")]
    DuplicateTransaction,

    #[error("交易存在高风险，已被拦截: {}", reasons.join(", "))]
    FraudBlocked { reasons: Vec<String> },

    // === 奖品与兑换 ===
    #[error("奖品不存在: {0}")]
    RewardNotFound(i64),

    #[error("奖品已下架: reward_id={0}")]
    RewardInactive(i64),

    #[error("奖品库存不足: reward_id={0}")]
    OutOfStock(i64),

    #[error("积分余额不足: 需要 {required}, 可用 {available}")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },

    #[error("兑换记录不存在: {0}")]
    RedemptionNotFound(i64),

    #[error("兑换已完成: redemption_id={0}")]
    RedemptionAlreadyCompleted(i64),

    // === 二维码 ===
    #[error("{}", .0.message())]
    QrRejected(QrErrorCode),

    // === 系统错误 ===
    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 积分服务 Result 类型别名
pub type Result<T> = std::result::Result<T, LoyaltyError>;

impl LoyaltyError {
    /// 错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::QrRejected(QrErrorCode::MalformedPayload) => ErrorKind::Validation,
            Self::MemberNotFound(_)
            | Self::MemberCodeNotFound(_)
            | Self::CategoryNotFound(_)
            | Self::RewardNotFound(_)
            | Self::RedemptionNotFound(_) => ErrorKind::NotFound,
            Self::MemberInactive { .. }
            | Self::DuplicateTransaction
            | Self::RewardInactive(_)
            | Self::OutOfStock(_)
            | Self::InsufficientBalance { .. }
            | Self::RedemptionAlreadyCompleted(_) => ErrorKind::Conflict,
            Self::QrRejected(_) => ErrorKind::Security,
            Self::FraudBlocked { .. } => ErrorKind::FraudBlock,
            Self::Configuration(_)
            | Self::Database(_)
            | Self::Serialization(_)
            | Self::Internal(_) => ErrorKind::System,
        }
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        self.kind() != ErrorKind::System
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::MemberNotFound(_) | Self::MemberCodeNotFound(_) => "MEMBER_NOT_FOUND",
            Self::MemberInactive { .. } => "MEMBER_INACTIVE",
            Self::CategoryNotFound(_) => "CATEGORY_NOT_FOUND",
            Self::DuplicateTransaction => "DUPLICATE_TRANSACTION",
            Self::FraudBlocked { .. } => "FRAUD_BLOCKED",
            Self::RewardNotFound(_) => "REWARD_NOT_FOUND",
            Self::RewardInactive(_) => "REWARD_INACTIVE",
            Self::OutOfStock(_) => "OUT_OF_STOCK",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::RedemptionNotFound(_) => "REDEMPTION_NOT_FOUND",
            Self::RedemptionAlreadyCompleted(_) => "REDEMPTION_ALREADY_COMPLETED",
            Self::QrRejected(code) => code.as_str(),
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 对外展示的错误文案
    ///
    /// 业务错误原样返回，系统错误统一替换为通用提示
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::System => GENERIC_SYSTEM_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for LoyaltyError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(LoyaltyError::MemberNotFound(1).error_code(), "MEMBER_NOT_FOUND");
        assert_eq!(
            LoyaltyError::MemberCodeNotFound("M-1".to_string()).error_code(),
            "MEMBER_NOT_FOUND"
        );
        assert_eq!(
            LoyaltyError::DuplicateTransaction.error_code(),
            "DUPLICATE_TRANSACTION"
        );
        assert_eq!(
            LoyaltyError::QrRejected(QrErrorCode::IntegrityFailure).error_code(),
            "INTEGRITY_FAILURE"
        );
        assert_eq!(
            LoyaltyError::FraudBlocked { reasons: vec![] }.error_code(),
            "FRAUD_BLOCKED"
        );
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(
            LoyaltyError::Validation("x".to_string()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(LoyaltyError::RewardNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(LoyaltyError::OutOfStock(1).kind(), ErrorKind::Conflict);
        assert_eq!(
            LoyaltyError::QrRejected(QrErrorCode::Expired).kind(),
            ErrorKind::Security
        );
        assert_eq!(
            LoyaltyError::FraudBlocked { reasons: vec![] }.kind(),
            ErrorKind::FraudBlock
        );
        assert_eq!(
            LoyaltyError::Internal("boom".to_string()).kind(),
            ErrorKind::System
        );
        assert!(!LoyaltyError::Internal("boom".to_string()).is_business_error());
        assert!(LoyaltyError::DuplicateTransaction.is_business_error());
    }

    #[test]
    fn test_fraud_block_message_includes_reasons() {
        let err = LoyaltyError::FraudBlocked {
            reasons: vec!["高频扫码".to_string(), "深夜交易".to_string()],
        };
        let message = err.user_message();
        assert!(message.contains("高频扫码"));
        assert!(message.contains("深夜交易"));
    }

    #[test]
    fn test_system_errors_are_masked() {
        let err = LoyaltyError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(err.user_message(), GENERIC_SYSTEM_MESSAGE);

        let err = LoyaltyError::Configuration("secret missing".to_string());
        assert_eq!(err.user_message(), GENERIC_SYSTEM_MESSAGE);
    }

    #[test]
    fn test_insufficient_balance_display() {
        let err = LoyaltyError::InsufficientBalance {
            required: Decimal::new(50000, 2),
            available: Decimal::new(12050, 2),
        };
        let text = err.to_string();
        assert!(text.contains("500.00"));
        assert!(text.contains("120.50"));
    }
}
