//! 会员二维码
//!
//! 二维码内容为 JSON：
//!
//! ```text
//! { "member_id": "BMPC-000123", "issued_at": 1704240000, "expires_at": 1704326400, "checksum": "<hex>" }
//! ```
//!
//! checksum 为 HMAC-SHA256，输入是按键名排序后的 {expires_at, issued_at, member_id} 紧凑 JSON。

mod codec;
mod secret;

pub use codec::QrCodec;
pub use secret::{ConfigSecretProvider, DEV_FALLBACK_SECRET, SecretProvider};

#[cfg(test)]
pub use secret::MockSecretProvider;

use serde::{Deserialize, Serialize};

/// 二维码校验失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QrErrorCode {
    /// 缺少字段或字段类型不对
    MalformedPayload,
    /// 签名不匹配
    IntegrityFailure,
    /// 已过期
    Expired,
    /// 签发时间在未来（超出允许的时钟漂移）
    FutureIssued,
    /// 校验过程中的内部错误
    ValidationError,
}

impl QrErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedPayload => "MALFORMED_PAYLOAD",
            Self::IntegrityFailure => "INTEGRITY_FAILURE",
            Self::Expired => "EXPIRED",
            Self::FutureIssued => "FUTURE_ISSUED",
            Self::ValidationError => "VALIDATION_ERROR",
        }
    }

    /// 面向调用方的提示文案
    pub fn message(&self) -> &'static str {
        match self {
            Self::MalformedPayload => "二维码内容格式不正确",
            Self::IntegrityFailure => "二维码完整性校验失败",
            Self::Expired => "二维码已过期",
            Self::FutureIssued => "二维码签发时间无效",
            Self::ValidationError => "二维码校验失败",
        }
    }
}

/// 已签名的二维码内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    /// 会员编码
    pub member_id: String,
    pub issued_at: i64,
    pub expires_at: i64,
    pub checksum: String,
}

/// 二维码校验结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QrVerification {
    pub valid: bool,
    pub member_code: Option<String>,
    pub error: Option<QrErrorCode>,
}

impl QrVerification {
    pub fn accepted(member_code: impl Into<String>) -> Self {
        Self {
            valid: true,
            member_code: Some(member_code.into()),
            error: None,
        }
    }

    pub fn rejected(code: QrErrorCode) -> Self {
        Self {
            valid: false,
            member_code: None,
            error: Some(code),
        }
    }

    /// 转换为 Result，校验通过时返回会员编码
    pub fn into_result(self) -> crate::error::Result<String> {
        match (self.valid, self.member_code, self.error) {
            (true, Some(code), _) => Ok(code),
            (_, _, Some(error)) => Err(crate::error::LoyaltyError::QrRejected(error)),
            _ => Err(crate::error::LoyaltyError::QrRejected(
                QrErrorCode::ValidationError,
            )),
        }
    }
}
