//! 会员查询服务（二维码签发、积分余额）

use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;
use tracing::instrument;

use crate::error::{LoyaltyError, Result};
use crate::qr::{QrCodec, QrPayload};
use crate::repository::{BalanceRepository, MemberRepository};
use crate::service::dto::BalanceDto;

/// 二维码有效期上限（秒）
pub const MAX_QR_VALIDITY_SECONDS: i64 = 30 * 86_400;

pub struct MemberService {
    codec: Arc<QrCodec>,
    member_repo: Arc<MemberRepository>,
    balance_repo: Arc<BalanceRepository>,
}

impl MemberService {
    pub fn new(
        codec: Arc<QrCodec>,
        member_repo: Arc<MemberRepository>,
        balance_repo: Arc<BalanceRepository>,
    ) -> Self {
        Self {
            codec,
            member_repo,
            balance_repo,
        }
    }

    /// 签发会员二维码，未指定有效期时使用配置的默认值
    #[instrument(skip(self))]
    pub async fn issue_member_qr(
        &self,
        member_id: i64,
        validity: Option<Duration>,
    ) -> Result<QrPayload> {
        if let Some(validity) = validity {
            if validity <= Duration::zero()
                || validity > Duration::seconds(MAX_QR_VALIDITY_SECONDS)
            {
                return Err(LoyaltyError::Validation(format!(
                    "二维码有效期必须在 1-{MAX_QR_VALIDITY_SECONDS} 秒之间"
                )));
            }
        }

        let member = self
            .member_repo
            .get(member_id)
            .await?
            .ok_or(LoyaltyError::MemberNotFound(member_id))?;

        self.codec.sign(
            &member.member_code,
            validity.unwrap_or_else(|| self.codec.default_validity()),
        )
    }

    /// 查询积分余额，没有余额记录时为 0
    #[instrument(skip(self))]
    pub async fn get_balance(&self, member_id: i64) -> Result<BalanceDto> {
        self.member_repo
            .get(member_id)
            .await?
            .ok_or(LoyaltyError::MemberNotFound(member_id))?;

        let balance = self
            .balance_repo
            .get_balance(member_id)
            .await?
            .unwrap_or(Decimal::ZERO);

        Ok(BalanceDto { member_id, balance })
    }
}
