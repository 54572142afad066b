//! 扫码积分服务
//!
//! 员工扫描会员二维码后：校验二维码 -> 按编码找到会员 -> 会员必须为正常状态
//! -> 以当前操作人作为经办员工执行积分交易 -> 返回最新余额。

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument};
use validator::Validate;

use crate::context::RequestContext;
use crate::error::{LoyaltyError, Result};
use crate::qr::QrCodec;
use crate::repository::{BalanceRepository, MemberRepository};
use crate::service::TransactionService;
use crate::service::dto::{ProcessTransactionRequest, ScanReceipt, ScanRequest};

/// 扫码积分服务
pub struct ScanService {
    codec: Arc<QrCodec>,
    member_repo: Arc<MemberRepository>,
    balance_repo: Arc<BalanceRepository>,
    transactions: Arc<TransactionService>,
}

impl ScanService {
    pub fn new(
        codec: Arc<QrCodec>,
        member_repo: Arc<MemberRepository>,
        balance_repo: Arc<BalanceRepository>,
        transactions: Arc<TransactionService>,
    ) -> Self {
        Self {
            codec,
            member_repo,
            balance_repo,
            transactions,
        }
    }

    /// 处理一次扫码
    #[instrument(skip(self, ctx, request), fields(actor_id = ?ctx.actor_id, category_id = request.category_id))]
    pub async fn process_scan(
        &self,
        ctx: &RequestContext,
        request: ScanRequest,
    ) -> Result<ScanReceipt> {
        request.validate()?;
        let created_by = ctx
            .actor_id
            .ok_or_else(|| LoyaltyError::Validation("缺少操作人".to_string()))?;

        let member_code = self.codec.verify(&request.qr_payload).into_result()?;

        let member = self
            .member_repo
            .get_by_code(&member_code)
            .await?
            .ok_or_else(|| LoyaltyError::MemberCodeNotFound(member_code.clone()))?;
        if !member.is_active() {
            return Err(LoyaltyError::MemberInactive {
                member_id: member.id,
                status: member.status.as_str().to_string(),
            });
        }

        let transaction = self
            .transactions
            .process_transaction(
                ctx,
                ProcessTransactionRequest {
                    member_id: member.id,
                    category_id: request.category_id,
                    action: request.action,
                    amount: request.amount,
                    notes: request.notes,
                    created_by,
                },
            )
            .await?;

        let new_balance = self
            .balance_repo
            .get_balance(member.id)
            .await?
            .unwrap_or(Decimal::ZERO);

        info!(
            member_id = member.id,
            reference_no = %transaction.reference_no,
            "扫码积分完成"
        );

        Ok(ScanReceipt {
            transaction_id: transaction.id,
            reference_no: transaction.reference_no,
            points_earned: transaction.points_earned,
            new_balance,
            member_name: member.name,
        })
    }
}
