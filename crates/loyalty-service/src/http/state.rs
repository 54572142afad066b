//! 应用状态定义

use std::sync::Arc;

use sqlx::PgPool;

use loyalty_shared::config::AppConfig;

use crate::audit::PgAuditSink;
use crate::clock::Clock;
use crate::fraud::FraudScoringService;
use crate::qr::QrCodec;
use crate::repository::{BalanceRepository, MemberRepository, RedemptionRepository};
use crate::service::{MemberService, RedemptionService, ScanService, TransactionService};

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub transactions: Arc<TransactionService>,
    pub scans: Arc<ScanService>,
    pub members: Arc<MemberService>,
    pub redemptions: Arc<RedemptionService>,
}

impl AppState {
    pub fn new(
        transactions: Arc<TransactionService>,
        scans: Arc<ScanService>,
        members: Arc<MemberService>,
        redemptions: Arc<RedemptionService>,
    ) -> Self {
        Self {
            transactions,
            scans,
            members,
            redemptions,
        }
    }

    /// 按配置组装仓储与服务
    pub fn build(
        pool: PgPool,
        codec: Arc<QrCodec>,
        clock: Arc<dyn Clock>,
        config: &AppConfig,
    ) -> Self {
        let member_repo = Arc::new(MemberRepository::new(pool.clone()));
        let balance_repo = Arc::new(BalanceRepository::new(pool.clone()));
        let redemption_repo = Arc::new(RedemptionRepository::new(pool.clone()));
        let audit = Arc::new(PgAuditSink::new(clock.clone()));

        let transactions = Arc::new(TransactionService::new(
            pool.clone(),
            FraudScoringService::new(config.fraud.clone()),
            audit.clone(),
            clock.clone(),
            config.transaction.clone(),
        ));
        let scans = Arc::new(ScanService::new(
            codec.clone(),
            member_repo.clone(),
            balance_repo.clone(),
            transactions.clone(),
        ));
        let members = Arc::new(MemberService::new(codec, member_repo, balance_repo));
        let redemptions = Arc::new(RedemptionService::new(
            pool,
            redemption_repo,
            audit,
            clock,
        ));

        Self::new(transactions, scans, members, redemptions)
    }
}
