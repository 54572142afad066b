//! 风控评分引擎
//!
//! 对一次积分交易尝试计算风险增量。各信号独立判断、分值累加：
//!
//! - 高频扫码：窗口内（含本次）交易次数达到阈值
//! - 高额积分：本次预计积分超过阈值
//! - 深夜交易：本地时间落在深夜时段
//! - 员工配对：窗口内（含本次）同一员工为该会员经办的交易次数达到阈值
//!
//! 风险等级只取决于本次增量，与会员累计风险分无关。引擎只读取交易历史，不写入任何数据；
//! 累计风险分由交易流程负责更新。

use chrono::{DateTime, Duration, FixedOffset, Offset, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use tracing::{debug, instrument};

use loyalty_shared::config::FraudConfig;
use loyalty_shared::observability::metrics;

use crate::error::Result;
use crate::repository::TransactionRepository;

/// 风险等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

/// 评估上下文
#[derive(Debug, Clone, Serialize)]
pub struct FraudContext {
    pub amount: Decimal,
    /// 预计算的积分
    pub points: Decimal,
    /// 经办员工
    pub staff_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

/// 从交易历史读取的行为信号
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FraudSignals {
    /// 高频窗口内已有的交易数
    pub recent_transactions: i64,
    /// 配对窗口内该员工已经办的交易数（无员工时为 None）
    pub staff_transactions: Option<i64>,
}

/// 评估结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FraudEvaluation {
    pub score_delta: i32,
    pub risk_level: RiskLevel,
    pub reasons: Vec<String>,
}

/// 风控评分服务
#[derive(Debug, Clone)]
pub struct FraudScoringService {
    config: FraudConfig,
}

impl FraudScoringService {
    pub fn new(config: FraudConfig) -> Self {
        Self { config }
    }

    /// 评估一次交易尝试
    #[instrument(skip(self, conn, context), fields(staff_id = ?context.staff_id))]
    pub async fn evaluate(
        &self,
        conn: &mut PgConnection,
        member_id: i64,
        context: &FraudContext,
    ) -> Result<FraudEvaluation> {
        let signals = self.collect_signals(conn, member_id, context).await?;
        let evaluation = self.score(&signals, context);

        debug!(
            member_id,
            score_delta = evaluation.score_delta,
            risk_level = evaluation.risk_level.as_str(),
            "风控评估完成"
        );
        metrics::record_fraud_evaluation(evaluation.risk_level.as_str());

        Ok(evaluation)
    }

    /// 读取交易历史中的行为信号
    pub async fn collect_signals(
        &self,
        conn: &mut PgConnection,
        member_id: i64,
        context: &FraudContext,
    ) -> Result<FraudSignals> {
        let velocity_since =
            context.timestamp - Duration::seconds(self.config.velocity_window_seconds);
        let recent_transactions =
            TransactionRepository::count_since_in_tx(&mut *conn, member_id, velocity_since).await?;

        let staff_transactions = match context.staff_id {
            Some(staff_id) => {
                let pairing_since = context.timestamp
                    - Duration::seconds(self.config.staff_pairing_window_seconds);
                Some(
                    TransactionRepository::count_with_staff_since_in_tx(
                        &mut *conn,
                        member_id,
                        staff_id,
                        pairing_since,
                    )
                    .await?,
                )
            }
            None => None,
        };

        Ok(FraudSignals {
            recent_transactions,
            staff_transactions,
        })
    }

    /// 根据信号计算增量、等级与原因
    ///
    /// 次数类信号把本次尝试也计入
    pub fn score(&self, signals: &FraudSignals, context: &FraudContext) -> FraudEvaluation {
        let config = &self.config;
        let mut score_delta = 0;
        let mut reasons = Vec::new();

        let scans = signals.recent_transactions + 1;
        if scans >= config.velocity_threshold {
            score_delta += config.velocity_score;
            reasons.push(format!(
                "高频扫码: {} 分钟内 {} 次交易",
                config.velocity_window_seconds / 60,
                scans
            ));
        }

        if context.points > Decimal::from(config.high_points_threshold) {
            score_delta += config.high_points_score;
            reasons.push(format!("高额交易: {} 积分", context.points));
        }

        let hour = self.local_hour(context.timestamp);
        if self.is_late_night(hour) {
            score_delta += config.late_night_score;
            reasons.push(format!("深夜交易 (时段: {} 点)", hour));
        }

        if let (Some(staff_id), Some(count)) = (context.staff_id, signals.staff_transactions) {
            let pairings = count + 1;
            if pairings >= config.staff_pairing_threshold {
                score_delta += config.staff_pairing_score;
                reasons.push(format!(
                    "员工配对异常: 与员工 {} 共 {} 次交易",
                    staff_id, pairings
                ));
            }
        }

        FraudEvaluation {
            score_delta,
            risk_level: self.risk_level(score_delta),
            reasons,
        }
    }

    /// 分值对应的风险等级
    pub fn risk_level(&self, score: i32) -> RiskLevel {
        if score >= self.config.high_threshold {
            RiskLevel::High
        } else if score >= self.config.medium_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    fn local_hour(&self, timestamp: DateTime<Utc>) -> u32 {
        let offset =
            FixedOffset::east_opt(self.config.utc_offset_seconds).unwrap_or_else(|| Utc.fix());
        timestamp.with_timezone(&offset).hour()
    }

    fn is_late_night(&self, hour: u32) -> bool {
        let start = self.config.late_night_start_hour;
        let end = self.config.late_night_end_hour;
        if start > end {
            hour >= start || hour < end
        } else {
            hour >= start && hour < end
        }
    }
}
