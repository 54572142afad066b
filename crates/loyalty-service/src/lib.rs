//! 会员积分服务
//!
//! 负责会员积分的获取、风控与兑换。
//!
//! ## 核心功能
//!
//! - **二维码签名**：会员二维码的 HMAC 签发与校验（完整性、过期、签发时间）
//! - **积分计算**：按分类与动作匹配启用的积分规则，多条规则累加
//! - **风控评分**：基于近期交易行为计算风险增量与风险等级
//! - **积分交易**：去重、风控、入账与审计在同一数据库事务内完成
//! - **奖品兑换**：锁定库存与余额，扣减后生成待处理的兑换记录
//! - **审计日志**：只追加的操作记录
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `clock`: 可注入的时间源
//! - `context`: 请求上下文（操作人、IP、UA）
//! - `qr`: 二维码签名与校验
//! - `rules`: 积分规则引擎
//! - `fraud`: 风控评分引擎
//! - `audit`: 审计日志
//! - `repository`: 数据库仓储层
//! - `service`: 业务服务层
//! - `http`: REST 接口

pub mod audit;
pub mod clock;
pub mod context;
pub mod error;
pub mod fraud;
pub mod http;
pub mod models;
pub mod qr;
pub mod repository;
pub mod rules;
pub mod service;

use sqlx::migrate::Migrator;

/// 数据库迁移（位于工作区根目录 migrations/）
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub use audit::{AuditAction, AuditEntry, AuditSink, AuditSubject, EntityKind, PgAuditSink};
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::RequestContext;
pub use error::{ErrorKind, LoyaltyError, Result};
pub use fraud::{FraudEvaluation, FraudScoringService, FraudSignals, RiskLevel};
pub use models::*;
pub use qr::{ConfigSecretProvider, QrCodec, QrErrorCode, QrPayload, QrVerification, SecretProvider};
pub use rules::PointsEngine;
pub use service::{MemberService, RedemptionService, ScanService, TransactionService, dto};
