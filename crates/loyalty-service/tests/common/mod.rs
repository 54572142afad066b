//! 集成测试公共辅助函数
//!
//! 每个测试用 uuid 生成独立的会员、分类与奖品，互不干扰，可重复执行。

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use loyalty_points::http::AppState;
use loyalty_points::qr::{ConfigSecretProvider, QrCodec};
use loyalty_points::{MIGRATOR, ManualClock};
use loyalty_shared::config::AppConfig;

pub const STAFF_ID: i64 = 9001;

pub fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests")
}

/// 连接数据库并执行迁移
pub async fn setup_pool() -> PgPool {
    let pool = PgPool::connect(&database_url())
        .await
        .expect("数据库连接失败");
    MIGRATOR.run(&pool).await.expect("数据库迁移失败");
    pool
}

/// 白天的固定时间点（UTC 12:00），避免触发深夜规则
pub fn daytime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 3, 12, 0, 0).unwrap()
}

pub fn unique_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// 测试环境：共享的手动时钟与组装好的服务
pub struct TestEnv {
    pub pool: PgPool,
    pub clock: ManualClock,
    pub codec: Arc<QrCodec>,
    pub state: AppState,
}

pub async fn setup_env() -> TestEnv {
    setup_env_with(AppConfig::default()).await
}

pub async fn setup_env_with(config: AppConfig) -> TestEnv {
    let pool = setup_pool().await;
    let clock = ManualClock::new(daytime());
    let provider = ConfigSecretProvider::new(Some("integration-test-secret".to_string()), false);
    let codec = Arc::new(
        QrCodec::new(&provider, Arc::new(clock.clone()), &config.qr).expect("创建二维码编解码器失败"),
    );
    let state = AppState::build(pool.clone(), codec.clone(), Arc::new(clock.clone()), &config);

    TestEnv {
        pool,
        clock,
        codec,
        state,
    }
}

/// 插入会员，返回 (id, member_code)
pub async fn seed_member(pool: &PgPool, status: &str) -> (i64, String) {
    let code = format!("MBR-{}", unique_suffix());
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO members (member_code, name, email, status)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&code)
    .bind(format!("测试会员 {}", code))
    .bind(format!("{}@example.com", code.to_lowercase()))
    .bind(status)
    .fetch_one(pool)
    .await
    .expect("插入测试会员失败");

    (id, code)
}

/// 插入分类及一条 purchase 规则，返回分类 ID
pub async fn seed_category_with_rule(pool: &PgPool, rule_type: &str, value: Decimal) -> i64 {
    let slug = format!("cat-{}", unique_suffix());
    let category_id: i64 = sqlx::query_scalar(
        "INSERT INTO categories (name, slug) VALUES ($1, $1) RETURNING id",
    )
    .bind(&slug)
    .fetch_one(pool)
    .await
    .expect("插入测试分类失败");

    sqlx::query(
        r#"
        INSERT INTO point_rules (category_id, action, rule_type, value)
        VALUES ($1, 'purchase', $2, $3)
        "#,
    )
    .bind(category_id)
    .bind(rule_type)
    .bind(value)
    .execute(pool)
    .await
    .expect("插入测试规则失败");

    category_id
}

pub async fn seed_reward(pool: &PgPool, points_required: Decimal, stock: i32, active: bool) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO rewards (name, points_required, stock, active)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(format!("奖品 {}", unique_suffix()))
    .bind(points_required)
    .bind(stock)
    .bind(active)
    .fetch_one(pool)
    .await
    .expect("插入测试奖品失败")
}

pub async fn seed_balance(pool: &PgPool, member_id: i64, balance: Decimal) {
    sqlx::query(
        r#"
        INSERT INTO loyalty_balances (member_id, balance)
        VALUES ($1, $2)
        ON CONFLICT (member_id) DO UPDATE SET balance = EXCLUDED.balance
        "#,
    )
    .bind(member_id)
    .bind(balance)
    .execute(pool)
    .await
    .expect("写入测试余额失败");
}

pub async fn balance_of(pool: &PgPool, member_id: i64) -> Decimal {
    sqlx::query_scalar("SELECT balance FROM loyalty_balances WHERE member_id = $1")
        .bind(member_id)
        .fetch_optional(pool)
        .await
        .expect("查询余额失败")
        .unwrap_or(Decimal::ZERO)
}

pub async fn transaction_count(pool: &PgPool, member_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE member_id = $1")
        .bind(member_id)
        .fetch_one(pool)
        .await
        .expect("查询交易数失败")
}

/// 指定动作、主体的审计记录条数
pub async fn audit_count(pool: &PgPool, action: &str, subject_type: &str, subject_id: i64) -> i64 {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM audit_logs
        WHERE action = $1 AND subject_type = $2 AND subject_id = $3
        "#,
    )
    .bind(action)
    .bind(subject_type)
    .bind(subject_id)
    .fetch_one(pool)
    .await
    .expect("查询审计日志失败")
}
