//! 会员积分服务
//!
//! 提供扫码积分、积分交易、余额查询与奖品兑换的 REST API。

use std::sync::Arc;

use axum::{Json, Router, middleware, routing::get};
use loyalty_points::{
    Clock, MIGRATOR, SystemClock,
    http::{AppState, api_routes},
    qr::{ConfigSecretProvider, QrCodec},
};
use loyalty_shared::{
    config::AppConfig,
    database::Database,
    observability::{self, middleware as obs_middleware},
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 加载配置：config/default.toml -> config/{environment}.toml -> LOYALTY_* 环境变量
    // 加载失败直接退出，不能回退到开发环境默认值
    let config = AppConfig::load("loyalty-service")?;

    // 2. 初始化可观测性
    let obs_config = config.observability.clone().with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!(
        environment = %config.environment,
        "Starting loyalty-service on {}",
        config.server_addr()
    );

    // 3. 数据库连接与迁移
    let db = Database::connect(&config.database).await?;
    db.run_migrations(&MIGRATOR).await?;
    info!("Database connection established, migrations applied");

    // 4. 二维码签名密钥：生产环境缺失时直接拒绝启动
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let secret_provider = ConfigSecretProvider::from_config(&config);
    let codec = Arc::new(QrCodec::new(&secret_provider, clock.clone(), &config.qr)?);

    // 5. 组装服务
    let state = AppState::build(db.pool().clone(), codec, clock, &config);
    info!("Services initialized");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api/v1", api_routes())
        .route("/health", get(health_check))
        .route(
            "/ready",
            get({
                let db_for_ready = db.clone();
                move || readiness_check(db_for_ready.clone())
            }),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .with_state(state);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// 收到 SIGTERM 或 Ctrl+C 后返回，触发 axum 的优雅关闭流程。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("注册 Ctrl+C 处理器失败: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("注册 SIGTERM 处理器失败: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

/// 存活探针
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "loyalty-service"
    }))
}

/// 就绪探针：检查数据库连接
async fn readiness_check(db: Database) -> Json<serde_json::Value> {
    let db_ok = db.health_check().await.is_ok();

    Json(serde_json::json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "service": "loyalty-service",
        "checks": {
            "database": if db_ok { "ok" } else { "fail" }
        }
    }))
}
