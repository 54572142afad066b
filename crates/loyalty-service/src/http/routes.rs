//! 路由配置

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::http::{handlers, state::AppState};

/// 业务路由，由调用方挂载到 `/api/v1`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/scan", post(handlers::scan))
        .route("/transactions", post(handlers::create_transaction))
        .route("/members/{id}/qr", get(handlers::member_qr))
        .route("/members/{id}/points", get(handlers::member_points))
        .route(
            "/members/{id}/redemptions",
            get(handlers::member_redemptions),
        )
        .route("/redemptions", post(handlers::redeem))
        .route(
            "/redemptions/{id}/complete",
            patch(handlers::complete_redemption),
        )
}
