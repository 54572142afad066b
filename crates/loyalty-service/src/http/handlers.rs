//! API 处理器

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use chrono::Duration;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use crate::error::LoyaltyError;
use crate::http::{context::request_context, error::ApiError, response::ApiResponse, state::AppState};
use crate::models::{PointTransaction, Redemption, RedemptionStatus};
use crate::qr::QrPayload;
use crate::service::dto::{BalanceDto, ProcessTransactionRequest, ScanReceipt, ScanRequest};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// 手工录入交易请求体，经办员工取自请求头
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionBody {
    pub member_id: i64,
    pub category_id: i64,
    pub action: String,
    pub amount: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrQuery {
    /// 有效期（秒），缺省使用配置值
    pub validity_seconds: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionListQuery {
    pub status: Option<RedemptionStatus>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
}

fn default_list_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemBody {
    pub member_id: i64,
    pub reward_id: i64,
}

/// 扫码积分
///
/// POST /api/v1/scan
pub async fn scan(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ScanRequest>,
) -> ApiResult<ScanReceipt> {
    let ctx = request_context(&headers);
    let receipt = state.scans.process_scan(&ctx, req).await?;
    Ok(Json(ApiResponse::success(receipt)))
}

/// 手工录入积分交易
///
/// POST /api/v1/transactions
pub async fn create_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateTransactionBody>,
) -> ApiResult<PointTransaction> {
    let ctx = request_context(&headers);
    let created_by = ctx
        .actor_id
        .ok_or_else(|| LoyaltyError::Validation("缺少操作人".to_string()))?;

    let transaction = state
        .transactions
        .process_transaction(
            &ctx,
            ProcessTransactionRequest {
                member_id: body.member_id,
                category_id: body.category_id,
                action: body.action,
                amount: body.amount,
                notes: body.notes,
                created_by,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(transaction)))
}

/// 签发会员二维码
///
/// GET /api/v1/members/{id}/qr
pub async fn member_qr(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
    Query(query): Query<QrQuery>,
) -> ApiResult<QrPayload> {
    let validity = query
        .validity_seconds
        .map(|seconds| {
            Duration::try_seconds(seconds)
                .ok_or_else(|| LoyaltyError::Validation("二维码有效期超出范围".to_string()))
        })
        .transpose()?;
    let payload = state.members.issue_member_qr(member_id, validity).await?;

    info!(member_id, expires_at = payload.expires_at, "会员二维码已签发");
    Ok(Json(ApiResponse::success(payload)))
}

/// 查询积分余额
///
/// GET /api/v1/members/{id}/points
pub async fn member_points(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
) -> ApiResult<BalanceDto> {
    let balance = state.members.get_balance(member_id).await?;
    Ok(Json(ApiResponse::success(balance)))
}

/// 查询会员兑换记录
///
/// GET /api/v1/members/{id}/redemptions
pub async fn member_redemptions(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
    Query(query): Query<RedemptionListQuery>,
) -> ApiResult<Vec<Redemption>> {
    let items = state
        .redemptions
        .list_member_redemptions(member_id, query.status, query.limit)
        .await?;
    Ok(Json(ApiResponse::success(items)))
}

/// 兑换奖品
///
/// POST /api/v1/redemptions
pub async fn redeem(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RedeemBody>,
) -> ApiResult<Redemption> {
    let ctx = request_context(&headers);
    let redemption = state
        .redemptions
        .redeem(&ctx, body.member_id, body.reward_id)
        .await?;
    Ok(Json(ApiResponse::success(redemption)))
}

/// 确认领取
///
/// PATCH /api/v1/redemptions/{id}/complete
pub async fn complete_redemption(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(redemption_id): Path<i64>,
) -> ApiResult<Redemption> {
    let ctx = request_context(&headers);
    let redemption = state
        .redemptions
        .complete_redemption(&ctx, redemption_id)
        .await?;
    Ok(Json(ApiResponse::success(redemption)))
}
