//! HTTP 错误映射

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::{ErrorKind, LoyaltyError};
use crate::http::response::ApiResponse;

/// 接口层错误，包装业务错误并决定 HTTP 状态码
#[derive(Debug)]
pub struct ApiError(pub LoyaltyError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Security => StatusCode::UNAUTHORIZED,
            ErrorKind::FraudBlock => StatusCode::FORBIDDEN,
            ErrorKind::System => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LoyaltyError> for ApiError {
    fn from(err: LoyaltyError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        if !self.0.is_business_error() {
            tracing::error!(error = %self.0, code = self.0.error_code(), "请求处理失败");
        }

        let body = ApiResponse::error(self.0.error_code(), self.0.user_message());
        (status, Json(body)).into_response()
    }
}
