//! REST 接口
//!
//! 对外暴露扫码积分、积分交易、余额查询与奖品兑换，统一使用 `ApiResponse` 响应格式。

pub mod context;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use response::ApiResponse;
pub use routes::api_routes;
pub use state::AppState;
