//! 服务层
//!
//! 实现积分业务流程，协调仓储层、规则引擎、风控引擎与审计日志。
//!
//! ## 模块结构
//!
//! - `dto`: 数据传输对象定义
//! - `transaction_service`: 积分交易
//! - `redemption_service`: 奖品兑换与领取
//! - `scan_service`: 扫码积分
//! - `member_service`: 会员二维码与余额查询

pub mod dto;
mod member_service;
mod redemption_service;
mod scan_service;
mod transaction_service;

pub use member_service::{MAX_QR_VALIDITY_SECONDS, MemberService};
pub use redemption_service::RedemptionService;
pub use scan_service::ScanService;
pub use transaction_service::TransactionService;
