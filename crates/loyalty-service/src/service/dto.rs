//! 服务层数据传输对象

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

/// 金额上限，与 NUMERIC(15,2) 列一致
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_319, 232_830, 0, false, 2);

fn amount_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// 金额非负、不超过列上限、最多两位小数
fn valid_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO {
        return Err(amount_error("non_negative", "金额不能为负数"));
    }
    if *amount > MAX_AMOUNT {
        return Err(amount_error("max_amount", "金额超出上限"));
    }
    if amount.normalize().scale() > 2 {
        return Err(amount_error("scale", "金额最多两位小数"));
    }
    Ok(())
}

/// 积分交易请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProcessTransactionRequest {
    pub member_id: i64,
    pub category_id: i64,
    #[validate(length(min = 1, max = 64, message = "动作长度必须在1-64个字符之间"))]
    pub action: String,
    #[validate(custom(function = "valid_amount"))]
    pub amount: Decimal,
    #[validate(length(max = 255, message = "备注不能超过255个字符"))]
    pub notes: Option<String>,
    /// 经办员工
    pub created_by: i64,
}

/// 扫码积分请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    /// 二维码原始内容（JSON 对象）
    pub qr_payload: Value,
    pub category_id: i64,
    #[validate(length(min = 1, max = 64, message = "动作长度必须在1-64个字符之间"))]
    pub action: String,
    #[validate(custom(function = "valid_amount"))]
    pub amount: Decimal,
    #[validate(length(max = 255, message = "备注不能超过255个字符"))]
    pub notes: Option<String>,
}

/// 扫码积分结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReceipt {
    pub transaction_id: i64,
    pub reference_no: String,
    pub points_earned: Decimal,
    pub new_balance: Decimal,
    pub member_name: String,
}

/// 会员积分余额
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDto {
    pub member_id: i64,
    pub balance: Decimal,
}
