//! 二维码签名与校验

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Duration;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tracing::{error, instrument, warn};

use loyalty_shared::config::QrConfig;
use loyalty_shared::observability::metrics;

use super::secret::{DEV_FALLBACK_SECRET, SecretProvider};
use super::{QrErrorCode, QrPayload, QrVerification};
use crate::clock::Clock;
use crate::error::{LoyaltyError, Result};

type HmacSha256 = Hmac<Sha256>;

/// 二维码编解码器
///
/// 密钥在构造时确定：生产环境缺少密钥直接返回配置错误，非生产环境回退到开发密钥。
pub struct QrCodec {
    key: Vec<u8>,
    clock: Arc<dyn Clock>,
    default_validity: Duration,
    clock_drift: Duration,
}

impl QrCodec {
    pub fn new(
        provider: &dyn SecretProvider,
        clock: Arc<dyn Clock>,
        config: &QrConfig,
    ) -> Result<Self> {
        let secret = provider.secret().filter(|s| !s.trim().is_empty());

        let key = match secret {
            Some(secret) => secret.into_bytes(),
            None if provider.is_production() => {
                return Err(LoyaltyError::Configuration(
                    "生产环境必须配置二维码签名密钥 qr.secret".to_string(),
                ));
            }
            None => {
                warn!("未配置二维码签名密钥，使用不安全的开发密钥");
                DEV_FALLBACK_SECRET.as_bytes().to_vec()
            }
        };

        Ok(Self {
            key,
            clock,
            default_validity: Duration::seconds(config.validity_seconds),
            clock_drift: Duration::seconds(config.clock_drift_seconds),
        })
    }

    /// 默认有效期
    pub fn default_validity(&self) -> Duration {
        self.default_validity
    }

    /// 为会员签发二维码内容
    #[instrument(skip(self), fields(member_code = %member_code))]
    pub fn sign(&self, member_code: &str, validity: Duration) -> Result<QrPayload> {
        if member_code.trim().is_empty() {
            return Err(LoyaltyError::Validation("会员编码不能为空".to_string()));
        }
        if validity <= Duration::zero() {
            return Err(LoyaltyError::Validation("二维码有效期必须大于 0".to_string()));
        }

        let issued_at = self.clock.now().timestamp();
        let expires_at = issued_at + validity.num_seconds();

        let mac = self
            .keyed_mac(member_code, issued_at, expires_at)
            .map_err(|_| LoyaltyError::Internal("二维码签名失败".to_string()))?;

        Ok(QrPayload {
            member_id: member_code.to_string(),
            issued_at,
            expires_at,
            checksum: hex::encode(mac.finalize().into_bytes()),
        })
    }

    /// 校验二维码内容
    ///
    /// 依次检查：字段完整性、签名、过期时间、签发时间
    pub fn verify(&self, payload: &Value) -> QrVerification {
        match self.check(payload) {
            Ok(member_code) => {
                metrics::record_qr_verification("VALID");
                QrVerification::accepted(member_code)
            }
            Err(code) => {
                match code {
                    QrErrorCode::ValidationError => error!("二维码校验出现内部错误"),
                    _ => warn!(
                        reason = code.as_str(),
                        member_id = payload.get("member_id").and_then(serde_json::Value::as_str),
                        "二维码校验失败"
                    ),
                }
                metrics::record_qr_verification(code.as_str());
                QrVerification::rejected(code)
            }
        }
    }

    /// 校验结构化的二维码内容
    pub fn verify_payload(&self, payload: &QrPayload) -> QrVerification {
        match serde_json::to_value(payload) {
            Ok(value) => self.verify(&value),
            Err(_) => QrVerification::rejected(QrErrorCode::ValidationError),
        }
    }

    fn check(&self, payload: &Value) -> std::result::Result<String, QrErrorCode> {
        let fields = PayloadFields::parse(payload).ok_or(QrErrorCode::MalformedPayload)?;

        let mac = self.keyed_mac(fields.member_id, fields.issued_at, fields.expires_at)?;
        let provided = hex::decode(fields.checksum).map_err(|_| QrErrorCode::IntegrityFailure)?;
        mac.verify_slice(&provided)
            .map_err(|_| QrErrorCode::IntegrityFailure)?;

        let now = self.clock.now().timestamp();
        if now > fields.expires_at {
            return Err(QrErrorCode::Expired);
        }
        if fields.issued_at > now + self.clock_drift.num_seconds() {
            return Err(QrErrorCode::FutureIssued);
        }

        Ok(fields.member_id.to_string())
    }

    fn keyed_mac(
        &self,
        member_id: &str,
        issued_at: i64,
        expires_at: i64,
    ) -> std::result::Result<HmacSha256, QrErrorCode> {
        let message = canonical_json(member_id, issued_at, expires_at)
            .map_err(|_| QrErrorCode::ValidationError)?;
        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|_| QrErrorCode::ValidationError)?;
        mac.update(message.as_bytes());
        Ok(mac)
    }
}

/// 参与签名的字段
struct PayloadFields<'a> {
    member_id: &'a str,
    issued_at: i64,
    expires_at: i64,
    checksum: &'a str,
}

impl<'a> PayloadFields<'a> {
    fn parse(payload: &'a Value) -> Option<Self> {
        let object = payload.as_object()?;
        let member_id = object.get("member_id")?.as_str()?;
        if member_id.is_empty() {
            return None;
        }

        Some(Self {
            member_id,
            issued_at: object.get("issued_at")?.as_i64()?,
            expires_at: object.get("expires_at")?.as_i64()?,
            checksum: object.get("checksum")?.as_str()?,
        })
    }
}

/// 按键名排序的紧凑 JSON
fn canonical_json(
    member_id: &str,
    issued_at: i64,
    expires_at: i64,
) -> serde_json::Result<String> {
    let mut fields: BTreeMap<&str, Value> = BTreeMap::new();
    fields.insert("member_id", Value::from(member_id));
    fields.insert("issued_at", Value::from(issued_at));
    fields.insert("expires_at", Value::from(expires_at));
    serde_json::to_string(&fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::qr::MockSecretProvider;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn provider(secret: Option<&str>, production: bool) -> MockSecretProvider {
        let secret = secret.map(str::to_string);
        let mut provider = MockSecretProvider::new();
        provider.expect_secret().returning(move || secret.clone());
        provider.expect_is_production().return_const(production);
        provider
    }

    fn codec_at(clock: &ManualClock) -> QrCodec {
        QrCodec::new(
            &provider(Some("test-secret"), false),
            Arc::new(clock.clone()),
            &QrConfig::default(),
        )
        .unwrap()
    }

    fn start() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 3, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_canonical_json_is_key_sorted() {
        let text = canonical_json("BMPC-000123", 1704240000, 1704326400).unwrap();
        assert_eq!(
            text,
            r#"{"expires_at":1704326400,"issued_at":1704240000,"member_id":"BMPC-000123"}"#
        );
    }

    #[test]
    fn test_sign_then_verify() {
        let clock = ManualClock::new(start());
        let codec = codec_at(&clock);

        let payload = codec.sign("BMPC-000123", Duration::hours(24)).unwrap();
        assert_eq!(payload.expires_at - payload.issued_at, 86_400);
        assert_eq!(payload.checksum.len(), 64);

        let result = codec.verify_payload(&payload);
        assert!(result.valid);
        assert_eq!(result.member_code.as_deref(), Some("BMPC-000123"));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_valid_until_expiry_boundary() {
        let clock = ManualClock::new(start());
        let codec = codec_at(&clock);
        let payload = codec.sign("BMPC-000123", Duration::seconds(600)).unwrap();

        clock.advance(Duration::seconds(600));
        assert!(codec.verify_payload(&payload).valid);

        clock.advance(Duration::seconds(1));
        let result = codec.verify_payload(&payload);
        assert!(!result.valid);
        assert_eq!(result.error, Some(QrErrorCode::Expired));
    }

    #[test]
    fn test_tampered_fields_fail_integrity() {
        let clock = ManualClock::new(start());
        let codec = codec_at(&clock);
        let payload = codec.sign("BMPC-000123", Duration::hours(1)).unwrap();

        let mut tampered = payload.clone();
        tampered.member_id = "BMPC-000124".to_string();
        assert_eq!(
            codec.verify_payload(&tampered).error,
            Some(QrErrorCode::IntegrityFailure)
        );

        let mut tampered = payload.clone();
        tampered.issued_at -= 1;
        assert_eq!(
            codec.verify_payload(&tampered).error,
            Some(QrErrorCode::IntegrityFailure)
        );

        let mut tampered = payload.clone();
        tampered.expires_at += 86_400;
        assert_eq!(
            codec.verify_payload(&tampered).error,
            Some(QrErrorCode::IntegrityFailure)
        );
    }

    #[test]
    fn test_non_hex_checksum_fails_integrity() {
        let clock = ManualClock::new(start());
        let codec = codec_at(&clock);
        let mut payload = codec.sign("BMPC-000123", Duration::hours(1)).unwrap();
        payload.checksum = "not-a-hex-string".to_string();

        assert_eq!(
            codec.verify_payload(&payload).error,
            Some(QrErrorCode::IntegrityFailure)
        );
    }

    #[test]
    fn test_integrity_checked_before_expiry() {
        let clock = ManualClock::new(start());
        let codec = codec_at(&clock);
        let mut payload = codec.sign("BMPC-000123", Duration::seconds(60)).unwrap();
        payload.member_id = "BMPC-999999".to_string();

        clock.advance(Duration::hours(2));
        assert_eq!(
            codec.verify_payload(&payload).error,
            Some(QrErrorCode::IntegrityFailure)
        );
    }

    #[test]
    fn test_malformed_payloads() {
        let clock = ManualClock::new(start());
        let codec = codec_at(&clock);

        let cases = [
            json!("just a string"),
            json!({}),
            json!({ "member_id": "BMPC-1", "issued_at": 1, "expires_at": 2 }),
            json!({ "member_id": "BMPC-1", "issued_at": "1", "expires_at": 2, "checksum": "ab" }),
            json!({ "member_id": 42, "issued_at": 1, "expires_at": 2, "checksum": "ab" }),
            json!({ "member_id": "", "issued_at": 1, "expires_at": 2, "checksum": "ab" }),
        ];

        for payload in cases {
            let result = codec.verify(&payload);
            assert!(!result.valid);
            assert_eq!(result.error, Some(QrErrorCode::MalformedPayload), "{payload}");
        }
    }

    #[test]
    fn test_future_issued_beyond_drift() {
        let signing_clock = ManualClock::new(start() + Duration::seconds(400));
        let signer = codec_at(&signing_clock);
        let payload = signer.sign("BMPC-000123", Duration::hours(1)).unwrap();

        let clock = ManualClock::new(start());
        let verifier = codec_at(&clock);
        assert_eq!(
            verifier.verify_payload(&payload).error,
            Some(QrErrorCode::FutureIssued)
        );

        // 漂移容忍范围内
        clock.set(start() + Duration::seconds(100));
        assert!(verifier.verify_payload(&payload).valid);
    }

    #[test]
    fn test_different_secret_fails_integrity() {
        let clock = ManualClock::new(start());
        let codec = codec_at(&clock);
        let payload = codec.sign("BMPC-000123", Duration::hours(1)).unwrap();

        let other = QrCodec::new(
            &provider(Some("another-secret"), false),
            Arc::new(clock.clone()),
            &QrConfig::default(),
        )
        .unwrap();
        assert_eq!(
            other.verify_payload(&payload).error,
            Some(QrErrorCode::IntegrityFailure)
        );
    }

    #[test]
    fn test_missing_secret_in_production_is_fatal() {
        let clock = ManualClock::new(start());
        let result = QrCodec::new(
            &provider(None, true),
            Arc::new(clock.clone()),
            &QrConfig::default(),
        );
        assert!(matches!(result, Err(LoyaltyError::Configuration(_))));

        let result = QrCodec::new(
            &provider(Some("   "), true),
            Arc::new(clock),
            &QrConfig::default(),
        );
        assert!(matches!(result, Err(LoyaltyError::Configuration(_))));
    }

    #[test]
    fn test_missing_secret_outside_production_uses_fallback() {
        let clock = ManualClock::new(start());
        let fallback = QrCodec::new(
            &provider(None, false),
            Arc::new(clock.clone()),
            &QrConfig::default(),
        )
        .unwrap();
        let explicit = QrCodec::new(
            &provider(Some(DEV_FALLBACK_SECRET), false),
            Arc::new(clock),
            &QrConfig::default(),
        )
        .unwrap();

        let payload = fallback.sign("BMPC-000123", Duration::hours(1)).unwrap();
        assert!(explicit.verify_payload(&payload).valid);
    }

    #[test]
    fn test_sign_rejects_invalid_input() {
        let clock = ManualClock::new(start());
        let codec = codec_at(&clock);
        assert!(matches!(
            codec.sign("", Duration::hours(1)),
            Err(LoyaltyError::Validation(_))
        ));
        assert!(matches!(
            codec.sign("BMPC-1", Duration::zero()),
            Err(LoyaltyError::Validation(_))
        ));
    }

    #[test]
    fn test_into_result() {
        assert_eq!(
            QrVerification::accepted("BMPC-1").into_result().unwrap(),
            "BMPC-1"
        );
        let err = QrVerification::rejected(QrErrorCode::Expired)
            .into_result()
            .unwrap_err();
        assert_eq!(err.error_code(), "EXPIRED");
    }
}
