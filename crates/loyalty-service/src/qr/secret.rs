//! 签名密钥来源

use loyalty_shared::config::AppConfig;

/// 非生产环境未配置密钥时使用的开发密钥
///
/// 不安全，仅用于本地开发。需要更严格策略的部署应在所有环境中配置 `qr.secret`。
pub const DEV_FALLBACK_SECRET: &str = "default_insecure_secret";

/// 提供二维码签名密钥，并区分是否为生产环境
#[cfg_attr(test, mockall::automock)]
pub trait SecretProvider: Send + Sync {
    fn secret(&self) -> Option<String>;
    fn is_production(&self) -> bool;
}

/// 从应用配置读取密钥
#[derive(Debug, Clone)]
pub struct ConfigSecretProvider {
    secret: Option<String>,
    production: bool,
}

impl ConfigSecretProvider {
    pub fn new(secret: Option<String>, production: bool) -> Self {
        Self { secret, production }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.qr.secret.clone(), config.is_production())
    }
}

impl SecretProvider for ConfigSecretProvider {
    fn secret(&self) -> Option<String> {
        self.secret.clone()
    }

    fn is_production(&self) -> bool {
        self.production
    }
}
