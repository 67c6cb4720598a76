//! Централизованная конфигурация runtime
//!
//! Все лимиты и имена алгоритмов по умолчанию определены здесь,
//! чтобы не разносить константы по модулям.

use std::sync::OnceLock;

/// Глобальная конфигурация (синглтон)
static GLOBAL_CONFIG: OnceLock<Config> = OnceLock::new();

/// Основная структура конфигурации
#[derive(Debug, Clone)]
pub struct Config {
    // ============================================
    // ТАБЛИЦА HANDLE
    // ============================================

    /// Максимальный индекс handle, который может быть выдан контекстом.
    /// Индексы не переиспользуются, поэтому это лимит на всё время жизни контекста.
    pub max_handles: u32,

    // ============================================
    // ТРАНСПОРТ СЕКРЕТОВ
    // ============================================

    /// Алгоритм обмена ключами для external_secret_encapsulate
    pub transport_kx_algorithm: String,

    /// HKDF extract для деривации транспортного ключа
    pub transport_kdf_extract: String,

    /// HKDF expand для деривации транспортного ключа
    pub transport_kdf_expand: String,

    /// AEAD для шифрования секрета при транспорте
    pub transport_aead_algorithm: String,

    // ============================================
    // ЛОГИРОВАНИЕ
    // ============================================

    /// Фильтр для tracing-subscriber (синтаксис EnvFilter)
    pub log_filter: String,
}

impl Config {
    /// Максимальный индекс, помещающийся в 24 младших бита handle
    pub const MAX_HANDLE_INDEX: u32 = (1 << 24) - 1;

    /// Создать конфигурацию с дефолтными значениями
    pub fn default() -> Self {
        Self {
            max_handles: Self::MAX_HANDLE_INDEX,

            transport_kx_algorithm: "X25519".to_string(),
            transport_kdf_extract: "HKDF-EXTRACT/SHA-256".to_string(),
            transport_kdf_expand: "HKDF-EXPAND/SHA-256".to_string(),
            transport_aead_algorithm: "XCHACHA20-POLY1305".to_string(),

            log_filter: "hostcrypto=info".to_string(),
        }
    }

    /// Создать конфигурацию из переменных окружения
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("HOSTCRYPTO_MAX_HANDLES") {
            if let Ok(parsed) = val.parse::<u32>() {
                config.max_handles = parsed.min(Self::MAX_HANDLE_INDEX);
            }
        }

        if let Ok(val) = std::env::var("HOSTCRYPTO_LOG") {
            if !val.is_empty() {
                config.log_filter = val;
            }
        }

        config
    }

    /// Получить глобальный экземпляр конфигурации
    ///
    /// При первом вызове без `init_with` читается окружение (`from_env`)
    pub fn global() -> &'static Config {
        GLOBAL_CONFIG.get_or_init(Config::from_env)
    }

    /// Инициализировать глобальную конфигурацию с кастомным экземпляром
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_with(config: Config) -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(config)
            .map_err(|_| "Config already initialized")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_handles, Config::MAX_HANDLE_INDEX);
        assert_eq!(config.transport_kx_algorithm, "X25519");
        assert_eq!(config.transport_aead_algorithm, "XCHACHA20-POLY1305");
    }

    #[test]
    fn test_global_is_stable() {
        let a = Config::global() as *const Config;
        let b = Config::global() as *const Config;
        assert_eq!(a, b);
        // После первого обращения глобальная конфигурация зафиксирована
        assert!(Config::init_with(Config::default()).is_err());
        assert_eq!(Config::global() as *const Config, a);
    }
}
