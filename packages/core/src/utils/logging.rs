// Логирование

use crate::config::Config;
use tracing_subscriber::EnvFilter;

/// Установить fmt-подписчик tracing с фильтром из конфигурации.
///
/// `RUST_LOG`, если задан, имеет приоритет над `Config::log_filter`.
/// Повторный вызов ничего не делает.
pub fn init(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_noop() {
        init(&Config::default());
        init(&Config::default());
        tracing::info!(target: "hostcrypto::tests", "logging initialised");
    }
}
