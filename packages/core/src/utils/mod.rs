// Вспомогательные модули

pub mod logging;
pub mod time;
