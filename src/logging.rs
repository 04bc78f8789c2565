use std::sync::OnceLock;

/// Diagnostic verbosity, read once from `GIT_AUTOSQUASH_LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

static LOG_LEVEL: OnceLock<LogLevel> = OnceLock::new();

impl LogLevel {
    fn from_env() -> Self {
        match std::env::var("GIT_AUTOSQUASH_LOG_LEVEL")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "error" => LogLevel::Error,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            _ => LogLevel::Warn,
        }
    }
}

pub fn level() -> LogLevel {
    *LOG_LEVEL.get_or_init(LogLevel::from_env)
}

pub fn debug_log(msg: &str) {
    if level() >= LogLevel::Debug {
        eprintln!("\x1b[1;33m[git-autosquash]\x1b[0m {}", msg);
    }
}

pub fn info_log(msg: &str) {
    if level() >= LogLevel::Info {
        eprintln!("\x1b[1;32m[git-autosquash]\x1b[0m {}", msg);
    }
}

pub fn warn_log(msg: &str) {
    if level() >= LogLevel::Warn {
        eprintln!("\x1b[1;31m[git-autosquash]\x1b[0m warning: {}", msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_from_quiet_to_verbose() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
    }
}
