use std::env;

pub const DEFAULT_HISTORY_SIZE: usize = 50;
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Runtime settings. The shell takes no flags, so everything comes from
/// the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub history_size: usize,
    pub log_filter: String,
    /// Settings that were present but unusable; logged once tracing is up.
    pub ignored: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_size: DEFAULT_HISTORY_SIZE,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            ignored: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("HSH_HISTSIZE") {
            match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => config.history_size = size,
                _ => config.ignored.push(format!("HSH_HISTSIZE={}", raw)),
            }
        }

        if let Some(filter) = lookup("HSH_LOG") {
            if !filter.trim().is_empty() {
                config.log_filter = filter;
            }
        }

        config
    }
}
