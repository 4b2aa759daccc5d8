use std::sync::Once;

/// Logger configuration.
///
/// `default_level` applies when neither `RUST_LOG` nor `filters` are set.
/// `filters` uses `env_logger` filter syntax (e.g. "arbor_ui=debug,wgpu=warn")
/// and is appended after the default level.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub default_level: log::LevelFilter,
    pub filters: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Include the module path in each record.
    pub module_path: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_level: log::LevelFilter::Info,
            filters: None,
            write_style: env_logger::WriteStyle::Auto,
            module_path: true,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(mut self, level: log::LevelFilter) -> Self {
        self.default_level = level;
        self
    }

    pub fn with_filters(mut self, filters: impl Into<String>) -> Self {
        self.filters = Some(filters.into());
        self
    }
}

static INIT: Once = Once::new();

/// Installs the global `env_logger` once.
///
/// `RUST_LOG`, when present, replaces the configured level and filters.
/// Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        match std::env::var("RUST_LOG") {
            Ok(filter) if !filter.trim().is_empty() => {
                builder.parse_filters(&filter);
            }
            _ => {
                builder.filter_level(config.default_level);
                if let Some(filters) = &config.filters {
                    builder.parse_filters(filters);
                }
            }
        }

        builder
            .write_style(config.write_style)
            .format_module_path(config.module_path)
            .format_target(false);

        // A host process may have installed its own logger already.
        if builder.try_init().is_err() {
            log::debug!("logger already installed; keeping the existing one");
            return;
        }

        log::debug!("logging initialized");
    });
}
