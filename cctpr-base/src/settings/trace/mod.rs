use eyre::Result;
use serde::Deserialize;
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    prelude::*,
};

pub use self::fmt::Style;

/// Configure a `tracing_subscriber::fmt` Layer outputting to stdout
pub mod fmt;

/// Logging level. A "higher level" means more will be logged.
#[derive(Default, Debug, Clone, Copy, Deserialize, PartialOrd, Ord, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Level {
    /// Off
    Off = 0,
    /// Error
    Error = 1,
    /// Warn
    Warn = 2,
    /// Debug
    Debug = 4,
    /// Trace
    Trace = 5,
    /// Info
    #[serde(other)]
    #[default]
    Info = 3,
}

impl From<Level> for LevelFilter {
    fn from(level: Level) -> LevelFilter {
        match level {
            Level::Off => LevelFilter::OFF,
            Level::Error => LevelFilter::ERROR,
            Level::Warn => LevelFilter::WARN,
            Level::Debug => LevelFilter::DEBUG,
            Level::Trace => LevelFilter::TRACE,
            Level::Info => LevelFilter::INFO,
        }
    }
}

/// Configuration for the tracing subscriber of the engine's host process
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TracingConfig {
    /// Output style
    #[serde(default)]
    pub fmt: Style,
    /// Maximum level logged
    #[serde(default)]
    pub level: Level,
}

impl TracingConfig {
    /// The per-target filter: everything at `level`, except chatty transport
    /// crates which only show up at trace level.
    pub fn targets(&self) -> Targets {
        let mut targets = Targets::new().with_default(self.level);
        if self.level < Level::Trace {
            targets = targets.with_target("hyper", Level::Info);
            targets = targets.with_target("reqwest", Level::Info);
            targets = targets.with_target("ethers_providers", Level::Info);
        }
        targets
    }

    /// Attempt to instantiate and register a tracing subscriber setup from
    /// settings.
    pub fn start_tracing(&self) -> Result<()> {
        let subscriber = tracing_subscriber::Registry::default()
            .with(self.targets())
            .with(self.fmt.layer())
            .with(tracing_error::ErrorLayer::default());

        subscriber.try_init()?;
        Ok(())
    }
}
