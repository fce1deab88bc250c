use serde::Deserialize;
use tracing::Subscriber;
use tracing_subscriber::{fmt, registry::LookupSpan, Layer};

/// Basic tracing configuration
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Style {
    /// Pretty print
    Pretty,
    /// JSON
    Json,
    /// Compact
    Compact,
    /// Default style
    #[serde(other)]
    #[default]
    Default,
}

impl Style {
    /// A `tracing_subscriber::fmt` layer writing to stdout in this style.
    pub fn layer<S>(self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    {
        let layer = fmt::layer().with_target(true);
        match self {
            Style::Pretty => layer.pretty().boxed(),
            Style::Json => layer.json().with_current_span(true).boxed(),
            Style::Compact => layer.compact().boxed(),
            Style::Default => layer.boxed(),
        }
    }
}
