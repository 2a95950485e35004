use anyhow::{anyhow, bail, Result};
use tracing_subscriber::EnvFilter;

/// A validated `tracing` filter directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogFilter(String);

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

// === impl LogFilter ===

impl std::str::FromStr for LogFilter {
    type Err = tracing_subscriber::filter::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EnvFilter::try_new(s)?;
        Ok(Self(s.to_string()))
    }
}

impl LogFilter {
    fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.0).map_err(Into::into)
    }
}

// === impl LogFormat ===

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            s => bail!("invalid log format: {s} (expected plain or json)"),
        }
    }
}

impl LogFormat {
    /// Installs the global subscriber. Logs are written to stderr so that
    /// stdout carries only the conversion output.
    pub fn try_init(self, filter: &LogFilter) -> Result<()> {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter.env_filter()?)
            .with_writer(std::io::stderr);
        match self {
            Self::Plain => builder.try_init(),
            Self::Json => builder.json().try_init(),
        }
        .map_err(|error| anyhow!(error))
    }
}
