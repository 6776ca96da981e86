use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, ConfigError, Environment, File, Map};
use serde::{Deserialize, Serialize};

const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 1000;
const DEFAULT_YIELD_INTERVAL_MS: u64 = 10;
const ENV_PREFIX: &str = "DNNRUNNER";

/// Runtime knobs for a [`crate::Runner`].
///
/// Every field can be overridden by a `DNNRUNNER_`-prefixed variable named
/// after it, e.g. `DNNRUNNER_PROGRESS_INTERVAL_MS=250` or
/// `DNNRUNNER_TRACE_EVENTS=on`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerOptions {
    /// Minimum wall time between two progress notifications.
    pub progress_interval_ms: u64,
    /// Pause taken after each progress notification.
    pub yield_interval_ms: u64,
    /// Record a trace event per executed instruction.
    pub trace_events: bool,
    /// Measure kernel wall time in trace events.
    pub timer: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
            yield_interval_ms: DEFAULT_YIELD_INTERVAL_MS,
            trace_events: false,
            timer: false,
        }
    }
}

impl RunnerOptions {
    /// Defaults overridden by `DNNRUNNER_*` environment variables.
    pub fn from_env() -> Result<Self> {
        load(None, None)
    }

    /// Defaults, then `path` (json or toml), then `DNNRUNNER_*` environment
    /// variables, lowest precedence first.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        load(Some(path.as_ref()), None)
    }

    /// Like [`RunnerOptions::from_env`], reading variables from `vars`
    /// instead of the process environment.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: Map<String, String> = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        load(None, Some(vars))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).with_context(|| "parse runner options")
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn yield_interval(&self) -> Duration {
        Duration::from_millis(self.yield_interval_ms)
    }
}

fn load(path: Option<&Path>, vars: Option<Map<String, String>>) -> Result<RunnerOptions> {
    let mut builder = Config::builder().add_source(Config::try_from(&RunnerOptions::default())?);
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }
    // DNNRUNNER_TRACE belongs to the logger and lands on an unknown key here.
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .ignore_empty(true)
            .source(vars),
    );
    builder
        .build()
        .and_then(|config| config.try_deserialize())
        .map_err(|err: ConfigError| anyhow::Error::new(err))
        .with_context(|| "load runner options")
}
