use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Any failure of a plugin call. All of them abort the analysis.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin '{name}' not found on PATH: {source}")]
    NotFound {
        name: String,
        #[source]
        source: which::Error,
    },

    #[error("unable to start plugin {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to talk to plugin '{plugin}': {source}")]
    Io {
        plugin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("plugin '{plugin}' did not finish within {}s", timeout.as_secs())]
    Timeout { plugin: String, timeout: Duration },

    #[error("plugin '{plugin}' exited with {status}: {stderr}")]
    Failed {
        plugin: String,
        status: String,
        stderr: String,
    },

    #[error("plugin '{plugin}' returned malformed output: {source}; stderr: {stderr}")]
    Malformed {
        plugin: String,
        stderr: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to serialize the model for plugin '{plugin}': {source}")]
    Serialize {
        plugin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("plugin '{plugin}' announced id '{announced}' but its category id is '{category}'")]
    IdMismatch {
        plugin: String,
        announced: String,
        category: String,
    },

    #[error("plugin '{plugin}' scored unknown technical asset: {asset}")]
    UnknownAsset { plugin: String, asset: String },

    #[error("plugin '{plugin}' scored technical asset '{asset}' outside 0..100: {score}")]
    ScoreOutOfRange {
        plugin: String,
        asset: String,
        score: f64,
    },
}
