use std::path::PathBuf;

/// Loading, saving and locating `config.ron`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid config RON: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("config could not be encoded as RON: {0}")]
    Serialize(#[source] ron::Error),

    /// The platform exposes no configuration directory.
    #[error("no platform configuration directory")]
    NoConfigDir,
}
