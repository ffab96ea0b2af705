use thiserror::Error;

/// Hard failures only. Provider and model trouble never surfaces here; it is
/// absorbed into degraded signals and the fallback analysis instead.
#[derive(Error, Debug)]
pub enum CrisisError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
