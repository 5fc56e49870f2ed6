use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("unknown dataset shape '{0}', expected 'random', 'even' or 'stacked'")]
    UnknownShape(String),
}

pub type Result<T> = std::result::Result<T, BenchError>;
