use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceMapError {
    #[error("Index error: {0}")]
    IndexError(#[from] crate::index::IndexError),
    #[error("Geocoder error: {0}")]
    GeocodeError(#[from] crate::geocoder::GeocodeError),
    #[error("Region fetch error: {0}")]
    FetchError(#[from] crate::backend::FetchError),
    #[error("Data processing error: {0}")]
    DataProcessing(#[from] voicemap_data_processing::DataError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VoiceMapError>;
