use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("failed to open database connection: {0}")]
    Connect(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("failed to scan column {column}: {reason}")]
    Scan { column: usize, reason: String },
    #[error("division by zero computing {0}")]
    DivisionByZero(&'static str),
    #[error("inconsistent label cardinality for {name}: expected {expected} values, got {actual}")]
    LabelCardinality {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("metric sink closed")]
    SinkClosed,
    #[error("invalid data source name: {0}")]
    InvalidDsn(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ExporterError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::Query(_) => "query",
            Self::Scan { .. } => "scan",
            Self::DivisionByZero(_) => "division_by_zero",
            Self::LabelCardinality { .. } => "label_cardinality",
            Self::SinkClosed => "sink_closed",
            Self::InvalidDsn(_) => "invalid_dsn",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::InternalError(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;
