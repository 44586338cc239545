use std::fmt;
use std::io;

/// Error type for loading and validating cache activity data
#[derive(Debug)]
pub enum CachelyticsError {
    /// File I/O error
    Io(io::Error),
    /// JSON parse error
    JsonParse {
        file_path: String,
        line_number: usize,
        source: serde_json::Error,
    },
    /// Date parse error
    DateParse {
        input: String,
        expected_format: String,
    },
    /// Validation error
    Validation { field: String, message: String },
    /// Captured activity data not found
    DataNotFound { path: String },
}

impl fmt::Display for CachelyticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachelyticsError::Io(err) => write!(f, "I/O error: {}", err),
            CachelyticsError::JsonParse {
                file_path,
                line_number,
                source,
            } => write!(
                f,
                "JSON parse error in {} at line {}: {}",
                file_path, line_number, source
            ),
            CachelyticsError::DateParse {
                input,
                expected_format,
            } => write!(
                f,
                "Date parse error: '{}' (expected format: {})",
                input, expected_format
            ),
            CachelyticsError::Validation { field, message } => {
                write!(f, "Validation error in field '{}': {}", field, message)
            }
            CachelyticsError::DataNotFound { path } => {
                write!(f, "Cache activity data not found: {}", path)
            }
        }
    }
}

impl std::error::Error for CachelyticsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CachelyticsError::Io(err) => Some(err),
            CachelyticsError::JsonParse { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for CachelyticsError {
    fn from(err: io::Error) -> Self {
        CachelyticsError::Io(err)
    }
}

impl From<serde_json::Error> for CachelyticsError {
    fn from(err: serde_json::Error) -> Self {
        CachelyticsError::JsonParse {
            file_path: "unknown".to_string(),
            line_number: 0,
            source: err,
        }
    }
}

pub type Result<T> = std::result::Result<T, CachelyticsError>;

impl CachelyticsError {
    pub fn json_parse_error(
        file_path: &str,
        line_number: usize,
        source: serde_json::Error,
    ) -> Self {
        Self::JsonParse {
            file_path: file_path.to_string(),
            line_number,
            source,
        }
    }

    pub fn date_parse_error(input: &str, expected_format: &str) -> Self {
        Self::DateParse {
            input: input.to_string(),
            expected_format: expected_format.to_string(),
        }
    }

    pub fn validation_error(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn data_not_found(path: &str) -> Self {
        Self::DataNotFound {
            path: path.to_string(),
        }
    }
}

/// Longer explanation for the CLI error path
impl CachelyticsError {
    pub fn detailed_message(&self) -> String {
        match self {
            CachelyticsError::JsonParse {
                file_path,
                line_number,
                source,
            } => format!(
                "Failed to parse JSON in file '{}' at line {}\nError: {}\nThe capture is probably truncated or not a gateway activity export.",
                file_path, line_number, source
            ),
            CachelyticsError::DataNotFound { path } => format!(
                "No cache activity data at '{}'\nPoint --path (or `config --set-path`) at a captured activity export:\n- a .json file holding an array of rows\n- a .jsonl file with one row per line\n- a directory of YYYY-MM-DD.json daily captures",
                path
            ),
            _ => self.to_string(),
        }
    }
}
