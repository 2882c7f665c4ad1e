use thiserror::Error;

#[derive(Error, Debug)]
/// Error types for the **basil** library
pub enum BasilError {
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("LP kernel error: {0}")]
    Kernel(String),

    #[error("Q-metric matrix is not invertible (zero pivot at row {0})")]
    NonInvertibleMatrix(usize),

    #[error("invalid cobasis: {0}")]
    OutOfRange(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
