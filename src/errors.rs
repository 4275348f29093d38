/// Errors raised by the knapsack solver and its configuration surfaces.
///
/// `InvalidConfiguration` is the only kind the solver itself produces: every
/// precondition is checked before the first generation runs.
#[derive(Debug, thiserror::Error)]
pub enum KnapsackError {
    #[error("InvalidConfiguration: {0}")]
    InvalidConfiguration(String),
    #[error("Io: {0}")]
    Io(#[from] std::io::Error),
}

impl KnapsackError {
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        KnapsackError::InvalidConfiguration(msg.into())
    }

    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, KnapsackError::InvalidConfiguration(_))
    }
}

impl From<serde_json::Error> for KnapsackError {
    fn from(e: serde_json::Error) -> Self {
        KnapsackError::InvalidConfiguration(format!("malformed payload: {}", e))
    }
}

impl From<serde_yaml::Error> for KnapsackError {
    fn from(e: serde_yaml::Error) -> Self {
        KnapsackError::InvalidConfiguration(format!("malformed parameter file: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, KnapsackError>;
