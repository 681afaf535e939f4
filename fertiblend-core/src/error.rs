use thiserror::Error;

#[derive(Debug, Error)]
pub enum FertiblendError {
    #[error("No composition found for fertilizer '{name}' (formula hint: {formula:?})")]
    CompositionNotFound {
        name: String,
        formula: Option<String>,
    },

    #[error("Invalid composition for '{name}': {reason}")]
    InvalidComposition { name: String, reason: String },

    #[error("Invalid dosage limit for '{fertilizer}': {reason}")]
    InvalidDosageLimit { fertilizer: String, reason: String },

    #[error("At least one fertilizer must be provided for the calculation")]
    NoFertilizers,

    /// The chosen backend produced no feasible optimum. No partial dosages are returned.
    #[error(
        "Optimization failed ({backend} backend, status {status}): {reason} \
         [{elements} element constraints, {fertilizers} fertilizers]"
    )]
    OptimizationFailed {
        backend: String,
        status: String,
        reason: String,
        elements: usize,
        fertilizers: usize,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error for file '{0}': {1}")]
    FileIO(String, #[source] std::io::Error),

    #[error("Failed to parse YAML from '{0}': {1}")]
    YamlParsing(String, #[source] serde_yaml::Error),

    #[error("Failed to serialize JSON: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("Failed to process CSV file '{0}': {1}")]
    CsvError(String, #[source] csv::Error),
}
