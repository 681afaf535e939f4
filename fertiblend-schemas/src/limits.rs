use serde::{Deserialize, Serialize};

/// Per-fertilizer dosage window in g/L. Either side may be open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DosageLimit {
    pub fertilizer: String,
    #[serde(default)]
    pub min_g_per_l: Option<f64>,
    #[serde(default)]
    pub max_g_per_l: Option<f64>,
}
