//! Serializable definitions for every input the fertiblend engine consumes.
//!
//! These types mirror the YAML files of a knowledge base and the records handed over by
//! external catalog, crop-requirement and water-analysis sources. They carry no behaviour.

pub mod fertilizer;
pub mod file_formats;
pub mod limits;
pub mod solution;
