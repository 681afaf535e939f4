use crate::{
    fertilizer::FertilizerRecord,
    solution::{TargetProfile, WaterAnalysis},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct FertilizerCatalogFile {
    pub schema_version: String,
    pub fertilizers: Vec<FertilizerRecord>,
}

#[derive(Debug, Deserialize)]
pub struct CropProfileFile {
    pub schema_version: String,
    pub crop_profiles: Vec<TargetProfile>,
}

#[derive(Debug, Deserialize)]
pub struct WaterAnalysisFile {
    pub schema_version: String,
    pub water_analyses: Vec<WaterAnalysis>,
}
