use serde::{
    Deserialize,
    Serialize,
};

use super::identification::PeptideIdentification;
use super::provenance::{
    DataProcessing,
    DataProcessingHistory,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HullPoint {
    pub rt: f64,
    pub mz: f64,
}

/// Outline of a mass trace, in absolute coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvexHull {
    pub points: Vec<HullPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: u64,
    pub rt: f64,
    pub mz: f64,
    pub intensity: f32,
    #[serde(default)]
    pub charge: i32,
    #[serde(default)]
    pub convex_hulls: Vec<ConvexHull>,
    /// Nested features, e.g. the isotope traces this feature was built from.
    #[serde(default)]
    pub subordinates: Vec<Feature>,
    #[serde(default)]
    pub peptide_ids: Vec<PeptideIdentification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMap {
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub unassigned_peptide_ids: Vec<PeptideIdentification>,
    #[serde(default)]
    pub data_processing: Vec<DataProcessing>,
}

impl DataProcessingHistory for FeatureMap {
    fn data_processing(&self) -> &[DataProcessing] {
        &self.data_processing
    }

    fn data_processing_mut(&mut self) -> &mut Vec<DataProcessing> {
        &mut self.data_processing
    }
}
