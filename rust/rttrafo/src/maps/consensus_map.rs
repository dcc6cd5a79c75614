use std::collections::BTreeMap;

use serde::{
    Deserialize,
    Serialize,
};

use super::identification::PeptideIdentification;
use super::provenance::{
    DataProcessing,
    DataProcessingHistory,
};

/// One run that contributed to a consensus map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileDescription {
    pub filename: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub size: usize,
}

/// Reference to the feature a run contributed to a consensus group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureHandle {
    /// Run the feature came from; key into `file_descriptions`.
    pub map_index: u32,
    pub unique_id: u64,
    pub rt: f64,
    pub mz: f64,
    pub intensity: f32,
}

/// Features from different runs believed to be the same analyte.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsensusFeature {
    pub id: u64,
    pub rt: f64,
    pub mz: f64,
    pub intensity: f32,
    #[serde(default)]
    pub handles: Vec<FeatureHandle>,
    #[serde(default)]
    pub peptide_ids: Vec<PeptideIdentification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsensusMap {
    #[serde(default)]
    pub file_descriptions: BTreeMap<u32, FileDescription>,
    #[serde(default)]
    pub consensus_features: Vec<ConsensusFeature>,
    #[serde(default)]
    pub unassigned_peptide_ids: Vec<PeptideIdentification>,
    #[serde(default)]
    pub data_processing: Vec<DataProcessing>,
}

impl DataProcessingHistory for ConsensusMap {
    fn data_processing(&self) -> &[DataProcessing] {
        &self.data_processing
    }

    fn data_processing_mut(&mut self) -> &mut Vec<DataProcessing> {
        &mut self.data_processing
    }
}
