use serde::{
    Deserialize,
    Serialize,
};

use super::provenance::{
    DataProcessing,
    DataProcessingHistory,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Precursor {
    pub mz: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge: Option<i32>,
}

/// A single scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub native_id: String,
    pub ms_level: u8,
    /// Retention time in seconds.
    pub rt: f64,
    #[serde(default)]
    pub precursors: Vec<Precursor>,
    #[serde(default)]
    pub mz_array: Vec<f64>,
    #[serde(default)]
    pub intensity_array: Vec<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChromatogramPeak {
    pub rt: f64,
    pub intensity: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chromatogram {
    pub native_id: String,
    #[serde(default)]
    pub peaks: Vec<ChromatogramPeak>,
}

/// Raw (peak) data of one run: scans in acquisition order plus chromatograms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    #[serde(default)]
    pub spectra: Vec<Spectrum>,
    #[serde(default)]
    pub chromatograms: Vec<Chromatogram>,
    #[serde(default)]
    pub data_processing: Vec<DataProcessing>,
}

impl DataProcessingHistory for Experiment {
    fn data_processing(&self) -> &[DataProcessing] {
        &self.data_processing
    }

    fn data_processing_mut(&mut self) -> &mut Vec<DataProcessing> {
        &mut self.data_processing
    }
}
