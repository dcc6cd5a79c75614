use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeptideHit {
    pub sequence: String,
    pub score: f64,
    #[serde(default)]
    pub charge: i32,
}

/// Search results for one spectrum.
///
/// `rt` is optional; records without one are left alone by every transformation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeptideIdentification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mz: Option<f64>,
    #[serde(default)]
    pub score_type: String,
    #[serde(default)]
    pub hits: Vec<PeptideHit>,
    /// Run of origin, set for identifications inside a consensus map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_index: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProteinIdentification {
    pub search_engine: String,
    #[serde(default)]
    pub accessions: Vec<String>,
}

/// Protein and peptide identifications of one search.
///
/// Has no processing history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentificationList {
    #[serde(default)]
    pub protein_ids: Vec<ProteinIdentification>,
    #[serde(default)]
    pub peptide_ids: Vec<PeptideIdentification>,
}
