//! In-memory shapes of the record collections a transformation is applied to.

mod consensus_map;
mod experiment;
mod feature_map;
mod identification;
pub mod provenance;

pub use consensus_map::{
    ConsensusFeature,
    ConsensusMap,
    FeatureHandle,
    FileDescription,
};
pub use experiment::{
    Chromatogram,
    ChromatogramPeak,
    Experiment,
    Precursor,
    Spectrum,
};
pub use feature_map::{
    ConvexHull,
    Feature,
    FeatureMap,
    HullPoint,
};
pub use identification::{
    IdentificationList,
    PeptideHit,
    PeptideIdentification,
    ProteinIdentification,
};
pub use provenance::{
    DataProcessing,
    DataProcessingHistory,
    ProcessingAction,
    Software,
};

use crate::io::FormatKind;

/// Any of the collection shapes, as loaded from a data file.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordCollection {
    Experiment(Experiment),
    FeatureMap(FeatureMap),
    ConsensusMap(ConsensusMap),
    Identifications(IdentificationList),
}

impl RecordCollection {
    pub fn format_kind(&self) -> FormatKind {
        match self {
            Self::Experiment(_) => FormatKind::Experiment,
            Self::FeatureMap(_) => FormatKind::FeatureMap,
            Self::ConsensusMap(_) => FormatKind::ConsensusMap,
            Self::Identifications(_) => FormatKind::Identifications,
        }
    }

    /// Processing history of the collection, `None` for identification lists.
    pub fn history_mut(&mut self) -> Option<&mut dyn DataProcessingHistory> {
        match self {
            Self::Experiment(x) => Some(x),
            Self::FeatureMap(x) => Some(x),
            Self::ConsensusMap(x) => Some(x),
            Self::Identifications(_) => None,
        }
    }
}
