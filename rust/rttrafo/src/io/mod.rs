//! Persistence of transformations and record collections.
//!
//! File types are recognised from the file name alone:
//!
//! | suffix             | content                                         |
//! |--------------------|-------------------------------------------------|
//! | `.experiment.json` | [`Experiment`](crate::maps::Experiment)         |
//! | `.features.json`   | [`FeatureMap`](crate::maps::FeatureMap)         |
//! | `.consensus.json`  | [`ConsensusMap`](crate::maps::ConsensusMap)     |
//! | `.ids.json`        | [`IdentificationList`](crate::maps::IdentificationList) |
//! | `.trafo.json`      | [`TransformationDescription`] as JSON           |
//! | `.trafoxml`        | [`TransformationDescription`] as TrafoXML       |
//!
//! Matching is case insensitive.

mod json;
mod trafo_xml;

use std::fmt::Display;
use std::fs::File;
use std::io::{
    BufReader,
    BufWriter,
};
use std::path::Path;

use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

use crate::description::TransformationDescription;
use crate::errors::StoreError;
use crate::maps::RecordCollection;
use json::{
    read_json,
    write_json,
};
use trafo_xml::{
    TrafoXmlError,
    read_trafo_xml,
    write_trafo_xml,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatKind {
    Experiment,
    FeatureMap,
    ConsensusMap,
    Identifications,
    Transformation,
}

impl FormatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Experiment => "experiment",
            Self::FeatureMap => "feature map",
            Self::ConsensusMap => "consensus map",
            Self::Identifications => "identification",
            Self::Transformation => "transformation",
        }
    }
}

impl Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const SUFFIXES: [(&str, FormatKind); 6] = [
    (".experiment.json", FormatKind::Experiment),
    (".features.json", FormatKind::FeatureMap),
    (".consensus.json", FormatKind::ConsensusMap),
    (".ids.json", FormatKind::Identifications),
    (".trafo.json", FormatKind::Transformation),
    (".trafoxml", FormatKind::Transformation),
];

/// Determines the kind of file at `path` from its name.
pub fn classify(path: &Path) -> Option<FormatKind> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    SUFFIXES
        .iter()
        .find(|(suffix, _)| name.ends_with(suffix))
        .map(|(_, kind)| *kind)
}

fn is_trafo_xml(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.to_ascii_lowercase().ends_with(".trafoxml"))
}

/// Loads and stores transformation descriptions.
pub trait TransformationStore {
    fn load_transformation(&self, path: &Path) -> Result<TransformationDescription, StoreError>;
    fn store_transformation(
        &self,
        path: &Path,
        trafo: &TransformationDescription,
    ) -> Result<(), StoreError>;
}

/// Loads and stores record collections of any supported shape.
pub trait CollectionStore {
    fn classify(&self, path: &Path) -> Option<FormatKind> {
        classify(path)
    }
    fn load_collection(&self, path: &Path) -> Result<RecordCollection, StoreError>;
    fn store_collection(
        &self,
        path: &Path,
        collection: &RecordCollection,
    ) -> Result<(), StoreError>;
}

/// Reads and writes files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl TransformationStore for FileStore {
    fn load_transformation(&self, path: &Path) -> Result<TransformationDescription, StoreError> {
        if classify(path) != Some(FormatKind::Transformation) {
            return Err(StoreError::UnsupportedFormat {
                path: path.to_path_buf(),
                expected: Some(FormatKind::Transformation),
            });
        }
        let trafo = if is_trafo_xml(path) {
            let file = File::open(path).map_err(|e| StoreError::Io {
                source: e,
                path: path.to_path_buf(),
            })?;
            read_trafo_xml(BufReader::new(file)).map_err(|e| match e {
                TrafoXmlError::Malformed(msg) => StoreError::Parse {
                    msg,
                    path: path.to_path_buf(),
                },
                TrafoXmlError::Fit(source) => StoreError::InvalidTransformation {
                    source,
                    path: path.to_path_buf(),
                },
            })?
        } else {
            read_json(path)?
        };
        debug!(
            "Loaded transformation from {} ({} pairs, model: {:?})",
            path.display(),
            trafo.sample_count(),
            trafo.model_kind()
        );
        Ok(trafo)
    }

    fn store_transformation(
        &self,
        path: &Path,
        trafo: &TransformationDescription,
    ) -> Result<(), StoreError> {
        if classify(path) != Some(FormatKind::Transformation) {
            return Err(StoreError::UnsupportedFormat {
                path: path.to_path_buf(),
                expected: Some(FormatKind::Transformation),
            });
        }
        if is_trafo_xml(path) {
            let io_err = |e: std::io::Error| StoreError::Io {
                source: e,
                path: path.to_path_buf(),
            };
            let file = File::create(path).map_err(io_err)?;
            write_trafo_xml(BufWriter::new(file), trafo).map_err(io_err)?;
        } else {
            write_json(path, trafo)?;
        }
        debug!("Wrote transformation to {}", path.display());
        Ok(())
    }
}

impl CollectionStore for FileStore {
    fn load_collection(&self, path: &Path) -> Result<RecordCollection, StoreError> {
        let collection = match classify(path) {
            Some(FormatKind::Experiment) => RecordCollection::Experiment(read_json(path)?),
            Some(FormatKind::FeatureMap) => RecordCollection::FeatureMap(read_json(path)?),
            Some(FormatKind::ConsensusMap) => RecordCollection::ConsensusMap(read_json(path)?),
            Some(FormatKind::Identifications) => {
                RecordCollection::Identifications(read_json(path)?)
            }
            Some(FormatKind::Transformation) | None => {
                return Err(StoreError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    expected: None,
                });
            }
        };
        debug!("Loaded {} from {}", collection.format_kind(), path.display());
        Ok(collection)
    }

    /// The file name has to match the shape of `collection`.
    fn store_collection(
        &self,
        path: &Path,
        collection: &RecordCollection,
    ) -> Result<(), StoreError> {
        let expected = collection.format_kind();
        if classify(path) != Some(expected) {
            return Err(StoreError::UnsupportedFormat {
                path: path.to_path_buf(),
                expected: Some(expected),
            });
        }
        match collection {
            RecordCollection::Experiment(x) => write_json(path, x)?,
            RecordCollection::FeatureMap(x) => write_json(path, x)?,
            RecordCollection::ConsensusMap(x) => write_json(path, x)?,
            RecordCollection::Identifications(x) => write_json(path, x)?,
        }
        debug!("Wrote {} to {}", expected, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn classifies_by_suffix() {
        let cases = [
            ("run1.experiment.json", Some(FormatKind::Experiment)),
            ("/data/run1.Features.JSON", Some(FormatKind::FeatureMap)),
            ("all.consensus.json", Some(FormatKind::ConsensusMap)),
            ("search.ids.json", Some(FormatKind::Identifications)),
            ("run1.trafo.json", Some(FormatKind::Transformation)),
            ("run1.trafoXML", Some(FormatKind::Transformation)),
            ("run1.json", None),
            ("run1.mzML", None),
            ("", None),
        ];
        for (name, expected) in cases {
            assert_eq!(classify(&PathBuf::from(name)), expected, "{}", name);
        }
    }

    #[test]
    fn unsupported_collection_path_is_rejected_before_io() {
        let err = FileStore
            .load_collection(Path::new("/does/not/exist/run.mzML"))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnsupportedFormat { expected: None, .. }
        ));
    }

    #[test]
    fn mismatched_output_suffix_is_rejected() {
        let err = FileStore
            .store_collection(
                Path::new("/does/not/exist/out.features.json"),
                &RecordCollection::Identifications(Default::default()),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnsupportedFormat {
                expected: Some(FormatKind::Identifications),
                ..
            }
        ));
    }

    #[test]
    fn missing_transformation_file_reports_path() {
        let path = Path::new("/does/not/exist/run.trafo.json");
        let err = FileStore.load_transformation(path).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(err.path(), path);
    }
}
