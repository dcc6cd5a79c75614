//! Processing history attached to transformed collections.

use std::collections::BTreeMap;

use chrono::{
    SecondsFormat,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Software {
    pub name: String,
    pub version: String,
}

impl Software {
    /// This crate, at the version it was built with.
    pub fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingAction {
    /// Retention time alignment.
    Alignment,
    Other(String),
}

/// A single processing step in a collection's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataProcessing {
    pub software: Software,
    pub actions: Vec<ProcessingAction>,
    /// RFC 3339 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl DataProcessing {
    /// Alignment step completed now, by this crate.
    pub fn alignment(parameters: BTreeMap<String, String>) -> Self {
        Self {
            software: Software::current(),
            actions: vec![ProcessingAction::Alignment],
            completion_time: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
            parameters,
        }
    }
}

/// Collections that keep a list of the processing steps applied to them.
pub trait DataProcessingHistory {
    fn data_processing(&self) -> &[DataProcessing];
    fn data_processing_mut(&mut self) -> &mut Vec<DataProcessing>;

    fn add_data_processing(&mut self, step: DataProcessing) {
        self.data_processing_mut().push(step);
    }
}
