//! Rewrites every retention time carried by a record collection.
//!
//! Each shape lists its retention time fields through [`RtFields`]; the single
//! rule (replace each value with the model's output, touch nothing else) lives
//! in [`apply_transformation`].

use tracing::debug;

use crate::description::TransformationDescription;
use crate::errors::TransformationError;
use crate::maps::{
    ConsensusMap,
    Experiment,
    Feature,
    FeatureMap,
    IdentificationList,
    PeptideIdentification,
    RecordCollection,
};

/// Visits every retention time of a collection, always in the same order.
pub trait RtFields {
    fn visit_rt_mut(&mut self, visit: &mut dyn FnMut(&mut f64));
}

/// Maps every retention time visited by `target` through `trafo`.
///
/// All values are evaluated before any is written, so on error (no model, or
/// a value the model refuses to extrapolate) `target` is left untouched.
/// Returns the number of values rewritten.
pub fn apply_transformation<T: RtFields + ?Sized>(
    target: &mut T,
    trafo: &TransformationDescription,
) -> Result<usize, TransformationError> {
    let model = trafo.model().ok_or(TransformationError::NoModel)?;

    let mut mapped = Vec::new();
    let mut first_err = None;
    target.visit_rt_mut(&mut |rt| {
        if first_err.is_some() {
            return;
        }
        match model.evaluate(*rt) {
            Ok(v) => mapped.push(v),
            Err(e) => first_err = Some(e),
        }
    });
    if let Some(e) = first_err {
        return Err(e);
    }

    let mut values = mapped.iter();
    target.visit_rt_mut(&mut |rt| {
        if let Some(v) = values.next() {
            *rt = *v;
        }
    });
    Ok(mapped.len())
}

impl RtFields for Experiment {
    fn visit_rt_mut(&mut self, visit: &mut dyn FnMut(&mut f64)) {
        for spectrum in self.spectra.iter_mut() {
            visit(&mut spectrum.rt);
        }
        for chrom in self.chromatograms.iter_mut() {
            for peak in chrom.peaks.iter_mut() {
                visit(&mut peak.rt);
            }
        }
    }
}

fn visit_feature(feature: &mut Feature, visit: &mut dyn FnMut(&mut f64)) {
    visit(&mut feature.rt);
    for hull in feature.convex_hulls.iter_mut() {
        for point in hull.points.iter_mut() {
            visit(&mut point.rt);
        }
    }
    for sub in feature.subordinates.iter_mut() {
        visit_feature(sub, visit);
    }
    visit_peptide_ids(&mut feature.peptide_ids, visit);
}

fn visit_peptide_ids(ids: &mut [PeptideIdentification], visit: &mut dyn FnMut(&mut f64)) {
    for rt in ids.iter_mut().filter_map(|id| id.rt.as_mut()) {
        visit(rt);
    }
}

impl RtFields for FeatureMap {
    fn visit_rt_mut(&mut self, visit: &mut dyn FnMut(&mut f64)) {
        for feature in self.features.iter_mut() {
            visit_feature(feature, visit);
        }
        visit_peptide_ids(&mut self.unassigned_peptide_ids, visit);
    }
}

impl RtFields for IdentificationList {
    fn visit_rt_mut(&mut self, visit: &mut dyn FnMut(&mut f64)) {
        visit_peptide_ids(&mut self.peptide_ids, visit);
    }
}

/// The part of a consensus map that belongs to one run.
///
/// Only feature handles and peptide identifications tagged with `map_index`
/// are visited. The consensus-level retention time is left as is.
pub struct ConsensusRun<'a> {
    pub map: &'a mut ConsensusMap,
    pub map_index: u32,
}

impl RtFields for ConsensusRun<'_> {
    fn visit_rt_mut(&mut self, visit: &mut dyn FnMut(&mut f64)) {
        let map_index = self.map_index;
        let in_run = |id: &&mut PeptideIdentification| id.map_index == Some(map_index);
        for cf in self.map.consensus_features.iter_mut() {
            for handle in cf.handles.iter_mut().filter(|h| h.map_index == map_index) {
                visit(&mut handle.rt);
            }
            for rt in cf
                .peptide_ids
                .iter_mut()
                .filter(in_run)
                .filter_map(|id| id.rt.as_mut())
            {
                visit(rt);
            }
        }
        for rt in self
            .map
            .unassigned_peptide_ids
            .iter_mut()
            .filter(in_run)
            .filter_map(|id| id.rt.as_mut())
        {
            visit(rt);
        }
    }
}

pub fn transform_experiment(
    map: &mut Experiment,
    trafo: &TransformationDescription,
) -> Result<usize, TransformationError> {
    let n = apply_transformation(map, trafo)?;
    debug!("Transformed {} retention times in experiment", n);
    Ok(n)
}

/// Transforms features, their hulls, their subordinates (recursively) and
/// every attached identification.
pub fn transform_feature_map(
    map: &mut FeatureMap,
    trafo: &TransformationDescription,
) -> Result<usize, TransformationError> {
    let n = apply_transformation(map, trafo)?;
    debug!("Transformed {} retention times in feature map", n);
    Ok(n)
}

/// Transforms only the entries of `map` that came from run `map_index`.
pub fn transform_consensus_map(
    map: &mut ConsensusMap,
    trafo: &TransformationDescription,
    map_index: u32,
) -> Result<usize, TransformationError> {
    let n = apply_transformation(&mut ConsensusRun { map, map_index }, trafo)?;
    debug!(
        "Transformed {} retention times of run {} in consensus map",
        n, map_index
    );
    Ok(n)
}

pub fn transform_identifications(
    ids: &mut IdentificationList,
    trafo: &TransformationDescription,
) -> Result<usize, TransformationError> {
    let n = apply_transformation(ids, trafo)?;
    debug!("Transformed {} retention times in identifications", n);
    Ok(n)
}

/// Dispatches to the matching per-shape function. `map_index` is only read for
/// consensus maps.
pub fn transform_collection(
    collection: &mut RecordCollection,
    trafo: &TransformationDescription,
    map_index: u32,
) -> Result<usize, TransformationError> {
    match collection {
        RecordCollection::Experiment(x) => transform_experiment(x, trafo),
        RecordCollection::FeatureMap(x) => transform_feature_map(x, trafo),
        RecordCollection::ConsensusMap(x) => transform_consensus_map(x, trafo, map_index),
        RecordCollection::Identifications(x) => transform_identifications(x, trafo),
    }
}
