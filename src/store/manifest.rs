//! End-of-run prune and the run manifest.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::geometry::{Rotation, Shape};
use crate::registry::{RegionId, RegionOrigin, RegionRecord, TypeId, TypeOrigin};

use super::ConfigurationStore;

/// One snapshot in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotSummary {
    /// Snapshot time.
    pub time: f64,
    /// blake3 digest of the layout.
    pub fingerprint: String,
    /// Number of assemblies per type name.
    pub type_counts: BTreeMap<String, usize>,
}

/// One assembly type in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSummary {
    /// Handle.
    pub id: TypeId,
    /// Display name.
    pub name: String,
    /// Provenance.
    pub origin: TypeOrigin,
    /// Region name per coarse bin.
    pub config: Vec<String>,
}

/// What a finished run produced, for downstream writers and audit logs.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    /// Fresh id of this run.
    pub run_id: Uuid,
    /// Id of the schedule that was run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_id: Option<Uuid>,
    /// Wall-clock time of `finalize`.
    pub generated_at: DateTime<Utc>,
    /// Assembly shape.
    pub shape: Shape,
    /// Sector symmetry.
    pub rotation: Rotation,
    /// Number of assembly positions.
    pub assemblies: usize,
    /// Coarse axial boundaries.
    pub zcuts: Vec<f64>,
    /// Snapshots in time order.
    pub snapshots: Vec<SnapshotSummary>,
    /// Surviving assembly types.
    pub types: Vec<TypeSummary>,
    /// Surviving regions.
    pub regions: Vec<RegionRecord>,
    /// Types removed by the prune.
    pub pruned_types: usize,
    /// Regions removed by the prune.
    pub pruned_regions: usize,
}

impl ConfigurationStore {
    /// Drops every type and region no snapshot refers to and seals the
    /// store.
    ///
    /// Types placed in a snapshot are kept together with the user type they
    /// derive from; regions used by kept types are kept together with the
    /// components and bases they derive from. Ids are never renumbered.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Finalized` if called twice.
    pub fn finalize(&mut self) -> CoreResult<RunManifest> {
        self.ensure_open()?;

        let mut keep_types: HashSet<TypeId> = HashSet::new();
        for (_, grid) in self.snapshots.iter() {
            keep_types.extend(grid.cells().iter().filter_map(|&v| TypeId::from_cell(v)));
        }
        let roots: Vec<TypeId> = keep_types.iter().map(|&id| self.types.root_of(id)).collect();
        keep_types.extend(roots);

        let mut pending: Vec<RegionId> = Vec::new();
        for id in &keep_types {
            if let Some(projection) = self.projections.get(id) {
                pending.extend_from_slice(projection.config());
            }
            if let Some(cuts) = self.cuts.get(id) {
                pending.extend(cuts.cuts().iter().filter_map(|c| self.regions.id(&c.region)));
            }
        }
        let mut keep_regions: HashSet<RegionId> = HashSet::new();
        while let Some(id) = pending.pop() {
            if !keep_regions.insert(id) {
                continue;
            }
            match self.regions.record(id).map(|r| &r.origin) {
                Some(RegionOrigin::Mixture { components, .. }) => {
                    pending.extend(components.iter().map(|(c, _)| *c));
                }
                Some(RegionOrigin::Perturbed { base, .. }) => pending.push(*base),
                _ => {}
            }
        }

        let pruned_types = self.types.prune(&keep_types);
        let pruned_regions = self.regions.prune(&keep_regions);
        self.cuts.retain(|id, _| keep_types.contains(id));
        self.projections.retain(|id, _| keep_types.contains(id));
        self.materials.retain(|id, _| keep_regions.contains(id));
        self.finalized = true;

        info!(
            types = self.types.len(),
            regions = self.regions.len(),
            pruned_types,
            pruned_regions,
            snapshots = self.snapshots.len(),
            "finalized configuration"
        );
        Ok(self.manifest(pruned_types, pruned_regions))
    }

    fn manifest(&self, pruned_types: usize, pruned_regions: usize) -> RunManifest {
        let snapshots = self
            .snapshots
            .iter()
            .map(|(t, grid)| {
                let mut type_counts = BTreeMap::new();
                for id in grid.cells().iter().filter_map(|&v| TypeId::from_cell(v)) {
                    let name = self.types.name(id).unwrap_or_default().to_string();
                    *type_counts.entry(name).or_insert(0) += 1;
                }
                SnapshotSummary {
                    time: t.value(),
                    fingerprint: grid.fingerprint(),
                    type_counts,
                }
            })
            .collect();
        let types = self
            .types
            .iter()
            .map(|r| TypeSummary {
                id: r.id,
                name: r.name.clone(),
                origin: r.origin.clone(),
                config: self
                    .projections
                    .get(&r.id)
                    .map(|p| p.config_str().to_vec())
                    .unwrap_or_default(),
            })
            .collect();

        RunManifest {
            run_id: Uuid::new_v4(),
            schedule_id: self.schedule_id,
            generated_at: Utc::now(),
            shape: self.lattice.shape(),
            rotation: self.lattice.rotation(),
            assemblies: self.lattice.len(),
            zcuts: self.coarse.zcuts().to_vec(),
            snapshots,
            types,
            regions: self.regions.iter().cloned().collect(),
            pruned_types,
            pruned_regions,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::axial::{AxialCut, ZRange};
    use crate::geometry::{AssemblyGeometry, Rotation, Shape};
    use crate::grid::CoreGrid;
    use crate::ir::ReplaceAxialPayload;
    use crate::lattice::Numbering;
    use crate::store::{ConfigurationStore, CoreBuilder};
    use crate::{ConfigurationError, CoreError};

    fn store() -> ConfigurationStore {
        CoreBuilder::new()
            .geometry(AssemblyGeometry::new(Shape::Square, 1.0).unwrap())
            .rotation(Rotation::Full)
            .sector(CoreGrid::from_rows(vec![vec![1, 1], vec![1, 2]]).unwrap())
            .assembly_type("A", vec![AxialCut::new("fuel", "", 0.0, 10.0)])
            .assembly_type("B", vec![AxialCut::new("refl", "", 0.0, 10.0)])
            .assembly_type("C", vec![AxialCut::new("clad", "", 0.0, 10.0)])
            .region("b4c")
            .zcuts(vec![0.0, 5.0, 10.0])
            .build()
            .unwrap()
    }

    #[test]
    fn unreferenced_entries_are_pruned_without_renumbering() {
        let mut s = store();
        let request = ReplaceAxialPayload {
            which: vec![vec![1]],
            locations: vec![ZRange {
                lower: 0.0,
                upper: 5.0,
            }],
            with: vec!["b4c".to_string()],
            numbering: Numbering::Library,
            at: 1.0,
        };
        s.replace_axial(&request).unwrap();
        let manifest = s.finalize().unwrap();

        // C and its region never appear in a snapshot.
        assert!(s.type_id("C").is_none());
        assert!(s.region_id("clad").is_none());
        assert_eq!(manifest.pruned_types, 1);
        assert_eq!(manifest.pruned_regions, 1);
        let derived = s.type_id("A-1repl").unwrap();
        assert_eq!(derived.get(), 4);
        assert_eq!(manifest.snapshots.len(), 2);
        assert_eq!(manifest.snapshots[1].type_counts["A-1repl"], 1);
        assert_eq!(manifest.assemblies, 4);
    }

    #[test]
    fn finalized_store_rejects_mutation() {
        let mut s = store();
        s.finalize().unwrap();
        let a = s.type_id("A").unwrap();
        let err = s.replace(a, &[1], Numbering::Library, 1.0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Configuration(ConfigurationError::Finalized)
        ));
        assert!(s.finalize().is_err());
        assert!(s.is_finalized());
    }

    #[test]
    fn manifest_serializes() {
        let mut s = store();
        let manifest = s.finalize().unwrap();
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["shape"], "square");
        assert_eq!(json["snapshots"][0]["fingerprint"].as_str().unwrap().len(), 64);
        assert!(json.get("schedule_id").is_none());
    }
}
