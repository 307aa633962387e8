//! Mutation operators of the configuration store.
//!
//! Every operator resolves its targets against the layout in force at the
//! requested time, derives new assembly types and regions where needed
//! (reusing identical earlier derivations) and finally places types with
//! [`ConfigurationStore::replace`].

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::axial::{self, AxialCuts, ZRange};
use crate::error::{ConfigurationError, CoreResult};
use crate::ir::{
    Operation, PerturbPayload, ReplaceAxialPayload, ReplacePayload, Schedule, TranslatePayload,
};
use crate::lattice::Numbering;
use crate::material::Perturbation;
use crate::registry::{Derivation, RegionId, RegionOrigin, TypeId};
use crate::time::TimeInstant;

use super::ConfigurationStore;

impl ConfigurationStore {
    /// Places `type_id` at `assemblies` in the snapshot at `at`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown types, ids out of range, invalid or
    /// sealed times. The store is unchanged on error.
    pub fn replace(
        &mut self,
        type_id: TypeId,
        assemblies: &[u32],
        numbering: Numbering,
        at: f64,
    ) -> CoreResult<()> {
        self.ensure_open()?;
        if !self.types.contains(type_id) {
            return Err(ConfigurationError::UnknownTypeId { id: type_id.get() }.into());
        }
        let t = TimeInstant::new(at)?;
        let cells = self
            .lattice
            .library_ids(assemblies, numbering)?
            .into_iter()
            .map(|lib| self.lattice.cell_of(lib))
            .collect::<Result<Vec<_>, _>>()?;
        self.snapshots.edit(t, |grid| {
            for &(row, col) in &cells {
                grid.set(row, col, type_id.cell_value());
            }
            Ok(())
        })?;
        info!(
            assembly_type = self.types.name(type_id).unwrap_or_default(),
            assemblies = cells.len(),
            %t,
            "replaced assemblies"
        );
        Ok(())
    }

    /// [`replace`](Self::replace) by type name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::UnknownAssemblyType` for unknown names.
    pub fn replace_named(&mut self, request: &ReplacePayload) -> CoreResult<()> {
        request.validate()?;
        let type_id = self.types.id(&request.assembly_type).ok_or_else(|| {
            ConfigurationError::UnknownAssemblyType {
                name: request.assembly_type.clone(),
            }
        })?;
        self.replace(type_id, &request.assemblies, request.numbering, request.at)
    }

    /// Substitutes the region filling each `where` location of the targeted
    /// assemblies.
    ///
    /// A location must match a run of coarse bins or one fine cut of the
    /// assembly type. Each affected type gets a derived type whose cuts
    /// carry the new region; the derived type is then placed at the
    /// targeted positions.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::LengthMismatch`, `UnknownRegion` or
    /// `LocationNotFound`, or a `HomogenizationError` if the new cuts do
    /// not project cleanly.
    pub fn replace_axial(&mut self, request: &ReplaceAxialPayload) -> CoreResult<()> {
        self.ensure_open()?;
        request.validate()?;
        let t = TimeInstant::new(request.at)?;
        self.snapshots.check_open(t)?;
        for ((which, location), with) in request.which.iter().zip(&request.locations).zip(&request.with) {
            let region = self
                .regions
                .id(with)
                .ok_or_else(|| ConfigurationError::UnknownRegion { name: with.clone() })?;
            let libs = self.lattice.library_ids(which, request.numbering)?;
            for (type_id, group) in self.group_by_type(&libs, t)? {
                self.paint_group(type_id, &group, *location, region, t)?;
            }
        }
        Ok(())
    }

    /// Clones the material found at each `where` location, applies the
    /// perturbation and paints the clone back in its place.
    ///
    /// Identical perturbations of the same region share one clone.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::AmbiguousTarget` when the location holds
    /// a mixture whose components also appear standalone in the same
    /// assembly type, or a fine cut whose region fills some bin alone and
    /// also sits inside a mixture, plus the errors of
    /// [`replace_axial`](Self::replace_axial).
    pub fn perturb_material(&mut self, request: &PerturbPayload) -> CoreResult<()> {
        self.ensure_open()?;
        request.validate()?;
        let t = TimeInstant::new(request.at)?;
        self.snapshots.check_open(t)?;
        for ((which, location), perturbation) in request
            .which
            .iter()
            .zip(&request.locations)
            .zip(&request.perturbations)
        {
            let libs = self.lattice.library_ids(which, request.numbering)?;
            for (type_id, group) in self.group_by_type(&libs, t)? {
                let target = self.located_region(type_id, *location)?;
                let clone = self.perturbed_region(target, perturbation)?;
                self.paint_group(type_id, &group, *location, clone, t)?;
            }
        }
        Ok(())
    }

    /// Shifts the internal axial boundaries of the targeted assemblies by
    /// `dz`. The outer boundaries stay put.
    ///
    /// # Errors
    ///
    /// Returns a `GeometryError` if the shift collapses a cut, or a
    /// `HomogenizationError` if the result does not project cleanly.
    pub fn translate_axial(&mut self, request: &TranslatePayload) -> CoreResult<()> {
        self.ensure_open()?;
        request.validate()?;
        let t = TimeInstant::new(request.at)?;
        self.snapshots.check_open(t)?;
        let libs = self.lattice.library_ids(&request.which, request.numbering)?;
        for (type_id, group) in self.group_by_type(&libs, t)? {
            let name = self.types.name(type_id).unwrap_or_default().to_string();
            let shifted = self.cuts_of(type_id)?.shifted(&name, request.dz)?;
            let derived = self.derive_type(type_id, shifted, Derivation::Translated { dz: request.dz })?;
            if derived == type_id {
                self.snapshots.touch(t)?;
            } else {
                self.replace(derived, &group, Numbering::Library, t.value())?;
            }
        }
        Ok(())
    }

    /// Applies one operation.
    ///
    /// # Errors
    ///
    /// Returns whatever the operator returns.
    pub fn execute(&mut self, operation: &Operation) -> CoreResult<()> {
        debug!(op = operation.kind(), at = operation.at(), "executing operation");
        match operation {
            Operation::Replace(p) => self.replace_named(p),
            Operation::ReplaceAxial(p) => self.replace_axial(p),
            Operation::Perturb(p) => self.perturb_material(p),
            Operation::Translate(p) => self.translate_axial(p),
        }
    }

    /// Validates and applies a whole schedule in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing operation.
    pub fn run(&mut self, schedule: &Schedule) -> CoreResult<()> {
        schedule.validate()?;
        self.schedule_id = Some(schedule.schedule_id);
        info!(
            schedule_id = %schedule.schedule_id,
            operations = schedule.operations.len(),
            "running schedule"
        );
        for operation in &schedule.operations {
            self.execute(operation)?;
        }
        Ok(())
    }

    /// Library ids grouped by their assembly type at `t`.
    fn group_by_type(&self, libs: &[u32], t: TimeInstant) -> CoreResult<BTreeMap<TypeId, Vec<u32>>> {
        let grid = self.snapshots.at(t);
        let mut groups: BTreeMap<TypeId, Vec<u32>> = BTreeMap::new();
        for &lib in libs {
            let (row, col) = self.lattice.cell_of(lib)?;
            let type_id = TypeId::from_cell(grid.get(row, col)).ok_or_else(|| {
                ConfigurationError::InvalidRequest {
                    reason: format!("assembly {lib} is void at {t}"),
                }
            })?;
            let group = groups.entry(type_id).or_default();
            if !group.contains(&lib) {
                group.push(lib);
            }
        }
        Ok(groups)
    }

    /// Extent a location refers to in `type_id`: a run of coarse bins, or
    /// else one fine cut.
    fn resolve_location(&self, type_id: TypeId, location: ZRange) -> Result<ZRange, ConfigurationError> {
        if let Some(bins) = self.coarse.bins_matching(location) {
            return Ok(ZRange {
                lower: self.coarse.bin(bins.start).lower,
                upper: self.coarse.bin(bins.end - 1).upper,
            });
        }
        let cuts = self.cuts_of(type_id)?;
        if let Some(i) = cuts.find(location) {
            return Ok(cuts.cuts()[i].range());
        }
        Err(ConfigurationError::LocationNotFound {
            assembly_type: self.types.name(type_id).unwrap_or_default().to_string(),
            lower: location.lower,
            upper: location.upper,
        })
    }

    /// Region a perturbation at `location` targets.
    fn located_region(&self, type_id: TypeId, location: ZRange) -> Result<RegionId, ConfigurationError> {
        let type_name = || self.types.name(type_id).unwrap_or_default().to_string();
        if let Some(bins) = self.coarse.bins_matching(location) {
            let projection = self.projection_of(type_id)?;
            let found: BTreeSet<RegionId> = projection.config()[bins].iter().copied().collect();
            let names = || {
                found
                    .iter()
                    .map(|&id| self.regions.name(id).unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join(",")
            };
            let mut hits = found.iter().copied();
            let (Some(id), None) = (hits.next(), hits.next()) else {
                return Err(ConfigurationError::AmbiguousTarget {
                    region: names(),
                    assembly_type: type_name(),
                });
            };
            if let Some(RegionOrigin::Mixture { components, .. }) = self.regions.record(id).map(|r| &r.origin) {
                if components.iter().any(|(c, _)| projection.config().contains(c)) {
                    return Err(ConfigurationError::AmbiguousTarget {
                        region: names(),
                        assembly_type: type_name(),
                    });
                }
            }
            return Ok(id);
        }
        let cuts = self.cuts_of(type_id)?;
        if let Some(i) = cuts.find(location) {
            let name = &cuts.cuts()[i].region;
            let id = self
                .regions
                .id(name)
                .ok_or_else(|| ConfigurationError::UnknownRegion { name: name.clone() })?;
            let config = self.projection_of(type_id)?.config();
            let mixed = config.iter().any(|&bin| {
                matches!(self.regions.record(bin).map(|r| &r.origin),
                    Some(RegionOrigin::Mixture { components, .. }) if components.iter().any(|(c, _)| *c == id))
            });
            if mixed && config.contains(&id) {
                return Err(ConfigurationError::AmbiguousTarget {
                    region: name.clone(),
                    assembly_type: type_name(),
                });
            }
            return Ok(id);
        }
        Err(ConfigurationError::LocationNotFound {
            assembly_type: type_name(),
            lower: location.lower,
            upper: location.upper,
        })
    }

    fn perturbed_region(&mut self, base: RegionId, perturbation: &Perturbation) -> CoreResult<RegionId> {
        let (id, created) = self.regions.register_perturbed(base, perturbation)?;
        if created {
            info!(
                base = self.regions.name(base).unwrap_or_default(),
                region = self.regions.name(id).unwrap_or_default(),
                "registered perturbed region"
            );
            self.warm_materials(&[id])?;
        }
        Ok(id)
    }

    /// Paints `region` over `location` for one group of same-type
    /// assemblies and places the resulting type.
    fn paint_group(
        &mut self,
        type_id: TypeId,
        group: &[u32],
        location: ZRange,
        region: RegionId,
        t: TimeInstant,
    ) -> CoreResult<()> {
        let range = self.resolve_location(type_id, location)?;
        let region_name = self
            .regions
            .name(region)
            .ok_or_else(|| ConfigurationError::UnknownRegion {
                name: region.to_string(),
            })?;
        let painted = self.cuts_of(type_id)?.painted(range, region_name)?;
        let derived = self.derive_type(type_id, painted, Derivation::Replaced)?;
        if derived == type_id {
            self.snapshots.touch(t)
        } else {
            self.replace(derived, group, Numbering::Library, t.value())
        }
    }

    /// Type with the given cuts derived from the same root as `base`,
    /// registering a new one if none exists.
    fn derive_type(&mut self, base: TypeId, cuts: AxialCuts, derivation: Derivation) -> CoreResult<TypeId> {
        if *self.cuts_of(base)? == cuts {
            return Ok(base);
        }
        let root = self.types.root_of(base);
        let existing = self
            .types
            .iter()
            .map(|r| r.id)
            .find(|&id| self.types.root_of(id) == root && self.cuts.get(&id) == Some(&cuts));
        if let Some(id) = existing {
            debug!(
                assembly_type = self.types.name(id).unwrap_or_default(),
                "reusing derived assembly type"
            );
            return Ok(id);
        }

        let name = self.types.next_derived_name(root, &derivation)?;
        let slots = axial::slots(&name, &cuts, &self.coarse)?;
        let id = self.types.register_derived(root, derivation)?;
        self.install_type(id, cuts, slots)?;
        info!(
            base = self.types.name(base).unwrap_or_default(),
            assembly_type = %name,
            "registered derived assembly type"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axial::AxialCut;
    use crate::geometry::{AssemblyGeometry, Rotation, Shape};
    use crate::grid::CoreGrid;
    use crate::material::{InMemoryMaterialLibrary, Material};
    use crate::store::CoreBuilder;

    fn zr(lower: f64, upper: f64) -> ZRange {
        ZRange { lower, upper }
    }

    /// 2x2 square core: A at library ids 1-2, B at 3-4.
    fn store() -> ConfigurationStore {
        let library = InMemoryMaterialLibrary::new()
            .with(Material::absorber("fuel", 300.0, vec![1.0]).unwrap())
            .with(Material::absorber("refl", 300.0, vec![3.0]).unwrap())
            .with(Material::absorber("b4c", 300.0, vec![9.0]).unwrap());
        CoreBuilder::new()
            .geometry(AssemblyGeometry::new(Shape::Square, 10.0).unwrap())
            .rotation(Rotation::Half)
            .sector(CoreGrid::from_rows(vec![vec![1, 2], vec![0, 0]]).unwrap())
            .assembly_type("A", vec![AxialCut::new("fuel", "core", 0.0, 100.0)])
            .assembly_type(
                "B",
                vec![
                    AxialCut::new("fuel", "core", 0.0, 25.0),
                    AxialCut::new("refl", "top", 25.0, 100.0),
                ],
            )
            .region("b4c")
            .zcuts(vec![0.0, 50.0, 100.0])
            .library(Box::new(library))
            .build()
            .unwrap()
    }

    fn axial_request(which: Vec<u32>, location: ZRange, with: &str, at: f64) -> ReplaceAxialPayload {
        ReplaceAxialPayload {
            which: vec![which],
            locations: vec![location],
            with: vec![with.to_string()],
            numbering: Numbering::Library,
            at,
        }
    }

    #[test]
    fn replace_writes_snapshot() {
        let mut s = store();
        let b = s.type_id("B").unwrap();
        s.replace(b, &[1], Numbering::Library, 1.0).unwrap();
        assert_eq!(s.type_at(1, 1.0).unwrap(), b);
        assert_eq!(s.type_at(1, 0.0).unwrap().get(), 1);
        assert_eq!(s.times(), vec![0.0, 1.0]);
    }

    #[test]
    fn replace_rejects_unknown_and_out_of_range() {
        let mut s = store();
        let a = s.type_id("A").unwrap();
        assert!(s.replace(a, &[9], Numbering::Library, 0.0).unwrap_err().is_geometry());
        assert!(s.replace_named(&ReplacePayload {
            assembly_type: "Z".to_string(),
            assemblies: vec![1],
            numbering: Numbering::Library,
            at: 0.0,
        })
        .unwrap_err()
        .is_configuration());
        assert_eq!(s.times(), vec![0.0]);
    }

    #[test]
    fn sealed_snapshot_is_rejected() {
        let mut s = store();
        let b = s.type_id("B").unwrap();
        s.replace(b, &[1], Numbering::Library, 2.0).unwrap();
        let err = s.replace(b, &[2], Numbering::Library, 0.0).unwrap_err();
        assert!(matches!(
            err,
            crate::CoreError::Configuration(ConfigurationError::SealedSnapshot { .. })
        ));
    }

    #[test]
    fn replace_axial_on_coarse_bin_derives_type() {
        let mut s = store();
        s.replace_axial(&axial_request(vec![1], zr(50.0, 100.0), "b4c", 1.0)).unwrap();
        let derived = s.type_at(1, 1.0).unwrap();
        assert_eq!(s.type_name(derived), Some("A-1repl"));
        // The untouched A assembly keeps its type.
        assert_eq!(s.type_name(s.type_at(2, 1.0).unwrap()), Some("A"));
        let proj = s.axial_projection(derived).unwrap();
        assert_eq!(proj.config_str(), &["fuel".to_string(), "b4c".to_string()]);
    }

    #[test]
    fn identical_requests_reuse_the_derived_type() {
        let mut s = store();
        s.replace_axial(&axial_request(vec![1], zr(50.0, 100.0), "b4c", 1.0)).unwrap();
        let types = s.types().len();
        s.replace_axial(&axial_request(vec![2], zr(50.0, 100.0), "b4c", 1.0)).unwrap();
        assert_eq!(s.types().len(), types);
        assert_eq!(s.type_at(1, 1.0).unwrap(), s.type_at(2, 1.0).unwrap());
    }

    #[test]
    fn replace_axial_on_fine_cut() {
        let mut s = store();
        s.replace_axial(&axial_request(vec![3], zr(0.0, 25.0), "b4c", 0.0)).unwrap();
        let derived = s.type_at(3, 0.0).unwrap();
        assert_eq!(s.type_name(derived), Some("B-1repl"));
        let proj = s.axial_projection(derived).unwrap();
        assert_eq!(proj.config_str()[0], "B-1repl1_b4c+refl");
        let mix = proj.config()[0];
        assert!((s.material(mix).unwrap().capture[0] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn unmatched_location_fails() {
        let mut s = store();
        let err = s
            .replace_axial(&axial_request(vec![1], zr(10.0, 20.0), "b4c", 0.0))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::CoreError::Configuration(ConfigurationError::LocationNotFound { .. })
        ));
    }

    #[test]
    fn perturb_standalone_region() {
        let mut s = store();
        let request = PerturbPayload {
            which: vec![vec![1, 2]],
            locations: vec![zr(0.0, 50.0)],
            perturbations: vec![Perturbation::Density { factor: 2.0 }],
            numbering: Numbering::Library,
            at: 0.0,
        };
        s.perturb_material(&request).unwrap();
        let derived = s.type_at(1, 0.0).unwrap();
        let proj = s.axial_projection(derived).unwrap();
        assert_eq!(proj.config_str(), &["fuel-1pert".to_string(), "fuel".to_string()]);
        let clone = proj.config()[0];
        assert!((s.material(clone).unwrap().capture[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn identical_perturbations_share_the_clone() {
        let mut s = store();
        let request = |lib: u32| PerturbPayload {
            which: vec![vec![lib]],
            locations: vec![zr(0.0, 50.0)],
            perturbations: vec![Perturbation::Density { factor: 2.0 }],
            numbering: Numbering::Library,
            at: 0.0,
        };
        s.perturb_material(&request(1)).unwrap();
        let (types, regions) = (s.types().len(), s.regions().len());
        s.perturb_material(&request(2)).unwrap();
        assert_eq!((s.types().len(), s.regions().len()), (types, regions));
        assert_eq!(s.type_at(1, 0.0).unwrap(), s.type_at(2, 0.0).unwrap());
    }

    #[test]
    fn perturb_ambiguous_mixture_fails() {
        let mut s = store();
        // Bin 0 of B mixes fuel and refl while refl also fills bin 1 alone.
        let request = PerturbPayload {
            which: vec![vec![3]],
            locations: vec![zr(0.0, 50.0)],
            perturbations: vec![Perturbation::Density { factor: 2.0 }],
            numbering: Numbering::Library,
            at: 0.0,
        };
        let err = s.perturb_material(&request).unwrap_err();
        assert!(matches!(
            err,
            crate::CoreError::Configuration(ConfigurationError::AmbiguousTarget { .. })
        ));
    }

    #[test]
    fn perturb_fine_cut_inside_a_mixture_fails() {
        let mut s = store();
        // refl fills bin 1 alone and also sits in B1_fuel+refl.
        let request = |location| PerturbPayload {
            which: vec![vec![3]],
            locations: vec![location],
            perturbations: vec![Perturbation::Density { factor: 2.0 }],
            numbering: Numbering::Library,
            at: 0.0,
        };
        let err = s.perturb_material(&request(zr(25.0, 100.0))).unwrap_err();
        assert!(matches!(
            err,
            crate::CoreError::Configuration(ConfigurationError::AmbiguousTarget { ref region, .. }) if region == "refl"
        ));
        // fuel only ever appears inside the mixture.
        s.perturb_material(&request(zr(0.0, 25.0))).unwrap();
        let derived = s.type_at(3, 0.0).unwrap();
        assert_eq!(
            s.axial_projection(derived).unwrap().config_str()[0],
            "B-1repl1_fuel-1pert+refl"
        );
    }

    #[test]
    fn operators_reject_times_before_the_latest() {
        let mut s = store();
        let b = s.type_id("B").unwrap();
        s.replace(b, &[1], Numbering::Library, 2.0).unwrap();
        let regions = s.regions().len();
        let types = s.types().len();
        let err = s
            .replace_axial(&axial_request(vec![2], zr(50.0, 100.0), "b4c", 1.0))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::CoreError::Configuration(ConfigurationError::SealedSnapshot { .. })
        ));
        assert_eq!((s.types().len(), s.regions().len()), (types, regions));
        assert_eq!(s.times(), vec![0.0, 2.0]);
    }

    #[test]
    fn translate_shifts_internal_boundary() {
        let mut s = store();
        s.translate_axial(&TranslatePayload {
            which: vec![3, 4],
            dz: 25.0,
            numbering: Numbering::Library,
            at: 1.0,
        })
        .unwrap();
        let derived = s.type_at(3, 1.0).unwrap();
        assert_eq!(s.type_name(derived), Some("B-1transl"));
        assert_eq!(s.axial_cuts(derived).unwrap().boundaries(), vec![0.0, 50.0, 100.0]);
        assert_eq!(
            s.axial_projection(derived).unwrap().config_str(),
            &["fuel".to_string(), "refl".to_string()]
        );
    }

    #[test]
    fn translate_single_cut_is_a_no_op() {
        let mut s = store();
        let types = s.types().len();
        s.translate_axial(&TranslatePayload {
            which: vec![1],
            dz: 5.0,
            numbering: Numbering::Library,
            at: 0.0,
        })
        .unwrap();
        assert_eq!(s.types().len(), types);
        assert_eq!(s.type_name(s.type_at(1, 0.0).unwrap()), Some("A"));

        s.translate_axial(&TranslatePayload {
            which: vec![1],
            dz: 5.0,
            numbering: Numbering::Library,
            at: 4.0,
        })
        .unwrap();
        assert_eq!(s.times(), vec![0.0, 4.0]);
        assert_eq!(s.snapshot(4.0).unwrap(), s.snapshot(0.0).unwrap());
    }

    #[test]
    fn execute_dispatches() {
        let mut s = store();
        let op = Operation::Replace(ReplacePayload {
            assembly_type: "B".to_string(),
            assemblies: vec![1],
            numbering: Numbering::Library,
            at: 3.0,
        });
        s.execute(&op).unwrap();
        assert_eq!(s.type_name(s.type_at(1, 3.0).unwrap()), Some("B"));
    }
}
