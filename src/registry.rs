//! Append-only registries of regions and assembly types.
//!
//! Both registries hand out stable integer handles and keep a name index for
//! deduplication. Synthesized entries carry their provenance as a structured
//! record; display names are derived from it once, at registration, and never
//! parsed back. Entries are only ever removed by the end-of-run prune, which
//! does not renumber the survivors.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::material::Perturbation;

/// Handle of a registered region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(u32);

/// Handle of a registered assembly type. Grid cells hold these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(u32);

macro_rules! id_impls {
    ($t:ty) => {
        impl $t {
            /// Raw integer value.
            #[must_use]
            pub const fn get(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_impls!(RegionId);
id_impls!(TypeId);

impl TypeId {
    /// Value stored in grid cells.
    #[must_use]
    pub fn cell_value(self) -> i64 {
        i64::from(self.0)
    }

    /// Type id of a non-void grid cell.
    #[must_use]
    pub fn from_cell(value: i64) -> Option<Self> {
        u32::try_from(value).ok().filter(|&v| v > 0).map(Self)
    }
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.]+$").expect("valid name pattern"))
}

fn same_blend(a: &[(RegionId, f64)], b: &[(RegionId, f64)]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|((ra, wa), (rb, wb))| ra == rb && (wa - wb).abs() <= f64::EPSILON * 16.0)
}

/// Checks a user-supplied name.
///
/// Synthesized names use `-` and `+`, so input names restricted to letters,
/// digits, `_` and `.` can never collide with them.
pub fn validate_input_name(name: &str) -> Result<(), ConfigurationError> {
    if name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidName {
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
struct Arena<R> {
    entries: BTreeMap<u32, R>,
    by_name: HashMap<String, u32>,
    next: u32,
}

impl<R> Default for Arena<R> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            by_name: HashMap::new(),
            next: 1,
        }
    }
}

impl<R> Arena<R> {
    fn insert(&mut self, name: String, make: impl FnOnce(u32, String) -> R) -> u32 {
        let id = self.next;
        self.next += 1;
        self.by_name.insert(name.clone(), id);
        self.entries.insert(id, make(id, name));
        id
    }

    fn lookup(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    fn retain(&mut self, keep: &HashSet<u32>, name_of: impl Fn(&R) -> &str) -> usize {
        let doomed: Vec<u32> = self
            .entries
            .keys()
            .copied()
            .filter(|id| !keep.contains(id))
            .collect();
        for id in &doomed {
            if let Some(entry) = self.entries.remove(id) {
                self.by_name.remove(name_of(&entry));
            }
        }
        doomed.len()
    }
}

/// Where a region comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionOrigin {
    /// Supplied by the user.
    Input,
    /// Homogenized blend of the fine regions overlapping one coarse bin.
    Mixture {
        /// Assembly type whose projection produced the blend.
        assembly_type: String,
        /// 1-based index among that type's mixtures.
        mix_index: u32,
        /// Component regions and their weights.
        components: Vec<(RegionId, f64)>,
    },
    /// Material clone of `base` with a perturbation applied.
    Perturbed {
        /// Region that was cloned.
        base: RegionId,
        /// 1-based index among the perturbations of `base`.
        sequence: u32,
        /// Applied change.
        perturbation: Perturbation,
    },
}

/// A registered region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    /// Handle.
    pub id: RegionId,
    /// Display name.
    pub name: String,
    /// Provenance.
    pub origin: RegionOrigin,
}

/// Append-only region registry.
#[derive(Debug, Clone, Default)]
pub struct RegionRegistry {
    arena: Arena<RegionRecord>,
}

impl RegionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user region, reusing the id of an existing one.
    pub fn register_input(&mut self, name: &str) -> Result<RegionId, ConfigurationError> {
        if let Some(id) = self.id(name) {
            return Ok(id);
        }
        validate_input_name(name)?;
        Ok(RegionId(self.arena.insert(name.to_string(), |id, name| RegionRecord {
            id: RegionId(id),
            name,
            origin: RegionOrigin::Input,
        })))
    }

    /// Registers a mixture named `<type><mix-index>_<r1>+<r2>+...`.
    ///
    /// Returns the id and whether a new entry was created. An entry with the
    /// same name is reused when its components and weights agree.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidRequest` if a component is not
    /// registered, and `ConfigurationError::MixtureCollision` if the name is
    /// already taken by a different blend.
    pub fn register_mixture(
        &mut self,
        assembly_type: &str,
        mix_index: u32,
        components: Vec<(RegionId, f64)>,
    ) -> Result<(RegionId, bool), ConfigurationError> {
        let mut parts = Vec::with_capacity(components.len());
        for (id, _) in &components {
            parts.push(self.name(*id).ok_or_else(|| ConfigurationError::InvalidRequest {
                reason: format!("mixture component {id} is not registered"),
            })?);
        }
        let name = format!("{assembly_type}{mix_index}_{}", parts.join("+"));
        if let Some(id) = self.id(&name) {
            return match self.record(id).map(|r| &r.origin) {
                Some(RegionOrigin::Mixture { components: c, .. }) if same_blend(c, &components) => {
                    Ok((id, false))
                }
                _ => Err(ConfigurationError::MixtureCollision { name }),
            };
        }
        let assembly_type = assembly_type.to_string();
        let id = self.arena.insert(name, |id, name| RegionRecord {
            id: RegionId(id),
            name,
            origin: RegionOrigin::Mixture {
                assembly_type,
                mix_index,
                components,
            },
        });
        Ok((RegionId(id), true))
    }

    /// Registers `<base>-<k>pert`, reusing an earlier identical perturbation
    /// of the same base.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidRequest` if `base` is unknown.
    pub fn register_perturbed(
        &mut self,
        base: RegionId,
        perturbation: &Perturbation,
    ) -> Result<(RegionId, bool), ConfigurationError> {
        let base_name = self
            .name(base)
            .ok_or_else(|| ConfigurationError::InvalidRequest {
                reason: format!("region id {base} is not registered"),
            })?
            .to_string();

        let mut sequence = 0;
        for record in self.arena.entries.values() {
            if let RegionOrigin::Perturbed {
                base: b,
                perturbation: p,
                ..
            } = &record.origin
            {
                if *b == base {
                    if p == perturbation {
                        return Ok((record.id, false));
                    }
                    sequence += 1;
                }
            }
        }
        let sequence = sequence + 1;
        let perturbation = perturbation.clone();
        let id = self
            .arena
            .insert(format!("{base_name}-{sequence}pert"), |id, name| RegionRecord {
                id: RegionId(id),
                name,
                origin: RegionOrigin::Perturbed {
                    base,
                    sequence,
                    perturbation,
                },
            });
        Ok((RegionId(id), true))
    }

    /// Id of a region by name.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<RegionId> {
        self.arena.lookup(name).map(RegionId)
    }

    /// Name of a region.
    #[must_use]
    pub fn name(&self, id: RegionId) -> Option<&str> {
        self.record(id).map(|r| r.name.as_str())
    }

    /// Full record.
    #[must_use]
    pub fn record(&self, id: RegionId) -> Option<&RegionRecord> {
        self.arena.entries.get(&id.0)
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.entries.len()
    }

    /// True when there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.entries.is_empty()
    }

    /// Records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &RegionRecord> {
        self.arena.entries.values()
    }

    /// Removes every entry not in `keep`; returns how many were removed.
    pub fn prune(&mut self, keep: &HashSet<RegionId>) -> usize {
        let keep: HashSet<u32> = keep.iter().map(|id| id.0).collect();
        self.arena.retain(&keep, |r| r.name.as_str())
    }
}

/// How a derived assembly type was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Derivation {
    /// An axial slot was substituted.
    Replaced,
    /// Internal axial boundaries were shifted by `dz`.
    Translated {
        /// Applied shift.
        dz: f64,
    },
}

impl Derivation {
    const fn suffix(&self) -> &'static str {
        match self {
            Self::Replaced => "repl",
            Self::Translated { .. } => "transl",
        }
    }

    fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Where an assembly type comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum TypeOrigin {
    /// Supplied by the user.
    Input,
    /// Synthesized from the user type `base`.
    Derived {
        /// Root user type.
        base: TypeId,
        /// Operation that produced the type.
        derivation: Derivation,
        /// 1-based index among the types derived from `base` the same way.
        sequence: u32,
    },
}

/// A registered assembly type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRecord {
    /// Handle.
    pub id: TypeId,
    /// Display name.
    pub name: String,
    /// Provenance.
    pub origin: TypeOrigin,
}

/// Append-only assembly type registry.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    arena: Arena<TypeRecord>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user type.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::DuplicateName` or `InvalidName`.
    pub fn register_input(&mut self, name: &str) -> Result<TypeId, ConfigurationError> {
        if self.id(name).is_some() {
            return Err(ConfigurationError::DuplicateName {
                name: name.to_string(),
            });
        }
        validate_input_name(name)?;
        Ok(TypeId(self.arena.insert(name.to_string(), |id, name| TypeRecord {
            id: TypeId(id),
            name,
            origin: TypeOrigin::Input,
        })))
    }

    /// Name the next type derived from `root` by `derivation` would get.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::UnknownTypeId` if `root` is unknown.
    pub fn next_derived_name(
        &self,
        root: TypeId,
        derivation: &Derivation,
    ) -> Result<String, ConfigurationError> {
        let root_name = self
            .name(root)
            .ok_or(ConfigurationError::UnknownTypeId { id: root.0 })?;
        let sequence = self.derived_count(root, derivation) + 1;
        Ok(format!("{root_name}-{sequence}{}", derivation.suffix()))
    }

    fn derived_count(&self, root: TypeId, derivation: &Derivation) -> u32 {
        let count = self
            .arena
            .entries
            .values()
            .filter(|r| {
                matches!(&r.origin, TypeOrigin::Derived { base, derivation: d, .. }
                    if *base == root && d.same_kind(derivation))
            })
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Registers a type derived from `root`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::UnknownTypeId` if `root` is unknown.
    pub fn register_derived(
        &mut self,
        root: TypeId,
        derivation: Derivation,
    ) -> Result<TypeId, ConfigurationError> {
        let name = self.next_derived_name(root, &derivation)?;
        let sequence = self.derived_count(root, &derivation) + 1;
        Ok(TypeId(self.arena.insert(name, |id, name| TypeRecord {
            id: TypeId(id),
            name,
            origin: TypeOrigin::Derived {
                base: root,
                derivation,
                sequence,
            },
        })))
    }

    /// User type a type was ultimately derived from.
    #[must_use]
    pub fn root_of(&self, id: TypeId) -> TypeId {
        match self.record(id).map(|r| &r.origin) {
            Some(TypeOrigin::Derived { base, .. }) => *base,
            _ => id,
        }
    }

    /// Id of a type by name.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<TypeId> {
        self.arena.lookup(name).map(TypeId)
    }

    /// Name of a type.
    #[must_use]
    pub fn name(&self, id: TypeId) -> Option<&str> {
        self.record(id).map(|r| r.name.as_str())
    }

    /// Full record.
    #[must_use]
    pub fn record(&self, id: TypeId) -> Option<&TypeRecord> {
        self.arena.entries.get(&id.0)
    }

    /// True if `id` is live.
    #[must_use]
    pub fn contains(&self, id: TypeId) -> bool {
        self.arena.entries.contains_key(&id.0)
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.entries.len()
    }

    /// True when there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.entries.is_empty()
    }

    /// Records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeRecord> {
        self.arena.entries.values()
    }

    /// Removes every entry not in `keep`; returns how many were removed.
    pub fn prune(&mut self, keep: &HashSet<TypeId>) -> usize {
        let keep: HashSet<u32> = keep.iter().map(|id| id.0).collect();
        self.arena.retain(&keep, |r| r.name.as_str())
    }
}
