//! Time-indexed core layouts.

use std::collections::BTreeMap;

use crate::error::{ConfigurationError, CoreResult};
use crate::grid::CoreGrid;
use crate::time::TimeInstant;

/// Full-core layouts keyed by time.
///
/// Times are registered in increasing order. A new time starts as a copy of
/// the latest snapshot, and writing to an existing time is allowed only while
/// it is the latest one. Everything before the latest time is sealed.
#[derive(Debug, Clone)]
pub struct Snapshots {
    grids: BTreeMap<TimeInstant, CoreGrid>,
}

impl Snapshots {
    /// Starts with `initial` at t = 0.
    #[must_use]
    pub fn new(initial: CoreGrid) -> Self {
        Self {
            grids: BTreeMap::from([(TimeInstant::ZERO, initial)]),
        }
    }

    /// Snapshot registered exactly at `t`.
    #[must_use]
    pub fn get(&self, t: TimeInstant) -> Option<&CoreGrid> {
        self.grids.get(&t)
    }

    /// Layout in force at `t`: the snapshot at `t` or the nearest earlier one.
    #[must_use]
    pub fn at(&self, t: TimeInstant) -> &CoreGrid {
        self.grids
            .range(..=t)
            .next_back()
            .map(|(_, g)| g)
            .unwrap_or_else(|| self.initial())
    }

    fn initial(&self) -> &CoreGrid {
        self.grids
            .values()
            .next()
            .expect("snapshot at t=0 always exists")
    }

    /// Registered times, ascending.
    pub fn times(&self) -> impl Iterator<Item = TimeInstant> + '_ {
        self.grids.keys().copied()
    }

    /// Snapshots in time order.
    pub fn iter(&self) -> impl Iterator<Item = (TimeInstant, &CoreGrid)> {
        self.grids.iter().map(|(t, g)| (*t, g))
    }

    /// Number of snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grids.len()
    }

    /// True when there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    /// Latest registered time.
    #[must_use]
    pub fn latest(&self) -> TimeInstant {
        self.grids.keys().next_back().copied().unwrap_or(TimeInstant::ZERO)
    }

    /// Fails unless `t` is at or after the latest registered time.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::SealedSnapshot` for an earlier `t`.
    pub fn check_open(&self, t: TimeInstant) -> CoreResult<()> {
        if t < self.latest() {
            return Err(ConfigurationError::SealedSnapshot { time: t.value() }.into());
        }
        Ok(())
    }

    /// Registers `t` as a copy of the latest layout if it is new.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::SealedSnapshot` for an earlier `t`.
    pub fn touch(&mut self, t: TimeInstant) -> CoreResult<()> {
        self.edit(t, |_| Ok(()))
    }

    /// Applies `edit` to the layout at `t`.
    ///
    /// The edit runs on a copy; the stored snapshot is only replaced when
    /// the edit succeeds, so an error leaves every snapshot untouched.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::SealedSnapshot` if `t` is before the
    /// latest registered time, or whatever `edit` returns.
    pub fn edit<F>(&mut self, t: TimeInstant, edit: F) -> CoreResult<()>
    where
        F: FnOnce(&mut CoreGrid) -> CoreResult<()>,
    {
        self.check_open(t)?;
        let mut grid = self.at(t).clone();
        edit(&mut grid)?;
        self.grids.insert(t, grid);
        Ok(())
    }
}
