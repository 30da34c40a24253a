use std::collections::HashMap;

use crate::config::{vehicle_remap, VEHICLE_TYPES, WEAPON_TYPES};
use crate::error::{CategoryKind, Result, ScrapeError};

/// A closed set of category labels plus the table of known bad labels that
/// stand in for one of them.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    kind: CategoryKind,
    labels: &'static [&'static str],
    remap: HashMap<&'static str, &'static str>,
}

impl Taxonomy {
    pub fn new(
        kind: CategoryKind,
        labels: &'static [&'static str],
        remap: HashMap<&'static str, &'static str>,
    ) -> Self {
        Self {
            kind,
            labels,
            remap,
        }
    }

    /// Weapon labels from the stats API are already canonical.
    pub fn weapons() -> Self {
        Self::new(CategoryKind::Weapon, &WEAPON_TYPES, HashMap::new())
    }

    pub fn vehicles() -> Self {
        Self::new(CategoryKind::Vehicle, &VEHICLE_TYPES, vehicle_remap())
    }

    /// Canonical labels in column order.
    pub fn labels(&self) -> &'static [&'static str] {
        self.labels
    }

    /// Position of `raw_label`'s canonical category within [`Taxonomy::labels`].
    /// Remapped labels win over the taxonomy, so a remap entry may also
    /// redirect a label that happens to look canonical.
    pub fn index_of(&self, raw_label: &str) -> Result<usize> {
        let canonical = self.remap.get(raw_label).copied().unwrap_or(raw_label);
        self.labels
            .iter()
            .position(|&label| label == canonical)
            .ok_or_else(|| ScrapeError::UnrecognizedCategory {
                kind: self.kind,
                label: raw_label.to_string(),
            })
    }

    pub fn normalize(&self, raw_label: &str) -> Result<&'static str> {
        self.index_of(raw_label).map(|i| self.labels[i])
    }
}
