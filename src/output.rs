//! The engine result and its wire format.
//!
//! [`Packages`] is what [`crate::Ripple::changed_packages`] returns. On
//! the wire it carries bare import paths; empty collections are omitted
//! entirely so serialized output stays minimal and diff-friendly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::packager::Package;

// ---------------------------------------------------------------------------
// Packages
// ---------------------------------------------------------------------------

/// Changed packages and the dependents dirtied by them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Packages {
    /// Changed package → its dependents, sorted by import path.
    pub dependencies: BTreeMap<String, Vec<Package>>,

    /// The directly-changed packages, sorted by import path.
    pub changes: Vec<Package>,

    /// Every dirty package — the changes plus all dependents — without
    /// duplicates, sorted by import path.
    pub all_changes: Vec<Package>,
}

impl Packages {
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty() && self.changes.is_empty() && self.all_changes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// The serialized shape: import paths only, empty collections omitted.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PackagesWire {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    dependencies: BTreeMap<String, Vec<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    changes: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    all_changes: Vec<String>,
}

fn stringify(pkgs: &[Package]) -> Vec<String> {
    pkgs.iter().map(|p| p.import_path.clone()).collect()
}

fn packagify(paths: Vec<String>) -> Vec<Package> {
    paths.into_iter().map(Package::bare).collect()
}

impl Serialize for Packages {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = PackagesWire {
            dependencies: self
                .dependencies
                .iter()
                .map(|(k, v)| (k.clone(), stringify(v)))
                .collect(),
            changes: stringify(&self.changes),
            all_changes: stringify(&self.all_changes),
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Packages {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = PackagesWire::deserialize(deserializer)?;
        Ok(Self {
            dependencies: wire
                .dependencies
                .into_iter()
                .map(|(k, v)| (k, packagify(v)))
                .collect(),
            changes: packagify(wire.changes),
            all_changes: packagify(wire.all_changes),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
