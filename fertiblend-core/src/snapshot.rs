//! Process-wide reference data.
//!
//! A [`ReferenceSnapshot`] is immutable once built. Calculations hold an `Arc` to the
//! snapshot they started with, so a refresh never changes data under a running request:
//! [`SharedReference::swap`] replaces the pointer and readers pick up the new snapshot on
//! their next [`load`](SharedReference::load).

use crate::{caps::SafetyCaps, elements::ElementTable, error::FertiblendError, registry::CompositionRegistry};
use std::sync::{Arc, RwLock};
use tracing::info;

#[derive(Debug)]
pub struct ReferenceSnapshot {
    pub elements: ElementTable,
    pub registry: CompositionRegistry,
    pub caps: SafetyCaps,
}

impl ReferenceSnapshot {
    pub fn standard() -> Result<Self, FertiblendError> {
        Ok(Self {
            elements: ElementTable::standard(),
            registry: CompositionRegistry::standard()?,
            caps: SafetyCaps::standard(),
        })
    }
}

#[derive(Debug)]
pub struct SharedReference {
    current: RwLock<Arc<ReferenceSnapshot>>,
}

impl SharedReference {
    pub fn new(snapshot: ReferenceSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn load(&self) -> Arc<ReferenceSnapshot> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Installs `snapshot` and returns the one it replaced.
    pub fn swap(&self, snapshot: ReferenceSnapshot) -> Arc<ReferenceSnapshot> {
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = std::mem::replace(&mut *guard, Arc::new(snapshot));
        info!(
            salts = guard.registry.entries().len(),
            elements = guard.elements.iter().count(),
            "Reference snapshot replaced"
        );
        previous
    }
}
