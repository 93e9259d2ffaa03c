//! Blossom registry.
//!
//! Maps `(group type, blossom type)` pairs to factories. The engine
//! creates a fresh instance per execution so blossom implementations can
//! keep parsed inputs in `self` without cross-run leakage.

use std::collections::HashMap;

use crate::blossom::{Blossom, BlossomSchema};

type Factory = Box<dyn Fn() -> Box<dyn Blossom> + Send + Sync>;

/// Registry of blossom implementations, keyed by `(group, type)`.
#[derive(Default)]
pub struct BlossomRegistry {
    factories: HashMap<(String, String), Factory>,
}

impl core::fmt::Debug for BlossomRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlossomRegistry")
            .field("blossoms", &self.names())
            .finish()
    }
}

impl BlossomRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `(group_type, blossom_type)`.
    ///
    /// A later registration under the same pair replaces the earlier one.
    pub fn register<F>(
        &mut self,
        group_type: impl Into<String>,
        blossom_type: impl Into<String>,
        factory: F,
    ) where
        F: Fn() -> Box<dyn Blossom> + Send + Sync + 'static,
    {
        self.factories
            .insert((group_type.into(), blossom_type.into()), Box::new(factory));
    }

    /// Creates a fresh instance for the given pair.
    #[must_use]
    pub fn create(&self, group_type: &str, blossom_type: &str) -> Option<Box<dyn Blossom>> {
        self.factories
            .get(&(group_type.to_string(), blossom_type.to_string()))
            .map(|factory| factory())
    }

    /// Whether the pair is registered.
    #[must_use]
    pub fn contains(&self, group_type: &str, blossom_type: &str) -> bool {
        self.factories
            .contains_key(&(group_type.to_string(), blossom_type.to_string()))
    }

    /// The schema of the registered blossom, if any.
    #[must_use]
    pub fn schema(&self, group_type: &str, blossom_type: &str) -> Option<BlossomSchema> {
        self.create(group_type, blossom_type)
            .map(|blossom| blossom.schema().clone())
    }

    /// All registered `(group, type)` pairs, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<(String, String)> {
        let mut names: Vec<_> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}
