//! Named collection of morphogen gradients.

use crate::grid::Gradient;
use indexmap::IndexMap;

/// The gradients of a simulation, keyed by name.
///
/// Insertion order is preserved so that per-step iteration (diffusion,
/// snapshots) is deterministic regardless of the names chosen.
#[derive(Clone, Debug, Default)]
pub struct GradientSet {
    gradients: IndexMap<String, Gradient>,
}

impl GradientSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of gradients.
    pub fn len(&self) -> usize {
        self.gradients.len()
    }

    /// `true` when no gradients are registered.
    pub fn is_empty(&self) -> bool {
        self.gradients.is_empty()
    }

    /// Register a gradient under its own name. Replaces any previous
    /// gradient with the same name.
    pub fn insert(&mut self, gradient: Gradient) {
        self.gradients.insert(gradient.name().to_string(), gradient);
    }

    /// Look up a gradient by name.
    pub fn get(&self, name: &str) -> Option<&Gradient> {
        self.gradients.get(name)
    }

    /// Mutable lookup by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Gradient> {
        self.gradients.get_mut(name)
    }

    /// Iterate gradients in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Gradient> {
        self.gradients.values()
    }

    /// Mutable iteration in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Gradient> {
        self.gradients.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petri_core::{Mode, Vec3};

    fn gradient(name: &str) -> Gradient {
        Gradient::new(
            name,
            Vec3::new(1e-5, 1e-5, 0.0),
            Mode::TwoD,
            1e-6,
            1e-12,
            30.0,
            0.0,
        )
    }

    #[test]
    fn lookup_by_name() {
        let mut set = GradientSet::new();
        set.insert(gradient("fgf4"));
        assert!(set.get("fgf4").is_some());
        assert!(set.get("bmp4").is_none());
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let mut set = GradientSet::new();
        set.insert(gradient("fgf4"));
        set.insert(gradient("bmp4"));
        set.insert(gradient("activin"));
        let names: Vec<&str> = set.iter().map(|g| g.name()).collect();
        assert_eq!(names, vec!["fgf4", "bmp4", "activin"]);
    }

    #[test]
    fn reinsert_replaces_in_place() {
        let mut set = GradientSet::new();
        set.insert(gradient("fgf4"));
        set.get_mut("fgf4").unwrap().set([0, 0, 0], 5.0);
        set.insert(gradient("fgf4"));
        assert_eq!(set.get("fgf4").unwrap().at([0, 0, 0]), 0.0);
        assert_eq!(set.len(), 1);
    }
}
