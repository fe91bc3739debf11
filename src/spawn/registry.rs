//! Spawn registry: live item handles in insertion order.

use rand::Rng;

use super::area::ItemHandle;

/// Ordered collection of live item handles.
///
/// The registry only tracks handles; destroying the items they refer to is
/// the caller's job. Its length always equals the number of live items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    items: Vec<ItemHandle>,
}

impl Registry {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends a freshly spawned item.
    pub fn push(&mut self, handle: ItemHandle) {
        self.items.push(handle);
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Live handles, oldest first.
    #[must_use]
    pub fn items(&self) -> &[ItemHandle] {
        &self.items
    }

    /// Removes `floor(len / 2)` randomly chosen items and returns them.
    ///
    /// Each pick is uniform over the items still present, so no handle is
    /// taken twice. Survivors keep their relative order.
    pub fn take_half<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<ItemHandle> {
        let n = self.items.len() / 2;
        let mut taken = Vec::with_capacity(n);
        for _ in 0..n {
            let idx = rng.random_range(0..self.items.len());
            taken.push(self.items.remove(idx));
        }
        taken
    }

    /// Removes and returns every item.
    pub fn take_all(&mut self) -> Vec<ItemHandle> {
        std::mem::take(&mut self.items)
    }
}
