// src/sort_order/manager.rs
//! Hierarchical sort order computation.
//!
//! Every hierarchy level owns a 4-bit group of the key. A root entity's offset
//! lands in the top group, its children's offsets in the next one and so on, so
//! sorting by key draws parents before children and siblings in offset order.
//! Negative offsets borrow from the parent's group.

use std::collections::HashMap;

use super::key::RenderSortOrder;
use crate::entity::EntityId;

/// Per-entity offset within its hierarchy level.
pub type SortOrderOffset = i32;

/// Offset meaning "no explicit offset, use the default".
pub const USE_DEFAULT_OFFSET: SortOrderOffset = 0;

/// Read access to the scene hierarchy the sort order is computed over.
pub trait SortOrderHierarchy {
    fn parent(&self, entity: EntityId) -> Option<EntityId>;
    /// Children in sibling order.
    fn children(&self, entity: EntityId) -> &[EntityId];
}

/// Stores explicit offsets and hands out default root offsets.
#[derive(Debug)]
pub struct SortOrderManager {
    offsets: HashMap<EntityId, SortOrderOffset>,
    root_offsets: HashMap<EntityId, SortOrderOffset>,
    next_root_offset: SortOrderOffset,
}

impl Default for SortOrderManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SortOrderManager {
    pub fn new() -> Self {
        Self {
            offsets: HashMap::new(),
            root_offsets: HashMap::new(),
            next_root_offset: 1,
        }
    }

    /// Sets an explicit offset. `USE_DEFAULT_OFFSET` clears it.
    pub fn set_offset(&mut self, entity: EntityId, offset: SortOrderOffset) {
        if offset == USE_DEFAULT_OFFSET {
            self.offsets.remove(&entity);
        } else {
            self.offsets.insert(entity, offset);
        }
    }

    /// Explicit offset, or `USE_DEFAULT_OFFSET`. Default offsets are never reported.
    pub fn offset(&self, entity: EntityId) -> SortOrderOffset {
        self.offsets
            .get(&entity)
            .copied()
            .unwrap_or(USE_DEFAULT_OFFSET)
    }

    pub fn destroy(&mut self, entity: EntityId) {
        self.offsets.remove(&entity);
        self.root_offsets.remove(&entity);
    }

    /// Computes the key of `entity` from its ancestors' offsets.
    pub fn calculate_sort_order<H>(&mut self, entity: EntityId, hierarchy: &H) -> RenderSortOrder
    where
        H: SortOrderHierarchy + ?Sized,
    {
        match hierarchy.parent(entity) {
            None => self.root_sort_order(entity),
            Some(parent) => {
                let depth = depth_of(entity, hierarchy);
                let parent_order = self.calculate_sort_order(parent, hierarchy);
                self.child_sort_order(parent_order, entity, parent, depth, hierarchy)
            }
        }
    }

    /// Recomputes the keys of `entity` and its whole subtree, handing each to `apply`.
    pub fn update_sort_order<H, F>(&mut self, entity: EntityId, hierarchy: &H, mut apply: F)
    where
        H: SortOrderHierarchy + ?Sized,
        F: FnMut(EntityId, RenderSortOrder),
    {
        let order = self.calculate_sort_order(entity, hierarchy);
        let depth = depth_of(entity, hierarchy);
        self.update_subtree(entity, order, depth, hierarchy, &mut apply);
    }

    fn update_subtree<H, F>(
        &mut self,
        entity: EntityId,
        order: RenderSortOrder,
        depth: u32,
        hierarchy: &H,
        apply: &mut F,
    ) where
        H: SortOrderHierarchy + ?Sized,
        F: FnMut(EntityId, RenderSortOrder),
    {
        apply(entity, order);
        for &child in hierarchy.children(entity) {
            let child_order = self.child_sort_order(order, child, entity, depth + 1, hierarchy);
            self.update_subtree(child, child_order, depth + 1, hierarchy, apply);
        }
    }

    fn root_sort_order(&mut self, entity: EntityId) -> RenderSortOrder {
        let offset = match self.offset(entity) {
            USE_DEFAULT_OFFSET => self.default_root_offset(entity),
            explicit => explicit,
        };
        apply_offset(RenderSortOrder::ZERO, offset, RenderSortOrder::ROOT_SHIFT)
    }

    fn child_sort_order<H>(
        &self,
        parent_order: RenderSortOrder,
        entity: EntityId,
        parent: EntityId,
        depth: u32,
        hierarchy: &H,
    ) -> RenderSortOrder
    where
        H: SortOrderHierarchy + ?Sized,
    {
        if depth >= RenderSortOrder::MAX_DEPTH {
            crate::dfatal!(
                "Cannot exceed max depth ({}) for {:?}",
                RenderSortOrder::MAX_DEPTH,
                entity
            );
            return parent_order;
        }

        let offset = match self.offset(entity) {
            USE_DEFAULT_OFFSET => hierarchy
                .children(parent)
                .iter()
                .position(|&sibling| sibling == entity)
                .map_or(1, |index| index as SortOrderOffset + 1),
            explicit => explicit,
        };
        let shift = RenderSortOrder::ROOT_SHIFT - RenderSortOrder::OFFSET_BITS * depth;
        apply_offset(parent_order, offset, shift)
    }

    /// Root offsets cycle through 1..MAX_OFFSET and stick to the entity once assigned.
    fn default_root_offset(&mut self, entity: EntityId) -> SortOrderOffset {
        if let Some(&offset) = self.root_offsets.get(&entity) {
            return offset;
        }
        let offset = self.next_root_offset;
        self.next_root_offset += 1;
        if self.next_root_offset >= RenderSortOrder::MAX_OFFSET {
            self.next_root_offset = 1;
        }
        self.root_offsets.insert(entity, offset);
        offset
    }
}

fn depth_of<H>(entity: EntityId, hierarchy: &H) -> u32
where
    H: SortOrderHierarchy + ?Sized,
{
    let mut depth = 0;
    let mut current = entity;
    while let Some(parent) = hierarchy.parent(current) {
        depth += 1;
        current = parent;
    }
    depth
}

fn apply_offset(base: RenderSortOrder, offset: SortOrderOffset, shift: u32) -> RenderSortOrder {
    let magnitude = RenderSortOrder::from(offset.unsigned_abs() as u64) << shift;
    if offset >= 0 {
        base + magnitude
    } else {
        base - magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct TestHierarchy {
        parents: HashMap<EntityId, EntityId>,
        children: HashMap<EntityId, Vec<EntityId>>,
    }

    impl TestHierarchy {
        fn add_child(&mut self, parent: u32, child: u32) {
            self.parents.insert(EntityId(child), EntityId(parent));
            self.children.entry(EntityId(parent)).or_default().push(EntityId(child));
        }

        fn tree() -> Self {
            //   1
            // 2    3
            //    4    5
            //       6 7 8
            let mut h = Self::default();
            h.add_child(1, 2);
            h.add_child(1, 3);
            h.add_child(3, 4);
            h.add_child(3, 5);
            h.add_child(5, 6);
            h.add_child(5, 7);
            h.add_child(5, 8);
            h
        }
    }

    impl SortOrderHierarchy for TestHierarchy {
        fn parent(&self, entity: EntityId) -> Option<EntityId> {
            self.parents.get(&entity).copied()
        }

        fn children(&self, entity: EntityId) -> &[EntityId] {
            self.children.get(&entity).map(Vec::as_slice).unwrap_or(&[])
        }
    }

    fn root_order(offset: u64) -> RenderSortOrder {
        RenderSortOrder::from(offset) << RenderSortOrder::ROOT_SHIFT
    }

    fn hex(manager: &mut SortOrderManager, hierarchy: &TestHierarchy, entity: u32) -> String {
        manager.calculate_sort_order(EntityId(entity), hierarchy).to_hex_string()
    }

    #[test]
    fn test_unknown_offset() {
        let manager = SortOrderManager::new();
        assert_eq!(manager.offset(EntityId(1)), USE_DEFAULT_OFFSET);
    }

    #[test]
    fn test_set_offset_and_destroy() {
        let mut manager = SortOrderManager::new();
        manager.set_offset(EntityId(1), 2);
        manager.set_offset(EntityId(2), -5);
        assert_eq!(manager.offset(EntityId(1)), 2);
        assert_eq!(manager.offset(EntityId(2)), -5);

        manager.destroy(EntityId(1));
        assert_eq!(manager.offset(EntityId(1)), USE_DEFAULT_OFFSET);
    }

    #[test]
    fn test_default_root_offsets_cycle() {
        let mut manager = SortOrderManager::new();
        let hierarchy = TestHierarchy::default();
        manager.set_offset(EntityId(1), USE_DEFAULT_OFFSET);
        manager.set_offset(EntityId(5), USE_DEFAULT_OFFSET);

        for entity in 1..=15u32 {
            assert_eq!(
                manager.calculate_sort_order(EntityId(entity), &hierarchy),
                root_order(entity as u64)
            );
        }
        assert_eq!(manager.calculate_sort_order(EntityId(16), &hierarchy), root_order(1));
        // Assigned offsets stick.
        assert_eq!(manager.calculate_sort_order(EntityId(3), &hierarchy), root_order(3));
    }

    #[test]
    fn test_default_offsets_not_visible() {
        let mut manager = SortOrderManager::new();
        let hierarchy = TestHierarchy::tree();
        for entity in 1..=8 {
            manager.calculate_sort_order(EntityId(entity), &hierarchy);
            assert_eq!(manager.offset(EntityId(entity)), USE_DEFAULT_OFFSET);
        }
    }

    #[test]
    fn test_explicit_offsets() {
        let mut manager = SortOrderManager::new();
        let hierarchy = TestHierarchy::tree();
        for (entity, offset) in [(1, 1), (2, 1), (3, -1), (4, 1), (5, 2), (6, 3), (7, 4), (8, -5)] {
            manager.set_offset(EntityId(entity), offset);
        }

        assert_eq!(hex(&mut manager, &hierarchy, 1), "0x10000000000000000000000000000000");
        assert_eq!(hex(&mut manager, &hierarchy, 2), "0x11000000000000000000000000000000");
        assert_eq!(hex(&mut manager, &hierarchy, 3), "0x0F000000000000000000000000000000");
        assert_eq!(hex(&mut manager, &hierarchy, 4), "0x0F100000000000000000000000000000");
        assert_eq!(hex(&mut manager, &hierarchy, 5), "0x0F200000000000000000000000000000");
        assert_eq!(hex(&mut manager, &hierarchy, 6), "0x0F230000000000000000000000000000");
        assert_eq!(hex(&mut manager, &hierarchy, 7), "0x0F240000000000000000000000000000");
        assert_eq!(hex(&mut manager, &hierarchy, 8), "0x0F1B0000000000000000000000000000");
    }

    #[test]
    fn test_sibling_order() {
        let mut manager = SortOrderManager::new();
        let hierarchy = TestHierarchy::tree();

        assert_eq!(hex(&mut manager, &hierarchy, 1), "0x10000000000000000000000000000000");
        assert_eq!(hex(&mut manager, &hierarchy, 2), "0x11000000000000000000000000000000");
        assert_eq!(hex(&mut manager, &hierarchy, 3), "0x12000000000000000000000000000000");
        assert_eq!(hex(&mut manager, &hierarchy, 4), "0x12100000000000000000000000000000");
        assert_eq!(hex(&mut manager, &hierarchy, 5), "0x12200000000000000000000000000000");
        assert_eq!(hex(&mut manager, &hierarchy, 6), "0x12210000000000000000000000000000");
        assert_eq!(hex(&mut manager, &hierarchy, 7), "0x12220000000000000000000000000000");
        assert_eq!(hex(&mut manager, &hierarchy, 8), "0x12230000000000000000000000000000");
    }

    #[cfg(not(feature = "strict-dfatal"))]
    #[test]
    fn test_max_depth_keeps_parent_order() {
        let mut manager = SortOrderManager::new();
        let mut hierarchy = TestHierarchy::default();
        let count = RenderSortOrder::MAX_DEPTH + 1;
        for entity in 1..count {
            hierarchy.add_child(entity, entity + 1);
        }

        let deepest = manager.calculate_sort_order(EntityId(count), &hierarchy);
        let parent = manager.calculate_sort_order(EntityId(count - 1), &hierarchy);
        assert_eq!(deepest, parent);
    }

    #[test]
    fn test_update_subtree_only() {
        let mut manager = SortOrderManager::new();
        let mut hierarchy = TestHierarchy::default();
        for entity in 1..4 {
            hierarchy.add_child(entity, entity + 1);
        }

        let mut updated = HashMap::new();
        manager.update_sort_order(EntityId(2), &hierarchy, |entity, order| {
            updated.insert(entity, order.to_hex_string());
        });

        assert_eq!(updated.len(), 3);
        assert_eq!(updated[&EntityId(2)], "0x11000000000000000000000000000000");
        assert_eq!(updated[&EntityId(3)], "0x11100000000000000000000000000000");
        assert_eq!(updated[&EntityId(4)], "0x11110000000000000000000000000000");
        assert!(!updated.contains_key(&EntityId(1)));
        assert!(!updated.contains_key(&EntityId(5)));
    }
}
