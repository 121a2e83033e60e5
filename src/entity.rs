// src/entity.rs

/// Opaque entity identifier shared with the scene/ECS layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntityId(pub u32);

impl EntityId {
    pub const NULL: EntityId = EntityId(0);

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for EntityId {
    #[inline]
    fn from(value: u32) -> Self {
        EntityId(value)
    }
}
