//! Collision mask helpers
//!
//! A collision mask is a `u32` bitset over [`EntityTypeId`]s. An entity
//! reacts to another only when its own mask carries the other's type bit;
//! the test is one-sided, the other entity's mask is not consulted.

use crate::world::entity_types::EntityTypeId;

/// Collision mask helpers over entity type ids
pub struct CollisionLayers;

impl CollisionLayers {
    /// Mask accepting nothing; entities with it never initiate tests
    pub const NONE: u32 = 0;

    /// Mask accepting every type
    pub const ALL: u32 = u32::MAX;

    /// Single-bit mask for a type
    pub fn bit(type_id: EntityTypeId) -> u32 {
        type_id.bit()
    }

    /// Helper to create a mask from multiple types
    ///
    /// # Example
    /// ```
    /// use spatial_core::physics::CollisionLayers;
    /// use spatial_core::world::EntityTypeId;
    ///
    /// let mask = CollisionLayers::mask(&[EntityTypeId(0), EntityTypeId(3)]);
    /// assert_eq!(mask, 0b1001);
    /// ```
    pub fn mask(types: &[EntityTypeId]) -> u32 {
        types.iter().fold(Self::NONE, |acc, &type_id| acc | Self::bit(type_id))
    }

    /// Whether `mask` accepts entities of `type_id`
    pub fn accepts(mask: u32, type_id: EntityTypeId) -> bool {
        mask & Self::bit(type_id) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_is_one_sided() {
        let player = EntityTypeId(0);
        let enemy = EntityTypeId(1);

        let player_mask = CollisionLayers::mask(&[enemy]);
        let enemy_mask = CollisionLayers::NONE;

        assert!(CollisionLayers::accepts(player_mask, enemy));
        assert!(!CollisionLayers::accepts(enemy_mask, player));
    }

    #[test]
    fn test_mask_creation() {
        let mask = CollisionLayers::mask(&[EntityTypeId(0), EntityTypeId(1), EntityTypeId(31)]);
        assert_eq!(mask, 0b11 | (1 << 31));
        assert!(CollisionLayers::accepts(CollisionLayers::ALL, EntityTypeId(17)));
    }

    #[test]
    fn test_out_of_range_type_has_no_bit() {
        assert_eq!(CollisionLayers::bit(EntityTypeId(40)), 0);
        assert!(!CollisionLayers::accepts(CollisionLayers::ALL, EntityTypeId(40)));
    }
}
