//! Collision callbacks

use crate::foundation::math::Vec3;
use crate::world::context::HandlerContext;
use crate::world::entity::EntityHandle;

/// Game-side reaction to collision contacts
///
/// `time` is 0.0 for a forward (movement) contact and 1.0 for a down
/// (ground) contact. A down call with `other == ctx.this()` and a zero
/// point means nothing is under the entity.
pub trait CollisionHandler {
    /// A contact was found against `other`
    fn handle_collision(
        &mut self,
        ctx: &mut HandlerContext<'_>,
        other: EntityHandle,
        time: f32,
        point: Vec3,
        tag: u32,
    );

    /// Called once after the camera's forward contacts are resolved
    fn on_leaving_collision(&mut self, _ctx: &mut HandlerContext<'_>) {}
}
