//! Die: play the death clip, sink into the ground, then go away

use crate::core::types::EntityId;
use crate::simulation::context::SimContext;
use crate::state::{Activation, AnimationClip, State, StateResult, TriggerId};

#[derive(Debug, Clone, Default)]
pub struct Die {
    activation: Activation,
    sinking: bool,
    /// Ground height minus the sink depth
    base: f32,
    /// Remaining height above `base`
    height: f32,
}

impl Die {
    pub fn is_sinking(&self) -> bool {
        self.sinking
    }

    fn begin_sink(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        let Some(position) = ctx.entities.get(owner).map(|o| o.position_2d()) else {
            return;
        };
        let depth = ctx.config.sink_depth;
        self.base = ctx.landscape.height(position.x, position.y) - depth;
        self.height = depth;
        self.sinking = true;
    }
}

impl State for Die {
    fn update(&mut self, owner: EntityId, ctx: &mut SimContext<'_>, dt: f32) -> StateResult {
        if self.activation.activate_if_inactive() {
            if let Some(object) = ctx.entities.get_mut(owner) {
                object.animation.play(AnimationClip::death());
            }
        }
        if !self.sinking {
            return StateResult::Active;
        }

        self.height -= ctx.config.sink_speed * dt;
        if let Some(object) = ctx.entities.get_mut(owner) {
            let p = object.position();
            object.set_position(p.truncate().extend(self.base + self.height.max(0.0)));
        }
        if self.height <= 0.0 {
            ctx.request_destroy(owner);
            return self.activation.finish(StateResult::Completed);
        }
        StateResult::Active
    }

    fn on_trigger(&mut self, owner: EntityId, trigger: TriggerId, ctx: &mut SimContext<'_>) {
        if trigger == TriggerId::DeathComplete && !self.sinking {
            self.begin_sink(owner, ctx);
        }
    }
}
