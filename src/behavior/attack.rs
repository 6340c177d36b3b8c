//! Attack: chase a target and strike it, or attack-move to a position

use crate::behavior::combat::Combat;
use crate::behavior::movement::{MoveToPosition, MoveToTarget};
use crate::core::types::{Color, EntityId};
use crate::entity::store::EntityStore;
use crate::services::notify::DrawSink;
use crate::simulation::context::SimContext;
use crate::simulation::tick::SimulationEvent;
use crate::state::{Activation, EventStatus, InputEvent, State, StateResult, TriggerId};
use glam::Vec2;
use ordered_float::OrderedFloat;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    MoveToPosition,
    MoveToTarget,
    Attack,
}

#[derive(Debug, Clone)]
pub struct Attack {
    activation: Activation,
    phase: Phase,
    target: Option<EntityId>,
    /// Last known position of the target, or the attack-move destination
    target_position: Option<Vec2>,
    move_to_position: Option<MoveToPosition>,
    move_to_target: Option<MoveToTarget>,
    combat: Combat,
    arbitrate_timer: f32,
}

impl Attack {
    /// Chase and strike one entity
    pub fn target(target: EntityId) -> Self {
        Self::new(Phase::MoveToTarget, Some(target), None)
    }

    /// Attack-move: walk to `position`, engaging opponents met on the way
    pub fn position(position: Vec2) -> Self {
        Self::new(Phase::MoveToPosition, None, Some(position))
    }

    fn new(phase: Phase, target: Option<EntityId>, target_position: Option<Vec2>) -> Self {
        Self {
            activation: Activation::default(),
            phase,
            target,
            target_position,
            move_to_position: None,
            move_to_target: None,
            combat: Combat::new(),
            arbitrate_timer: 0.0,
        }
    }

    pub fn target_id(&self) -> Option<EntityId> {
        self.target
    }

    pub fn target_position(&self) -> Option<Vec2> {
        self.target_position
    }

    pub fn is_attacking(&self) -> bool {
        self.phase == Phase::Attack
    }

    /// Nearest attackable opponent in view, preferring ones that fight back
    pub fn find_another_target(
        ctx: &SimContext<'_>,
        owner: EntityId,
        existing: Option<EntityId>,
    ) -> Option<EntityId> {
        let object = ctx.entities.get(owner)?;
        let position = object.position_2d();
        ctx.index
            .nearby_objects_precise(ctx.entities, position, object.view_distance)
            .into_iter()
            .filter(|&id| Some(id) != existing && id != owner)
            .filter(|&id| ctx.is_opponent(owner, id))
            .filter(|&id| Combat::can_attack(ctx.entities, owner, Some(id)))
            .filter_map(|id| ctx.entities.get(id))
            .min_by_key(|o| {
                let harmless = o.combat.attack.1 <= 0.0;
                (harmless, OrderedFloat(o.position_2d().distance_squared(position)))
            })
            .map(|o| o.id)
    }

    fn stop_moving(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        if let Some(mut mv) = self.move_to_position.take() {
            mv.terminate(owner, ctx);
        }
        if let Some(mut mv) = self.move_to_target.take() {
            mv.terminate(owner, ctx);
        }
    }

    fn switch_target(&mut self, owner: EntityId, target: EntityId, ctx: &mut SimContext<'_>) {
        debug!("{:?} retargets {:?} -> {:?}", owner, self.target, target);
        ctx.emit(SimulationEvent::Retargeted {
            entity: owner,
            from: self.target,
            to: Some(target),
        });
        self.target = Some(target);
        self.combat.cancel();
        self.stop_moving(owner, ctx);
        self.phase = Phase::MoveToTarget;
    }

    fn track_target(&mut self, ctx: &SimContext<'_>) {
        if let Some(t) = self.target.and_then(|t| ctx.entities.get(t)) {
            self.target_position = Some(t.position_2d());
        }
    }

    fn update_move_to_position(
        &mut self,
        owner: EntityId,
        ctx: &mut SimContext<'_>,
        dt: f32,
    ) -> StateResult {
        if !Combat::can_attack(ctx.entities, owner, self.target) {
            self.target = Self::find_another_target(ctx, owner, self.target);
        }
        let Some(destination) = self.target_position else {
            return StateResult::Completed;
        };
        if self.target.is_some() {
            self.stop_moving(owner, ctx);
            self.phase = Phase::MoveToTarget;
            return StateResult::Active;
        }

        let mv = self
            .move_to_position
            .get_or_insert_with(|| MoveToPosition::new(destination));
        match mv.update(owner, ctx, dt) {
            StateResult::Failed => StateResult::Failed,
            StateResult::Completed => StateResult::Completed,
            _ => StateResult::Active,
        }
    }

    fn update_move_to_target(&mut self, owner: EntityId, ctx: &mut SimContext<'_>, dt: f32) {
        let target = match self.target {
            Some(t) if Combat::can_attack(ctx.entities, owner, Some(t)) => t,
            _ => {
                self.stop_moving(owner, ctx);
                self.phase = Phase::MoveToPosition;
                return;
            }
        };

        let mv = self
            .move_to_target
            .get_or_insert_with(|| MoveToTarget::touching(target));
        let result = mv.update(owner, ctx, dt);
        if result == StateResult::Failed {
            self.stop_moving(owner, ctx);
            self.phase = Phase::MoveToPosition;
            return;
        }

        let in_range = match (ctx.entities.get(owner), ctx.entities.get(target)) {
            (Some(o), Some(t)) => Combat::in_range(o, t),
            _ => false,
        };
        if in_range {
            self.stop_moving(owner, ctx);
            self.combat.cast(owner, Some(target), ctx);
            self.arbitrate_timer = 0.0;
            self.phase = Phase::Attack;
        } else if result == StateResult::Completed {
            self.stop_moving(owner, ctx);
            self.phase = Phase::MoveToPosition;
        }
    }

    fn update_attack(&mut self, owner: EntityId, ctx: &mut SimContext<'_>, dt: f32) {
        let in_range = match (ctx.entities.get(owner), self.target.and_then(|t| ctx.entities.get(t))) {
            (Some(o), Some(t)) => Combat::in_range(o, t),
            _ => false,
        };
        if !Combat::can_attack(ctx.entities, owner, self.target) || !in_range {
            self.combat.cancel();
            self.target = None;
            self.phase = Phase::MoveToPosition;
            return;
        }

        self.combat.cast(owner, self.target, ctx);

        self.arbitrate_timer += dt;
        if self.arbitrate_timer < ctx.config.attack_arbitrate_interval {
            return;
        }
        self.arbitrate_timer = 0.0;

        let attacking_building = self
            .target
            .and_then(|t| ctx.entities.get(t))
            .map_or(false, |t| t.kind.is_building());
        if !attacking_building {
            return;
        }
        let unit = Self::find_another_target(ctx, owner, None)
            .filter(|&id| ctx.entities.get(id).map_or(false, |o| !o.kind.is_building()));
        if let Some(unit) = unit {
            self.switch_target(owner, unit, ctx);
        }
    }
}

impl State for Attack {
    fn update(&mut self, owner: EntityId, ctx: &mut SimContext<'_>, dt: f32) -> StateResult {
        self.activation.activate_if_inactive();
        self.combat.update(dt);
        self.track_target(ctx);

        let result = match self.phase {
            Phase::MoveToPosition => self.update_move_to_position(owner, ctx, dt),
            Phase::MoveToTarget => {
                self.update_move_to_target(owner, ctx, dt);
                StateResult::Active
            }
            Phase::Attack => {
                self.update_attack(owner, ctx, dt);
                StateResult::Active
            }
        };
        if result.is_terminal() {
            self.activation.finish(result)
        } else {
            result
        }
    }

    fn terminate(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        self.stop_moving(owner, ctx);
        self.target = None;
        self.target_position = None;
        self.phase = Phase::MoveToPosition;
    }

    fn draw(&self, owner: EntityId, entities: &EntityStore, sink: &mut dyn DrawSink) {
        let Some(object) = entities.get(owner) else {
            return;
        };
        if let Some(target) = self.target.and_then(|t| entities.get(t)) {
            sink.line(object.position(), target.position(), Color::RED);
        } else if let Some(position) = self.target_position {
            sink.line(object.position(), position.extend(object.position().z), Color::GREEN);
        }
        if let Some(mv) = &self.move_to_position {
            mv.draw(owner, entities, sink);
        }
    }

    fn handle_event(
        &mut self,
        owner: EntityId,
        event: &InputEvent,
        ctx: &mut SimContext<'_>,
    ) -> EventStatus {
        match event {
            InputEvent::Command {
                target: Some(target),
                ..
            } if Combat::can_attack(ctx.entities, owner, Some(*target)) => {
                self.switch_target(owner, *target, ctx);
                self.track_target(ctx);
                EventStatus::Handled
            }
            _ => EventStatus::Unhandled,
        }
    }

    fn on_trigger(&mut self, owner: EntityId, trigger: TriggerId, ctx: &mut SimContext<'_>) {
        if trigger == TriggerId::AttackHit {
            self.combat.hit(owner, ctx);
        }
    }
}
