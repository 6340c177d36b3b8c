//! Movement primitives backed by the path service
//!
//! `MoveToPosition` walks a planned route to a point. `MoveToTarget`
//! follows an entity, replanning periodically and steering straight at the
//! target once it is within sensor range.

use crate::core::types::{Color, EntityId};
use crate::entity::store::EntityStore;
use crate::services::notify::DrawSink;
use crate::simulation::context::SimContext;
use crate::state::{Activation, State, StateResult};
use glam::Vec2;
use std::collections::VecDeque;

/// Distance below which a waypoint counts as reached
const WAYPOINT_TOLERANCE: f32 = 0.01;

/// Default distance kept to a followed entity
pub const FOLLOW_DISTANCE: f32 = 30.0;

/// Range in which a follower ignores its route and heads straight for the target
pub const SENSOR_DISTANCE: f32 = 10.0;

/// Seconds between route replans while following
pub const REPLAN_INTERVAL: f32 = 2.0;

/// Move `owner` toward `point` at its speed; returns whether it arrived
pub fn step_towards(ctx: &mut SimContext<'_>, owner: EntityId, point: Vec2, dt: f32) -> bool {
    let Some(object) = ctx.entities.get(owner) else {
        return false;
    };
    let from = object.position_2d();
    let offset = point - from;
    let distance = offset.length();
    let step = object.speed * dt;

    let (next, arrived) = if distance <= step.max(WAYPOINT_TOLERANCE) {
        (point, true)
    } else {
        (from + offset / distance * step, false)
    };

    let ground = ctx.on_ground(next);
    if let Some(object) = ctx.entities.get_mut(owner) {
        if distance > WAYPOINT_TOLERANCE {
            object.set_rotation(offset.y.atan2(offset.x));
        }
        object.set_position(ground);
    }
    ctx.paths.update_movable(owner, next);
    arrived
}

/// Walk a planned route to a point
#[derive(Debug, Clone)]
pub struct MoveToPosition {
    activation: Activation,
    destination: Vec2,
    waypoints: VecDeque<Vec2>,
}

impl MoveToPosition {
    pub fn new(destination: Vec2) -> Self {
        Self {
            activation: Activation::default(),
            destination,
            waypoints: VecDeque::new(),
        }
    }

    pub fn destination(&self) -> Vec2 {
        self.destination
    }

    fn plan(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) -> bool {
        let Some(object) = ctx.entities.get(owner) else {
            return false;
        };
        let start = object.position_2d();
        let brush = ctx.paths.create_brush(object.outline().radius());
        self.destination = ctx.paths.find_valid_position(self.destination, &brush);
        match ctx.paths.query_path(owner, start, self.destination) {
            Some(route) => {
                self.waypoints = route.into();
                true
            }
            None => false,
        }
    }
}

impl State for MoveToPosition {
    fn update(&mut self, owner: EntityId, ctx: &mut SimContext<'_>, dt: f32) -> StateResult {
        if self.activation.activate_if_inactive() && !self.plan(owner, ctx) {
            return self.activation.finish(StateResult::Failed);
        }

        let mut budget = dt;
        while let Some(&next) = self.waypoints.front() {
            if !step_towards(ctx, owner, next, budget) {
                return StateResult::Active;
            }
            self.waypoints.pop_front();
            // Arrival consumes the whole step; keeps motion per tick bounded
            budget = 0.0;
        }
        self.activation.finish(StateResult::Completed)
    }

    fn terminate(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        if self.activation.is_active() {
            ctx.paths.cancel_query(owner);
        }
        self.waypoints.clear();
    }

    fn draw(&self, owner: EntityId, entities: &EntityStore, sink: &mut dyn DrawSink) {
        let Some(object) = entities.get(owner) else {
            return;
        };
        let z = object.position().z;
        let mut from = object.position_2d();
        for &to in &self.waypoints {
            sink.line(from.extend(z), to.extend(z), Color::WHITE);
            from = to;
        }
    }
}

/// Follow an entity until within `follow_distance` of its outline
#[derive(Debug, Clone)]
pub struct MoveToTarget {
    activation: Activation,
    target: EntityId,
    follow_distance: f32,
    sensor_distance: f32,
    replan_timer: f32,
    waypoints: VecDeque<Vec2>,
}

impl MoveToTarget {
    pub fn new(target: EntityId) -> Self {
        Self::with_distance(target, FOLLOW_DISTANCE)
    }

    /// Follow until the owner's outline touches the target's
    pub fn touching(target: EntityId) -> Self {
        Self::with_distance(target, 0.0)
    }

    pub fn with_distance(target: EntityId, follow_distance: f32) -> Self {
        Self {
            activation: Activation::default(),
            target,
            follow_distance,
            sensor_distance: SENSOR_DISTANCE,
            replan_timer: 0.0,
            waypoints: VecDeque::new(),
        }
    }

    pub fn target(&self) -> EntityId {
        self.target
    }

    /// Border distance to the target minus the owner's radius
    fn gap(&self, owner: EntityId, ctx: &SimContext<'_>) -> Option<f32> {
        let object = ctx.entities.get(owner)?;
        let target = ctx.entities.get(self.target)?;
        Some(target.outline().distance_to(object.position_2d()) - object.outline().radius())
    }

    fn replan(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) -> bool {
        self.replan_timer = REPLAN_INTERVAL;
        let (Some(object), Some(target)) = (ctx.entities.get(owner), ctx.entities.get(self.target))
        else {
            return false;
        };
        let start = object.position_2d();
        let end = target.position_2d();
        match ctx.paths.query_path(owner, start, end) {
            Some(route) => {
                self.waypoints = route.into();
                true
            }
            None => false,
        }
    }
}

impl State for MoveToTarget {
    fn update(&mut self, owner: EntityId, ctx: &mut SimContext<'_>, dt: f32) -> StateResult {
        self.activation.activate_if_inactive();

        let Some(gap) = self.gap(owner, ctx) else {
            return self.activation.finish(StateResult::Failed);
        };
        if gap < self.follow_distance {
            return self.activation.finish(StateResult::Completed);
        }

        if gap <= self.sensor_distance {
            let Some(target) = ctx.entities.get(self.target).map(|t| t.position_2d()) else {
                return self.activation.finish(StateResult::Failed);
            };
            self.waypoints.clear();
            step_towards(ctx, owner, target, dt);
            return StateResult::Active;
        }

        self.replan_timer -= dt;
        if self.replan_timer <= 0.0 && !self.replan(owner, ctx) {
            return self.activation.finish(StateResult::Failed);
        }

        match self.waypoints.front().copied() {
            Some(next) => {
                if step_towards(ctx, owner, next, dt) {
                    self.waypoints.pop_front();
                }
            }
            None => {
                // Route exhausted short of the target: close in directly
                if let Some(target) = ctx.entities.get(self.target).map(|t| t.position_2d()) {
                    step_towards(ctx, owner, target, dt);
                }
            }
        }
        StateResult::Active
    }

    fn terminate(&mut self, owner: EntityId, ctx: &mut SimContext<'_>) {
        if self.activation.is_active() {
            ctx.paths.cancel_query(owner);
        }
        self.waypoints.clear();
    }

    fn draw(&self, owner: EntityId, entities: &EntityStore, sink: &mut dyn DrawSink) {
        if let (Some(object), Some(target)) = (entities.get(owner), entities.get(self.target)) {
            sink.line(object.position(), target.position(), Color::WHEAT);
        }
    }
}
