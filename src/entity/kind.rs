//! Entity kinds and per-kind data
//!
//! Every entity carries a closed `EntityKind` tag. Code that needs to know
//! whether something is a worker, a building or a resource node matches on
//! the tag instead of probing runtime types.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Lifecycle of a building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingState {
    /// Finished and operational
    Normal,
    /// Placed by the player, not yet started
    PreConstruct,
    /// Waiting for resources or builders
    Wait,
    /// Under construction
    Constructing,
    Destroyed,
}

impl BuildingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildingState::Normal => "Normal",
            BuildingState::PreConstruct => "PreConstruct",
            BuildingState::Wait => "Wait",
            BuildingState::Constructing => "Constructing",
            BuildingState::Destroyed => "Destroyed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Normal" => Some(BuildingState::Normal),
            "PreConstruct" => Some(BuildingState::PreConstruct),
            "Wait" => Some(BuildingState::Wait),
            "Constructing" => Some(BuildingState::Constructing),
            "Destroyed" => Some(BuildingState::Destroyed),
            _ => None,
        }
    }
}

/// Carry state of a worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerData {
    pub lumber_carried: u32,
    pub gold_carried: u32,
    pub lumber_capacity: u32,
    pub gold_capacity: u32,
}

impl Default for WorkerData {
    fn default() -> Self {
        Self {
            lumber_carried: 0,
            gold_carried: 0,
            lumber_capacity: 10,
            gold_capacity: 10,
        }
    }
}

impl WorkerData {
    pub fn lumber_space(&self) -> u32 {
        self.lumber_capacity.saturating_sub(self.lumber_carried)
    }

    pub fn gold_space(&self) -> u32 {
        self.gold_capacity.saturating_sub(self.gold_carried)
    }
}

/// Construction bookkeeping of a building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingData {
    pub state: BuildingState,
    /// Workers currently in their construct or repair work phase
    pub builder_count: u32,
    /// Seconds of single-builder work needed to finish construction
    pub construction_time: f32,
    /// Accumulated construction work (seconds)
    pub construction_elapsed: f32,
}

impl BuildingData {
    pub fn new(construction_time: f32) -> Self {
        Self {
            state: BuildingState::Normal,
            builder_count: 0,
            construction_time,
            construction_elapsed: 0.0,
        }
    }

    /// Progress in `[0, 1]`
    pub fn progress(&self) -> f32 {
        if self.construction_time <= 0.0 {
            1.0
        } else {
            (self.construction_elapsed / self.construction_time).clamp(0.0, 1.0)
        }
    }

    pub fn claim_builder(&mut self) {
        self.builder_count += 1;
    }

    pub fn release_builder(&mut self) {
        debug_assert!(self.builder_count > 0, "builder released without a claim");
        self.builder_count = self.builder_count.saturating_sub(1);
    }

    /// Speed multiplier for the current crew
    ///
    /// Every builder after the first adds `tradeoff` of a builder's speed.
    pub fn crew_factor(&self, tradeoff: f32) -> f32 {
        if self.builder_count == 0 {
            0.0
        } else {
            1.0 + (self.builder_count - 1) as f32 * tradeoff
        }
    }
}

/// A capacity-limited resource node (tree or goldmine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Remaining lumber or gold
    pub amount: u32,
    /// Workers currently harvesting
    pub harvester_count: u32,
    pub max_harvesters: u32,
}

impl ResourceNode {
    pub fn new(amount: u32, max_harvesters: u32) -> Self {
        Self {
            amount,
            harvester_count: 0,
            max_harvesters,
        }
    }

    pub fn has_room(&self) -> bool {
        self.harvester_count < self.max_harvesters
    }

    pub fn claim(&mut self) {
        debug_assert!(
            self.harvester_count < self.max_harvesters,
            "harvester cap {} exceeded",
            self.max_harvesters
        );
        self.harvester_count += 1;
    }

    pub fn release(&mut self) {
        debug_assert!(self.harvester_count > 0, "harvester released without a claim");
        self.harvester_count = self.harvester_count.saturating_sub(1);
    }

    /// Take up to `wanted`, returns the amount actually taken
    pub fn take(&mut self, wanted: u32) -> u32 {
        let taken = wanted.min(self.amount);
        self.amount -= taken;
        taken
    }
}

/// Goldmine data: the resource plus the point where workers reappear
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldmineData {
    pub node: ResourceNode,
    /// Offset from the mine's position
    pub spawn_point: Vec2,
}

/// Closed set of entity kinds with their payload
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Worker(WorkerData),
    Fighter,
    Building(BuildingData),
    Tree(ResourceNode),
    Goldmine(GoldmineData),
    /// Static decoration with no behavior
    Prop,
}

impl EntityKind {
    /// Units that walk, fight and run behavior states
    pub fn is_character(&self) -> bool {
        matches!(self, EntityKind::Worker(_) | EntityKind::Fighter)
    }

    pub fn is_building(&self) -> bool {
        matches!(self, EntityKind::Building(_))
    }

    pub fn worker(&self) -> Option<&WorkerData> {
        match self {
            EntityKind::Worker(w) => Some(w),
            _ => None,
        }
    }

    pub fn worker_mut(&mut self) -> Option<&mut WorkerData> {
        match self {
            EntityKind::Worker(w) => Some(w),
            _ => None,
        }
    }

    pub fn building(&self) -> Option<&BuildingData> {
        match self {
            EntityKind::Building(b) => Some(b),
            _ => None,
        }
    }

    pub fn building_mut(&mut self) -> Option<&mut BuildingData> {
        match self {
            EntityKind::Building(b) => Some(b),
            _ => None,
        }
    }

    pub fn tree(&self) -> Option<&ResourceNode> {
        match self {
            EntityKind::Tree(t) => Some(t),
            _ => None,
        }
    }

    pub fn tree_mut(&mut self) -> Option<&mut ResourceNode> {
        match self {
            EntityKind::Tree(t) => Some(t),
            _ => None,
        }
    }

    pub fn goldmine(&self) -> Option<&GoldmineData> {
        match self {
            EntityKind::Goldmine(g) => Some(g),
            _ => None,
        }
    }

    pub fn goldmine_mut(&mut self) -> Option<&mut GoldmineData> {
        match self {
            EntityKind::Goldmine(g) => Some(g),
            _ => None,
        }
    }
}
