//! Behaviors driven through full simulation ticks

use glam::{Vec2, Vec3};
use isles_sim::behavior::{
    Behavior, Die, HarvestGold, HarvestLumber, Idle, MoveToPosition, StateId,
};
use isles_sim::core::types::{EntityId, PlayerId};
use isles_sim::entity::kind::{BuildingData, EntityKind, GoldmineData, ResourceNode, WorkerData};
use isles_sim::entity::object::{Footprint, GameObject};
use isles_sim::entity::player::Player;
use isles_sim::simulation::tick::{run_simulation_tick, SimulationEvent};
use isles_sim::state::Sequential;
use isles_sim::World;

const RED: PlayerId = PlayerId(1);
const BLUE: PlayerId = PlayerId(2);

fn world() -> World {
    let mut world = World::flat(1024.0, 128);
    world.add_player(Player::new(RED, "red", 0));
    world.add_player(Player::new(BLUE, "blue", 1));
    world
}

fn worker(world: &mut World, x: f32, y: f32) -> EntityId {
    world.add(
        GameObject::new("Follower", EntityKind::Worker(WorkerData::default()))
            .with_owner(RED)
            .with_position(Vec3::new(x, y, 0.0))
            .with_footprint(Footprint::Circle { radius: 2.0 })
            .with_health(50.0)
            .with_speed(30.0),
    )
}

fn townhall(world: &mut World, x: f32, y: f32) -> EntityId {
    world.add(
        GameObject::new("Townhall", EntityKind::Building(BuildingData::new(60.0)))
            .with_owner(RED)
            .with_position(Vec3::new(x, y, 0.0))
            .with_footprint(Footprint::Rectangle {
                size: Vec2::splat(20.0),
            })
            .with_health(1000.0),
    )
}

fn tree(world: &mut World, x: f32, y: f32, lumber: u32) -> EntityId {
    world.add(
        GameObject::new("Tree", EntityKind::Tree(ResourceNode::new(lumber, 2)))
            .with_position(Vec3::new(x, y, 0.0))
            .with_footprint(Footprint::Circle { radius: 3.0 }),
    )
}

fn state_of(world: &World, id: EntityId) -> Option<StateId> {
    world
        .entities()
        .get(id)
        .and_then(|o| o.state())
        .map(Behavior::state_id)
}

fn move_to(x: f32, y: f32) -> Behavior {
    Behavior::Move(MoveToPosition::new(Vec2::new(x, y)))
}

#[test]
fn test_queued_command_runs_after_completion() {
    let mut world = world();
    let peon = worker(&mut world, 100.0, 100.0);
    assert!(world.set_state(peon, Some(move_to(130.0, 100.0))));
    assert!(world.enqueue_state(peon, move_to(130.0, 140.0)));

    for _ in 0..100 {
        run_simulation_tick(&mut world, 0.1);
        if state_of(&world, peon) == Some(StateId::Idle) {
            break;
        }
    }

    let object = world.entities().get(peon).unwrap();
    assert_eq!(state_of(&world, peon), Some(StateId::Idle));
    assert!(object.position_2d().distance(Vec2::new(130.0, 140.0)) < 1.0);
    assert!(!object.orders.has_queued());
}

#[test]
fn test_failure_discards_queue() {
    let mut world = world();
    let peon = worker(&mut world, 100.0, 100.0);
    world.set_state(
        peon,
        Some(Behavior::HarvestLumber(HarvestLumber::tree(EntityId(999)))),
    );
    world.enqueue_state(peon, move_to(300.0, 300.0));
    world.take_events();

    let report = run_simulation_tick(&mut world, 0.1);
    assert_eq!(state_of(&world, peon), Some(StateId::Idle));
    assert!(!world.entities().get(peon).unwrap().orders.has_queued());
    assert!(!report.events.iter().any(|e| matches!(
        e,
        SimulationEvent::StateChanged { to: Some(StateId::Move), .. }
    )));
}

#[test]
fn test_sequence_then_idle() {
    let mut world = world();
    let peon = worker(&mut world, 100.0, 100.0);
    let route = Sequential::new()
        .then(move_to(120.0, 100.0))
        .then(move_to(120.0, 120.0));
    world.set_state(peon, Some(Behavior::Sequence(route)));

    for _ in 0..100 {
        run_simulation_tick(&mut world, 0.1);
    }
    let object = world.entities().get(peon).unwrap();
    assert!(object.position_2d().distance(Vec2::new(120.0, 120.0)) < 1.0);
    assert_eq!(state_of(&world, peon), Some(StateId::Idle));
}

#[test]
fn test_third_harvester_retargets() {
    let mut world = world();
    let _hall = townhall(&mut world, 100.0, 300.0);
    let oak = tree(&mut world, 200.0, 300.0, 200);
    let pine = tree(&mut world, 200.0, 500.0, 200);
    let peons: Vec<EntityId> = (0..3)
        .map(|i| worker(&mut world, 160.0, 290.0 + i as f32 * 10.0))
        .collect();
    for &peon in &peons {
        world.set_state(peon, Some(Behavior::HarvestLumber(HarvestLumber::tree(oak))));
    }

    let mut most = 0;
    let mut retargeted = false;
    for _ in 0..300 {
        let report = run_simulation_tick(&mut world, 0.1);
        let count = world
            .entities()
            .get(oak)
            .and_then(|o| o.kind.tree())
            .map_or(0, |n| n.harvester_count);
        assert!(count <= 2, "tree over capacity: {}", count);
        most = most.max(count);
        retargeted |= report.events.iter().any(|e| {
            matches!(e, SimulationEvent::Retargeted { entity, to: Some(to), .. }
                if peons.contains(entity) && *to == pine)
        });
    }
    assert_eq!(most, 2);
    assert!(retargeted);
    assert!(world.players().get(RED).unwrap().lumber > 0);
}

#[test]
fn test_third_harvester_without_alternative_goes_idle() {
    let mut world = world();
    let oak = tree(&mut world, 200.0, 300.0, 200);
    let _far_pine = tree(&mut world, 200.0, 900.0, 200);
    let a = worker(&mut world, 196.0, 300.0);
    let b = worker(&mut world, 204.0, 300.0);
    let late = worker(&mut world, 160.0, 300.0);
    for peon in [a, b, late] {
        world.set_state(peon, Some(Behavior::HarvestLumber(HarvestLumber::tree(oak))));
    }
    world.enqueue_state(late, move_to(100.0, 100.0));

    let report = run_simulation_tick(&mut world, 0.1);
    let harvesters = world
        .entities()
        .get(oak)
        .and_then(|o| o.kind.tree())
        .map_or(0, |n| n.harvester_count);
    assert_eq!(harvesters, 2);
    assert_eq!(state_of(&world, a), Some(StateId::HarvestLumber));
    assert_eq!(state_of(&world, b), Some(StateId::HarvestLumber));
    assert_eq!(state_of(&world, late), Some(StateId::Idle));
    assert!(!world.entities().get(late).unwrap().orders.has_queued());
    assert!(!report.events.iter().any(|e| matches!(
        e,
        SimulationEvent::Retargeted { entity, to: Some(_), .. } if *entity == late
    )));
}

#[test]
fn test_goldmine_admits_one_worker_at_a_time() {
    let mut world = world();
    let _hall = townhall(&mut world, 100.0, 100.0);
    let mine = world.add(
        GameObject::new(
            "Goldmine",
            EntityKind::Goldmine(GoldmineData {
                node: ResourceNode::new(1000, 1),
                spawn_point: Vec2::new(-25.0, 0.0),
            }),
        )
        .with_position(Vec3::new(200.0, 100.0, 0.0))
        .with_footprint(Footprint::Rectangle {
            size: Vec2::splat(30.0),
        }),
    );
    let peons: Vec<EntityId> = (0..3)
        .map(|i| worker(&mut world, 150.0, 80.0 + i as f32 * 20.0))
        .collect();
    for &peon in &peons {
        world.set_state(peon, Some(Behavior::HarvestGold(HarvestGold::goldmine(mine))));
    }

    for _ in 0..600 {
        run_simulation_tick(&mut world, 0.1);
        let inside = world
            .entities()
            .get(mine)
            .and_then(|o| o.kind.goldmine())
            .map_or(0, |g| g.node.harvester_count);
        assert!(inside <= 1);
    }
    let banked = world.players().get(RED).unwrap().gold;
    assert!(banked >= 20, "only {} gold banked", banked);
    assert_eq!(banked % 10, 0);
}

#[test]
fn test_dead_unit_keeps_dying() {
    let mut world = world();
    let victim = worker(&mut world, 100.0, 100.0);
    let killer = world.add(
        GameObject::new("Footman", EntityKind::Fighter)
            .with_owner(BLUE)
            .with_position(Vec3::new(104.0, 100.0, 0.0))
            .with_footprint(Footprint::Circle { radius: 2.0 })
            .with_health(100.0),
    );
    world.damage(killer, victim, 500.0);
    assert_eq!(state_of(&world, victim), Some(StateId::Die));

    assert!(!world.set_state(victim, Some(Behavior::Idle(Idle::new(1.0)))));
    assert!(!world.enqueue_state(victim, move_to(200.0, 200.0)));
    assert!(world.set_state(victim, Some(Behavior::Die(Die::default()))));
    run_simulation_tick(&mut world, 0.1);
    assert_eq!(state_of(&world, victim), Some(StateId::Die));
    assert!(!world.entities().get(victim).unwrap().is_alive());
}

#[test]
fn test_idle_fighters_engage_opponents() {
    let mut world = world();
    let blue = world.add(
        GameObject::new("Footman", EntityKind::Fighter)
            .with_owner(BLUE)
            .with_position(Vec3::new(300.0, 300.0, 0.0))
            .with_footprint(Footprint::Circle { radius: 2.0 })
            .with_health(60.0)
            .with_speed(30.0)
            .with_combat(isles_sim::entity::object::CombatStats {
                attack: (10.0, 12.0),
                ..Default::default()
            }),
    );
    let red = worker(&mut world, 340.0, 300.0);

    let mut died = false;
    for _ in 0..600 {
        let report = run_simulation_tick(&mut world, 0.1);
        died |= report
            .events
            .contains(&SimulationEvent::EntityDied { entity: red });
        if died {
            break;
        }
    }
    assert!(died, "idle fighter never finished off the worker");
    assert!(world.entities().get(blue).unwrap().is_alive());
}
