//! Helpers shared by the harvesting behaviors: deposits and carried resources

use crate::core::types::{Color, EntityId};
use crate::entity::kind::BuildingState;
use crate::simulation::context::SimContext;
use crate::simulation::tick::{ResourceKind, SimulationEvent};
use glam::Vec3;
use tracing::debug;

pub const TOWNHALL: &str = "Townhall";
pub const LUMBERMILL: &str = "Lumbermill";

/// Buildings that accept `resource`
pub fn deposit_classes(resource: ResourceKind) -> &'static [&'static str] {
    match resource {
        ResourceKind::Lumber => &[TOWNHALL, LUMBERMILL],
        ResourceKind::Gold => &[TOWNHALL],
    }
}

/// Operational building of the owner's player that accepts `resource`
pub fn is_valid_deposit(
    ctx: &SimContext<'_>,
    owner: EntityId,
    deposit: EntityId,
    resource: ResourceKind,
) -> bool {
    let (Some(worker), Some(building)) = (ctx.entities.get(owner), ctx.entities.get(deposit))
    else {
        return false;
    };
    building.owner.is_some()
        && building.owner == worker.owner
        && building.is_alive()
        && deposit_classes(resource).contains(&building.class_id.as_str())
        && building
            .kind
            .building()
            .is_some_and(|b| b.state == BuildingState::Normal)
}

/// Nearest operational deposit of the owner's player
pub fn find_deposit(
    ctx: &SimContext<'_>,
    owner: EntityId,
    resource: ResourceKind,
) -> Option<EntityId> {
    let worker = ctx.entities.get(owner)?;
    let player = ctx.players.get(worker.owner?)?;
    player.find_nearest_by(
        ctx.entities,
        worker.position_2d(),
        deposit_classes(resource),
        |o| {
            o.kind
                .building()
                .is_some_and(|b| b.state == BuildingState::Normal)
        },
    )
}

/// Amount of `resource` the worker carries
pub fn carried(ctx: &SimContext<'_>, owner: EntityId, resource: ResourceKind) -> u32 {
    ctx.entities
        .get(owner)
        .and_then(|o| o.kind.worker())
        .map_or(0, |w| match resource {
            ResourceKind::Lumber => w.lumber_carried,
            ResourceKind::Gold => w.gold_carried,
        })
}

/// Empty the worker's pocket into its player's stock
pub fn unload(ctx: &mut SimContext<'_>, owner: EntityId, resource: ResourceKind) {
    let Some(object) = ctx.entities.get_mut(owner) else {
        return;
    };
    let top = object.position() + Vec3::Z * object.model_height;
    let player_id = object.owner;
    let Some(worker) = object.kind.worker_mut() else {
        return;
    };
    let amount = match resource {
        ResourceKind::Lumber => std::mem::take(&mut worker.lumber_carried),
        ResourceKind::Gold => std::mem::take(&mut worker.gold_carried),
    };

    let Some(player) = player_id.and_then(|p| ctx.players.get_mut(p)) else {
        return;
    };
    match resource {
        ResourceKind::Lumber => player.lumber += amount,
        ResourceKind::Gold => player.gold += amount,
    }
    let player = player.id;
    debug!("{:?} deposited {} {:?}", owner, amount, resource);

    let color = match resource {
        ResourceKind::Lumber => Color::GREEN,
        ResourceKind::Gold => Color::GOLD,
    };
    ctx.notify(format!("+{}", amount), top, color);
    ctx.emit(SimulationEvent::ResourceDeposited {
        player,
        worker: owner,
        resource,
        amount,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PlayerId;
    use crate::entity::kind::{BuildingData, EntityKind, WorkerData};
    use crate::entity::object::{Footprint, GameObject};
    use crate::entity::player::Player;
    use crate::world::World;
    use glam::Vec2;

    fn setup() -> (World, EntityId) {
        let mut world = World::flat(512.0, 64);
        world.add_player(Player::new(PlayerId(1), "red", 0));
        let worker = world.add(
            GameObject::new("Follower", EntityKind::Worker(WorkerData::default()))
                .with_owner(PlayerId(1))
                .with_position(Vec3::new(100.0, 100.0, 0.0))
                .with_footprint(Footprint::Circle { radius: 2.0 })
                .with_health(20.0),
        );
        (world, worker)
    }

    fn building(world: &mut World, class: &str, x: f32, state: BuildingState) -> EntityId {
        let mut data = BuildingData::new(10.0);
        data.state = state;
        world.add(
            GameObject::new(class, EntityKind::Building(data))
                .with_owner(PlayerId(1))
                .with_position(Vec3::new(x, 100.0, 0.0))
                .with_footprint(Footprint::Rectangle {
                    size: Vec2::splat(10.0),
                })
                .with_health(100.0),
        )
    }

    #[test]
    fn test_lumber_goes_to_nearest_mill_or_hall() {
        let (mut world, worker) = setup();
        let _hall = building(&mut world, TOWNHALL, 300.0, BuildingState::Normal);
        let mill = building(&mut world, LUMBERMILL, 150.0, BuildingState::Normal);

        world.with_context(|ctx| {
            assert_eq!(find_deposit(ctx, worker, ResourceKind::Lumber), Some(mill));
            assert!(!is_valid_deposit(ctx, worker, mill, ResourceKind::Gold));
        });
    }

    #[test]
    fn test_unfinished_deposit_ignored() {
        let (mut world, worker) = setup();
        let hall = building(&mut world, TOWNHALL, 300.0, BuildingState::Normal);
        let _site = building(&mut world, TOWNHALL, 150.0, BuildingState::Constructing);

        world.with_context(|ctx| {
            assert_eq!(find_deposit(ctx, worker, ResourceKind::Gold), Some(hall));
        });
    }

    #[test]
    fn test_unload_credits_player() {
        let (mut world, worker) = setup();
        world
            .entities_mut()
            .get_mut(worker)
            .and_then(|o| o.kind.worker_mut())
            .unwrap()
            .gold_carried = 7;

        world.with_context(|ctx| unload(ctx, worker, ResourceKind::Gold));

        assert_eq!(world.players().get(PlayerId(1)).unwrap().gold, 7);
        let events = world.take_events();
        assert!(events.contains(&SimulationEvent::ResourceDeposited {
            player: PlayerId(1),
            worker,
            resource: ResourceKind::Gold,
            amount: 7,
        }));
        world.with_context(|ctx| assert_eq!(carried(ctx, worker, ResourceKind::Gold), 0));
    }
}
