//! End-to-end flag resolution across prioritized, parented region sets

use palisade::flags::{register_builtins, BuiltinFlags, FlagRegistry};
use palisade::types::ActorKind;
use palisade::{
    Actor, ActorId, Bounds, FlagValue, GameMode, Location, Point, ProtectedRegion, RegionIndex,
    State, WorldId,
};

fn setup() -> (RegionIndex, BuiltinFlags) {
    let registry = FlagRegistry::new();
    let flags = register_builtins(&registry).expect("builtin flags register");
    (RegionIndex::new(), flags)
}

fn world() -> WorldId {
    WorldId::new("overworld")
}

fn cuboid(min: f64, max: f64) -> Bounds {
    Bounds::Cuboid {
        min: Point::new(min, min, min),
        max: Point::new(max, max, max),
    }
}

fn player_at(point: Point) -> Actor {
    Actor {
        id: ActorId::new(),
        name: "steve".to_string(),
        kind: ActorKind::Player,
        location: Location::new("overworld", point),
        game_mode: GameMode::Survival,
        bypass: false,
    }
}

#[test]
fn deny_wins_within_a_priority_group() {
    let (index, flags) = setup();

    let mut friendly = ProtectedRegion::new("friendly", cuboid(0.0, 10.0)).with_priority(10);
    friendly
        .set_flag(&flags.entry, FlagValue::State(State::Allow))
        .unwrap();
    let mut hostile = ProtectedRegion::new("hostile", cuboid(0.0, 10.0)).with_priority(10);
    hostile
        .set_flag(&flags.entry, FlagValue::State(State::Deny))
        .unwrap();
    index.add_region(&world(), friendly).unwrap();
    index.add_region(&world(), hostile).unwrap();

    let point = Point::new(5.0, 5.0, 5.0);
    let set = index.applicable_regions(&world(), point);
    assert!(!set.test_state(&player_at(point), &flags.entry));
}

#[test]
fn higher_priority_shadows_lower() {
    let (index, flags) = setup();

    let mut outer = ProtectedRegion::new("outer", cuboid(0.0, 100.0)).with_priority(1);
    outer
        .set_flag(&flags.entry, FlagValue::State(State::Deny))
        .unwrap();
    let mut inner = ProtectedRegion::new("inner", cuboid(0.0, 10.0)).with_priority(20);
    inner
        .set_flag(&flags.entry, FlagValue::State(State::Allow))
        .unwrap();
    index.add_region(&world(), outer).unwrap();
    index.add_region(&world(), inner).unwrap();

    let point = Point::new(5.0, 5.0, 5.0);
    let set = index.applicable_regions(&world(), point);
    // The top priority group resolves entry; the outer deny is never reached
    assert!(set.test_state(&player_at(point), &flags.entry));
}

// Town is the parent of house and does not itself cover the queried point;
// house leaves enderpearl unset, so the value is inherited through the chain.
#[test]
fn parent_chain_supplies_unset_flags() {
    let (index, flags) = setup();

    let mut town = ProtectedRegion::new("town", cuboid(100.0, 110.0)).with_priority(5);
    town.set_flag(&flags.enderpearl, FlagValue::State(State::Allow))
        .unwrap();
    index.add_region(&world(), town).unwrap();
    index
        .add_region(
            &world(),
            ProtectedRegion::new("house", cuboid(0.0, 10.0))
                .with_priority(5)
                .with_parent("town"),
        )
        .unwrap();

    let point = Point::new(5.0, 5.0, 5.0);
    let set = index.applicable_regions(&world(), point);
    assert_eq!(
        set.query_value(&player_at(point), &flags.enderpearl)
            .and_then(|v| v.as_state()),
        Some(State::Allow)
    );
}

#[test]
fn bypass_short_circuits_every_deny() {
    let (index, flags) = setup();

    let mut fortress = ProtectedRegion::new("fortress", cuboid(0.0, 10.0)).with_priority(50);
    for flag in [&flags.entry, &flags.exit, &flags.send_chat, &flags.enderpearl] {
        fortress
            .set_flag(flag, FlagValue::State(State::Deny))
            .unwrap();
    }
    index.add_region(&world(), fortress).unwrap();

    let point = Point::new(5.0, 5.0, 5.0);
    let set = index.applicable_regions(&world(), point);
    let mut admin = player_at(point);
    admin.bypass = true;

    assert!(set.test_state(&admin, &flags.entry));
    assert!(set.test_state(&admin, &flags.send_chat));
    // Value queries under bypass report unset rather than region data
    assert_eq!(set.query_value(&admin, &flags.enderpearl), None);
    // No region data was read for any of the bypassed queries
    assert_eq!(set.region_lookups(), 0);

    // The same queries for an ordinary actor do consult region data
    assert!(!set.test_state(&player_at(point), &flags.entry));
    assert!(set.region_lookups() > 0);
}

// Scenario: spawn region denies chat for visitors but not for members
#[test]
fn spawn_chat_deny_respects_membership() {
    let (index, flags) = setup();
    let point = Point::new(5.0, 5.0, 5.0);
    let visitor = player_at(point);
    let member = player_at(point);

    let mut spawn = ProtectedRegion::new("spawn", cuboid(0.0, 10.0)).with_priority(10);
    spawn
        .set_flag(&flags.send_chat, FlagValue::State(State::Deny))
        .unwrap();
    spawn.add_member(member.id);
    index.add_region(&world(), spawn).unwrap();

    let set = index.applicable_regions(&world(), point);
    assert!(!set.test_state(&visitor, &flags.send_chat));
    assert!(set.test_state(&member, &flags.send_chat));
}

#[test]
fn unset_flag_falls_back_to_its_fallback_flag() {
    let (index, flags) = setup();

    let mut keep = ProtectedRegion::new("keep", cuboid(0.0, 10.0));
    keep.set_flag(&flags.enderpearl, FlagValue::State(State::Deny))
        .unwrap();
    index.add_region(&world(), keep).unwrap();

    let point = Point::new(5.0, 5.0, 5.0);
    let set = index.applicable_regions(&world(), point);
    // chorus-teleport is unset everywhere; the enderpearl deny decides
    assert!(!set.test_state(&player_at(point), &flags.chorus_teleport));
}

#[test]
fn membership_is_inherited_from_parents() {
    let (index, flags) = setup();
    let point = Point::new(5.0, 5.0, 5.0);
    let citizen = player_at(point);

    let mut town = ProtectedRegion::new("town", cuboid(0.0, 100.0)).with_priority(1);
    town.add_member(citizen.id);
    town.set_flag(&flags.send_chat, FlagValue::State(State::Deny))
        .unwrap();
    index.add_region(&world(), town).unwrap();
    index
        .add_region(
            &world(),
            ProtectedRegion::new("plaza", cuboid(0.0, 10.0))
                .with_priority(10)
                .with_parent("town"),
        )
        .unwrap();

    let set = index.applicable_regions(&world(), point);
    assert!(set.test_state(&citizen, &flags.send_chat));
}
