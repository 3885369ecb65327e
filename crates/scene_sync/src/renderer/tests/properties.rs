//! Invariants that hold across ticks

use super::harness::{adds_for, updates_for, Harness};
use crate::entities::{EntityKind, EntityProperties, ZoneCullingMode, ZoneProperties};
use crate::foundation::math::Vec3;
use crate::render::RenderOp;
use crate::renderer::{ContainmentEvent, RANKED_ZONES_SELECTION};

#[test]
fn test_replacing_entity_keeps_one_renderable() {
    let mut harness = Harness::new();
    let id = harness.add_model(EntityProperties::at(Vec3::new(2.0, 0.0, 0.0)));
    harness.tick();
    let first_item = harness.renderer.render_item_for_entity_id(id).expect("promoted");
    harness.take_ops();

    harness
        .tree
        .add_entity_with_id(id, EntityKind::Model, EntityProperties::at(Vec3::new(3.0, 0.0, 0.0)));
    harness.tick();

    assert_eq!(harness.renderer.renderable_count(), 1);
    let second_item = harness.renderer.render_item_for_entity_id(id).expect("promoted");
    assert_ne!(first_item, second_item);
    let ops = harness.take_ops();
    assert_eq!(adds_for(&ops, id), 1);
    assert!(ops.contains(&RenderOp::RemoveItem(first_item)));
}

#[test]
fn test_leaves_are_dispatched_before_enters() {
    let mut harness = Harness::new();
    let west = harness.add_zone(ZoneCullingMode::Inherit, Vec3::new(-10.0, 0.0, 0.0), 6.0);
    let east = harness.add_zone(ZoneCullingMode::Inherit, Vec3::new(10.0, 0.0, 0.0), 6.0);

    harness.move_observer(Vec3::new(-10.0, 0.0, 0.0));
    harness.tick();
    assert_eq!(harness.take_events(), vec![ContainmentEvent::Enter(west)]);

    harness.move_observer(Vec3::new(10.0, 0.0, 0.0));
    harness.tick();
    assert_eq!(
        harness.take_events(),
        vec![ContainmentEvent::Leave(west), ContainmentEvent::Enter(east)]
    );
    assert_eq!(harness.renderer.containing_entities(), vec![east]);
}

#[test]
fn test_quiet_tick_changes_nothing() {
    let mut harness = Harness::new();
    harness.add_zone(ZoneCullingMode::Outside, Vec3::zeros(), 10.0);
    harness.add_model(EntityProperties::at(Vec3::new(1.0, 0.0, 0.0)));
    harness.tick();
    let skip = harness.renderer.zone_cull_skip_list();
    let inside = harness.renderer.containing_entities();
    harness.take_events();
    harness.take_ops();

    harness.tick();
    harness.tick();

    assert!(harness.take_events().is_empty());
    assert!(harness.take_ops().is_empty());
    assert_eq!(harness.renderer.zone_cull_skip_list(), skip);
    assert_eq!(harness.renderer.containing_entities(), inside);
}

#[test]
fn test_layered_zones_rank_smallest_first() {
    let mut harness = Harness::new();
    let outer = harness.add_zone(ZoneCullingMode::Inherit, Vec3::zeros(), 40.0);
    let inner = harness
        .tree
        .add_entity(
            EntityKind::Zone(ZoneProperties::new(ZoneCullingMode::Inherit).with_flying_allowed(false)),
            EntityProperties::at(Vec3::zeros()).with_dimensions(Vec3::new(4.0, 4.0, 4.0)),
        )
        .id();
    harness.tick();

    assert_eq!(harness.renderer.layered_zone_ids(), vec![inner, outer]);
    assert_eq!(harness.renderer.zone_interaction_properties(), (false, true));

    let inner_item = harness.renderer.render_item_for_entity_id(inner).expect("promoted");
    let outer_item = harness.renderer.render_item_for_entity_id(outer).expect("promoted");
    let expected = RenderOp::ResetSelection {
        name: RANKED_ZONES_SELECTION.to_string(),
        items: vec![inner_item, outer_item],
    };
    assert!(harness.take_ops().contains(&expected));
}

#[test]
fn test_moved_zone_drops_out_of_layering() {
    let mut harness = Harness::new();
    let outer = harness.add_zone(ZoneCullingMode::Inherit, Vec3::zeros(), 40.0);
    let inner = harness.add_zone(ZoneCullingMode::Inherit, Vec3::zeros(), 4.0);
    harness.tick();
    assert_eq!(harness.renderer.layered_zone_ids(), vec![inner, outer]);

    harness
        .tree
        .edit_entity(inner, |state| state.position = Vec3::new(100.0, 0.0, 0.0));
    harness.tick();

    assert_eq!(harness.renderer.layered_zone_ids(), vec![outer]);
    assert_eq!(harness.renderer.zone_interaction_properties(), (true, true));
}

#[test]
fn test_changes_reported_from_another_thread() {
    let mut harness = Harness::new();
    let id = harness.add_model(EntityProperties::at(Vec3::new(5.0, 0.0, 0.0)));
    harness.tick();
    harness.take_ops();

    let notifier = harness.renderer.notifier();
    std::thread::spawn(move || notifier.entity_changed(id))
        .join()
        .expect("notifier thread");
    harness.tick();

    assert_eq!(updates_for(&harness.take_ops(), id), 1);
    assert_eq!(harness.renderer.pass_stats().updated, 1);
}

#[test]
fn test_edit_mode_demotes_prioritized_entities() {
    let mut harness = Harness::new();
    let id = harness.add_model(
        EntityProperties::at(Vec3::new(5.0, 0.0, 0.0))
            .with_priority(crate::entities::EntityPriority::Prioritized),
    );
    harness.tick();

    harness.renderer.set_edit_mode(true);
    harness.renderer.on_entity_changed(id);
    harness.tick();

    let stats = harness.renderer.pass_stats();
    assert_eq!(stats.prioritized, 0);
    assert_eq!(stats.total_needed, 1);
    assert_eq!(stats.updated, 1);
}

#[test]
fn test_stationary_observer_rechecks_on_interval() {
    let mut harness = Harness::new();
    let zone = harness.add_zone(ZoneCullingMode::Inherit, Vec3::new(50.0, 0.0, 0.0), 10.0);
    harness.tick();
    assert!(harness.renderer.containing_entities().is_empty());

    harness.tree.edit_entity(zone, |state| state.position = Vec3::zeros());
    harness.tick();
    assert!(harness.renderer.containing_entities().is_empty());

    harness.clock.advance(200 * crate::foundation::time::USECS_PER_MSEC);
    harness.tick();
    assert_eq!(harness.take_events(), vec![ContainmentEvent::Enter(zone)]);
}
