//! End-to-end walkthroughs of the main tick paths

use super::harness::{adds_for, updates_for, Harness};
use crate::entities::{EntityId, EntityKind, EntityPriority, EntityProperties, ZoneCullingMode};
use crate::foundation::math::Vec3;
use crate::renderer::ContainmentEvent;

#[test]
fn test_prioritized_entity_is_updated_alone() {
    let mut harness = Harness::new();
    let id = harness.add_model(EntityProperties::at(Vec3::new(3.0, 0.0, 0.0)).with_priority(EntityPriority::Prioritized));
    harness.tick();
    assert!(harness.renderer.is_scene_ready());
    harness.take_ops();

    harness.tree.edit_entity(id, |state| state.position.y += 1.0);
    harness.tick();

    let stats = harness.renderer.pass_stats();
    assert_eq!(stats.prioritized, 1);
    assert_eq!(stats.total_needed, 0);
    assert_eq!(stats.prioritized + stats.updated, 1);
    assert_eq!(updates_for(&harness.take_ops(), id), 1);
}

#[test]
fn test_nested_disabled_zone_overrides_outside_zone() {
    let mut harness = Harness::new();
    let outer = harness.add_zone(ZoneCullingMode::Outside, Vec3::zeros(), 20.0);
    let inner = harness.add_zone(ZoneCullingMode::Disabled, Vec3::new(5.0, 0.0, 0.0), 4.0);
    let a = harness.add_model(EntityProperties::at(Vec3::new(-6.0, 2.0, 0.0)));
    let b = harness.add_model(EntityProperties::at(Vec3::new(-6.0, -2.0, 0.0)));
    let far = harness.add_model(EntityProperties::at(Vec3::new(100.0, 0.0, 0.0)));

    harness.move_observer(Vec3::new(-5.0, 0.0, 0.0));
    harness.tick();
    assert_eq!(harness.renderer.zone_culling_stack(), vec![outer]);
    let skip = harness.renderer.zone_cull_skip_list();
    assert!(skip.contains(&a));
    assert!(skip.contains(&b));
    assert!(!skip.contains(&far));

    harness.move_observer(Vec3::new(5.0, 0.0, 0.0));
    harness.tick();
    assert_eq!(harness.renderer.zone_culling_stack(), vec![outer, inner]);
    assert!(harness.renderer.zone_cull_skip_list().is_empty());
}

#[test]
fn test_leaving_only_zone_empties_culling_state() {
    let mut harness = Harness::new();
    let zone = harness.add_zone(ZoneCullingMode::Outside, Vec3::zeros(), 10.0);
    harness.add_model(EntityProperties::at(Vec3::new(1.0, 1.0, 1.0)));

    harness.tick();
    assert_eq!(harness.take_events(), vec![ContainmentEvent::Enter(zone)]);
    assert!(!harness.renderer.zone_cull_skip_list().is_empty());

    harness.move_observer(Vec3::new(50.0, 0.0, 0.0));
    harness.tick();
    harness.tick();

    assert_eq!(harness.take_events(), vec![ContainmentEvent::Leave(zone)]);
    assert!(harness.renderer.zone_culling_stack().is_empty());
    assert!(harness.renderer.zone_cull_skip_list().is_empty());
    assert!(harness.renderer.containing_entities().is_empty());
}

#[test]
fn test_incomplete_parent_chain_defers_promotion() {
    let mut harness = Harness::new();
    let outer = harness.add_zone(ZoneCullingMode::Inherit, Vec3::zeros(), 40.0);
    harness.tick();
    assert_eq!(harness.renderer.containing_entities(), vec![outer]);

    let parent_id = EntityId::new(500);
    let child = harness
        .tree
        .add_entity(
            EntityKind::Zone(crate::entities::ZoneProperties::new(ZoneCullingMode::Inherit)),
            EntityProperties::at(Vec3::zeros())
                .with_dimensions(Vec3::new(4.0, 4.0, 4.0))
                .with_parent(parent_id),
        )
        .id();

    for _ in 0..3 {
        harness.tick();
        assert_eq!(harness.renderer.pending_count(), 1);
        assert!(harness.renderer.renderable_for_entity_id(child).is_none());
        // No promotion, no forced recheck
        assert_eq!(harness.renderer.containing_entities(), vec![outer]);
    }
    assert_eq!(adds_for(&harness.take_ops(), child), 0);

    harness.tree.add_entity_with_id(
        parent_id,
        EntityKind::Shape,
        EntityProperties::at(Vec3::new(200.0, 0.0, 0.0)),
    );
    harness.tick();
    harness.tick();

    assert_eq!(harness.renderer.pending_count(), 0);
    assert!(harness.renderer.renderable_for_entity_id(child).is_some());
    assert_eq!(adds_for(&harness.take_ops(), child), 1);
    assert_eq!(harness.renderer.containing_entities(), vec![outer, child]);
}

#[test]
fn test_disabled_zone_entered_first_still_disables_culling() {
    let mut harness = Harness::new();
    let pavilion = harness.add_zone(ZoneCullingMode::Disabled, Vec3::new(5.0, 0.0, 0.0), 4.0);
    let plaza = harness.add_zone(ZoneCullingMode::Outside, Vec3::zeros(), 20.0);
    harness.add_model(EntityProperties::at(Vec3::new(-3.0, 0.0, 0.0)));

    harness.move_observer(Vec3::new(5.0, 0.0, 0.0));
    harness.tick();
    harness.tick();

    assert_eq!(harness.renderer.zone_culling_stack(), vec![pavilion, plaza]);
    assert!(harness.renderer.zone_cull_skip_list().is_empty());
}

#[test]
fn test_static_entities_refresh_when_culling_changes() {
    let mut harness = Harness::new();
    harness.add_zone(ZoneCullingMode::Outside, Vec3::zeros(), 10.0);
    let statue = harness.add_model(EntityProperties::at(Vec3::new(2.0, 0.0, 0.0)).with_priority(EntityPriority::Static));
    harness.move_observer(Vec3::new(100.0, 0.0, 0.0));
    harness.tick();
    assert!(harness.renderer.is_scene_ready());

    harness.tree.edit_entity(statue, |state| state.position.y += 1.0);
    harness.tick();
    assert_eq!(updates_for(&harness.take_ops(), statue), 0);

    harness.tick();
    assert_eq!(updates_for(&harness.take_ops(), statue), 0);

    harness.move_observer(Vec3::zeros());
    harness.tick();
    assert!(!harness.renderer.zone_culling_stack().is_empty());
    assert!(updates_for(&harness.take_ops(), statue) >= 1);

    harness.tick();
    assert_eq!(updates_for(&harness.take_ops(), statue), 0);
}
