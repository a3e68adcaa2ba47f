use ecm_framework::prelude::*;

type Pose = Data<[f64; 3], 10>;
type Twist = Data<[f64; 3], 20>;
type Name = Data<String, 30>;

fn setup() -> EntityComponentManager {
    let _ = env_logger::builder().is_test(true).try_init();
    register_component::<Pose>().unwrap();
    register_component::<Twist>().unwrap();
    register_component::<Name>().unwrap();
    EntityComponentManager::new()
}

#[test]
fn view_tracks_matching_entities() {
    let mut ecm = setup();
    let e1 = ecm.create_entity();

    ecm.create_component(e1, Pose::new([1.0; 3]));
    ecm.create_component(e1, Twist::new([2.0; 3]));

    let view = ecm.view(&[10, 20]);
    assert!(view.has_entity(e1));
    assert_eq!(view.entities().len(), 1);

    // Removing a required component drops the entity out of the view.
    ecm.remove_component(e1, 10);
    let view = ecm.view(&[10, 20]);
    assert!(!view.has_entity(e1));
    assert!(view.is_empty());

    // The removal is reported by the delta serialiser.
    let msg = ecm.changed_state();
    let entry = msg.entities.iter().find(|e| e.id == e1).unwrap();
    let removals: Vec<_> = entry.components.iter().filter(|c| c.remove).collect();
    assert_eq!(removals.len(), 1);
    assert_eq!(removals[0].type_id, 10);
    assert_eq!(removals[0].component, b" ".to_vec());
}

#[test]
fn view_key_is_order_insensitive() {
    let mut ecm = setup();
    let e1 = ecm.create_entity();
    ecm.create_component(e1, Pose::new([1.0; 3]));
    ecm.create_component(e1, Twist::new([2.0; 3]));

    let forward = ecm.view(&[10, 20]);
    let backward = ecm.view(&[20, 10]);
    assert_eq!(forward.component_types(), backward.component_types());
    assert_eq!(forward.entities(), backward.entities());

    // Both orders resolve to the same cached view.
    assert!(ecm.find_view(&[20, 10]).is_some());
    assert!(ecm.find_view(&[10, 20]).is_some());
}

#[test]
fn entities_added_later_join_existing_views() {
    let mut ecm = setup();
    let e1 = ecm.create_entity();
    ecm.create_component(e1, Pose::new([1.0; 3]));

    let view = ecm.view(&[10, 20]);
    assert!(view.is_empty());

    // Completing the type set queues the entity into the view.
    ecm.create_component(e1, Twist::new([2.0; 3]));
    let view = ecm.view(&[10, 20]);
    assert!(view.has_entity(e1));
}

#[test]
fn removing_then_readding_preserves_membership_across_a_barrier() {
    let mut ecm = setup();
    let e1 = ecm.create_entity();
    ecm.create_component(e1, Pose::new([1.0; 3]));
    ecm.create_component(e1, Twist::new([2.0; 3]));

    let view = ecm.view(&[10, 20]);
    assert!(view.has_entity(e1));

    ecm.remove_component(e1, 10);
    assert!(!ecm.view(&[10, 20]).has_entity(e1));

    ecm.create_component(e1, Pose::new([9.0; 3]));
    ecm.process_remove_entity_requests();

    let view = ecm.view(&[10, 20]);
    assert!(view.has_entity(e1));
    assert!(view.marked_for_removal().is_empty());
}

#[test]
fn new_this_tick_subset_follows_the_newly_created_set() {
    let mut ecm = setup();
    let e1 = ecm.create_entity();
    ecm.create_component(e1, Pose::new([1.0; 3]));

    let view = ecm.view(&[10]);
    assert!(view.new_entities().contains(&e1));

    ecm.clear_newly_created_entities();
    let view = ecm.view(&[10]);
    assert!(view.new_entities().is_empty());
    assert!(view.has_entity(e1));

    // Steady-state entities gaining components are not flagged new.
    let e2 = ecm.create_entity();
    ecm.clear_newly_created_entities();
    ecm.create_component(e2, Pose::new([2.0; 3]));
    let view = ecm.view(&[10]);
    assert!(view.has_entity(e2));
    assert!(view.new_entities().is_empty());
}

#[test]
fn recursive_removal_marks_views_and_barrier_empties_them() {
    let mut ecm = setup();
    let e1 = ecm.create_entity();
    let e2 = ecm.create_entity();
    let e3 = ecm.create_entity();
    ecm.set_parent_entity(e2, e1);
    ecm.set_parent_entity(e3, e2);
    for entity in [e1, e2, e3] {
        ecm.create_component(entity, Pose::new([entity as f64; 3]));
    }

    let view = ecm.view(&[10]);
    assert_eq!(view.entities().len(), 3);

    ecm.request_remove_entity(e1, true);

    let view = ecm.view(&[10]);
    let marked: Vec<Entity> = view.marked_for_removal().iter().copied().collect();
    assert_eq!(marked, vec![e1, e2, e3]);
    // Tombstoned entities are still members until the barrier.
    assert_eq!(view.entities().len(), 3);

    ecm.process_remove_entity_requests();

    assert_eq!(ecm.entity_count(), 0);
    let view = ecm.view(&[10]);
    assert!(view.is_empty());
    assert!(view.marked_for_removal().is_empty());
}

#[test]
fn rebuild_views_reflects_current_world() {
    let mut ecm = setup();
    let e1 = ecm.create_entity();
    let e2 = ecm.create_entity();
    ecm.create_component(e1, Pose::new([1.0; 3]));
    ecm.create_component(e2, Pose::new([2.0; 3]));
    ecm.create_component(e2, Name::new("arm".to_string()));

    let view = ecm.view(&[10]);
    assert_eq!(view.entities().len(), 2);

    ecm.rebuild_views();

    let view = ecm.view(&[10]);
    assert_eq!(view.entities().len(), 2);
    let view = ecm.view(&[10, 30]);
    assert!(view.has_entity(e2));
    assert!(!view.has_entity(e1));
}

#[test]
fn remove_all_invalidates_every_view() {
    let mut ecm = setup();
    let e1 = ecm.create_entity();
    ecm.create_component(e1, Pose::new([1.0; 3]));

    let view = ecm.view(&[10]);
    assert!(view.has_entity(e1));

    ecm.request_remove_entities();
    let view = ecm.view(&[10]);
    assert!(view.marked_for_removal().contains(&e1));

    ecm.process_remove_entity_requests();
    assert!(ecm.view(&[10]).is_empty());
}
