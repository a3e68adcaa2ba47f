use ecm_framework::prelude::*;

type Pose = Data<[f64; 3], 10>;

#[test]
fn create_entities_and_clear_newly_created() {
    let mut ecm = EntityComponentManager::new();

    let e1 = ecm.create_entity();
    let e2 = ecm.create_entity();
    let e3 = ecm.create_entity();

    assert_eq!(e1, 1);
    assert_eq!(e2, 2);
    assert_eq!(e3, 3);
    assert_eq!(ecm.entity_count(), 3);

    assert!(ecm.has_new_entities());
    assert!(ecm.is_new_entity(e1));
    assert!(ecm.is_new_entity(e2));
    assert!(ecm.is_new_entity(e3));

    ecm.clear_newly_created_entities();

    assert!(!ecm.has_new_entities());
    assert!(!ecm.is_new_entity(e1));
    assert!(!ecm.is_new_entity(e2));
    assert!(!ecm.is_new_entity(e3));

    // Entities survive the clear; only the new flag is dropped.
    assert_eq!(ecm.entity_count(), 3);
    assert!(ecm.has_entity(e1));
}

#[test]
fn null_entity_is_never_live() {
    let mut ecm = EntityComponentManager::new();
    let e1 = ecm.create_entity();

    assert!(!ecm.has_entity(NULL_ENTITY));
    assert_ne!(e1, NULL_ENTITY);
    assert_eq!(ecm.parent_entity(e1), NULL_ENTITY);
}

#[test]
fn parenting_and_descendants() {
    let mut ecm = EntityComponentManager::new();

    let e1 = ecm.create_entity();
    let e2 = ecm.create_entity();
    let e3 = ecm.create_entity();

    assert!(ecm.set_parent_entity(e2, e1));
    assert!(ecm.set_parent_entity(e3, e2));

    let descendants: Vec<Entity> = ecm.descendants(e1).into_iter().collect();
    assert_eq!(descendants, vec![e1, e2, e3]);
    assert_eq!(ecm.parent_entity(e3), e2);
    assert_eq!(ecm.parent_entity(e2), e1);

    // Unparenting invalidates the memoised closure.
    assert!(ecm.set_parent_entity(e3, NULL_ENTITY));
    let descendants: Vec<Entity> = ecm.descendants(e1).into_iter().collect();
    assert_eq!(descendants, vec![e1, e2]);
    assert_eq!(ecm.parent_entity(e3), NULL_ENTITY);

    // Reparenting replaces the previous parent.
    assert!(ecm.set_parent_entity(e3, e1));
    assert_eq!(ecm.parent_entity(e3), e1);
    assert_eq!(ecm.descendants(e1).len(), 3);
}

#[test]
fn parenting_to_unknown_entity_fails() {
    let mut ecm = EntityComponentManager::new();
    let e1 = ecm.create_entity();

    assert!(!ecm.set_parent_entity(e1, 42));
    assert_eq!(ecm.parent_entity(e1), NULL_ENTITY);
}

#[test]
fn descendants_of_unknown_entity_is_empty() {
    let ecm = EntityComponentManager::new();
    assert!(ecm.descendants(7).is_empty());
}

#[test]
fn staged_entities_exist_until_the_barrier() {
    let mut ecm = EntityComponentManager::new();
    let e1 = ecm.create_entity();

    ecm.request_remove_entity(e1, false);

    assert!(ecm.has_entity(e1));
    assert!(ecm.is_marked_for_removal(e1));
    assert!(ecm.has_entities_marked_for_removal());

    ecm.process_remove_entity_requests();

    assert!(!ecm.has_entity(e1));
    assert!(!ecm.is_marked_for_removal(e1));
    assert!(!ecm.has_entities_marked_for_removal());
    assert_eq!(ecm.entity_count(), 0);
}

#[test]
fn recursive_removal_stages_descendants() {
    let mut ecm = EntityComponentManager::new();

    let e1 = ecm.create_entity();
    let e2 = ecm.create_entity();
    let e3 = ecm.create_entity();
    let e4 = ecm.create_entity();
    ecm.set_parent_entity(e2, e1);
    ecm.set_parent_entity(e3, e2);

    ecm.request_remove_entity(e1, true);

    assert!(ecm.is_marked_for_removal(e1));
    assert!(ecm.is_marked_for_removal(e2));
    assert!(ecm.is_marked_for_removal(e3));
    assert!(!ecm.is_marked_for_removal(e4));

    ecm.process_remove_entity_requests();

    assert_eq!(ecm.entity_count(), 1);
    assert!(ecm.has_entity(e4));
}

#[test]
fn remove_all_wipes_the_world() {
    let mut ecm = EntityComponentManager::new();
    register_component::<Pose>().unwrap();

    let e1 = ecm.create_entity();
    let e2 = ecm.create_entity();
    ecm.create_component(e1, Pose::new([1.0, 2.0, 3.0]));

    ecm.request_remove_entities();
    assert!(ecm.is_marked_for_removal(e1));
    assert!(ecm.is_marked_for_removal(e2));

    ecm.process_remove_entity_requests();

    assert_eq!(ecm.entity_count(), 0);
    assert!(!ecm.has_entity(e1));
    assert!(!ecm.has_entity(e2));
    assert!(ecm.component::<Pose>(e1).is_none());
}

#[test]
fn entity_ids_are_not_reused_after_removal() {
    let mut ecm = EntityComponentManager::new();

    let e1 = ecm.create_entity();
    ecm.request_remove_entity(e1, false);
    ecm.process_remove_entity_requests();

    let e2 = ecm.create_entity();
    assert_ne!(e1, e2);
    assert_eq!(e2, 2);
}

#[test]
fn create_offset_moves_the_allocator() {
    let mut ecm = EntityComponentManager::new();

    ecm.set_entity_create_offset(100);
    let e = ecm.create_entity();
    assert_eq!(e, 101);
    assert!(ecm.has_entity(e));
}

#[test]
fn saturated_allocator_refuses_registration() {
    let mut ecm = EntityComponentManager::new();

    ecm.set_entity_create_offset(u64::MAX);

    let e = ecm.create_entity();
    assert_eq!(e, u64::MAX);
    assert!(!ecm.has_entity(e));
    assert_eq!(ecm.entity_count(), 0);

    // Further creations stay refused.
    let e = ecm.create_entity();
    assert_eq!(e, u64::MAX);
    assert_eq!(ecm.entity_count(), 0);
}

#[test]
fn scene_graph_labels_are_decimal_ids() {
    let mut ecm = EntityComponentManager::new();
    let e1 = ecm.create_entity();

    assert_eq!(ecm.entities().label(e1), Some("1"));
    assert_eq!(ecm.entities().label(99), None);
}
