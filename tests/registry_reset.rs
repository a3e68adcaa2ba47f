use ecm_framework::prelude::*;
use ecm_framework::{clear_registry, descriptor, has_type, new_default, new_from_bytes};

type Pose = Data<[f64; 3], 10>;

// Runs alone in this binary: clearing the global registry would race any
// sibling test relying on registrations.
#[test]
fn registry_supports_test_scoped_reset() {
    register_component::<Pose>().unwrap();
    assert!(has_type(10));

    let desc = descriptor(10).unwrap();
    assert_eq!(desc.type_id, 10);

    let component = new_default(10).unwrap();
    assert_eq!(component.component_type_id(), 10);

    let bytes = bincode::serialize(&[1.0f64, 2.0, 3.0]).unwrap();
    let component = new_from_bytes(10, &bytes).unwrap();
    let mut out = Vec::new();
    component.serialize(&mut out).unwrap();
    assert_eq!(out, bytes);

    clear_registry();
    assert!(!has_type(10));
    assert!(new_default(10).is_err());

    // Re-registration restores the type.
    register_component::<Pose>().unwrap();
    assert!(has_type(10));
}
