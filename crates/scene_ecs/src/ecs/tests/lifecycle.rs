use super::{manager, record, Mesh, MeshSystem};
use crate::ecs::components::{AnimationComponent, AnimationParams};
use crate::ecs::{EntityRef, SystemKind};
use crate::events::names;

#[test]
fn test_systems_without_update_calls_are_skipped() {
    let manager = manager();
    manager.add_system(MeshSystem::new(&manager, false)).unwrap();
    for _ in 0..100 {
        manager.update(0.016);
    }
    let updates = manager.with_system::<MeshSystem, _, _>(|system| system.updates);
    assert_eq!(updates, Some(0));
}

#[test]
fn test_systems_with_update_calls_run_every_frame() {
    let manager = manager();
    manager.add_system(MeshSystem::new(&manager, true)).unwrap();
    for _ in 0..100 {
        manager.update(0.016);
    }
    let updates = manager.with_system::<MeshSystem, _, _>(|system| system.updates);
    assert_eq!(updates, Some(100));
}

#[test]
fn test_manager_init_and_start_are_idempotent() {
    let manager = manager();
    manager.add_system(MeshSystem::new(&manager, false)).unwrap();
    let entity = manager.create_entity(None);
    entity.add_component(Mesh);
    let entity_inits = record(entity.events(), names::INIT);

    manager.init();
    manager.init();
    manager.start();
    manager.start();

    let counts = manager
        .with_system::<MeshSystem, _, _>(|system| (system.inits, system.starts))
        .unwrap();
    assert_eq!(counts, (1, 1));
    assert!(entity.is_started());
    assert!(entity_inits.borrow().is_empty());
}

#[test]
fn test_entity_start_event_fires_once() {
    let manager = manager();
    let entity = manager.create_entity(None);
    let starts = record(entity.events(), names::START);

    manager.activate_entity(&entity);
    manager.activate_entity(&entity);
    entity.start();
    assert_eq!(starts.borrow().len(), 1);
}

#[test]
fn test_remove_system_runs_destroy_once() {
    let manager = manager();
    let removing = record(manager.bus(), names::SYSTEM_REMOVING);
    let handle = manager.add_system(MeshSystem::new(&manager, false)).unwrap();

    assert!(manager.remove_system(MeshSystem::TYPE));
    assert!(!manager.remove_system(MeshSystem::TYPE));
    assert_eq!(removing.borrow().len(), 1);
    assert_eq!(handle.downcast_ref::<MeshSystem>().unwrap().destroys, 1);
    assert!(manager.system::<MeshSystem>().is_none());
}

#[test]
fn test_component_added_later_is_inited_and_tagged() {
    let manager = manager();
    let entity = manager.create_entity(None);
    manager.activate_entity(&entity);

    let handle = entity.add_component(Mesh);
    assert!(handle.is_inited());
    assert_eq!(handle.entity_id(), entity.id());
}

fn playing(entity: &EntityRef) -> bool {
    let handle = entity.component::<AnimationComponent>().unwrap();
    let playing = handle.downcast_ref::<AnimationComponent>().unwrap().is_playing();
    playing
}

#[test]
fn test_pause_and_resume_restore_autoplay() {
    let manager = manager();
    let entity = manager.create_entity(None);
    entity.add_component(AnimationComponent::new(AnimationParams {
        name: "Wave".to_string(),
        looping: true,
        autoplay: true,
        clamp_when_finished: false,
    }));
    manager.activate_entity(&entity);
    let pauses = record(entity.events(), names::PAUSE);
    let resumes = record(entity.events(), names::RESUME);
    assert!(playing(&entity));

    manager.pause();
    assert!(!playing(&entity));
    manager.resume();
    assert!(playing(&entity));
    assert_eq!((pauses.borrow().len(), resumes.borrow().len()), (1, 1));
}
