//! Headless scene demo
//!
//! Builds a small scene of lights and primitives, clicks one of them through
//! the viewport and runs a few seconds of frames without a window.
//!
//! Usage: `scene_demo [config.toml|config.ron]`

use std::cell::Cell;
use std::error::Error;
use std::rc::Rc;

use scene_ecs::foundation::logging;
use scene_ecs::prelude::*;

const FRAMES: u64 = 120;

fn spawn(engine: &Engine, params: MeshParams) -> Result<EntityRef, EcsError> {
    let entity = pollster::block_on(engine.manager().create_entity_with_params(params))?;
    engine.manager().activate_entity(&entity);
    Ok(entity)
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut engine = match std::env::args().nth(1) {
        Some(path) => Engine::from_config_file(&path)?,
        None => Engine::new(EngineConfig::default()),
    };
    logging::init_with_filter(&engine.config().log_filter);

    engine.init()?;
    let manager = engine.manager();
    manager.add_system(InteractableSystem::new(manager))?;
    manager.add_system(EventActionSystem::new(manager))?;

    for kind in [LightKind::Ambient, LightKind::Directional] {
        spawn(&engine, MeshParams::Light(LightParams::new(kind)))?;
    }

    let cube = spawn(
        &engine,
        MeshParams::Primitive(PrimitiveParams::new(PrimitiveShape::Box).with_color(0x00ff_8800)),
    )?;
    cube.add_component(InteractableComponent::new());
    cube.add_component(
        ActionComponent::new().with_action(
            ActionData::new("rotateObject", names::CLICK).with_param("rotY", 0.02),
        ),
    );

    let clicks = Rc::new(Cell::new(0));
    let counter = Rc::clone(&clicks);
    cube.add_component(Behavior::new(names::CLICK, move |event| {
        counter.set(counter.get() + 1);
        log::info!("Cube clicked (entity {:?})", event.entity_id());
    }));

    let sphere = spawn(
        &engine,
        MeshParams::Primitive(PrimitiveParams::new(PrimitiveShape::Sphere)),
    )?;
    sphere.scene_object().transform_mut().position = Vec3::new(4.0, 0.0, 0.0);

    engine.run_frames(FRAMES / 2)?;

    // center of the default 800x600 viewport
    let click = PointerEvent::new(PointerKind::Click, 400.0, 300.0, 0.0);
    match engine.dispatch_pointer(&click) {
        Some(id) => log::info!("Pointer hit entity {}", id),
        None => log::warn!("Pointer hit nothing"),
    }

    engine.run_frames(FRAMES / 2)?;

    let rotation = cube.scene_object().transform().rotation.angle();
    log::info!(
        "Ran {} frames over {} entities; cube clicked {} time(s), rotated {:.3} rad",
        engine.frame_count(),
        engine.manager().entity_count(),
        clicks.get(),
        rotation
    );
    Ok(())
}
