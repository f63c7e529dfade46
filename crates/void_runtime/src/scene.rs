//! Demo scene: one entity whose transform is driven from a script thread
//!
//! The main thread owns the world and is the engine thread. A second
//! thread plays the part of a script host, writing through proxies. Each
//! engine tick runs the queued proxy flushes, advances the native data and
//! synchronises both sides.

use std::mem::offset_of;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use void_core::ReturnValue;
use void_ecs::prelude::*;
use void_property::config::RuntimeConfig;
use void_property::prelude::*;
use void_property::registry;
use void_property::serialize::export_object;

const TICKS: u32 = 8;
const TICK: Duration = Duration::from_millis(16);

/// Native transform as the simulation stores it
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct Transform {
    rotation: Vec4,
    scale: f32,
    age: f32,
    _pad: [f32; 2],
}

fn transform_info() -> ComponentInfo {
    ComponentInfo::of::<Transform>("Transform")
        .with_property(PropertyDescriptor::of::<Vec4>("rotation", offset_of!(Transform, rotation)))
        .with_property(PropertyDescriptor::of::<f32>("scale", offset_of!(Transform, scale)))
        .with_property(PropertyDescriptor::of::<f32>("age", offset_of!(Transform, age)))
}

fn failed(what: &str, code: ReturnValue) -> Box<dyn std::error::Error> {
    format!("{} failed: {:?}", what, code).into()
}

/// Build the scene, run the engine loop and report the final state
pub fn run(config: &RuntimeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let engine = EngineThread::enter();
    let registry = registry::init();

    let world = Arc::new(World::new());
    let component = world.register_component(transform_info());
    let entity = world.spawn();
    let handle = world.add_component_with(
        entity,
        component,
        Transform {
            rotation: Vec4::W,
            scale: 1.0,
            age: 0.0,
            _pad: [0.0; 2],
        },
    )?;

    let manager = Arc::new(
        EngineValueManager::new(world.clone(), registry.clone()).with_options(config.engine_options()),
    );
    let player = MetaObject::new("player");
    for value in manager.construct_values(handle) {
        let field = value.params().descriptor.name.clone();
        let property = registry
            .create_property(value.type_uid(), &field)
            .ok_or_else(|| format!("no factory for '{}'", field))?;
        property.push_value(value);
        player.add_property(property);
    }
    manager.sync(&engine, EngineSyncDirection::FromEngine);
    log::info!("Scene ready: {} engine values on '{}'", manager.values().len(), player.name());

    let rotation = player.property("rotation").ok_or("missing rotation")?;
    let scale = player.property("scale").ok_or("missing scale")?;
    scale.add_modifier(Arc::new(ClampModifier::new(0.1f32, 10.0)));

    let queue = config.build_queue()?;
    let options = config.proxy_options();
    let rotation_proxy = Arc::new(
        PropertyProxy::<Vec4>::with_engine(&rotation, queue.as_dyn(), manager.clone(), options)
            .map_err(|code| failed("rotation proxy", code))?,
    );
    let scale_proxy = Arc::new(
        PropertyProxy::<f32>::with_engine(&scale, queue.as_dyn(), manager.clone(), options)
            .map_err(|code| failed("scale proxy", code))?,
    );

    let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
    let script = thread::Builder::new().name("script".into()).spawn({
        let rotation = rotation_proxy.clone();
        let scale = scale_proxy.clone();
        move || {
            for step in 1..=TICKS {
                let angle = step as f64 * 0.25;
                rotation.set_member("y", &HostValue::Number(angle.sin()));
                rotation.set_member("w", &HostValue::Number(angle.cos()));
                scale.set_value(step as f32 * 1.5);
                thread::sleep(TICK / 2);
            }
            let _ = done_tx.send(());
        }
    })?;

    let mut tick = 0u32;
    loop {
        let age = world.read_field::<f32>(handle, offset_of!(Transform, age))?;
        world.write_field(handle, offset_of!(Transform, age), age + TICK.as_secs_f32())?;

        let ran = queue.pump();
        let synced = manager.sync(&engine, EngineSyncDirection::Auto);
        log::debug!("tick {}: {} tasks, sync {:?}", tick, ran, synced);
        tick += 1;

        if done_rx.try_recv().is_ok() {
            break;
        }
        thread::sleep(TICK);
    }

    if script.join().is_err() {
        log::error!("script thread panicked");
    }
    queue.pump();
    manager.sync(&engine, EngineSyncDirection::Auto);

    let native: Transform = world.read_field(handle, 0)?;
    log::info!(
        "After {} ticks: rotation {:?}, scale {}, age {:.3}",
        tick,
        native.rotation,
        native.scale,
        native.age
    );
    log::info!(
        "Proxy flushes: rotation {}, scale {}",
        rotation_proxy.flush_count(),
        scale_proxy.flush_count()
    );

    let json = export_object(&player, &registry)?;
    log::info!("Exported '{}':\n{}", player.name(), serde_json::to_string_pretty(&json)?);

    drop(rotation_proxy);
    drop(scale_proxy);
    manager.remove_all();
    registry::shutdown();
    engine.leave();
    Ok(())
}
