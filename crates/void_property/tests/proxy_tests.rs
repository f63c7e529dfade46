//! Foreign-thread writes through property proxies

use std::sync::Arc;
use std::thread;

use glam::Vec4;
use void_ecs::prelude::*;
use void_property::prelude::*;

struct Scene {
    world: Arc<World>,
    handle: ComponentHandle,
    manager: Arc<EngineValueManager>,
    rotation: Arc<StackProperty>,
}

fn scene(engine: &EngineThread) -> Scene {
    let world = Arc::new(World::new());
    let transform = world.register_component(
        ComponentInfo::new("Transform", 16).with_property(PropertyDescriptor::of::<Vec4>("rotation", 0)),
    );
    let entity = world.spawn();
    let handle = world.add_component(entity, transform).unwrap();

    let manager = Arc::new(EngineValueManager::new(
        world.clone(),
        Arc::new(ObjectRegistry::with_defaults()),
    ));
    let rotation = StackProperty::of("rotation", Vec4::ZERO);
    for value in manager.construct_values(handle) {
        rotation.push_value(value);
    }
    manager.sync(engine, EngineSyncDirection::FromEngine);
    Scene {
        world,
        handle,
        manager,
        rotation,
    }
}

#[test]
fn member_writes_coalesce_into_one_flush() {
    let engine = EngineThread::enter();
    let scene = scene(&engine);
    let queue = Arc::new(PollingTaskQueue::new("engine"));
    let proxy = Arc::new(PropertyProxy::<Vec4>::new(&scene.rotation, queue.clone(), ProxyOptions::default()).unwrap());

    let script = proxy.clone();
    thread::spawn(move || {
        assert_eq!(script.set_member("x", &HostValue::Number(1.0)), ReturnValue::Success);
        assert_eq!(script.set_member("y", &HostValue::Number(2.0)), ReturnValue::Success);
    })
    .join()
    .unwrap();

    // Nothing reaches native memory before the engine thread runs the flush
    assert_eq!(queue.pending(), 1);
    assert_eq!(scene.world.read_field::<Vec4>(scene.handle, 0).unwrap(), Vec4::ZERO);

    assert_eq!(queue.process_tasks(), 1);
    assert_eq!(proxy.flush_count(), 1);
    assert_eq!(
        scene.world.read_field::<Vec4>(scene.handle, 0).unwrap(),
        Vec4::new(1.0, 2.0, 0.0, 0.0)
    );
    assert_eq!(scene.rotation.get::<Vec4>(), Some(Vec4::new(1.0, 2.0, 0.0, 0.0)));
}

#[test]
fn last_write_wins() {
    let engine = EngineThread::enter();
    let scene = scene(&engine);
    let queue = Arc::new(PollingTaskQueue::new("engine"));
    let proxy = Arc::new(
        PropertyProxy::<Vec4>::with_engine(&scene.rotation, queue.clone(), scene.manager.clone(), ProxyOptions::default())
            .unwrap(),
    );

    let script = proxy.clone();
    thread::spawn(move || {
        for i in 1..=10 {
            script.set_value(Vec4::splat(i as f32));
        }
    })
    .join()
    .unwrap();

    assert_eq!(queue.process_tasks(), 1);
    assert_eq!(proxy.flush_count(), 1);
    assert_eq!(scene.world.read_field::<Vec4>(scene.handle, 0).unwrap(), Vec4::splat(10.0));
}

#[test]
fn engine_changes_reach_the_proxy() {
    let engine = EngineThread::enter();
    let scene = scene(&engine);
    let queue = Arc::new(PollingTaskQueue::new("engine"));
    let proxy = PropertyProxy::<Vec4>::new(&scene.rotation, queue, ProxyOptions::default()).unwrap();

    scene.world.write_field(scene.handle, 0, Vec4::new(0.0, 0.0, 0.0, 1.0)).unwrap();
    scene.manager.sync(&engine, EngineSyncDirection::FromEngine);
    assert_eq!(proxy.get_member("w"), Ok(HostValue::Number(1.0)));
    let expected: Vec<HostValue> = [0.0, 0.0, 0.0, 1.0].into_iter().map(HostValue::Number).collect();
    assert_eq!(proxy.to_host(), HostValue::Array(expected));
}

#[test]
fn manual_refresh_without_subscription() {
    let engine = EngineThread::enter();
    let scene = scene(&engine);
    let queue = Arc::new(PollingTaskQueue::new("engine"));
    let options = ProxyOptions {
        refresh_on_change: false,
        ..ProxyOptions::default()
    };
    let proxy = PropertyProxy::<Vec4>::new(&scene.rotation, queue, options).unwrap();

    scene.rotation.set(Vec4::ONE);
    assert_eq!(proxy.get_value(), Vec4::ZERO);
    assert_eq!(proxy.update_local_values(), ReturnValue::Success);
    assert_eq!(proxy.get_value(), Vec4::ONE);
}

#[test]
fn flush_off_engine_thread_defers_native_write() {
    let engine = EngineThread::enter();
    let scene = scene(&engine);
    let queue = Arc::new(ThreadedTaskQueue::new("flush").unwrap());
    let proxy = PropertyProxy::<Vec4>::new(&scene.rotation, queue.clone(), ProxyOptions::default()).unwrap();

    proxy.set_member("z", &HostValue::Number(3.0));
    queue.wait();
    assert_eq!(proxy.flush_count(), 1);
    assert_eq!(scene.rotation.get::<Vec4>(), Some(Vec4::new(0.0, 0.0, 3.0, 0.0)));
    assert_eq!(scene.world.read_field::<Vec4>(scene.handle, 0).unwrap(), Vec4::ZERO);

    scene.manager.sync(&engine, EngineSyncDirection::Auto);
    assert_eq!(
        scene.world.read_field::<Vec4>(scene.handle, 0).unwrap(),
        Vec4::new(0.0, 0.0, 3.0, 0.0)
    );
}

#[test]
fn host_values_are_checked() {
    let property = StackProperty::of("enabled", false);
    let queue = Arc::new(PollingTaskQueue::new("engine"));
    let proxy = PropertyProxy::<bool>::new(&property, queue.clone(), ProxyOptions::default()).unwrap();
    assert_eq!(proxy.set_member("value", &HostValue::Number(1.0)), ReturnValue::InvalidArgument);
    assert_eq!(proxy.set_host(&HostValue::Bool(true)), ReturnValue::Success);
    queue.process_tasks();
    assert_eq!(property.get::<bool>(), Some(true));
}

#[test]
fn clamped_flush_reloads_the_cache() {
    let property = StackProperty::of("scale", 10.0f32);
    property.add_modifier(Arc::new(ClampModifier::new(0.1f32, 10.0)));
    let queue = Arc::new(PollingTaskQueue::new("engine"));
    let proxy = PropertyProxy::<f32>::new(&property, queue.clone(), ProxyOptions::default()).unwrap();

    assert_eq!(proxy.set_value(50.0), ReturnValue::Success);
    assert_eq!(proxy.get_value(), 50.0);
    queue.process_tasks();

    assert_eq!(property.get::<f32>(), Some(10.0));
    assert!(!proxy.is_dirty());
    assert_eq!(proxy.get_value(), 10.0);
}

#[test]
fn vetoed_flush_reloads_the_cache() {
    let property = StackProperty::of("scale", 1.0f32);
    property.add_modifier(Arc::new(ReadOnlyModifier));
    let queue = Arc::new(PollingTaskQueue::new("engine"));
    let proxy = PropertyProxy::<f32>::new(&property, queue.clone(), ProxyOptions::default()).unwrap();

    proxy.set_value(3.0);
    queue.process_tasks();

    assert_eq!(proxy.flush_count(), 1);
    assert_eq!(property.get::<f32>(), Some(1.0));
    assert_eq!(proxy.get_value(), 1.0);
}

#[test]
fn observers_see_a_refreshed_proxy() {
    let property = StackProperty::of("scale", 1.0f32);
    let queue = Arc::new(PollingTaskQueue::new("engine"));
    let slot: Arc<parking_lot::Mutex<Option<Arc<PropertyProxy<f32>>>>> = Arc::new(parking_lot::Mutex::new(None));
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

    // Subscribed before the proxy exists
    let (s, observed) = (slot.clone(), seen.clone());
    property.on_changed().subscribe(move |_: &StackProperty| {
        if let Some(proxy) = s.lock().as_ref() {
            observed.lock().push(proxy.get_value());
        }
    });
    let proxy = Arc::new(PropertyProxy::<f32>::new(&property, queue, ProxyOptions::default()).unwrap());
    *slot.lock() = Some(proxy.clone());

    property.set(4.0f32);
    assert_eq!(*seen.lock(), vec![4.0]);
    slot.lock().take();
}
