//! Engine values against a live ECS world

use std::sync::Arc;

use void_ecs::prelude::*;
use void_property::engine::ConflictPolicy;
use void_property::prelude::*;

struct Fixture {
    world: Arc<World>,
    manager: EngineValueManager,
    handle: ComponentHandle,
    entity: Entity,
}

fn fixture(intensity: f32) -> Fixture {
    let world = Arc::new(World::new());
    let light = world.register_component(
        ComponentInfo::new("Light", 20)
            .with_property(PropertyDescriptor::of::<f32>("intensity", 0))
            .with_property(PropertyDescriptor::of::<glam::Vec4>("color", 4)),
    );
    let entity = world.spawn();
    let handle = world.add_component(entity, light).unwrap();
    world.write_field(handle, 0, intensity).unwrap();
    let registry = Arc::new(ObjectRegistry::with_defaults());
    let manager = EngineValueManager::new(world.clone(), registry);
    Fixture {
        world,
        manager,
        handle,
        entity,
    }
}

fn intensity_params(f: &Fixture) -> EnginePropertyParams {
    let descriptor = f.world.descriptor(f.handle, "intensity").unwrap();
    EnginePropertyParams::new(f.handle, descriptor)
}

#[test]
fn sync_round_trip() {
    let engine = EngineThread::enter();
    let f = fixture(5.0);
    let value = f
        .manager
        .construct_value("Light.intensity", intensity_params(&f), EngineValueOptions::default())
        .unwrap();
    let p = StackProperty::of("intensity", 0.0f32);
    p.push_value(value.clone());

    assert_eq!(f.manager.sync(&engine, EngineSyncDirection::FromEngine), ReturnValue::Success);
    assert_eq!(p.get::<f32>(), Some(5.0));

    assert_eq!(p.set(7.0f32), ReturnValue::Success);
    assert!(value.is_dirty());
    assert_eq!(f.world.read_field::<f32>(f.handle, 0).unwrap(), 5.0);

    assert_eq!(f.manager.sync(&engine, EngineSyncDirection::ToEngine), ReturnValue::Success);
    assert_eq!(f.world.read_field::<f32>(f.handle, 0).unwrap(), 7.0);
    assert!(!value.is_dirty());
}

#[test]
fn auto_sync_follows_changed_side() {
    let engine = EngineThread::enter();
    let f = fixture(1.0);
    let value = f
        .manager
        .construct_value("Light.intensity", intensity_params(&f), EngineValueOptions::default())
        .unwrap();
    let p = StackProperty::of("intensity", 0.0f32);
    p.push_value(value);

    f.manager.sync(&engine, EngineSyncDirection::Auto);
    assert_eq!(p.get::<f32>(), Some(1.0));
    assert_eq!(f.manager.sync(&engine, EngineSyncDirection::Auto), ReturnValue::NothingToDo);

    f.world.write_field(f.handle, 0, 2.0f32).unwrap();
    f.manager.sync(&engine, EngineSyncDirection::Auto);
    assert_eq!(p.get::<f32>(), Some(2.0));

    p.set(3.0f32);
    f.manager.sync(&engine, EngineSyncDirection::Auto);
    assert_eq!(f.world.read_field::<f32>(f.handle, 0).unwrap(), 3.0);
}

#[test]
fn auto_conflict_follows_policy() {
    let engine = EngineThread::enter();
    for (policy, expected) in [(ConflictPolicy::ToEngine, 8.0f32), (ConflictPolicy::FromEngine, 9.0)] {
        let f = fixture(1.0);
        let options = EngineValueOptions {
            conflict: policy,
            ..EngineValueOptions::default()
        };
        let value = f
            .manager
            .construct_value("Light.intensity", intensity_params(&f), options)
            .unwrap();
        let p = StackProperty::of("intensity", 0.0f32);
        p.push_value(value);
        f.manager.sync(&engine, EngineSyncDirection::Auto);

        p.set(8.0f32);
        f.world.write_field(f.handle, 0, 9.0f32).unwrap();
        f.manager.sync(&engine, EngineSyncDirection::Auto);
        assert_eq!(p.get::<f32>(), Some(expected), "{:?}", policy);
        assert_eq!(f.world.read_field::<f32>(f.handle, 0).unwrap(), expected, "{:?}", policy);
    }
}

#[test]
fn stale_handle_falls_back_to_default() {
    let engine = EngineThread::enter();
    let f = fixture(5.0);
    let value = f
        .manager
        .construct_value("Light.intensity", intensity_params(&f), EngineValueOptions::default())
        .unwrap();
    let p = StackProperty::of("intensity", 0.0f32);
    p.push_value(value.clone());
    f.manager.sync(&engine, EngineSyncDirection::FromEngine);
    assert_eq!(p.get::<f32>(), Some(5.0));

    assert!(f.world.despawn(f.entity));
    assert_eq!(f.manager.sync(&engine, EngineSyncDirection::Auto), ReturnValue::Fail);
    assert!(!value.is_bound());
    assert_eq!(p.get::<f32>(), Some(0.0));

    let err = f
        .manager
        .construct_value("Light.intensity", intensity_params(&f), EngineValueOptions::default())
        .unwrap_err();
    assert_eq!(err, ReturnValue::InvalidArgument);
}

#[test]
fn type_mismatch_mutates_nothing() {
    let engine = EngineThread::enter();
    let f = fixture(5.0);
    // Declares a Vec4 where the native field is an f32
    let descriptor = PropertyDescriptor {
        type_uid: TypeUid::of::<glam::Vec4>(),
        ..f.world.descriptor(f.handle, "intensity").unwrap()
    };
    let value = f
        .manager
        .construct_value("Light.intensity", EnginePropertyParams::new(f.handle, descriptor), EngineValueOptions::default())
        .unwrap();
    let p = StackProperty::of("color", glam::Vec4::ONE);
    p.push_value(value.clone());

    assert_eq!(value.sync(&engine, EngineSyncDirection::FromEngine), ReturnValue::IncompatibleTypes);
    assert_eq!(value.sync(&engine, EngineSyncDirection::ToEngine), ReturnValue::IncompatibleTypes);
    assert_eq!(f.world.read_field::<f32>(f.handle, 0).unwrap(), 5.0);
    assert_eq!(p.get::<glam::Vec4>(), Some(glam::Vec4::ZERO));
}

#[test]
fn direct_push_with_mismatched_layout_writes_nothing() {
    let _engine = EngineThread::enter();
    let f = fixture(5.0);
    f.world.write_field(f.handle, 4, glam::Vec4::splat(9.0)).unwrap();
    let descriptor = PropertyDescriptor {
        type_uid: TypeUid::of::<glam::Vec4>(),
        ..f.world.descriptor(f.handle, "intensity").unwrap()
    };
    let options = EngineValueOptions {
        push_mode: PushMode::Direct,
        ..EngineValueOptions::default()
    };
    let value = f
        .manager
        .construct_value("Light.intensity", EnginePropertyParams::new(f.handle, descriptor), options)
        .unwrap();
    let p = StackProperty::of("color", glam::Vec4::ONE);
    p.push_value(value.clone());

    assert_eq!(value.set_value(&Any::new(glam::Vec4::new(1.0, 2.0, 3.0, 4.0))), ReturnValue::IncompatibleTypes);
    assert!(!value.is_dirty());

    // The stack falls back to a stored entry; native memory is untouched
    p.set(glam::Vec4::new(1.0, 2.0, 3.0, 4.0));
    assert_eq!(p.values().len(), 2);
    assert_eq!(f.world.read_field::<f32>(f.handle, 0).unwrap(), 5.0);
    assert_eq!(f.world.read_field::<glam::Vec4>(f.handle, 4).unwrap(), glam::Vec4::splat(9.0));
}

#[test]
fn overflowing_offset_is_rejected() {
    let engine = EngineThread::enter();
    let f = fixture(5.0);
    let color = f.world.descriptor(f.handle, "color").unwrap();
    let params = EnginePropertyParams {
        base_offset: usize::MAX,
        ..EnginePropertyParams::new(f.handle, color)
    };
    assert_eq!(params.offset(), None);
    let value = f
        .manager
        .construct_value("Light.color", params, EngineValueOptions::default())
        .unwrap();
    assert_eq!(value.sync(&engine, EngineSyncDirection::FromEngine), ReturnValue::InvalidArgument);
    assert_eq!(value.sync(&engine, EngineSyncDirection::ToEngine), ReturnValue::InvalidArgument);
    assert_eq!(f.world.read_field::<f32>(f.handle, 0).unwrap(), 5.0);
    assert_eq!(f.world.read_field::<glam::Vec4>(f.handle, 4).unwrap(), glam::Vec4::ZERO);
}

#[test]
fn one_way_values() {
    let engine = EngineThread::enter();
    let f = fixture(5.0);
    let options = EngineValueOptions {
        direction: EngineSyncDirection::FromEngine,
        ..EngineValueOptions::default()
    };
    let value = f
        .manager
        .construct_value("Light.intensity", intensity_params(&f), options)
        .unwrap();
    let p = StackProperty::of("intensity", 0.0f32);
    p.push_value(value.clone());
    f.manager.sync(&engine, EngineSyncDirection::Auto);

    // The engine entry declines the write, a stored entry takes it
    p.set(1.0f32);
    assert_eq!(p.values().len(), 2);
    assert_eq!(value.sync(&engine, EngineSyncDirection::ToEngine), ReturnValue::NotSupported);
    assert_eq!(f.world.read_field::<f32>(f.handle, 0).unwrap(), 5.0);
}

#[test]
fn direct_push_on_engine_thread() {
    let engine = EngineThread::enter();
    let f = fixture(0.0);
    let options = EngineValueOptions {
        push_mode: PushMode::Direct,
        ..EngineValueOptions::default()
    };
    let value = f
        .manager
        .construct_value("Light.intensity", intensity_params(&f), options)
        .unwrap();
    let p = StackProperty::of("intensity", 0.0f32);
    p.push_value(value.clone());
    f.manager.sync(&engine, EngineSyncDirection::FromEngine);

    p.set(2.0f32);
    assert_eq!(f.world.read_field::<f32>(f.handle, 0).unwrap(), 2.0);
    assert!(!value.is_dirty());
}

#[test]
fn construct_values_per_descriptor() {
    let f = fixture(0.0);
    let values = f.manager.construct_values(f.handle);
    let mut names: Vec<_> = values.iter().map(|v| v.name().to_string()).collect();
    names.sort();
    assert_eq!(names, ["Light.color", "Light.intensity"]);
    assert!(f.manager.value("Light.color").is_some());
    assert!(f.manager.remove_value("Light.color"));
    assert_eq!(f.manager.values().len(), 1);
}
