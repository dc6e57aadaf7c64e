//! Stage Integration Tests
//!
//! Tests for:
//! - Frame order: assembler sync, loop tick, render
//! - Demand-driven rendering via `FrameLoop`
//! - Teardown

mod common;

use std::time::Duration;

use arbor::scene::NodeKind;
use arbor::{AssemblyState, Camera, FrameLoop, Geometry, Material, ObjectAssembler, ObjectPatch, Stage, StageSettings};
use glam::Vec3;

use common::{CountingBackend, init_logger};

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn stage_with(frameloop: FrameLoop) -> (Stage, std::rc::Rc<std::cell::RefCell<common::BackendLog>>) {
    init_logger();
    let mut stage = Stage::new(StageSettings {
        frameloop,
        ..Default::default()
    });
    let (backend, log) = CountingBackend::new();
    stage.init_root(Camera::default(), backend);
    (stage, log)
}

fn spawn_cube(stage: &mut Stage, id: &str) -> arbor::runtime::AssemblerKey {
    let assembler = ObjectAssembler::new(id, NodeKind::Mesh);
    assembler.shape().producer().set(Geometry::new(format!("{id}.geometry")));
    assembler.appearance().producer().set(Material::default());
    stage.spawn(assembler)
}

#[test]
fn spawn_assembles_ready_objects_immediately() {
    let (mut stage, _log) = stage_with(FrameLoop::Always);
    let key = spawn_cube(&mut stage, "cube");
    assert_eq!(stage.assembler(key).unwrap().state(), AssemblyState::Assembled);
    assert!(stage.registry().is_reachable("cube"));
}

#[test]
fn advance_assembles_objects_whose_channels_fill_later() {
    let (mut stage, _log) = stage_with(FrameLoop::Always);
    let assembler = ObjectAssembler::new("late", NodeKind::Mesh);
    let shape = assembler.shape().producer();
    let appearance = assembler.appearance().producer();
    let key = stage.spawn(assembler);

    assert_eq!(stage.advance(ms(0)).assembled, 0);
    shape.set(Geometry::new("box"));
    appearance.set(Material::default());

    let outcome = stage.advance(ms(16));
    assert_eq!(outcome.assembled, 1);
    assert_eq!(stage.assembler(key).unwrap().state(), AssemblyState::Assembled);
}

#[test]
fn child_spawned_before_parent_attaches_under_it() {
    let (mut stage, _log) = stage_with(FrameLoop::Always);
    let child = ObjectAssembler::new("child", NodeKind::Mesh).with_parent("parent");
    child.shape().producer().set(Geometry::new("child.geometry"));
    child.appearance().producer().set(Material::default());
    let child_key = stage.spawn(child);

    assert_eq!(stage.assembler(child_key).unwrap().state(), AssemblyState::Assembled);
    assert!(!stage.registry().is_reachable("child"));
    assert_eq!(stage.registry().pending_ids().len(), 1);

    let parent_key = spawn_cube(&mut stage, "parent");
    stage.advance(ms(0));

    assert!(stage.registry().is_reachable("parent"));
    assert!(stage.registry().is_reachable("child"));
    assert!(!stage.registry().has_pending());
    let parent_node = stage.registry().entry("parent").unwrap().node();
    let child_node = stage.registry().entry("child").unwrap().node();
    assert_eq!(stage.registry().graph().parent(child_node), Some(parent_node));

    stage.despawn(parent_key);
    assert!(!stage.registry().has_object("child"));
}

#[test]
fn child_attaches_when_parent_assembles_on_a_later_frame() {
    let (mut stage, _log) = stage_with(FrameLoop::Always);
    let child = ObjectAssembler::new("child", NodeKind::Mesh).with_parent("parent");
    child.shape().producer().set(Geometry::new("child.geometry"));
    child.appearance().producer().set(Material::default());
    stage.spawn(child);

    let parent = ObjectAssembler::new("parent", NodeKind::Mesh);
    let shape = parent.shape().producer();
    let appearance = parent.appearance().producer();
    stage.spawn(parent);
    assert_eq!(stage.advance(ms(0)).reconciled, 0);

    shape.set(Geometry::new("parent.geometry"));
    appearance.set(Material::default());
    let outcome = stage.advance(ms(16));
    assert_eq!(outcome.assembled, 1);
    assert_eq!(outcome.reconciled, 1);
    assert!(stage.registry().is_reachable("child"));
}

#[test]
fn duplicate_id_is_rejected_once_and_not_retried_every_frame() {
    let (mut stage, _log) = stage_with(FrameLoop::Always);
    let first = spawn_cube(&mut stage, "twin");
    let second = spawn_cube(&mut stage, "twin");

    let rejected = stage.assembler(second).unwrap();
    assert_eq!(rejected.state(), AssemblyState::PartiallyReady);
    assert!(rejected.is_rejected());
    assert!(!rejected.needs_sync());

    for frame in 0..5 {
        assert_eq!(stage.advance(ms(frame * 16)).assembled, 0);
    }
    assert!(!stage.assembler(second).unwrap().needs_sync());
    assert_eq!(stage.registry().resources().geometry_count(), 1);
    assert_eq!(stage.assembler(first).unwrap().state(), AssemblyState::Assembled);
}

#[test]
fn demand_loop_renders_only_after_invalidation() {
    let (mut stage, log) = stage_with(FrameLoop::Demand);
    spawn_cube(&mut stage, "cube");

    // Registration requested a redraw.
    assert!(stage.advance(ms(0)).rendered);
    assert!(!stage.advance(ms(16)).rendered);
    assert!(!stage.advance(ms(32)).rendered);

    stage.registry_mut().update("cube", &ObjectPatch::new().opacity(0.5));
    assert!(stage.advance(ms(48)).rendered);
    assert_eq!(log.borrow().frames, 2);
}

#[test]
fn demand_loop_renders_after_callback_mutation() {
    let (mut stage, log) = stage_with(FrameLoop::Demand);
    let key = spawn_cube(&mut stage, "cube");
    stage.advance(ms(0));

    stage
        .on_frame(key, |frame| {
            frame.registry.update("cube", &ObjectPatch::new().position(Vec3::new(frame.elapsed, 0.0, 0.0)));
        })
        .unwrap()
        .unwrap();

    let outcome = stage.advance(ms(16));
    assert_eq!(outcome.callbacks, 1);
    assert!(outcome.rendered);
    assert_eq!(log.borrow().frames, 2);
}

#[test]
fn always_loop_renders_every_frame_and_never_loop_does_not() {
    let (mut stage, log) = stage_with(FrameLoop::Always);
    for t in 0..3 {
        assert!(stage.advance(ms(t * 16)).rendered);
    }
    assert_eq!(log.borrow().frames, 3);

    stage.set_frameloop(FrameLoop::Never);
    stage.registry_mut().invalidator().invalidate();
    assert!(!stage.advance(ms(64)).rendered);
    assert!(stage.render_now());
    assert_eq!(log.borrow().frames, 4);
}

#[test]
fn frame_uses_the_stage_clock() {
    let (mut stage, _log) = stage_with(FrameLoop::Never);
    stage.frame();
    stage.frame();
    assert_eq!(stage.render_loop().frame_count(), 2);
}

#[test]
fn despawn_removes_node_and_callback() {
    let (mut stage, log) = stage_with(FrameLoop::Always);
    let key = spawn_cube(&mut stage, "cube");
    let handle = stage.on_frame(key, |_| {}).unwrap().unwrap();

    let report = stage.despawn(key).unwrap();
    assert_eq!(report.geometries, 1);
    assert!(!handle.is_registered());
    assert!(stage.despawn(key).is_none());
    assert_eq!(log.borrow().count_geometry("cube.geometry"), 1);
}

#[test]
fn teardown_releases_everything() {
    let (mut stage, log) = stage_with(FrameLoop::Always);
    spawn_cube(&mut stage, "a");
    spawn_cube(&mut stage, "b");

    let report = stage.teardown();
    assert_eq!(report.geometries, 2);
    assert_eq!(log.borrow().geometries.len(), 2);
    assert_eq!(stage.assembler_count(), 0);
    assert!(stage.registry().is_empty());
    assert!(!stage.registry().is_ready());
    assert!(stage.render_loop().is_empty());
}
