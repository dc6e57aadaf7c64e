//! Render Loop Integration Tests
//!
//! Tests for:
//! - Ordering and timing: registration order, delta/elapsed
//! - Isolation: panicking callbacks
//! - Pause/resume: skipped invocations, no delta jump
//! - Cancellation: unregister during and outside a tick

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use arbor::scene::{NodeKind, Object3D, ObjectPatch};
use arbor::{Camera, Geometry, HeadlessBackend, Material, RenderLoop, SceneRegistry};
use glam::Vec3;

use common::init_logger;

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn setup() -> (RenderLoop, SceneRegistry) {
    init_logger();
    (RenderLoop::default(), SceneRegistry::new())
}

#[test]
fn callbacks_run_in_registration_order() {
    let (mut render_loop, mut registry) = setup();
    let order = Rc::new(RefCell::new(Vec::new()));
    let _handles: Vec<_> = (0..5)
        .map(|i| {
            let order = Rc::clone(&order);
            render_loop.register(move |_| order.borrow_mut().push(i))
        })
        .collect();

    render_loop.tick(ms(0), &mut registry);
    assert_eq!(*order.borrow(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn delta_and_elapsed_follow_host_timestamps() {
    let (mut render_loop, mut registry) = setup();
    let samples = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&samples);
    let _handle = render_loop.register(move |frame| sink.borrow_mut().push((frame.delta, frame.elapsed, frame.frame)));

    render_loop.tick(ms(2000), &mut registry);
    render_loop.tick(ms(2016), &mut registry);
    render_loop.tick(ms(2048), &mut registry);

    let samples = samples.borrow();
    let (delta, elapsed, frame) = samples[2];
    assert!((delta - 0.032).abs() < 1e-4);
    assert!((elapsed - 0.048).abs() < 1e-4);
    assert_eq!(frame, 2);
}

#[test]
fn panicking_callback_is_isolated() {
    let (mut render_loop, mut registry) = setup();
    let first = Rc::new(Cell::new(0));
    let third = Rc::new(Cell::new(0));

    let counter = Rc::clone(&first);
    let _a = render_loop.register(move |_| counter.set(counter.get() + 1));
    let _b = render_loop.register(|_| panic!("callback failure"));
    let counter = Rc::clone(&third);
    let _c = render_loop.register(move |_| counter.set(counter.get() + 1));

    assert_eq!(render_loop.tick(ms(0), &mut registry), 3);
    assert_eq!((first.get(), third.get()), (1, 1));

    render_loop.tick(ms(16), &mut registry);
    assert_eq!((first.get(), third.get()), (2, 2));
}

#[test]
fn paused_callback_is_skipped_and_resumes_without_jump() {
    let (mut render_loop, mut registry) = setup();
    let deltas = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&deltas);
    let handle = render_loop
        .register_keyed("spinner", move |frame| sink.borrow_mut().push(frame.delta))
        .unwrap();

    render_loop.tick(ms(0), &mut registry);
    assert!(render_loop.pause("spinner"));
    assert!(handle.is_paused());

    let mut now = 0;
    for _ in 0..60 {
        now += 16;
        render_loop.tick(ms(now), &mut registry);
    }
    assert_eq!(deltas.borrow().len(), 1);

    assert!(render_loop.resume("spinner"));
    now += 16;
    render_loop.tick(ms(now), &mut registry);

    let deltas = deltas.borrow();
    assert_eq!(deltas.len(), 2);
    assert!((deltas[1] - 0.016).abs() < 1e-4, "delta after resume was {}", deltas[1]);
}

#[test]
fn hundred_callbacks_with_half_paused() {
    let (mut render_loop, mut registry) = setup();
    let records = Rc::new(RefCell::new(Vec::new()));

    for i in 0..100 {
        let records = Rc::clone(&records);
        render_loop
            .register_keyed(format!("cb-{i}"), move |_| records.borrow_mut().push(i))
            .unwrap();
    }
    for i in (0..100).step_by(2) {
        assert!(render_loop.pause(format!("cb-{i}").as_str()));
    }

    render_loop.tick(ms(0), &mut registry);
    assert_eq!(records.borrow().len(), 50);
    assert!(records.borrow().iter().all(|i| i % 2 == 1));
    assert_eq!(render_loop.active_count(), 50);
}

#[test]
fn unregister_during_own_invocation() {
    let (mut render_loop, mut registry) = setup();
    let self_calls = Rc::new(Cell::new(0));
    let later_calls = Rc::new(Cell::new(0));

    let counter = Rc::clone(&self_calls);
    let handle = render_loop.register(move |frame| {
        counter.set(counter.get() + 1);
        assert!(frame.handle().unregister());
    });
    let counter = Rc::clone(&later_calls);
    let _later = render_loop.register(move |_| counter.set(counter.get() + 1));

    for t in 0..3 {
        render_loop.tick(ms(t * 16), &mut registry);
    }

    assert_eq!(self_calls.get(), 1);
    assert_eq!(later_calls.get(), 3);
    assert!(!handle.is_registered());
    assert!(!handle.unregister());
}

#[test]
fn callback_removed_by_an_earlier_one_is_not_invoked() {
    let (mut render_loop, mut registry) = setup();
    let victim_calls = Rc::new(Cell::new(0));

    let victim_slot: Rc<RefCell<Option<arbor::UpdateHandle>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&victim_slot);
    let _killer = render_loop.register(move |_| {
        if let Some(victim) = slot.borrow().as_ref() {
            victim.unregister();
        }
    });
    let counter = Rc::clone(&victim_calls);
    let victim = render_loop.register(move |_| counter.set(counter.get() + 1));
    *victim_slot.borrow_mut() = Some(victim);

    render_loop.tick(ms(0), &mut registry);
    render_loop.tick(ms(16), &mut registry);
    assert_eq!(victim_calls.get(), 0);
    assert_eq!(render_loop.len(), 1);
}

#[test]
fn redundant_unregister_is_a_noop() {
    let (mut render_loop, _registry) = setup();
    let handle = render_loop.register(|_| {});
    let copy = handle.clone();
    assert!(handle.unregister());
    assert!(!copy.unregister());
    assert!(render_loop.is_empty());
}

#[test]
fn unknown_ids_are_ignored_by_pause_and_resume() {
    let (mut render_loop, _registry) = setup();
    assert!(!render_loop.pause("nobody"));
    assert!(!render_loop.resume("nobody"));
}

#[test]
fn callback_mutations_request_redraw() {
    let (mut render_loop, mut registry) = setup();
    registry.init_root(Camera::default(), Box::new(HeadlessBackend::default()));
    registry
        .register("cube", Object3D::mesh("cube", Geometry::new("box"), Material::default()), NodeKind::Mesh, None)
        .unwrap();
    registry.invalidator().take();

    let _spin = render_loop.register(|frame| {
        let patch = ObjectPatch::new().rotation(Vec3::new(0.0, frame.elapsed, 0.0));
        frame.registry.update("cube", &patch);
    });

    render_loop.tick(ms(0), &mut registry);
    assert!(registry.invalidator().take());
    render_loop.tick(ms(500), &mut registry);
    let rotation = registry.get_object("cube").unwrap().transform.rotation_euler();
    assert!((rotation.y - 0.5).abs() < 1e-4);
}

#[test]
fn handles_outlive_the_loop_safely() {
    let handle = {
        let mut render_loop = RenderLoop::default();
        render_loop.register(|_| {})
    };
    assert!(!handle.is_registered());
    assert!(!handle.pause());
    assert!(!handle.unregister());
}
