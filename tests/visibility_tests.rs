//! Visibility Gate Integration Tests
//!
//! Tests for:
//! - Gating render-loop callbacks on viewport intersection
//! - Headless fallback
//! - Reactive visibility signal

mod common;

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use arbor::{Rect, RenderLoop, SceneRegistry, VisibilityGate, VisibilitySettings};

use common::init_logger;

fn viewport() -> Rect {
    Rect::from_origin_size(0.0, 0.0, 1280.0, 720.0)
}

fn strict_gate() -> VisibilityGate {
    VisibilityGate::new(VisibilitySettings {
        margin: 0.0,
        threshold: 0.0,
    })
}

#[test]
fn offscreen_content_pauses_its_callback() {
    init_logger();
    let mut render_loop = RenderLoop::default();
    let mut registry = SceneRegistry::new();
    let calls = Rc::new(Cell::new(0));

    let counter = Rc::clone(&calls);
    let handle = render_loop.register(move |_| counter.set(counter.get() + 1));

    let mut gate = strict_gate();
    gate.set_viewport(viewport());
    gate.observe(Rect::from_origin_size(100.0, 100.0, 200.0, 200.0));
    let _binding = gate.gate(&handle);

    render_loop.tick(Duration::ZERO, &mut registry);
    assert_eq!(calls.get(), 1);

    // Scrolled out of view.
    gate.set_viewport(Rect::from_origin_size(0.0, 2000.0, 1280.0, 720.0));
    assert!(handle.is_paused());
    render_loop.tick(Duration::from_millis(16), &mut registry);
    assert_eq!(calls.get(), 1);

    // Back in view.
    gate.set_viewport(viewport());
    assert!(!handle.is_paused());
    render_loop.tick(Duration::from_millis(32), &mut registry);
    assert_eq!(calls.get(), 2);
}

#[test]
fn binding_applies_current_state_immediately() {
    let mut render_loop = RenderLoop::default();
    let handle = render_loop.register(|_| {});

    let mut gate = strict_gate();
    gate.set_viewport(viewport());
    gate.observe(Rect::from_origin_size(5000.0, 5000.0, 10.0, 10.0));
    assert!(!gate.visible());

    let _binding = gate.gate(&handle);
    assert!(handle.is_paused());
}

#[test]
fn dropping_the_binding_stops_gating() {
    let mut render_loop = RenderLoop::default();
    let handle = render_loop.register(|_| {});

    let mut gate = strict_gate();
    gate.set_viewport(viewport());
    gate.observe(Rect::from_origin_size(10.0, 10.0, 10.0, 10.0));
    drop(gate.gate(&handle));

    gate.observe(Rect::from_origin_size(5000.0, 5000.0, 10.0, 10.0));
    assert!(!gate.visible());
    assert!(!handle.is_paused());
}

#[test]
fn headless_gate_never_pauses() {
    let mut render_loop = RenderLoop::default();
    let handle = render_loop.register(|_| {});

    let mut gate = VisibilityGate::headless();
    assert!(!gate.is_supported());
    let _binding = gate.gate(&handle);
    gate.set_viewport(viewport());
    gate.observe(Rect::from_origin_size(9000.0, 9000.0, 1.0, 1.0));

    assert!(gate.visible());
    assert!(!handle.is_paused());
}

#[test]
fn visibility_signal_reports_transitions_only() {
    let mut gate = strict_gate();
    let transitions = Rc::new(Cell::new(0));
    let signal = gate.is_visible();
    let _sub = {
        let transitions = Rc::clone(&transitions);
        signal.subscribe(move || transitions.set(transitions.get() + 1))
    };

    gate.set_viewport(viewport());
    gate.observe(Rect::from_origin_size(0.0, 0.0, 10.0, 10.0));
    gate.observe(Rect::from_origin_size(20.0, 0.0, 10.0, 10.0));
    assert_eq!(transitions.get(), 0);

    gate.observe(Rect::from_origin_size(0.0, 900.0, 10.0, 10.0));
    assert_eq!(signal.get(), Some(false));
    gate.unobserve();
    assert_eq!(signal.get(), Some(true));
    assert_eq!(transitions.get(), 2);
}
