//! Shared test doubles.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use arbor::ArborError;
use arbor::scene::{Geometry, GeometryHandle, Material, MaterialHandle, RenderBackend, RenderFrame, Texture};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Everything a [`CountingBackend`] was asked to do.
#[derive(Debug, Default)]
pub struct BackendLog {
    pub frames: u64,
    pub geometries: Vec<String>,
    pub materials: Vec<String>,
    pub textures: Vec<String>,
}

impl BackendLog {
    pub fn count_geometry(&self, name: &str) -> usize {
        self.geometries.iter().filter(|g| g.as_str() == name).count()
    }

    pub fn count_material(&self, name: &str) -> usize {
        self.materials.iter().filter(|m| m.as_str() == name).count()
    }
}

/// Backend that records every render and disposal call.
///
/// Disposing a geometry whose name is in `fail_on` returns an error after
/// recording the call; one in `panic_on` panics instead.
pub struct CountingBackend {
    log: Rc<RefCell<BackendLog>>,
    fail_on: Vec<String>,
    panic_on: Vec<String>,
}

impl CountingBackend {
    pub fn new() -> (Box<Self>, Rc<RefCell<BackendLog>>) {
        Self::failing_on(&[])
    }

    pub fn failing_on(names: &[&str]) -> (Box<Self>, Rc<RefCell<BackendLog>>) {
        let log = Rc::new(RefCell::new(BackendLog::default()));
        let backend = Self {
            log: Rc::clone(&log),
            fail_on: names.iter().map(|n| (*n).to_string()).collect(),
            panic_on: Vec::new(),
        };
        (Box::new(backend), log)
    }

    pub fn panicking_on(names: &[&str]) -> (Box<Self>, Rc<RefCell<BackendLog>>) {
        let (mut backend, log) = Self::new();
        backend.panic_on = names.iter().map(|n| (*n).to_string()).collect();
        (backend, log)
    }
}

impl RenderBackend for CountingBackend {
    fn label(&self) -> &str {
        "CountingBackend"
    }

    fn render(&mut self, _frame: &RenderFrame<'_>) {
        self.log.borrow_mut().frames += 1;
    }

    fn dispose_geometry(&mut self, _handle: GeometryHandle, geometry: &Geometry) -> arbor::Result<()> {
        self.log.borrow_mut().geometries.push(geometry.name.clone());
        if self.fail_on.contains(&geometry.name) {
            return Err(ArborError::dispose(geometry.name.clone(), "simulated driver failure"));
        }
        if self.panic_on.contains(&geometry.name) {
            panic!("driver crashed releasing '{}'", geometry.name);
        }
        Ok(())
    }

    fn dispose_material(&mut self, _handle: MaterialHandle, material: &Material) -> arbor::Result<()> {
        self.log.borrow_mut().materials.push(material.name.clone());
        Ok(())
    }

    fn dispose_texture(&mut self, texture: &Texture) -> arbor::Result<()> {
        self.log.borrow_mut().textures.push(texture.name.clone());
        Ok(())
    }
}
