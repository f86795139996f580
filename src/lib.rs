//! lustre
//!
//! A minimal glTF viewer engine built on wgpu. This crate exposes a small
//! surface for constructing GPU resources, a single physically-based render
//! pipeline and a windowed render loop with an egui debug overlay. The design
//! emphasizes a thin, typed layer over the graphics stack: load a model into
//! mesh/material/texture tables, shade it with a Cook-Torrance PBR-lite
//! shader and expose the frame parameters through the overlay.
//!
//! High-level modules
//! - `app`: application config, the `Viewer` trait and the event/render loop
//! - `camera`: camera types and uniforms for view/projection
//! - `context`: central GPU and window context that owns device/queue/pipeline
//! - `data_structures`: engine data models (meshes, instances, textures)
//! - `overlay`: immediate-mode debug overlay (egui)
//! - `pipelines`: the PBR render pipeline and its shading uniforms
//! - `resources`: helpers to load glTF models and create GPU resources
//!

pub mod app;
pub mod camera;
pub mod context;
pub mod data_structures;
pub mod overlay;
pub mod pipelines;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use egui;
pub use winit::event::WindowEvent;
pub use wgpu::*;
