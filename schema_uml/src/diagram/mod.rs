//! Diagram module for schema_uml
//!
//! This module turns a table set into PlantUML text and, optionally, an image.

pub mod raster;
pub mod renderer;
pub mod template;

// Re-export key types
pub use raster::Rasterizer;
pub use renderer::{render_diagram, DiagramRenderer};
pub use template::{Template, TemplateContext};
