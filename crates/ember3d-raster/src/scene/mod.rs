//! Frame input types and draw ordering.
//!
//! Responsibilities:
//! - describe the geometry engine's output (polygons, vertices, registers)
//! - derive render keys and the per-frame draw order
//! - coalesce equal-key runs into batches

mod frame;
mod key;
mod list;
mod polygon;
mod regs;
mod vertex;

pub use frame::FrameInput;
pub use key::{DrawClass, RenderKey};
pub use list::{RenderBatch, RenderList, RenderPolygon, MAX_POLYGONS};
pub use polygon::{attr, Polygon, PolygonFlags, PolygonMode, PolygonVertex};
pub use regs::{clear_attr1, ClearAttributes, DisplayControl, RenderRegisters};
pub use vertex::{expand_rgb5, Vertex};
