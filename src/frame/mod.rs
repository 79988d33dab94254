//! Frame module - offscreen compositing and viewport placement
//!
//! The manager owns a software workspace surface, binds surfaces as the
//! displayed frame with camera-centering math, and tracks the tri-state
//! dirty flag the rendering driver consumes once per tick.

mod manager;
mod surface;

pub use manager::{Frame, FrameConfig, FrameManager, FrameState, PlayerAnchor};
pub use surface::{Surface, SurfaceError, MAX_SURFACE_DIM};
