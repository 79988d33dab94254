//! The frame manager: offscreen workspace, displayed-frame binding with
//! camera placement, and the tri-state dirty flag the rendering driver
//! polls once per tick.
//!
//! The camera placement is pure arithmetic over (window size, effective
//! texture size, player center, zoom, manual offset), so it is testable
//! without any surface at all.

use log::error;
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::frame::surface::Surface;
use crate::rect::Rect;

/// Redraw scheduling state.
///
/// Some double-buffered backends need the same image presented twice after
/// a change before the frame can be considered still; the intermediate
/// state carries that second present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Unchanged,
    BackbufferNeedsUpdate,
    Changed,
}

/// Logical window geometry and zoom factor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrameConfig {
    pub logical_width: i32,
    pub logical_height: i32,
    /// Integer scale applied when a frame is bound with zoom requested.
    pub zoom: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            logical_width: 640,
            logical_height: 360,
            zoom: 1,
        }
    }
}

/// The player's center point, the anchor for camera tracking.
#[derive(Debug, Clone, Copy)]
pub struct PlayerAnchor {
    pub center_x: i32,
    pub center_y: i32,
}

impl From<&Entity> for PlayerAnchor {
    fn from(entity: &Entity) -> Self {
        Self {
            center_x: entity.center_x(),
            center_y: entity.center_y(),
        }
    }
}

/// Which surface the displayed frame reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoundSource {
    Workspace,
    External,
}

/// The currently displayed frame: a bound surface plus derived source and
/// destination rectangles. The destination is never set directly; it falls
/// out of the camera math.
pub struct Frame {
    source: BoundSource,
    pub src: Rect,
    pub dst: Rect,
}

pub struct FrameManager {
    config: FrameConfig,
    /// Manual viewport offset added on top of the computed position.
    offset: (i32, i32),
    /// Whether to center on the player in large areas.
    centering: bool,
    workspace: Option<Surface>,
    /// Caller-supplied surface bound instead of the workspace; replaced
    /// (and the old one released) when superseded.
    external: Option<Surface>,
    frame: Option<Frame>,
    state: FrameState,
}

impl FrameManager {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            config,
            offset: (0, 0),
            centering: true,
            workspace: None,
            external: None,
            frame: None,
            state: FrameState::Unchanged,
        }
    }

    /// (Re)allocate the workspace at the given pixel size, releasing any
    /// previous allocation. Returns false if allocation fails.
    pub fn prepare(&mut self, width: u32, height: u32) -> bool {
        match Surface::new(width, height) {
            Ok(surface) => {
                self.workspace = Some(surface);
                true
            }
            Err(e) => {
                error!("frame: prepare: {}", e);
                false
            }
        }
    }

    /// Replace the displayed frame with the workspace (`source: None`) or a
    /// caller-owned surface, and recompute the viewport placement.
    ///
    /// Per axis: smaller-than-window content centers geometrically; larger
    /// content tracks the player's center clamped to the world edges when
    /// centering is enabled and an anchor exists, else centers. The manual
    /// offset is added last. Always marks the frame changed on success.
    pub fn frame(&mut self, source: Option<Surface>, zoom: bool, player: Option<PlayerAnchor>) -> bool {
        let bound = match source {
            Some(surface) => {
                self.external = Some(surface);
                BoundSource::External
            }
            None => BoundSource::Workspace,
        };
        let surface = match bound {
            BoundSource::Workspace => self.workspace.as_ref(),
            BoundSource::External => self.external.as_ref(),
        };
        let Some(surface) = surface else {
            error!("frame: no workspace prepared");
            return false;
        };

        let src = Rect::of_size(surface.width() as i32, surface.height() as i32);
        let zoom_factor = if zoom { self.config.zoom as i32 } else { 1 };
        let effective_w = src.w * zoom_factor;
        let effective_h = src.h * zoom_factor;

        let mut dst = Rect::new(
            axis_position(
                effective_w,
                self.config.logical_width,
                player.map(|p| p.center_x),
                zoom_factor,
                self.centering,
            ),
            axis_position(
                effective_h,
                self.config.logical_height,
                player.map(|p| p.center_y),
                zoom_factor,
                self.centering,
            ),
            effective_w,
            effective_h,
        );
        dst.x += self.offset.0;
        dst.y += self.offset.1;

        self.frame = Some(Frame { source: bound, src, dst });
        self.state = FrameState::Changed;
        true
    }

    /// Copy a rectangle of `src` onto the workspace. Best-effort: failures
    /// are logged and reported but don't abort remaining work.
    pub fn copy(&mut self, src: &Surface, src_rect: Rect, dst_rect: Rect) -> bool {
        let Some(workspace) = self.workspace.as_mut() else {
            error!("frame: copy: no workspace prepared");
            return false;
        };
        match workspace.blit(src, src_rect, dst_rect) {
            Ok(()) => {
                self.state = FrameState::Changed;
                true
            }
            Err(e) => {
                error!("frame: copy: {}", e);
                false
            }
        }
    }

    /// Set the manual viewport offset applied by the next `frame` call.
    pub fn set_offset(&mut self, x: i32, y: i32) {
        self.offset = (x, y);
    }

    /// Enable or disable player centering in large areas.
    pub fn set_centering(&mut self, centering: bool) {
        self.centering = centering;
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Driver-side consumption of the dirty flag, once per tick: returns
    /// the state to act on and steps Changed through the backbuffer
    /// re-present down to Unchanged.
    pub fn consume(&mut self) -> FrameState {
        let state = self.state;
        self.state = match state {
            FrameState::Changed => FrameState::BackbufferNeedsUpdate,
            _ => FrameState::Unchanged,
        };
        state
    }

    /// The displayed frame: its surface and source/destination rectangles.
    pub fn displayed(&self) -> Option<(&Surface, Rect, Rect)> {
        let frame = self.frame.as_ref()?;
        let surface = match frame.source {
            BoundSource::Workspace => self.workspace.as_ref()?,
            BoundSource::External => self.external.as_ref()?,
        };
        Some((surface, frame.src, frame.dst))
    }

    pub fn workspace(&self) -> Option<&Surface> {
        self.workspace.as_ref()
    }

    pub fn workspace_mut(&mut self) -> Option<&mut Surface> {
        self.workspace.as_mut()
    }
}

/// Viewport position along one axis.
///
/// Content smaller than the window centers. Content larger tracks the
/// player center (scaled by zoom) clamped so the visible region never
/// scrolls past the world's edges; without an anchor it centers.
fn axis_position(
    effective: i32,
    window: i32,
    player_center: Option<i32>,
    zoom: i32,
    centering: bool,
) -> i32 {
    if effective < window {
        return (window - effective) / 2;
    }
    if effective > window && centering {
        return match player_center {
            Some(center) => {
                let ideal = window / 2 - center * zoom;
                if ideal > 0 {
                    0
                } else if ideal < window - effective {
                    window - effective
                } else {
                    ideal
                }
            }
            None => (window - effective) / 2,
        };
    }
    0
}
