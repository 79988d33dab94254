//! Software composition surface: an RGBA pixel buffer with a clipped,
//! scaling rectangle copy. This is the workspace the frame manager
//! composes into; a rendering backend uploads it for display.

use crate::rect::Rect;

/// Dimension cap so a malformed prepare call can't exhaust memory.
pub const MAX_SURFACE_DIM: u32 = 16384;

#[derive(Debug)]
pub enum SurfaceError {
    /// Zero or over-cap dimensions.
    BadSize(u32, u32),
    /// Source rectangle falls outside the source surface.
    BadSourceRect(Rect),
}

impl std::fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceError::BadSize(w, h) => {
                write!(f, "invalid surface size {}x{} (cap {})", w, h, MAX_SURFACE_DIM)
            }
            SurfaceError::BadSourceRect(r) => {
                write!(f, "source rect {},{} {}x{} outside surface", r.x, r.y, r.w, r.h)
            }
        }
    }
}

impl std::error::Error for SurfaceError {}

/// An owned RGBA8888 pixel buffer.
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>, // 4 bytes per pixel
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Result<Self, SurfaceError> {
        if width == 0 || height == 0 || width > MAX_SURFACE_DIM || height > MAX_SURFACE_DIM {
            return Err(SurfaceError::BadSize(width, height));
        }
        Ok(Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Fill the whole surface with one color.
    pub fn clear(&mut self, rgba: [u8; 4]) {
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&rgba);
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]])
    }

    pub fn put_pixel(&mut self, x: i32, y: i32, rgba: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[i..i + 4].copy_from_slice(&rgba);
    }

    /// Copy `src_rect` of `src` into `dst_rect` of this surface,
    /// nearest-neighbor scaled when the rectangles differ in size and
    /// clipped against this surface's bounds.
    pub fn blit(&mut self, src: &Surface, src_rect: Rect, dst_rect: Rect) -> Result<(), SurfaceError> {
        let src_bounds = Rect::of_size(src.width as i32, src.height as i32);
        if src_rect.is_empty()
            || src_rect.intersect(&src_bounds) != Some(src_rect)
        {
            return Err(SurfaceError::BadSourceRect(src_rect));
        }
        if dst_rect.is_empty() {
            return Ok(());
        }

        let own_bounds = Rect::of_size(self.width as i32, self.height as i32);
        let Some(visible) = dst_rect.intersect(&own_bounds) else {
            return Ok(());
        };

        for dy in visible.y..visible.bottom() {
            for dx in visible.x..visible.right() {
                let sx = src_rect.x + (dx - dst_rect.x) * src_rect.w / dst_rect.w;
                let sy = src_rect.y + (dy - dst_rect.y) * src_rect.h / dst_rect.h;
                if let Some(rgba) = src.pixel(sx, sy) {
                    self.put_pixel(dx, dy, rgba);
                }
            }
        }
        Ok(())
    }
}
