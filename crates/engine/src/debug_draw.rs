use crate::math::Vec2;
use crate::nav::AiPath;
use crate::physics::{Collider, ColliderLayer, Shape};

pub const STATIC_COLLIDER_COLOR: [u8; 4] = [200, 80, 60, 255];
pub const DYNAMIC_COLLIDER_COLOR: [u8; 4] = [80, 220, 255, 255];
pub const TOUCHING_COLLIDER_COLOR: [u8; 4] = [255, 210, 60, 255];
pub const PATH_COLOR: [u8; 4] = [120, 255, 120, 255];
const WAYPOINT_HALF_SIZE: i32 = 2;

/// RGBA8 frame buffer, row-major, `width * height * 4` bytes.
#[derive(Debug)]
pub struct DebugFrame<'a> {
    rgba: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> DebugFrame<'a> {
    pub fn new(rgba: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            rgba,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for pixel in self.rgba.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let offset = self.byte_offset(x as i32, y as i32)?;
        let mut color = [0u8; 4];
        color.copy_from_slice(&self.rgba[offset..offset + 4]);
        Some(color)
    }

    /// Writes outside the frame are dropped.
    pub fn write_pixel_clipped(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if let Some(offset) = self.byte_offset(x, y) {
            self.rgba[offset..offset + 4].copy_from_slice(&color);
        }
    }

    fn byte_offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        let pixel_offset = (y as usize)
            .checked_mul(self.width as usize)?
            .checked_add(x as usize)?;
        let byte_offset = pixel_offset.checked_mul(4)?;
        let end = byte_offset.checked_add(4)?;
        if end > self.rgba.len() {
            return None;
        }
        Some(byte_offset)
    }

    pub fn draw_rect_outline(&mut self, left: i32, top: i32, right: i32, bottom: i32, color: [u8; 4]) {
        for x in left..=right {
            self.write_pixel_clipped(x, top, color);
            self.write_pixel_clipped(x, bottom, color);
        }
        for y in top..=bottom {
            self.write_pixel_clipped(left, y, color);
            self.write_pixel_clipped(right, y, color);
        }
    }

    /// Midpoint circle.
    pub fn draw_circle_outline(&mut self, cx: i32, cy: i32, radius: i32, color: [u8; 4]) {
        if radius <= 0 {
            self.write_pixel_clipped(cx, cy, color);
            return;
        }
        let mut x = radius;
        let mut y = 0;
        let mut error = 1 - radius;
        while x >= y {
            for (dx, dy) in [
                (x, y),
                (y, x),
                (-y, x),
                (-x, y),
                (-x, -y),
                (-y, -x),
                (y, -x),
                (x, -y),
            ] {
                self.write_pixel_clipped(cx + dx, cy + dy, color);
            }
            y += 1;
            if error < 0 {
                error += 2 * y + 1;
            } else {
                x -= 1;
                error += 2 * (y - x) + 1;
            }
        }
    }

    /// Bresenham line, endpoints inclusive.
    pub fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: [u8; 4]) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let step_x = if x < to.0 { 1 } else { -1 };
        let step_y = if y < to.1 { 1 } else { -1 };
        let mut error = dx + dy;
        loop {
            self.write_pixel_clipped(x, y, color);
            if x == to.0 && y == to.1 {
                break;
            }
            let doubled = 2 * error;
            if doubled >= dy {
                error += dy;
                x += step_x;
            }
            if doubled <= dx {
                error += dx;
                y += step_y;
            }
        }
    }

    fn draw_cross(&mut self, cx: i32, cy: i32, half_size: i32, color: [u8; 4]) {
        for x in (cx - half_size)..=(cx + half_size) {
            self.write_pixel_clipped(x, cy, color);
        }
        for y in (cy - half_size)..=(cy + half_size) {
            self.write_pixel_clipped(cx, y, color);
        }
    }
}

fn to_screen(point: Vec2, scroll: Vec2) -> (i32, i32) {
    let screen = point - scroll;
    (screen.x.round() as i32, screen.y.round() as i32)
}

fn collider_color(collider: &Collider) -> [u8; 4] {
    if collider.intersecting_count() > 0 {
        TOUCHING_COLLIDER_COLOR
    } else if collider.is_dynamic() {
        DYNAMIC_COLLIDER_COLOR
    } else {
        STATIC_COLLIDER_COLOR
    }
}

/// Outlines every collider. Colliders currently touching something are
/// highlighted regardless of kind.
pub fn draw_layer(frame: &mut DebugFrame<'_>, layer: &ColliderLayer, scroll: Vec2) {
    for collider in layer.iter() {
        let color = collider_color(collider);
        let (cx, cy) = to_screen(collider.center(), scroll);
        match collider.shape() {
            Shape::Circle { radius } => {
                frame.draw_circle_outline(cx, cy, radius.round() as i32, color);
            }
            Shape::Box {
                half_width,
                half_height,
            } => {
                let min = collider.center() - Vec2::new(half_width, half_height) - scroll;
                let max = collider.center() + Vec2::new(half_width, half_height) - scroll;
                // High edges are exclusive, so the outline stops one pixel short.
                frame.draw_rect_outline(
                    min.x.round() as i32,
                    min.y.round() as i32,
                    max.x.round() as i32 - 1,
                    max.y.round() as i32 - 1,
                    color,
                );
            }
        }
    }
}

pub fn draw_path(frame: &mut DebugFrame<'_>, path: &AiPath, scroll: Vec2) {
    let mut previous: Option<(i32, i32)> = None;
    for point in path.points() {
        let screen = to_screen(point, scroll);
        if let Some(previous) = previous {
            frame.draw_line(previous, screen, PATH_COLOR);
        }
        frame.draw_cross(screen.0, screen.1, WAYPOINT_HALF_SIZE, PATH_COLOR);
        previous = Some(screen);
    }
}
