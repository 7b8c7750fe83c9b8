// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 rogem contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Triangle, rectangle and line rasterization
//!
//! Triangles use an integer edge-function inside test that accepts
//! both windings; quads split into two triangles sharing vertices 1-2.
//! Lines are Bresenham with per-pixel color stepping.

use super::super::primitives::{Color, TextureInfo, Vec2, Vertex};
use super::super::{GPU, VRAM_HEIGHT, VRAM_WIDTH};

/// Per-command raster controls derived from the command word
#[derive(Debug, Clone, Copy, Default)]
struct RasterFlags {
    shaded: bool,
    textured: bool,
    raw_texture: bool,
}

/// Integer edge function: twice the signed area of (a, b, c)
fn edge_function(a: Vec2, b: Vec2, c: Vec2) -> i32 {
    (c.x - a.x) * (b.y - a.y) - (c.y - a.y) * (b.x - a.x)
}

fn interpolate_color(c0: Color, c1: Color, c2: Color, alpha: f32, beta: f32, gamma: f32) -> Color {
    Color {
        r: (c0.r as f32 * alpha + c1.r as f32 * beta + c2.r as f32 * gamma) as u8,
        g: (c0.g as f32 * alpha + c1.g as f32 * beta + c2.g as f32 * gamma) as u8,
        b: (c0.b as f32 * alpha + c1.b as f32 * beta + c2.b as f32 * gamma) as u8,
    }
}

impl GPU {
    /// Draw the collected polygon command
    pub(in crate::core::gpu) fn draw_polygon(&mut self) {
        let flags = RasterFlags {
            shaded: self.current_cmd.shaded(),
            textured: self.current_cmd.textured(),
            raw_texture: self.current_cmd.raw_texture(),
        };
        let nb_vertices = self.current_cmd.vertex_count();
        let params = self.current_cmd.params();

        let flat_color = Color::from_command(params[0]);
        let mut verts = [Vertex::default(); 4];
        let mut tex_info = TextureInfo::default();

        let step = 1 + flags.shaded as usize + flags.textured as usize;
        for (i, vert) in verts.iter_mut().enumerate().take(nb_vertices) {
            let base = i * step;

            if flags.shaded {
                vert.color = Color::from_command(params[base]);
            }

            let pos = Vec2::from_word(params[base + 1]);
            vert.pos = Vec2::new(pos.x + self.draw_offset.x, pos.y + self.draw_offset.y);

            if flags.textured {
                let tex_word = params[base + 2];
                vert.u = tex_word as u8;
                vert.v = (tex_word >> 8) as u8;

                // The first vertex carries the CLUT, the second the
                // texture page
                if i == 0 {
                    tex_info.set_clut((tex_word >> 16) as u16);
                } else if i == 1 {
                    tex_info.set_page((tex_word >> 16) as u16);
                }
            }
        }

        self.raster_triangle(&verts[0..3], flat_color, &tex_info, flags);
        if nb_vertices == 4 {
            self.raster_triangle(&verts[1..4], flat_color, &tex_info, flags);
        }
    }

    /// Draw the collected rectangle command
    ///
    /// Textured rectangles sample with the GPU's current texture page;
    /// only the CLUT comes from the command.
    pub(in crate::core::gpu) fn draw_rectangle(&mut self) {
        let flags = RasterFlags {
            shaded: false,
            textured: self.current_cmd.textured(),
            raw_texture: self.current_cmd.raw_texture(),
        };
        let params = self.current_cmd.params();

        let color = Color::from_command(params[0]);
        let pos = Vec2::from_word(params[1]);
        let top_left = Vec2::new(pos.x + self.draw_offset.x, pos.y + self.draw_offset.y);

        let mut tex_info = TextureInfo::default();
        let mut base_u = 0u8;
        let mut base_v = 0u8;
        if flags.textured {
            let tex_word = params[2];
            base_u = tex_word as u8;
            base_v = (tex_word >> 8) as u8;
            tex_info.set_clut((tex_word >> 16) as u16);
            tex_info.page_x = self.status.tex_page_x as i32;
            tex_info.page_y = self.status.tex_page_y as i32;
            tex_info.depth = self.status.tex_depth;
        }

        let size = match self.current_cmd.rect_size() {
            Some(edge) => Vec2::new(edge, edge),
            None => Vec2::from_word(params[2 + flags.textured as usize]),
        };

        let solid = color.to_abgr1555();
        for y in 0..size.y {
            for x in 0..size.x {
                let pos = Vec2::new(top_left.x + x, top_left.y + y);
                let mut pixel = solid;

                if flags.textured {
                    let u = base_u.wrapping_add(x as u8);
                    let v = base_v.wrapping_add(y as u8);
                    let texel = self.sample_texture(u, v, &tex_info);
                    if texel == 0 {
                        continue;
                    }
                    pixel = if flags.raw_texture {
                        texel
                    } else {
                        modulate(texel, color)
                    };
                }
                self.set_pixel(pos, pixel);
            }
        }
    }

    /// Fill a rectangle with a solid color, ignoring the drawing
    /// environment (GP0 0x02)
    pub(in crate::core::gpu) fn quick_rect_fill(&mut self) {
        let params = self.current_cmd.params();
        let color = Color::from_command(params[0]).to_abgr1555();
        let top_left = Vec2::new((params[1] & 0xFFFF) as i32, (params[1] >> 16) as i32);
        let size = Vec2::new((params[2] & 0xFFFF) as i32, (params[2] >> 16) as i32);

        for y in 0..size.y {
            for x in 0..size.x {
                self.set_pixel(Vec2::new(top_left.x + x, top_left.y + y), color);
            }
        }
    }

    /// VRAM-to-VRAM rectangle copy (GP0 0x80)
    pub(in crate::core::gpu) fn vram_to_vram_copy(&mut self) {
        let params = self.current_cmd.params();
        let src = Vec2::new((params[1] & 0xFFFF) as i32, (params[1] >> 16) as i32);
        let dst = Vec2::new((params[2] & 0xFFFF) as i32, (params[2] >> 16) as i32);
        let size = Vec2::new((params[3] & 0xFFFF) as i32, (params[3] >> 16) as i32);

        for y in 0..size.y {
            for x in 0..size.x {
                let pixel = self.get_pixel(Vec2::new(src.x + x, src.y + y));
                self.set_pixel(Vec2::new(dst.x + x, dst.y + y), pixel);
            }
        }
    }

    /// Draw the collected line command (single segment or polyline)
    pub(in crate::core::gpu) fn draw_line(&mut self) {
        let shaded = self.current_cmd.shaded();
        let polyline = self.current_cmd.polyline();
        let params: Vec<u32> = self.current_cmd.params().to_vec();
        let step = 1 + shaded as usize;

        let mut v0 = Vertex {
            color: Color::from_command(params[0]),
            pos: Vec2::from_word(params[1]),
            ..Default::default()
        };
        let mut v1 = Vertex {
            color: if shaded {
                Color::from_command(params[2])
            } else {
                v0.color
            },
            pos: Vec2::from_word(params[2 + shaded as usize]),
            ..Default::default()
        };
        self.raster_line(v0, v1);

        if polyline {
            // Chain the remaining endpoint words; the terminator has
            // already been pushed and is never drawn
            let consumed = 3 + shaded as usize;
            let remaining = params.len().saturating_sub(1 + consumed);
            let segments = remaining / step;
            for i in 0..segments {
                v0 = v1;
                let base = consumed + step * i;
                if shaded {
                    v1.color = Color::from_command(params[base]);
                }
                v1.pos = Vec2::from_word(params[base + shaded as usize]);
                self.raster_line(v0, v1);
            }
        }
    }

    /// Barycentric triangle fill
    ///
    /// A fragment is inside when all three edge functions agree in
    /// sign (either winding).
    fn raster_triangle(
        &mut self,
        verts: &[Vertex],
        flat_color: Color,
        tex_info: &TextureInfo,
        flags: RasterFlags,
    ) {
        let (p0, p1, p2) = (verts[0].pos, verts[1].pos, verts[2].pos);

        let area = edge_function(p0, p1, p2);
        if area == 0 {
            return;
        }
        let inv_area = 1.0 / area as f32;

        let min_x = p0.x.min(p1.x).min(p2.x).max(0);
        let max_x = p0.x.max(p1.x).max(p2.x).min(VRAM_WIDTH - 1);
        let min_y = p0.y.min(p1.y).min(p2.y).max(0);
        let max_y = p0.y.max(p1.y).max(p2.y).min(VRAM_HEIGHT - 1);

        for y in min_y..max_y {
            for x in min_x..max_x {
                let p = Vec2::new(x, y);
                let w0 = edge_function(p1, p2, p);
                let w1 = edge_function(p2, p0, p);
                let w2 = edge_function(p0, p1, p);

                let all_pos = w0 >= 0 && w1 >= 0 && w2 >= 0;
                let all_neg = w0 <= 0 && w1 <= 0 && w2 <= 0;
                if !(all_pos || all_neg) {
                    continue;
                }

                let alpha = w0 as f32 * inv_area;
                let beta = w1 as f32 * inv_area;
                let gamma = w2 as f32 * inv_area;

                let mut color = flat_color;
                if flags.shaded {
                    color = interpolate_color(
                        verts[0].color,
                        verts[1].color,
                        verts[2].color,
                        alpha,
                        beta,
                        gamma,
                    );
                }

                let mut pixel = color.to_abgr1555();
                if flags.textured {
                    let u = (alpha * verts[0].u as f32
                        + beta * verts[1].u as f32
                        + gamma * verts[2].u as f32) as u8;
                    let v = (alpha * verts[0].v as f32
                        + beta * verts[1].v as f32
                        + gamma * verts[2].v as f32) as u8;

                    let texel = self.sample_texture(u, v, tex_info);
                    if texel == 0 {
                        continue;
                    }
                    pixel = if flags.raw_texture {
                        texel
                    } else {
                        modulate(texel, color)
                    };
                }

                self.set_pixel(p, pixel);
            }
        }
    }

    /// Bresenham line with per-pixel color interpolation
    fn raster_line(&mut self, v0: Vertex, v1: Vertex) {
        let mut x0 = v0.pos.x;
        let mut y0 = v0.pos.y;
        let x1 = v1.pos.x;
        let y1 = v1.pos.y;

        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx - dy;

        let steps = dx.max(dy).max(1) as f32;
        let dr = (v1.color.r as f32 - v0.color.r as f32) / steps;
        let dg = (v1.color.g as f32 - v0.color.g as f32) / steps;
        let db = (v1.color.b as f32 - v0.color.b as f32) / steps;

        let mut r = v0.color.r as f32;
        let mut g = v0.color.g as f32;
        let mut b = v0.color.b as f32;

        loop {
            let color = Color::new(r as u8, g as u8, b as u8);
            self.set_pixel(Vec2::new(x0, y0), color.to_abgr1555());

            if x0 == x1 && y0 == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x0 += sx;
            }
            if e2 < dx {
                err += dx;
                y0 += sy;
            }

            r = (r + dr).clamp(0.0, 255.0);
            g = (g + dg).clamp(0.0, 255.0);
            b = (b + db).clamp(0.0, 255.0);
        }
    }
}

/// Blend a texel with the command color by doubling the product
fn modulate(texel: u16, color: Color) -> u16 {
    let tex_r = ((texel & 0x1F) << 3) as u32;
    let tex_g = (((texel >> 5) & 0x1F) << 3) as u32;
    let tex_b = (((texel >> 10) & 0x1F) << 3) as u32;

    let r = ((tex_r * color.r as u32) / 128).min(255);
    let g = ((tex_g * color.g as u32) / 128).min(255);
    let b = ((tex_b * color.b as u32) / 128).min(255);

    0x8000 | (((b >> 3) as u16) << 10) | (((g >> 3) as u16) << 5) | (r >> 3) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_function_sign() {
        let a = Vec2::new(0, 0);
        let b = Vec2::new(10, 0);
        let c = Vec2::new(0, 10);
        let area = edge_function(a, b, c);
        let area_flipped = edge_function(a, c, b);
        assert_eq!(area, -area_flipped);
        assert_ne!(area, 0);
    }

    #[test]
    fn test_modulate_identity_at_128() {
        // A color channel of 128 leaves the texel untouched
        let texel = 0x7FFF;
        let out = modulate(texel, Color::new(128, 128, 128));
        assert_eq!(out & 0x7FFF, 0x7FFF);
        assert_ne!(out & 0x8000, 0);
    }

    #[test]
    fn test_modulate_doubles_and_saturates() {
        // Full-bright command color doubles the texel (clamped)
        let texel = 0x0010; // r = 16 of 31
        let out = modulate(texel, Color::new(255, 255, 255));
        assert_eq!(out & 0x1F, 31);
    }
}
