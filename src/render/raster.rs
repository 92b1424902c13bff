use glam::{Vec2, Vec3, Vec4};

use crate::depth::DepthConvention;
use crate::render::Framebuffer;

/// Values that can be interpolated across a triangle.
pub trait Interpolate: Copy {
    fn mix(a: &Self, b: &Self, c: &Self, weights: Vec3) -> Self;

    fn lerp(a: &Self, b: &Self, t: f32) -> Self {
        Self::mix(a, b, b, Vec3::new(1.0 - t, t, 0.0))
    }
}

impl Interpolate for f32 {
    fn mix(a: &Self, b: &Self, c: &Self, weights: Vec3) -> Self {
        a * weights.x + b * weights.y + c * weights.z
    }
}

impl Interpolate for Vec2 {
    fn mix(a: &Self, b: &Self, c: &Self, weights: Vec3) -> Self {
        *a * weights.x + *b * weights.y + *c * weights.z
    }
}

impl Interpolate for Vec3 {
    fn mix(a: &Self, b: &Self, c: &Self, weights: Vec3) -> Self {
        *a * weights.x + *b * weights.y + *c * weights.z
    }
}

impl Interpolate for Vec4 {
    fn mix(a: &Self, b: &Self, c: &Self, weights: Vec3) -> Self {
        *a * weights.x + *b * weights.y + *c * weights.z
    }
}

/// Vertex stage output: clip-space position plus varyings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipVertex<V> {
    pub position: Vec4,
    pub varyings: V,
}

impl<V: Interpolate> ClipVertex<V> {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            position: self.position.lerp(other.position, t),
            varyings: V::lerp(&self.varyings, &other.varyings, t),
        }
    }
}

/// Shaded fragment. `depth` replaces the interpolated depth when set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub color: Vec4,
    pub depth: Option<f32>,
}

impl Fragment {
    pub fn color(color: Vec4) -> Self {
        Self { color, depth: None }
    }
}

/// How triangles are turned into fragments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PolygonMode {
    #[default]
    Fill,
    /// Only the edges of each (clipped) triangle, one pixel wide.
    Line,
}

const LINE_HALF_WIDTH: f32 = 0.5;

/// Lane order of a quad: top-left, top-right, bottom-left, bottom-right.
const QUAD_OFFSETS: [(u32, u32); 4] = [(0, 0), (1, 0), (0, 1), (1, 1)];

/// Fragment kernel invoked once per 2x2 quad.
pub trait FragmentStage {
    type Varyings: Interpolate;

    fn shade_quad(&self, lanes: &[Self::Varyings; 4]) -> [Fragment; 4];
}

/// `fwidth` over one quad: `|ddx| + |ddy|` from the top-left lane.
pub fn coarse_fwidth(values: [Vec2; 4]) -> Vec2 {
    (values[1] - values[0]).abs() + (values[2] - values[0]).abs()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub triangles: usize,
    /// Triangles entirely behind the near plane or degenerate.
    pub culled: usize,
    /// Triangles referencing vertices that do not exist.
    pub invalid: usize,
    pub covered: usize,
    /// Fragments that passed the depth test.
    pub written: usize,
}

impl std::ops::AddAssign for DrawStats {
    fn add_assign(&mut self, other: Self) {
        self.triangles += other.triangles;
        self.culled += other.culled;
        self.invalid += other.invalid;
        self.covered += other.covered;
        self.written += other.written;
    }
}

#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    position: Vec2,
    depth: f32,
    inv_w: f32,
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Tie-break for pixel centers exactly on an edge: of two triangles
/// sharing the edge, only one owns it.
fn owns_edge(a: Vec2, b: Vec2) -> bool {
    b.y < a.y || (b.y == a.y && b.x < a.x)
}

fn blend(src: Vec4, dst: Vec4) -> Vec4 {
    let a = src.w;
    let rgb = src.truncate() * a + dst.truncate() * (1.0 - a);
    rgb.extend(a + dst.w * (1.0 - a))
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rasterizer {
    pub convention: DepthConvention,
}

impl Rasterizer {
    pub fn new(convention: DepthConvention) -> Self {
        Self { convention }
    }

    /// Draws an indexed triangle list into `target`.
    pub fn draw<S: FragmentStage>(
        &self,
        target: &mut Framebuffer,
        vertices: &[ClipVertex<S::Varyings>],
        indices: &[u32],
        stage: &S,
    ) -> DrawStats {
        self.draw_with_mode(target, vertices, indices, stage, PolygonMode::Fill)
    }

    pub fn draw_with_mode<S: FragmentStage>(
        &self,
        target: &mut Framebuffer,
        vertices: &[ClipVertex<S::Varyings>],
        indices: &[u32],
        stage: &S,
        mode: PolygonMode,
    ) -> DrawStats {
        let mut stats = DrawStats::default();
        for triangle in indices.chunks_exact(3) {
            let fetch = |index: u32| vertices.get(index as usize).copied();
            let (Some(a), Some(b), Some(c)) = (fetch(triangle[0]), fetch(triangle[1]), fetch(triangle[2]))
            else {
                stats.invalid += 1;
                continue;
            };
            stats.triangles += 1;

            let polygon = self.clip_near(&[a, b, c]);
            if polygon.len() < 3 {
                stats.culled += 1;
                continue;
            }
            let mut drawn = false;
            match mode {
                PolygonMode::Fill => {
                    for i in 1..polygon.len() - 1 {
                        drawn |= self.fill(
                            target,
                            [polygon[0], polygon[i], polygon[i + 1]],
                            stage,
                            &mut stats,
                        );
                    }
                }
                PolygonMode::Line => {
                    for i in 0..polygon.len() {
                        let next = (i + 1) % polygon.len();
                        drawn |= self.stroke(target, [polygon[i], polygon[next]], stage, &mut stats);
                    }
                }
            }
            if !drawn {
                stats.culled += 1;
            }
        }
        stats
    }

    /// Sutherland-Hodgman against the near plane only.
    fn clip_near<V: Interpolate>(&self, triangle: &[ClipVertex<V>; 3]) -> Vec<ClipVertex<V>> {
        let distance = |v: &ClipVertex<V>| {
            self.convention
                .near_plane_distance(v.position.z, v.position.w)
        };
        let mut out = Vec::with_capacity(4);
        for i in 0..3 {
            let current = &triangle[i];
            let next = &triangle[(i + 1) % 3];
            let (dc, dn) = (distance(current), distance(next));
            if dc >= 0.0 {
                out.push(*current);
            }
            if (dc >= 0.0) != (dn >= 0.0) {
                out.push(current.lerp(next, dc / (dc - dn)));
            }
        }
        out
    }

    fn to_screen(&self, position: Vec4, width: f32, height: f32) -> ScreenVertex {
        let inv_w = 1.0 / position.w;
        let ndc = position.truncate() * inv_w;
        ScreenVertex {
            position: Vec2::new(
                (ndc.x * 0.5 + 0.5) * width,
                (0.5 - ndc.y * 0.5) * height,
            ),
            depth: self.convention.window_depth(ndc.z),
            inv_w,
        }
    }

    fn fill<S: FragmentStage>(
        &self,
        target: &mut Framebuffer,
        triangle: [ClipVertex<S::Varyings>; 3],
        stage: &S,
        stats: &mut DrawStats,
    ) -> bool {
        let (width, height) = (target.width(), target.height());
        let mut screen = triangle.map(|v| self.to_screen(v.position, width as f32, height as f32));
        let mut varyings = triangle.map(|v| v.varyings);

        let mut area = edge(screen[0].position, screen[1].position, screen[2].position);
        if area == 0.0 || !area.is_finite() || screen.iter().any(|v| !v.inv_w.is_finite()) {
            return false;
        }
        if area < 0.0 {
            screen.swap(1, 2);
            varyings.swap(1, 2);
            area = -area;
        }
        let [s0, s1, s2] = screen.map(|v| v.position);

        let lo = s0.min(s1).min(s2).max(Vec2::ZERO);
        let hi = s0.max(s1).max(s2).min(Vec2::new(width as f32, height as f32));
        if lo.x >= hi.x || lo.y >= hi.y {
            return true;
        }
        // quads start on even pixels
        let (x0, y0) = ((lo.x as u32) & !1, (lo.y as u32) & !1);
        let (x1, y1) = (hi.x.ceil() as u32, hi.y.ceil() as u32);
        let inv_w = Vec3::new(screen[0].inv_w, screen[1].inv_w, screen[2].inv_w);
        let depths = Vec3::new(screen[0].depth, screen[1].depth, screen[2].depth);
        let edges = [(s1, s2), (s2, s0), (s0, s1)];

        for qy in (y0..y1).step_by(2) {
            for qx in (x0..x1).step_by(2) {
                let mut covered = [false; 4];
                let mut weights = [Vec3::ZERO; 4];
                let mut lane_depth = [0.0; 4];
                for (lane, (dx, dy)) in QUAD_OFFSETS.iter().enumerate() {
                    let (x, y) = (qx + dx, qy + dy);
                    let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                    let e = edges.map(|(a, b)| edge(a, b, p));
                    let inside = e
                        .iter()
                        .zip(edges)
                        .all(|(&value, (a, b))| value > 0.0 || (value == 0.0 && owns_edge(a, b)));
                    covered[lane] = inside && x < width && y < height;

                    let bary = Vec3::from(e) / area;
                    lane_depth[lane] = bary.dot(depths);
                    let corrected = bary * inv_w;
                    let sum = corrected.x + corrected.y + corrected.z;
                    let perspective = corrected / sum;
                    weights[lane] = if perspective.is_finite() { perspective } else { bary };
                }
                if !covered.contains(&true) {
                    continue;
                }

                let lanes = weights.map(|w| S::Varyings::mix(&varyings[0], &varyings[1], &varyings[2], w));
                let fragments = stage.shade_quad(&lanes);
                self.resolve_quad(target, (qx, qy), covered, lane_depth, fragments, stats);
            }
        }
        true
    }

    /// Draws one clipped edge. Pixels whose centers lie within half a
    /// pixel of the segment are covered.
    fn stroke<S: FragmentStage>(
        &self,
        target: &mut Framebuffer,
        segment: [ClipVertex<S::Varyings>; 2],
        stage: &S,
        stats: &mut DrawStats,
    ) -> bool {
        let (width, height) = (target.width(), target.height());
        let screen = segment.map(|v| self.to_screen(v.position, width as f32, height as f32));
        if screen
            .iter()
            .any(|v| !v.inv_w.is_finite() || !v.position.is_finite())
        {
            return false;
        }
        let (a, b) = (screen[0].position, screen[1].position);
        let direction = b - a;
        let length_squared = direction.length_squared();

        let lo = (a.min(b) - Vec2::splat(LINE_HALF_WIDTH)).max(Vec2::ZERO);
        let hi = (a.max(b) + Vec2::splat(LINE_HALF_WIDTH)).min(Vec2::new(width as f32, height as f32));
        if lo.x >= hi.x || lo.y >= hi.y {
            return true;
        }
        let (x0, y0) = ((lo.x as u32) & !1, (lo.y as u32) & !1);
        let (x1, y1) = (hi.x.ceil() as u32, hi.y.ceil() as u32);

        for qy in (y0..y1).step_by(2) {
            for qx in (x0..x1).step_by(2) {
                let mut covered = [false; 4];
                let mut params = [0.0; 4];
                let mut lane_depth = [0.0; 4];
                for (lane, (dx, dy)) in QUAD_OFFSETS.iter().enumerate() {
                    let (x, y) = (qx + dx, qy + dy);
                    let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                    let t = if length_squared > 0.0 {
                        ((p - a).dot(direction) / length_squared).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    let distance = (a + direction * t).distance(p);
                    covered[lane] = distance <= LINE_HALF_WIDTH && x < width && y < height;
                    lane_depth[lane] = screen[0].depth + (screen[1].depth - screen[0].depth) * t;

                    let near = (1.0 - t) * screen[0].inv_w;
                    let far = t * screen[1].inv_w;
                    let corrected = far / (near + far);
                    params[lane] = if corrected.is_finite() { corrected } else { t };
                }
                if !covered.contains(&true) {
                    continue;
                }

                let lanes = params.map(|t| S::Varyings::lerp(&segment[0].varyings, &segment[1].varyings, t));
                let fragments = stage.shade_quad(&lanes);
                self.resolve_quad(target, (qx, qy), covered, lane_depth, fragments, stats);
            }
        }
        true
    }

    /// Depth-tests and blends the covered lanes of a shaded quad.
    fn resolve_quad(
        &self,
        target: &mut Framebuffer,
        (qx, qy): (u32, u32),
        covered: [bool; 4],
        lane_depth: [f32; 4],
        fragments: [Fragment; 4],
        stats: &mut DrawStats,
    ) {
        for (lane, (dx, dy)) in QUAD_OFFSETS.iter().enumerate() {
            if !covered[lane] {
                continue;
            }
            stats.covered += 1;
            let (x, y) = (qx + dx, qy + dy);
            let fragment = fragments[lane];
            let depth = fragment
                .depth
                .map(|depth| self.convention.range.clamp(depth))
                .unwrap_or(lane_depth[lane]);
            if depth < target.depth_at(x, y) {
                let color = blend(fragment.color, target.color_at(x, y));
                target.set_color(x, y, color);
                target.set_depth(x, y, depth);
                stats.written += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ColorStage {
        depth: Option<f32>,
    }

    impl FragmentStage for ColorStage {
        type Varyings = Vec4;

        fn shade_quad(&self, lanes: &[Vec4; 4]) -> [Fragment; 4] {
            lanes.map(|color| Fragment {
                color,
                depth: self.depth,
            })
        }
    }

    fn vertex(x: f32, y: f32, z: f32, color: Vec4) -> ClipVertex<Vec4> {
        ClipVertex {
            position: Vec4::new(x, y, z, 1.0),
            varyings: color,
        }
    }

    fn covering(z: f32, color: Vec4) -> Vec<ClipVertex<Vec4>> {
        vec![
            vertex(-1.0, -1.0, z, color),
            vertex(3.0, -1.0, z, color),
            vertex(-1.0, 3.0, z, color),
        ]
    }

    fn target() -> Framebuffer {
        let mut target = Framebuffer::new(4, 4).unwrap();
        target.clear(Vec4::ZERO, 1.0);
        target
    }

    #[test]
    fn shared_edges_are_covered_exactly_once() {
        let mut target = target();
        let color = Vec4::new(1.0, 1.0, 1.0, 0.5);
        let quad = vec![
            vertex(-1.0, -1.0, 0.0, color),
            vertex(1.0, -1.0, 0.0, color),
            vertex(1.0, 1.0, 0.0, color),
            vertex(-1.0, 1.0, 0.0, color),
        ];
        let stats = Rasterizer::default().draw(&mut target, &quad, &[0, 1, 2, 0, 2, 3], &ColorStage { depth: None });
        assert_eq!(stats.covered, 16);
        assert_eq!(stats.written, 16);
        assert!(target.colors().iter().all(|c| *c == Vec4::splat(0.5)));
    }

    #[test]
    fn nearer_fragments_win_regardless_of_order() {
        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let blue = Vec4::new(0.0, 0.0, 1.0, 1.0);
        let stage = ColorStage { depth: None };
        let rasterizer = Rasterizer::default();

        let mut near_first = target();
        rasterizer.draw(&mut near_first, &covering(-0.5, red), &[0, 1, 2], &stage);
        let stats = rasterizer.draw(&mut near_first, &covering(0.5, blue), &[0, 1, 2], &stage);
        assert_eq!(stats.written, 0);
        assert_eq!(near_first.color_at(1, 1), red);

        let mut far_first = target();
        rasterizer.draw(&mut far_first, &covering(0.5, blue), &[0, 1, 2], &stage);
        rasterizer.draw(&mut far_first, &covering(-0.5, red), &[0, 1, 2], &stage);
        assert_eq!(far_first.color_at(1, 1), red);
        assert!((far_first.depth_at(1, 1) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn triangles_crossing_the_near_plane_are_clipped() {
        let mut target = target();
        let white = Vec4::ONE;
        let vertices = vec![
            vertex(-1.0, -1.0, 0.0, white),
            vertex(1.0, -1.0, 0.0, white),
            vertex(0.0, 1.0, -3.0, white),
        ];
        let stats = Rasterizer::default().draw(&mut target, &vertices, &[0, 1, 2], &ColorStage { depth: None });
        assert_eq!(stats.culled, 0);
        // clipped at ndc y = -1/3, i.e. below screen row 2.67
        assert_eq!(target.color_at(2, 3), white);
        assert_eq!(target.color_at(2, 1), Vec4::ZERO);
        assert!(target.colors().iter().all(|c| c.is_finite()));
    }

    #[test]
    fn triangles_behind_the_near_plane_are_culled() {
        let mut target = target();
        let stats = Rasterizer::default().draw(
            &mut target,
            &covering(-2.0, Vec4::ONE),
            &[0, 1, 2],
            &ColorStage { depth: None },
        );
        assert_eq!(stats.culled, 1);
        assert_eq!(stats.covered, 0);
    }

    #[test]
    fn explicit_depth_is_clamped_to_the_range() {
        let mut target = target();
        Rasterizer::default().draw(
            &mut target,
            &covering(0.0, Vec4::ONE),
            &[0, 1, 2],
            &ColorStage { depth: Some(-1.0) },
        );
        assert_eq!(target.depth_at(0, 0), 0.0);
    }

    #[test]
    fn translucent_fragments_blend_over_the_target() {
        let mut target = Framebuffer::new(2, 2).unwrap();
        target.clear(Vec4::new(0.0, 0.0, 1.0, 1.0), 1.0);
        Rasterizer::default().draw(
            &mut target,
            &covering(0.0, Vec4::new(1.0, 0.0, 0.0, 0.25)),
            &[0, 1, 2],
            &ColorStage { depth: None },
        );
        let color = target.color_at(1, 0);
        assert!((color - Vec4::new(0.25, 0.0, 0.75, 1.0)).abs().max_element() < 1e-6);
    }

    #[test]
    fn dangling_indices_are_skipped() {
        let mut target = target();
        let stats = Rasterizer::default().draw(
            &mut target,
            &covering(0.0, Vec4::ONE),
            &[0, 1, 7],
            &ColorStage { depth: None },
        );
        assert_eq!(stats.invalid, 1);
        assert_eq!(stats.triangles, 0);
    }

    #[test]
    fn line_mode_draws_edges_but_not_interiors() {
        let mut target = Framebuffer::new(16, 16).unwrap();
        target.clear(Vec4::ZERO, 1.0);
        let white = Vec4::ONE;
        // right triangle with corners at pixels (0,16), (16,16) and (0,0)
        let vertices = vec![
            vertex(-1.0, -1.0, 0.0, white),
            vertex(1.0, -1.0, 0.0, white),
            vertex(-1.0, 1.0, 0.0, white),
        ];
        let stats = Rasterizer::default().draw_with_mode(
            &mut target,
            &vertices,
            &[0, 1, 2],
            &ColorStage { depth: None },
            PolygonMode::Line,
        );
        assert_eq!(stats.culled, 0);
        assert!(stats.written > 0);
        // well inside the triangle, away from every edge
        assert_eq!(target.color_at(4, 10), Vec4::ZERO);
        // on the hypotenuse from (16,16) to (0,0)
        assert_eq!(target.color_at(8, 8), white);

        let mut filled = Framebuffer::new(16, 16).unwrap();
        filled.clear(Vec4::ZERO, 1.0);
        let fill = Rasterizer::default().draw(&mut filled, &vertices, &[0, 1, 2], &ColorStage { depth: None });
        assert!(stats.written < fill.written);
    }

    #[test]
    fn line_mode_interpolates_along_the_edge() {
        let mut target = Framebuffer::new(16, 2).unwrap();
        target.clear(Vec4::ZERO, 1.0);
        let vertices = vec![
            vertex(-1.0, 0.0, 0.0, Vec4::new(0.0, 0.0, 0.0, 1.0)),
            vertex(1.0, 0.0, 0.0, Vec4::new(1.0, 0.0, 0.0, 1.0)),
            vertex(1.0, 0.0, 0.0, Vec4::new(1.0, 0.0, 0.0, 1.0)),
        ];
        Rasterizer::default().draw_with_mode(
            &mut target,
            &vertices,
            &[0, 1, 2],
            &ColorStage { depth: None },
            PolygonMode::Line,
        );
        // row 0 and row 1 centers sit half a pixel from the horizontal edge
        let left = target.color_at(2, 1);
        let right = target.color_at(13, 1);
        assert_eq!(left.w, 1.0);
        assert!((left.x - 2.5 / 16.0).abs() < 1e-5);
        assert!((right.x - 13.5 / 16.0).abs() < 1e-5);
    }

    #[test]
    fn coarse_fwidth_sums_both_axes() {
        let values = [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.5, -0.25),
            Vec2::new(-0.1, 1.0),
            Vec2::new(9.0, 9.0),
        ];
        assert!((coarse_fwidth(values) - Vec2::new(0.6, 1.25)).abs().max_element() < 1e-6);
    }
}
