//! Path tessellation
//!
//! Setup builds a closed star-shaped path of `size` vertices whose edges
//! alternate between lines and cubic Béziers. Each timed iteration flattens
//! the curves to within [`TOLERANCE`] pixels and fan-triangulates the
//! resulting polygon around its centroid.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;

use super::Case;
use crate::backend::Surface;
use crate::core::error::HarnessResult;

/// Maximum deviation of the flattened polyline from the curve, in pixels
pub const TOLERANCE: f64 = 0.25;

const MAX_CURVE_SEGMENTS: usize = 100;
const SEED: u64 = 0x7e55_e11a;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle(pub Point, pub Point, pub Point);

#[derive(Debug, Clone, Copy)]
enum Segment {
    Line(Point),
    Cubic(Point, Point, Point),
}

/// Flatten-and-triangulate benchmark.
#[derive(Debug)]
pub struct TessellateCase {
    start: Point,
    path: Vec<Segment>,
    polygon: Vec<Point>,
    triangles: Vec<Triangle>,
}

impl TessellateCase {
    pub fn new() -> Self {
        Self {
            start: Point::new(0.0, 0.0),
            path: Vec::new(),
            polygon: Vec::new(),
            triangles: Vec::new(),
        }
    }

    /// Triangles produced by the most recent iteration.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    fn tessellate(&mut self) {
        self.polygon.clear();
        self.polygon.push(self.start);
        let mut current = self.start;
        for segment in &self.path {
            match *segment {
                Segment::Line(to) => {
                    self.polygon.push(to);
                    current = to;
                }
                Segment::Cubic(c1, c2, to) => {
                    flatten_cubic(current, c1, c2, to, &mut self.polygon);
                    current = to;
                }
            }
        }
        // The closing edge returns to the start point.
        if self.polygon.len() > 1 && self.polygon.last() == Some(&self.start) {
            self.polygon.pop();
        }

        self.triangles.clear();
        fan_triangulate(&self.polygon, &mut self.triangles);
    }
}

impl Default for TessellateCase {
    fn default() -> Self {
        Self::new()
    }
}

impl Case for TessellateCase {
    fn name(&self) -> &str {
        "tessellate"
    }

    fn min_size(&self) -> u32 {
        16
    }

    fn max_size(&self) -> u32 {
        256
    }

    fn setup(&mut self, surface: &mut dyn Surface, size: u32) -> HarnessResult<()> {
        let width = surface.width() as f64;
        let height = surface.height() as f64;
        let center = Point::new(width / 2.0, height / 2.0);
        let radius = width.min(height) / 2.0;
        let vertices = size.max(3) as usize;

        let mut rng = StdRng::seed_from_u64(SEED ^ size as u64);
        let mut outline = Vec::new();
        outline.try_reserve_exact(vertices)?;
        for i in 0..vertices {
            let angle = TAU * i as f64 / vertices as f64;
            let r = radius * rng.gen_range(0.3..1.0);
            outline.push(Point::new(center.x + r * angle.cos(), center.y + r * angle.sin()));
        }

        self.start = outline[0];
        self.path.clear();
        self.path.try_reserve_exact(vertices)?;
        for i in 0..vertices {
            let to = outline[(i + 1) % vertices];
            if i % 2 == 0 {
                self.path.push(Segment::Line(to));
            } else {
                let c1 = Point::new(rng.gen_range(0.0..=width), rng.gen_range(0.0..=height));
                let c2 = Point::new(rng.gen_range(0.0..=width), rng.gen_range(0.0..=height));
                self.path.push(Segment::Cubic(c1, c2, to));
            }
        }

        // Size the output buffers once so timed iterations do not allocate.
        self.tessellate();
        Ok(())
    }

    fn run(&mut self, _surface: &mut dyn Surface) {
        self.tessellate();
        std::hint::black_box(&self.triangles);
    }
}

/// Append the flattened cubic (excluding its start point) to `out`.
fn flatten_cubic(p0: Point, p1: Point, p2: Point, p3: Point, out: &mut Vec<Point>) {
    // Second differences of the control polygon bound the curve's deviation
    // from its chords.
    let ddx = (p0.x - 2.0 * p1.x + p2.x).abs().max((p1.x - 2.0 * p2.x + p3.x).abs());
    let ddy = (p0.y - 2.0 * p1.y + p2.y).abs().max((p1.y - 2.0 * p2.y + p3.y).abs());
    let dd = ddx.hypot(ddy);
    let segments = ((0.75 * dd / TOLERANCE).sqrt().ceil() as usize).clamp(1, MAX_CURVE_SEGMENTS);

    for i in 1..=segments {
        let t = i as f64 / segments as f64;
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        out.push(Point::new(
            a * p0.x + b * p1.x + c * p2.x + d * p3.x,
            a * p0.y + b * p1.y + c * p2.y + d * p3.y,
        ));
    }
}

/// Triangulate a star-shaped polygon as a fan around its centroid.
fn fan_triangulate(polygon: &[Point], out: &mut Vec<Triangle>) {
    if polygon.len() < 3 {
        return;
    }
    let n = polygon.len() as f64;
    let centroid = Point::new(
        polygon.iter().map(|p| p.x).sum::<f64>() / n,
        polygon.iter().map(|p| p.y).sum::<f64>() / n,
    );
    for (i, &p) in polygon.iter().enumerate() {
        let q = polygon[(i + 1) % polygon.len()];
        out.push(Triangle(centroid, p, q));
    }
}
