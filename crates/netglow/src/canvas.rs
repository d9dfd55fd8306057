//! A tiny 2D raster API for effects to draw with, and an in-memory implementation of it.
//!
//! Effects work in "canvas units", a resolution-independent coordinate space. The pixel canvas
//! maps those units onto terminal pixels, where every terminal cell is 1 pixel wide and 2 pixels
//! tall.

use glam::Vec2;
use palette::Mix as _;

use crate::effects::network::colours::Colour;

/// Pixels with less coverage than this are treated as empty.
const MIN_COVERAGE: f32 = 0.01;

/// The most points sampled along a single stroke.
const MAX_STROKE_SAMPLES: usize = 4096;

/// How to fill a circle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum Fill {
    /// One flat colour.
    Solid(Colour),
    /// A colour that blends from `inner` at the centre to `outer` at the rim.
    Radial {
        /// Centre colour.
        inner: Colour,
        /// Rim colour.
        outer: Colour,
    },
    /// Like `Radial`, but also fading to fully transparent at the rim.
    Fading {
        /// Centre colour.
        inner: Colour,
        /// Rim colour.
        outer: Colour,
    },
}

impl Fill {
    /// The colour and alpha multiplier at `t`, where 0.0 is the centre and 1.0 the rim.
    fn sample(self, t: f32) -> (Colour, f32) {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Solid(colour) => (colour, 1.0),
            Self::Radial { inner, outer } => (inner.mix(outer, t), 1.0),
            Self::Fading { inner, outer } => (inner.mix(outer, t), 1.0 - t),
        }
    }
}

/// Anything that can be drawn on. All coordinates and lengths are in canvas units.
///
/// Implementations must silently skip any draw with non-finite or degenerate geometry.
pub trait Canvas {
    /// The drawable area.
    fn size(&self) -> Vec2;

    /// Fill a disc.
    fn fill_circle(&mut self, centre: Vec2, radius: f32, fill: Fill, alpha: f32);

    /// Draw the outline of a circle.
    fn stroke_circle(&mut self, centre: Vec2, radius: f32, width: f32, colour: Colour, alpha: f32);

    /// Draw a quadratic Bézier curve.
    fn stroke_quadratic(&mut self, points: [Vec2; 3], width: f32, colour: Colour, alpha: f32);
}

/// A single composited pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixel {
    /// Straight, non-premultiplied colour.
    pub colour: Colour,
    /// Accumulated alpha, from 0.0 to 1.0.
    pub coverage: f32,
}

impl Default for Pixel {
    fn default() -> Self {
        Self {
            colour: Colour::new(0.0, 0.0, 0.0),
            coverage: 0.0,
        }
    }
}

impl Pixel {
    /// Composite a colour over this pixel.
    fn blend(&mut self, colour: Colour, alpha: f32) {
        let alpha = alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let coverage = alpha + self.coverage * (1.0 - alpha);
        if coverage <= 0.0 {
            return;
        }
        self.colour = self.colour.mix(colour, alpha / coverage);
        self.coverage = coverage;
    }

    /// Has anything visible been drawn here?
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.coverage >= MIN_COVERAGE
    }
}

/// An in-memory raster of terminal pixels.
#[derive(Debug, Clone)]
pub struct PixelCanvas {
    /// Width in pixels, the same as the terminal's columns.
    width: usize,
    /// Height in pixels, twice the terminal's rows.
    height: usize,
    /// Canvas units per pixel.
    scale: f32,
    /// Row-major pixels.
    pixels: Vec<Pixel>,
}

impl PixelCanvas {
    /// A blank canvas. A nonsensical scale falls back to 1 unit per pixel.
    #[must_use]
    pub fn new(width: usize, height: usize, scale: f32) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        };
        Self {
            width,
            height,
            scale,
            pixels: vec![Pixel::default(); width.saturating_mul(height)],
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// The pixel at the given coordinates.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> Option<&Pixel> {
        if x >= self.width {
            return None;
        }
        self.pixels.get(y.checked_mul(self.width)?.checked_add(x)?)
    }

    /// Convert from canvas units to fractional pixel coordinates.
    fn to_pixels(&self, point: Vec2) -> Vec2 {
        point / self.scale
    }

    /// Blend into a pixel, ignoring coordinates off the canvas.
    fn plot(&mut self, x: i64, y: i64, colour: Colour, alpha: f32) {
        let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
            return;
        };
        if x >= self.width || y >= self.height {
            return;
        }
        let Some(index) = y.checked_mul(self.width).and_then(|row| row.checked_add(x)) else {
            return;
        };
        if let Some(pixel) = self.pixels.get_mut(index) {
            pixel.blend(colour, alpha);
        }
    }

    /// The pixel that contains a point in pixel space.
    #[expect(
        clippy::as_conversions,
        clippy::cast_possible_truncation,
        reason = "Callers only pass finite points and `as` saturates"
    )]
    fn containing_pixel(point: Vec2) -> (i64, i64) {
        (point.x.floor() as i64, point.y.floor() as i64)
    }

    /// Draw a dot thinner than a pixel, dimmed by how much of the pixel it would cover.
    fn plot_dot(&mut self, point: Vec2, thickness: f32, colour: Colour, alpha: f32) {
        let (x, y) = Self::containing_pixel(point);
        let share = thickness.clamp(0.0, 1.0);
        self.plot(x, y, colour, alpha * share);
    }

    /// Visit every point along a curve, at roughly half-pixel spacing, visiting each pixel once.
    fn trace(
        &mut self,
        length: f32,
        point_at: impl Fn(f32) -> Vec2,
        mut visit: impl FnMut(&mut Self, Vec2),
    ) {
        #[expect(
            clippy::as_conversions,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "The sample count is clamped to a small positive range"
        )]
        let samples = ((length * 2.0).ceil().max(1.0) as usize).min(MAX_STROKE_SAMPLES);

        let mut last = None;
        for step in 0..=samples {
            #[expect(
                clippy::as_conversions,
                clippy::cast_precision_loss,
                reason = "The sample count is small"
            )]
            let t = step as f32 / samples as f32;
            let point = point_at(t);
            let pixel = Self::containing_pixel(point);
            if last == Some(pixel) {
                continue;
            }
            last = Some(pixel);
            visit(self, point);
        }
    }
}

impl Canvas for PixelCanvas {
    fn size(&self) -> Vec2 {
        #[expect(
            clippy::as_conversions,
            clippy::cast_precision_loss,
            reason = "Terminal sizes are tiny"
        )]
        let pixels = Vec2::new(self.width as f32, self.height as f32);
        pixels * self.scale
    }

    fn fill_circle(&mut self, centre: Vec2, radius: f32, fill: Fill, alpha: f32) {
        if !centre.is_finite() || !radius.is_finite() || !alpha.is_finite() || radius <= 0.0 {
            return;
        }

        let centre = self.to_pixels(centre);
        let radius = radius / self.scale;

        if radius < 1.0 {
            let area = std::f32::consts::PI * radius * radius;
            let (colour, fade) = fill.sample(0.0);
            let (x, y) = Self::containing_pixel(centre);
            self.plot(x, y, colour, alpha * fade * area.min(1.0));
            return;
        }

        let (left, top) = Self::containing_pixel(centre - Vec2::splat(radius));
        let (right, bottom) = Self::containing_pixel(centre + Vec2::splat(radius));
        let max_x = i64::try_from(self.width).unwrap_or(i64::MAX) - 1;
        let max_y = i64::try_from(self.height).unwrap_or(i64::MAX) - 1;
        let (left, right) = (left.max(0), right.min(max_x));
        let (top, bottom) = (top.max(0), bottom.min(max_y));
        for y in top..=bottom {
            for x in left..=right {
                #[expect(
                    clippy::as_conversions,
                    clippy::cast_precision_loss,
                    reason = "Pixel coordinates are small"
                )]
                let pixel_centre = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let distance = pixel_centre.distance(centre);
                if distance > radius {
                    continue;
                }
                let (colour, fade) = fill.sample(distance / radius);
                self.plot(x, y, colour, alpha * fade);
            }
        }
    }

    fn stroke_circle(&mut self, centre: Vec2, radius: f32, width: f32, colour: Colour, alpha: f32) {
        if !centre.is_finite()
            || !radius.is_finite()
            || !width.is_finite()
            || !alpha.is_finite()
            || radius <= 0.0
        {
            return;
        }

        let centre = self.to_pixels(centre);
        let radius = radius / self.scale;
        let thickness = width / self.scale;
        let circumference = std::f32::consts::TAU * radius;
        self.trace(
            circumference,
            |t| centre + Vec2::from_angle(t * std::f32::consts::TAU) * radius,
            |canvas, point| canvas.plot_dot(point, thickness, colour, alpha),
        );
    }

    fn stroke_quadratic(&mut self, points: [Vec2; 3], width: f32, colour: Colour, alpha: f32) {
        if points.iter().any(|point| !point.is_finite())
            || !width.is_finite()
            || !alpha.is_finite()
            || width <= 0.0
        {
            return;
        }

        let [from, control, to] = points.map(|point| self.to_pixels(point));
        let length = from.distance(control) + control.distance(to);
        if length < f32::EPSILON {
            return;
        }
        let thickness = width / self.scale;
        self.trace(
            length,
            |t| crate::effects::network::connection::quadratic_bezier(from, control, to, t),
            |canvas, point| canvas.plot_dot(point, thickness.max(0.5), colour, alpha),
        );
    }
}
