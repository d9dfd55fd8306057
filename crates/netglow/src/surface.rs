//! Turn a canvas of pixels into terminal cells made of half blocks

use termwiz::surface::Change as TermwizChange;
use termwiz::surface::Position as TermwizPosition;

use crate::canvas::{Pixel, PixelCanvas};

/// The glyph that fills the upper half of a cell.
pub const UPPER_HALF: &str = "▀";

/// The glyph that fills the lower half of a cell.
pub const LOWER_HALF: &str = "▄";

/// A complete frame, ready to be drawn to the terminal.
pub struct Surface {
    /// The terminal's width
    pub width: usize,
    /// The terminal's height
    pub height: usize,
    /// A surface of terminal cells
    pub surface: termwiz::surface::Surface,
}

impl Surface {
    /// A blank frame.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            surface: termwiz::surface::Surface::new(width, height),
        }
    }

    /// Convert every pair of vertically stacked pixels into a single cell.
    ///
    /// A cell with both halves visible uses the upper half block, with the upper pixel as the
    /// foreground and the lower pixel as the background. When only one half is visible we use
    /// the matching half block as the foreground so that the terminal's own default background
    /// shows through the other half. Cells with nothing visible are left blank.
    #[must_use]
    pub fn from_canvas(canvas: &PixelCanvas) -> Self {
        let width = canvas.width();
        let height = canvas.height().div_ceil(2);
        let mut surface = Self::new(width, height);

        for row in 0..height {
            let upper_y = row * 2;
            for col in 0..width {
                let upper = canvas.pixel(col, upper_y).filter(|pixel| pixel.is_visible());
                let lower = canvas
                    .pixel(col, upper_y + 1)
                    .filter(|pixel| pixel.is_visible());
                surface.add_cell(col, row, upper, lower);
            }
        }

        surface
    }

    /// Set a single cell from its two pixels.
    fn add_cell(&mut self, col: usize, row: usize, upper: Option<&Pixel>, lower: Option<&Pixel>) {
        let (glyph, foreground, background) = match (upper, lower) {
            (None, None) => return,
            (Some(upper), None) => (UPPER_HALF, Self::make_colour_attribute(upper), None),
            (None, Some(lower)) => (LOWER_HALF, Self::make_colour_attribute(lower), None),
            (Some(upper), Some(lower)) => (
                UPPER_HALF,
                Self::make_colour_attribute(upper),
                Some(Self::make_colour_attribute(lower)),
            ),
        };

        self.surface.add_changes(vec![
            TermwizChange::CursorPosition {
                x: TermwizPosition::Absolute(col),
                y: TermwizPosition::Absolute(row),
            },
            TermwizChange::Attribute(termwiz::cell::AttributeChange::Foreground(foreground)),
            TermwizChange::Attribute(termwiz::cell::AttributeChange::Background(
                background.unwrap_or(termwiz::color::ColorAttribute::Default),
            )),
        ]);
        self.surface.add_change(glyph);
    }

    /// Make a Termwiz colour attribute. Terminals can't do transparency, so the pixel's
    /// coverage darkens its colour instead.
    #[must_use]
    pub fn make_colour_attribute(pixel: &Pixel) -> termwiz::color::ColorAttribute {
        let coverage = pixel.coverage.clamp(0.0, 1.0);
        termwiz::color::ColorAttribute::TrueColorWithDefaultFallback(termwiz::color::SrgbaTuple(
            pixel.colour.red * coverage,
            pixel.colour.green * coverage,
            pixel.colour.blue * coverage,
            1.0,
        ))
    }
}

#[cfg(test)]
#[expect(clippy::indexing_slicing, reason = "Tests aren't so strict")]
mod test {
    use glam::Vec2;

    use super::*;
    use crate::canvas::{Canvas as _, Fill};
    use crate::effects::network::colours::Colour;

    const WHITE: Colour = Colour::new(1.0, 1.0, 1.0);
    const RED: Colour = Colour::new(1.0, 0.0, 0.0);

    /// Paint a single, fully opaque pixel.
    fn paint(canvas: &mut PixelCanvas, x: f32, y: f32, colour: Colour) {
        canvas.fill_circle(Vec2::new(x + 0.5, y + 0.5), 0.6, Fill::Solid(colour), 1.0);
    }

    fn opaque(colour: Colour) -> termwiz::color::ColorAttribute {
        Surface::make_colour_attribute(&Pixel {
            colour,
            coverage: 1.0,
        })
    }

    #[test]
    fn empty_canvas_leaves_blank_cells() {
        let canvas = PixelCanvas::new(2, 4, 1.0);
        let mut surface = Surface::from_canvas(&canvas);

        assert_eq!((surface.width, surface.height), (2, 2));
        let cell = &surface.surface.screen_cells()[1][1];
        assert_eq!(cell.str(), " ");
        assert_eq!(
            cell.attrs().foreground(),
            termwiz::color::ColorAttribute::Default
        );
    }

    #[test]
    fn upper_pixel_uses_upper_half() {
        let mut canvas = PixelCanvas::new(1, 2, 1.0);
        paint(&mut canvas, 0.0, 0.0, WHITE);
        let mut surface = Surface::from_canvas(&canvas);

        let cell = &surface.surface.screen_cells()[0][0];
        assert_eq!(cell.str(), UPPER_HALF);
        assert_eq!(cell.attrs().foreground(), opaque(WHITE));
        assert_eq!(
            cell.attrs().background(),
            termwiz::color::ColorAttribute::Default
        );
    }

    #[test]
    fn lower_pixel_keeps_default_background() {
        let mut canvas = PixelCanvas::new(1, 2, 1.0);
        paint(&mut canvas, 0.0, 1.0, WHITE);
        let mut surface = Surface::from_canvas(&canvas);

        let cell = &surface.surface.screen_cells()[0][0];
        assert_eq!(cell.str(), LOWER_HALF);
        assert_eq!(cell.attrs().foreground(), opaque(WHITE));
        assert_eq!(
            cell.attrs().background(),
            termwiz::color::ColorAttribute::Default
        );
    }

    #[test]
    fn both_pixels_share_a_cell() {
        let mut canvas = PixelCanvas::new(1, 2, 1.0);
        paint(&mut canvas, 0.0, 0.0, RED);
        paint(&mut canvas, 0.0, 1.0, WHITE);
        let mut surface = Surface::from_canvas(&canvas);

        let cell = &surface.surface.screen_cells()[0][0];
        assert_eq!(cell.str(), UPPER_HALF);
        assert_eq!(cell.attrs().foreground(), opaque(RED));
        assert_eq!(cell.attrs().background(), opaque(WHITE));
    }

    #[test]
    fn odd_pixel_heights_round_up() {
        let mut canvas = PixelCanvas::new(1, 3, 1.0);
        paint(&mut canvas, 0.0, 2.0, WHITE);
        let mut surface = Surface::from_canvas(&canvas);

        assert_eq!(surface.height, 2);
        assert_eq!(surface.surface.screen_cells()[1][0].str(), UPPER_HALF);
    }

    #[test]
    fn faint_pixels_are_darker() {
        let faint = Surface::make_colour_attribute(&Pixel {
            colour: WHITE,
            coverage: 0.5,
        });
        assert_eq!(
            faint,
            termwiz::color::ColorAttribute::TrueColorWithDefaultFallback(
                termwiz::color::SrgbaTuple(0.5, 0.5, 0.5, 1.0)
            )
        );
    }
}
