//! The brand colours that every particle, connection and orb is painted with.

use palette::Darken as _;
use rand::Rng as _;

/// The colour type used throughout the simulation.
pub type Colour = palette::Srgb;

/// Used when none of the configured colours can be parsed.
const FALLBACK: &[&str] = &["#4E7CFF", "#7B61FF", "#B4C9F9", "#d4a650"];

/// A parsed, non-empty set of brand colours.
#[derive(Debug, Clone)]
pub struct Colours {
    /// Always has at least one colour.
    brand: Vec<Colour>,
}

impl Colours {
    /// Parse hex strings like `#4E7CFF`. Unparseable strings are logged and skipped.
    #[must_use]
    pub fn from_hex(hexes: &[String]) -> Self {
        let mut brand: Vec<Colour> = hexes
            .iter()
            .filter_map(|hex| match Self::parse(hex) {
                Some(colour) => Some(colour),
                None => {
                    tracing::warn!("Ignoring unparseable colour: {hex:?}");
                    None
                }
            })
            .collect();

        if brand.is_empty() {
            brand = FALLBACK.iter().filter_map(|hex| Self::parse(hex)).collect();
        }
        if brand.is_empty() {
            brand.push(Colour::new(1.0, 1.0, 1.0));
        }

        Self { brand }
    }

    /// Parse a single hex colour.
    #[must_use]
    pub fn parse(hex: &str) -> Option<Colour> {
        hex.trim()
            .parse::<palette::Srgb<u8>>()
            .ok()
            .map(|colour| colour.into_format())
    }

    /// Pick any of the brand colours.
    pub fn random(&self, rng: &mut impl rand::Rng) -> Colour {
        let index = rng.gen_range(0..self.brand.len());
        self.nth(index)
    }

    /// The two colours of an orb's gradient. Neighbouring orbs get different pairs.
    #[must_use]
    pub fn gradient_pair(&self, index: usize) -> (Colour, Colour) {
        (self.nth(index), self.nth(index + 1))
    }

    /// Cycle through the brand colours.
    fn nth(&self, index: usize) -> Colour {
        let wrapped = index % self.brand.len();
        self.brand
            .get(wrapped)
            .copied()
            .unwrap_or_else(|| Colour::new(1.0, 1.0, 1.0))
    }

    /// The darker edge of a particle's gradient.
    #[must_use]
    pub fn shade(colour: Colour) -> Colour {
        colour.darken_fixed(0.08)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_hex_and_skips_garbage() {
        let colours = Colours::from_hex(&["#ff0000".to_owned(), "nope".to_owned()]);
        assert_eq!(colours.brand.len(), 1);
        let red = colours.gradient_pair(0).0;
        assert!((red.red - 1.0).abs() < f32::EPSILON);
        assert!(red.green.abs() < f32::EPSILON);
    }

    #[test]
    fn falls_back_when_nothing_parses() {
        let colours = Colours::from_hex(&[]);
        assert_eq!(colours.brand.len(), FALLBACK.len());
    }

    #[test]
    fn gradient_pairs_cycle() {
        let colours = Colours::from_hex(&["#000000".to_owned(), "#ffffff".to_owned()]);
        let (start, end) = colours.gradient_pair(1);
        assert!((start.red - 1.0).abs() < f32::EPSILON);
        assert!(end.red.abs() < f32::EPSILON);
    }
}
