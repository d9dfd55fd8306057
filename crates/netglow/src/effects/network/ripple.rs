//! Expanding rings left behind by pointer clicks

use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng as _;

use super::colours::Colour;

/// The most ripples that can be on screen at once.
pub const MAX_RIPPLES: usize = 5;

/// A ripple starts this opaque and fades as it grows.
const START_OPACITY: f32 = 0.6;

/// Ripples fainter than this are removed.
const MIN_OPACITY: f32 = 0.02;

/// A ripple
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Ripple {
    /// Where the click happened.
    pub centre: Vec2,
    /// The ring's current radius.
    pub radius: f32,
    /// The radius at which the ring disappears.
    pub max_radius: f32,
    /// Derived from how far the ring has grown.
    pub opacity: f32,
    /// Ring colour.
    pub colour: Colour,
    /// Growth per frame.
    pub speed: f32,
}

impl Ripple {
    /// Grow by one frame. Returns whether the ripple is still visible.
    pub fn advance(&mut self) -> bool {
        self.radius += self.speed;
        self.opacity = (START_OPACITY * (1.0 - self.radius / self.max_radius)).max(0.0);
        self.radius < self.max_radius && self.opacity > MIN_OPACITY
    }
}

/// The live ripples, oldest first. Owned by the simulation rather than being global state.
#[derive(Debug, Default, Clone)]
pub struct Ripples {
    /// Oldest at the front.
    ripples: VecDeque<Ripple>,
}

impl Ripples {
    /// Start a new ripple, dropping the oldest if there are too many.
    pub fn spawn(&mut self, rng: &mut impl rand::Rng, centre: Vec2, colour: Colour) {
        self.ripples.push_back(Ripple {
            centre,
            radius: 0.0,
            max_radius: rng.gen_range(100.0..150.0),
            opacity: START_OPACITY,
            colour,
            speed: rng.gen_range(2.0..4.0),
        });

        while self.ripples.len() > MAX_RIPPLES {
            self.ripples.pop_front();
        }
    }

    /// Grow every ripple, removing the finished ones.
    pub fn advance(&mut self) {
        self.ripples.retain_mut(Ripple::advance);
    }

    /// Iterate over the live ripples.
    pub fn iter(&self) -> impl Iterator<Item = &Ripple> {
        self.ripples.iter()
    }

    /// Number of live ripples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ripples.len()
    }

    /// Are there no live ripples?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ripples.is_empty()
    }

    /// Remove every ripple.
    pub fn clear(&mut self) {
        self.ripples.clear();
    }
}

#[cfg(test)]
mod test {
    use rand::SeedableRng as _;

    use super::*;

    #[test]
    fn keeps_only_the_newest_ripples() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let mut ripples = Ripples::default();
        let white = Colour::new(1.0, 1.0, 1.0);
        for index in 0..8u8 {
            ripples.spawn(&mut rng, Vec2::new(f32::from(index), 0.0), white);
        }
        assert_eq!(ripples.len(), MAX_RIPPLES);
        let oldest = ripples.iter().next().unwrap();
        assert!((oldest.centre.x - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn ripples_grow_and_disappear() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(6);
        let mut ripples = Ripples::default();
        ripples.spawn(&mut rng, Vec2::ZERO, Colour::new(1.0, 1.0, 1.0));

        ripples.advance();
        let ripple = ripples.iter().next().unwrap();
        assert!(ripple.radius > 0.0);
        assert!(ripple.opacity < START_OPACITY);

        for _ in 0..100 {
            ripples.advance();
        }
        assert!(ripples.is_empty());
    }
}
