//! Big, slow, soft blobs of colour drifting behind the network

use glam::Vec2;
use rand::Rng as _;

use super::cluster::{fit_radius, random_within};
use super::colours::{Colour, Colours};

/// An orb
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Orb {
    /// Centre in canvas units.
    pub position: Vec2,
    /// Radius in canvas units.
    pub radius: f32,
    /// Distance moved per frame.
    pub velocity: Vec2,
    /// Overall transparency.
    pub opacity: f32,
    /// Colour at the centre of the gradient.
    pub inner: Colour,
    /// Colour at the rim of the gradient, where it's fully transparent.
    pub outer: Colour,
}

impl Orb {
    /// Create the `index`th orb somewhere on the canvas.
    pub fn random(
        rng: &mut impl rand::Rng,
        colours: &Colours,
        index: usize,
        width: f32,
        height: f32,
    ) -> Self {
        let (inner, outer) = colours.gradient_pair(index);
        let radius = fit_radius(rng.gen_range(50.0..130.0), width, height);
        Self {
            position: Vec2::new(
                random_within(rng, radius, width - radius),
                random_within(rng, radius, height - radius),
            ),
            radius,
            velocity: Vec2::new(rng.gen_range(-0.1..0.1), rng.gen_range(-0.1..0.1)),
            opacity: rng.gen_range(0.05..0.2),
            inner,
            outer,
        }
    }

    /// Drift, bouncing whenever the disc touches an edge. An orb only ever turns back towards
    /// the inside, so one that starts across an edge drifts free of it.
    pub fn advance(&mut self, width: f32, height: f32) {
        self.position += self.velocity;
        self.velocity.x = bounce(self.position.x, self.velocity.x, self.radius, width);
        self.velocity.y = bounce(self.position.y, self.velocity.y, self.radius, height);
    }
}

/// The velocity along one axis after touching either end of `0..=extent`.
fn bounce(position: f32, velocity: f32, radius: f32, extent: f32) -> f32 {
    let leaving_start = position - radius < 0.0 && velocity < 0.0;
    let leaving_end = position + radius > extent && velocity > 0.0;
    if leaving_start || leaving_end {
        -velocity
    } else {
        velocity
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bounces_off_the_rim() {
        let mut orb = Orb {
            position: Vec2::new(95.0, 50.0),
            radius: 5.0,
            velocity: Vec2::new(0.1, 0.0),
            opacity: 0.1,
            inner: Colour::new(0.0, 0.0, 1.0),
            outer: Colour::new(1.0, 0.0, 0.0),
        };
        orb.advance(100.0, 100.0);
        assert!((orb.velocity.x + 0.1).abs() < f32::EPSILON);
        orb.advance(100.0, 100.0);
        assert!((orb.position.x - 95.0).abs() < 1e-4);
    }

    #[test]
    fn an_orb_across_an_edge_drifts_inwards() {
        let mut orb = Orb {
            position: Vec2::new(10.0, 300.0),
            radius: 80.0,
            velocity: Vec2::new(0.05, 0.0),
            opacity: 0.1,
            inner: Colour::new(0.0, 0.0, 1.0),
            outer: Colour::new(1.0, 0.0, 0.0),
        };
        for _ in 0..10_000 {
            orb.advance(640.0, 384.0);
        }
        assert!(orb.position.x - orb.radius >= 0.0, "Stuck at {}", orb.position.x);
    }

    #[test]
    fn orbs_spawn_inside_the_canvas() {
        use rand::SeedableRng as _;

        let mut rng = rand::rngs::StdRng::seed_from_u64(6);
        let colours = Colours::from_hex(&[]);
        for index in 0..100 {
            let orb = Orb::random(&mut rng, &colours, index, 640.0, 384.0);
            assert!(orb.position.x - orb.radius >= 0.0 && orb.position.x + orb.radius <= 640.0);
            assert!(orb.position.y - orb.radius >= 0.0 && orb.position.y + orb.radius <= 384.0);
        }
    }
}
