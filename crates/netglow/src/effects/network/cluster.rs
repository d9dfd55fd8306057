//! Spatial seeds that group particles into blobs. They only exist during initialisation.

use glam::Vec2;
use rand::Rng as _;

use super::colours::{Colour, Colours};

/// The smallest radius a cluster is given before clamping to the canvas.
const MIN_RADIUS: f32 = 100.0;

/// The largest radius a cluster is given before clamping to the canvas.
const MAX_RADIUS: f32 = 200.0;

/// A cluster
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct Cluster {
    /// Centre of the disc particles are scattered in.
    pub centre: Vec2,
    /// Radius of the disc.
    pub radius: f32,
    /// The colour every particle in the cluster inherits.
    pub colour: Colour,
}

impl Cluster {
    /// Place a cluster so that its whole disc lies inside the canvas.
    pub fn random(rng: &mut impl rand::Rng, colours: &Colours, width: f32, height: f32) -> Self {
        let radius = fit_radius(rng.gen_range(MIN_RADIUS..MAX_RADIUS), width, height);
        let centre = Vec2::new(
            random_within(rng, radius, width - radius),
            random_within(rng, radius, height - radius),
        );

        Self {
            centre,
            radius,
            colour: colours.random(rng),
        }
    }

    /// A random point inside the cluster's disc.
    pub fn scatter(&self, rng: &mut impl rand::Rng) -> Vec2 {
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = rng.gen_range(0.0..=self.radius);
        self.centre + Vec2::from_angle(angle) * distance
    }

    /// Is the point within this cluster's disc?
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        self.centre.distance(point) <= self.radius + 1e-3
    }
}

/// Shrink a radius so that a disc of it fits inside the canvas.
#[must_use]
pub fn fit_radius(radius: f32, width: f32, height: f32) -> f32 {
    radius.min(width.min(height) / 2.0).max(0.0)
}

/// A uniform pick from `low..=high`, tolerating an empty range.
pub fn random_within(rng: &mut impl rand::Rng, low: f32, high: f32) -> f32 {
    if high > low {
        rng.gen_range(low..=high)
    } else {
        low
    }
}

#[cfg(test)]
mod test {
    use rand::SeedableRng as _;

    use super::*;

    #[test]
    fn discs_fit_inside_the_canvas() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let colours = Colours::from_hex(&[]);
        for _ in 0..200 {
            let cluster = Cluster::random(&mut rng, &colours, 320.0, 180.0);
            let slack = 1e-3;
            assert!(cluster.radius <= 90.0);
            assert!(cluster.centre.x - cluster.radius >= -slack);
            assert!(cluster.centre.x + cluster.radius <= 320.0 + slack);
            assert!(cluster.centre.y - cluster.radius >= -slack);
            assert!(cluster.centre.y + cluster.radius <= 180.0 + slack);
        }
    }

    #[test]
    fn scattered_points_stay_in_the_disc() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(4);
        let colours = Colours::from_hex(&[]);
        let cluster = Cluster::random(&mut rng, &colours, 800.0, 600.0);
        for _ in 0..500 {
            assert!(cluster.contains(cluster.scatter(&mut rng)));
        }
    }
}
