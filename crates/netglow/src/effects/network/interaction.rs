//! Lets the mouse push particles around and make them stand out.

use glam::Vec2;

use super::config;
use super::particle::Particle;

/// The displacement applied at full strength right next to the pointer.
const MAX_PUSH: f32 = 2.0;

/// How quickly emphasis fades for particles outside the pointer's radius.
const EMPHASIS_DECAY: f32 = 0.95;

/// Emphasis below this is snapped to zero.
const EMPHASIS_FLOOR: f32 = 0.001;

/// The pointer's state
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct Interaction {
    /// The last known pointer position in canvas units.
    pub pointer: Option<Vec2>,
    /// Rises when the pointer moves and decays while it's still.
    pub strength: f32,
}

impl Interaction {
    /// Record a pointer movement.
    pub fn pointer_moved(&mut self, position: Vec2, config: &config::Interaction) {
        if !position.is_finite() {
            return;
        }
        self.pointer = Some(position);
        self.strength = config.strength_on_move;
    }

    /// Push and emphasise particles near the pointer, then decay the strength.
    pub fn apply(&mut self, particles: &mut [Particle], config: &config::Interaction) {
        if !config.enabled {
            return;
        }

        for particle in particles.iter_mut() {
            let influence = self.pointer.and_then(|pointer| {
                let away = particle.position - pointer;
                let distance = away.length();
                (distance < config.radius).then_some((away, distance))
            });

            match influence {
                Some((away, distance)) => {
                    let falloff = 1.0 - distance / config.radius;
                    if distance > 0.0 {
                        let push = MAX_PUSH * self.strength * falloff;
                        particle.position += away / distance * push;
                    }
                    particle.emphasis = (self.strength * falloff).clamp(0.0, 1.0);
                }
                None => {
                    particle.emphasis *= EMPHASIS_DECAY;
                    if particle.emphasis < EMPHASIS_FLOOR {
                        particle.emphasis = 0.0;
                    }
                }
            }
        }

        self.strength = (self.strength - config.decay).max(0.0);
    }
}

#[cfg(test)]
#[expect(clippy::indexing_slicing, reason = "Tests aren't so strict")]
mod test {
    use rand::SeedableRng as _;

    use super::*;
    use crate::effects::network::colours::Colour;

    fn particles(positions: &[Vec2]) -> Vec<Particle> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(9);
        let white = Colour::new(1.0, 1.0, 1.0);
        positions
            .iter()
            .map(|position| Particle::spawn(&mut rng, *position, 0, white, white))
            .collect()
    }

    #[test]
    fn pushes_nearby_particles_away() {
        let config = config::Interaction::default();
        let mut interaction = Interaction::default();
        let mut particles = particles(&[Vec2::new(75.0, 0.0), Vec2::new(500.0, 0.0)]);
        particles[1].emphasis = 0.5;

        interaction.pointer_moved(Vec2::ZERO, &config);
        interaction.apply(&mut particles, &config);

        // Half way into the radius at strength 0.8 gives a push of 0.8.
        assert!((particles[0].position.x - 75.8).abs() < 1e-4);
        assert!((particles[0].emphasis - 0.4).abs() < 1e-4);

        assert!((particles[1].position.x - 500.0).abs() < f32::EPSILON);
        assert!((particles[1].emphasis - 0.475).abs() < 1e-4);

        assert!((interaction.strength - 0.78).abs() < 1e-4);
    }

    #[test]
    fn particle_under_the_pointer_is_not_pushed() {
        let config = config::Interaction::default();
        let mut interaction = Interaction::default();
        let mut particles = particles(&[Vec2::new(10.0, 10.0)]);

        interaction.pointer_moved(Vec2::new(10.0, 10.0), &config);
        interaction.apply(&mut particles, &config);

        assert_eq!(particles[0].position, Vec2::new(10.0, 10.0));
        assert!((particles[0].emphasis - 0.8).abs() < 1e-4);
    }

    #[test]
    fn strength_decays_to_zero() {
        let config = config::Interaction::default();
        let mut interaction = Interaction::default();
        interaction.pointer_moved(Vec2::ZERO, &config);
        for _ in 0..100 {
            interaction.apply(&mut [], &config);
        }
        assert!(interaction.strength.abs() < f32::EPSILON);
    }

    #[test]
    fn disabled_interaction_does_nothing() {
        let config = config::Interaction {
            enabled: false,
            ..config::Interaction::default()
        };
        let mut interaction = Interaction::default();
        let mut particles = particles(&[Vec2::new(1.0, 0.0)]);
        interaction.pointer_moved(Vec2::ZERO, &config);
        interaction.apply(&mut particles, &config);
        assert_eq!(particles[0].position, Vec2::new(1.0, 0.0));
        assert!(particles[0].emphasis.abs() < f32::EPSILON);
    }
}
