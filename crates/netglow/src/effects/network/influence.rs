//! Nearby particles in the same cluster slowly rub off on each other, in both size and colour.

use glam::Vec3;
use palette::Mix as _;
use rand::Rng as _;

use super::colours::Colour;
use super::particle::Particle;

/// The chance, per frame, that any influence is calculated at all.
pub const CHANCE_PER_FRAME: f64 = 0.3;

/// The share of particles looked at whenever influence is calculated.
const SHARE_OF_PARTICLES: f32 = 0.2;

/// Only particles this close, as a fraction of the connection threshold, have any influence.
const REACH: f32 = 0.4;

/// No particle is influenced by more than this many neighbours at once.
const MAX_NEIGHBOURS: usize = 2;

/// How much a neighbour's relative size affects a particle.
const SIZE_WEIGHT: f32 = 0.2;

/// The share of the blended colour that comes from the neighbours.
const COLOUR_WEIGHT: f32 = 0.2;

/// The chance that the colour is blended, as well as the size.
const COLOUR_CHANCE: f64 = 0.3;

/// Frames that must pass before a particle can be influenced again.
const COOLDOWN_FRAMES: u64 = 15;

/// Let a random sample of particles be influenced by their neighbours.
pub fn apply(
    rng: &mut impl rand::Rng,
    particles: &mut [Particle],
    connection_threshold: f32,
    frame: u64,
) {
    if particles.is_empty() {
        return;
    }

    #[expect(
        clippy::as_conversions,
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Particle counts are small and the product is never negative"
    )]
    let sample_size = (particles.len() as f32 * SHARE_OF_PARTICLES).floor() as usize;

    for _ in 0..sample_size {
        let index = rng.gen_range(0..particles.len());
        influence_one(rng, particles, index, connection_threshold, frame);
    }
}

/// Blend one particle towards its closest same-cluster neighbours.
fn influence_one(
    rng: &mut impl rand::Rng,
    particles: &mut [Particle],
    index: usize,
    connection_threshold: f32,
    frame: u64,
) {
    let Some(particle) = particles.get(index) else {
        return;
    };
    if particle
        .last_influenced
        .is_some_and(|last| frame.saturating_sub(last) < COOLDOWN_FRAMES)
    {
        return;
    }

    let reach = connection_threshold * REACH;
    let mut found = 0;
    let mut total_weight = 0.0;
    let mut total_size = 0.0;
    let mut total_colour = Vec3::ZERO;

    for (other_index, other) in particles.iter().enumerate() {
        if found >= MAX_NEIGHBOURS {
            break;
        }
        if other_index == index || other.cluster != particle.cluster {
            continue;
        }
        let distance = particle.position.distance(other.position);
        if distance >= reach {
            continue;
        }

        let weight = 1.0 - distance / reach;
        found += 1;
        total_weight += weight;
        total_colour += Vec3::new(other.colour.red, other.colour.green, other.colour.blue) * weight;
        if particle.base_size > 0.0 {
            total_size += (other.base_size / particle.base_size - 1.0) * weight * SIZE_WEIGHT;
        }
    }

    let blend_colour = total_weight > 0.0 && rng.gen_bool(COLOUR_CHANCE);
    let Some(particle) = particles.get_mut(index) else {
        return;
    };

    if total_weight > 0.0 {
        if blend_colour {
            let average = total_colour / total_weight;
            let neighbours = Colour::new(average.x, average.y, average.z);
            particle.influenced_colour = Some(particle.base_colour.mix(neighbours, COLOUR_WEIGHT));
        }
        particle.influenced_size = Some(particle.base_size * (1.0 + total_size / total_weight));
    }

    particle.last_influenced = Some(frame);
}
