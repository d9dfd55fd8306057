//! Drawing the network. Nothing here changes the simulation.

use glam::Vec2;

use crate::canvas::{Canvas, Fill};

use super::colours::{Colour, Colours};
use super::connection::Connection;
use super::orb::Orb;
use super::particle::Particle;
use super::ripple::Ripple;
use super::simulation::Simulation;

/// The alpha at the centre of an orb's gradient.
const ORB_ALPHA: f32 = 0.5;

/// Particles with more links than this glow.
const GLOW_MIN_LINKS: usize = 2;

/// Particles with more emphasis than this glow.
const GLOW_MIN_EMPHASIS: f32 = 0.2;

/// The alpha at the centre of glow gradients.
const GLOW_ALPHA: f32 = 0.6;

/// Particles bigger than this get a little highlight.
const HIGHLIGHT_MIN_SIZE: f32 = 3.5;

/// The alpha of a particle's highlight.
const HIGHLIGHT_ALPHA: f32 = 0.3;

/// The alpha of a travelling data dot.
const TRANSFER_ALPHA: f32 = 0.9;

/// The largest glow around a travelling data dot.
const MAX_TRANSFER_GLOW: f32 = 20.0;

/// The width of a ripple's ring.
const RIPPLE_WIDTH: f32 = 2.0;

/// A particle's highlight colour.
const WHITE: Colour = Colour::new(1.0, 1.0, 1.0);

impl Simulation {
    /// Draw a whole frame: orbs, then particles, then connections, then ripples.
    pub fn render(&self, canvas: &mut impl Canvas) {
        let layer = self.config().opacity.clamp(0.0, 1.0);

        for orb in self.orbs() {
            render_orb(canvas, orb, layer);
        }
        for particle in self.particles() {
            render_particle(canvas, particle, layer);
        }
        for connection in self.network().iter() {
            let (Some(from), Some(to)) = (
                self.particles().get(connection.from),
                self.particles().get(connection.to),
            ) else {
                continue;
            };
            render_connection(canvas, connection, from.position, to.position, layer);
        }
        for ripple in self.ripples().iter() {
            render_ripple(canvas, ripple, layer);
        }
    }
}

/// A big soft gradient blob.
fn render_orb(canvas: &mut impl Canvas, orb: &Orb, layer: f32) {
    let fill = Fill::Fading {
        inner: orb.inner,
        outer: orb.outer,
    };
    canvas.fill_circle(orb.position, orb.radius, fill, ORB_ALPHA * orb.opacity * layer);
}

/// A particle, with its glow and highlight when it has them.
fn render_particle(canvas: &mut impl Canvas, particle: &Particle, layer: f32) {
    let size = particle.display_size();
    let colour = particle.display_colour();

    if particle.connections > GLOW_MIN_LINKS || particle.emphasis > GLOW_MIN_EMPHASIS {
        let glow_alpha = (0.2 + particle.emphasis).min(0.4);
        let fill = Fill::Fading {
            inner: colour,
            outer: colour,
        };
        canvas.fill_circle(
            particle.position,
            size * 3.0,
            fill,
            GLOW_ALPHA * glow_alpha * layer,
        );
    }

    let fill = Fill::Radial {
        inner: colour,
        outer: Colours::shade(colour),
    };
    let alpha = particle.display_opacity() * layer;
    canvas.fill_circle(particle.position, size, fill, alpha);

    if size > HIGHLIGHT_MIN_SIZE {
        let offset = Vec2::splat(size / 3.0);
        canvas.fill_circle(
            particle.position - offset,
            size / 3.0,
            Fill::Solid(WHITE),
            HIGHLIGHT_ALPHA * alpha,
        );
    }
}

/// A curved line, and its travelling data dot.
fn render_connection(
    canvas: &mut impl Canvas,
    connection: &Connection,
    from: Vec2,
    to: Vec2,
    layer: f32,
) {
    let Some(control) = connection.control_point(from, to) else {
        return;
    };

    canvas.stroke_quadratic(
        [from, control, to],
        connection.stroke_width(),
        connection.colour,
        connection.opacity * layer,
    );

    let (Some(point), Some(transfer)) = (
        connection.transfer_point(from, control, to),
        connection.transfer,
    ) else {
        return;
    };
    canvas.fill_circle(
        point,
        transfer.size,
        Fill::Solid(transfer.colour),
        TRANSFER_ALPHA * layer,
    );
    let glow = Fill::Fading {
        inner: transfer.colour,
        outer: transfer.colour,
    };
    canvas.fill_circle(
        point,
        (transfer.size * 3.0).min(MAX_TRANSFER_GLOW),
        glow,
        ORB_ALPHA * layer,
    );
}

/// An expanding ring.
fn render_ripple(canvas: &mut impl Canvas, ripple: &Ripple, layer: f32) {
    canvas.stroke_circle(
        ripple.centre,
        ripple.radius,
        RIPPLE_WIDTH,
        ripple.colour,
        ripple.opacity * layer,
    );
}

#[cfg(test)]
#[expect(clippy::indexing_slicing, reason = "Tests aren't so strict")]
mod test {
    use super::*;
    use crate::effects::network::config::Config;

    /// Records every draw call.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
    }

    impl Canvas for Recorder {
        fn size(&self) -> Vec2 {
            Vec2::new(800.0, 600.0)
        }

        fn fill_circle(&mut self, centre: Vec2, radius: f32, _fill: Fill, alpha: f32) {
            assert!(centre.is_finite() && radius.is_finite() && alpha.is_finite());
            self.calls.push("fill");
        }

        fn stroke_circle(
            &mut self,
            _centre: Vec2,
            _radius: f32,
            _width: f32,
            _colour: Colour,
            _alpha: f32,
        ) {
            self.calls.push("ring");
        }

        fn stroke_quadratic(&mut self, points: [Vec2; 3], _width: f32, _colour: Colour, _alpha: f32) {
            assert!(points.iter().all(|point| point.is_finite()));
            self.calls.push("curve");
        }
    }

    #[test]
    fn draws_in_layers() {
        let config = Config {
            seed: Some(3),
            ..Config::default()
        };
        let mut simulation = Simulation::new(config, 800.0, 600.0);
        simulation.pointer_clicked(Vec2::new(400.0, 300.0));
        simulation.tick();

        let mut recorder = Recorder::default();
        simulation.render(&mut recorder);

        assert!(!simulation.network().is_empty());
        let first_curve = recorder
            .calls
            .iter()
            .position(|call| *call == "curve")
            .unwrap();
        let fills_before_curves = &recorder.calls[..first_curve];
        assert!(fills_before_curves.iter().all(|call| *call == "fill"));
        let orbs_and_particles = simulation.orbs().len() + simulation.particles().len();
        assert!(fills_before_curves.len() >= orbs_and_particles);

        let connection_layer = &recorder.calls[first_curve..];
        let rings = connection_layer.iter().position(|call| *call == "ring").unwrap();
        assert!(connection_layer[rings..].iter().all(|call| *call == "ring"));
        let curves = recorder.calls.iter().filter(|call| **call == "curve").count();
        assert!(curves <= simulation.network().len());
    }

    #[test]
    fn degenerate_connections_are_skipped() {
        use rand::SeedableRng as _;

        let mut rng = rand::rngs::StdRng::seed_from_u64(4);
        let colours = Colours::from_hex(&[]);
        let edge = crate::effects::network::connection::Edge::new(0, 1);
        let connection = Connection::regular(&mut rng, &colours, edge, 10);

        let mut recorder = Recorder::default();
        render_connection(&mut recorder, &connection, Vec2::ONE, Vec2::ONE, 1.0);
        render_connection(&mut recorder, &connection, Vec2::NAN, Vec2::ONE, 1.0);
        assert!(recorder.calls.is_empty());

        render_connection(&mut recorder, &connection, Vec2::ZERO, Vec2::ONE, 1.0);
        assert_eq!(recorder.calls.first(), Some(&"curve"));
    }
}
