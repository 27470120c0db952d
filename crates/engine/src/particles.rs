//! Cosmetic particle burst emitted after a successful computation.
//!
//! The engine only describes the burst; rendering (and removing each
//! particle after `lifetime_ms`) is up to the front-end.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSettings {
    pub enabled: bool,
    pub count: usize,
    pub lifetime_ms: u64,
    /// Travel distance in px is `min_distance + [0, distance_spread)`.
    pub min_distance: f64,
    pub distance_spread: f64,
    pub palette: Vec<String>,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            count: 20,
            lifetime_ms: 1000,
            min_distance: 20.0,
            distance_spread: 50.0,
            palette: ["#00f2ff", "#ff00ff", "#9d00ff", "#00ff41"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Horizontal travel in px.
    pub dx: f64,
    /// Vertical travel in px.
    pub dy: f64,
    pub color: String,
    /// Start position as a percentage of the calculator's width.
    pub left_pct: f64,
    /// Start position as a percentage of the calculator's height.
    pub top_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleBurst {
    pub particles: Vec<Particle>,
    pub lifetime_ms: u64,
}

impl ParticleBurst {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, settings: &ParticleSettings) -> Self {
        let particles = (0..settings.count)
            .map(|_| {
                let angle = rng.gen::<f64>() * TAU;
                let distance = settings.min_distance + rng.gen::<f64>() * settings.distance_spread;
                let color = settings.palette.choose(rng).cloned().unwrap_or_default();
                Particle {
                    dx: angle.cos() * distance,
                    dy: angle.sin() * distance,
                    color,
                    left_pct: 50.0 + (rng.gen::<f64>() - 0.5) * 20.0,
                    top_pct: 20.0 + rng.gen::<f64>() * 10.0,
                }
            })
            .collect();

        Self {
            particles,
            lifetime_ms: settings.lifetime_ms,
        }
    }

    pub fn lifetime(&self) -> Duration {
        Duration::from_millis(self.lifetime_ms)
    }
}
