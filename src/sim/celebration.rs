//! Confetti burst for high-scoring evaluations.
//!
//! Purely decorative: a burst of randomly placed particles that clears
//! itself a few seconds after spawning. Uses `tokio::time::Instant` so
//! the self-clear is observable under paused test time.

use rand::Rng;
use tokio::time::{Duration, Instant};

pub const PARTICLE_COUNT: usize = 50;

/// Fixed particle palette.
pub const PALETTE: [&str; 5] = ["#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6"];

/// How long a burst stays visible.
const BURST_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct ConfettiParticle {
    pub color: &'static str,
    /// Horizontal position, percent of viewport width.
    pub left_percent: f32,
    /// Animation start delay in seconds.
    pub delay_secs: f32,
}

/// Generate one burst of random particles.
pub fn burst(count: usize) -> Vec<ConfettiParticle> {
    let mut rng = rand::rng();
    (0..count)
        .map(|_| ConfettiParticle {
            color: PALETTE[rng.random_range(0..PALETTE.len())],
            left_percent: rng.random_range(0.0..100.0),
            delay_secs: rng.random_range(0.0..2.0),
        })
        .collect()
}

/// Holds the currently visible burst, if any.
#[derive(Default)]
pub struct Celebration {
    particles: Vec<ConfettiParticle>,
    expires_at: Option<Instant>,
}

impl Celebration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a fresh burst, replacing any previous one.
    pub fn trigger(&mut self) {
        self.particles = burst(PARTICLE_COUNT);
        self.expires_at = Some(Instant::now() + BURST_TTL);
    }

    /// The currently visible particles. An expired burst clears on read.
    pub fn particles(&mut self) -> &[ConfettiParticle] {
        if let Some(expires_at) = self.expires_at
            && Instant::now() >= expires_at
        {
            self.particles.clear();
            self.expires_at = None;
        }
        &self.particles
    }

    pub fn is_active(&mut self) -> bool {
        !self.particles().is_empty()
    }
}
