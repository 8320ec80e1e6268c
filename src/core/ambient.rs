//! Injected time and randomness.
//!
//! Every component that reads the wall clock or draws Gaussian noise does so
//! through an [`Ambient`] bundle, so tests can pin both.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Seconds since the Unix epoch, with sub-second precision.
    fn epoch_seconds(&self) -> f64 {
        let now = self.now();
        now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1e9
    }
}

pub trait NoiseSource: Send + Sync {
    /// Draw from N(mean, std_dev).
    fn gauss(&self, mean: f64, std_dev: f64) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Gaussian noise backed by a `StdRng`.
pub struct RngNoise {
    rng: Mutex<StdRng>,
}

impl RngNoise {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl NoiseSource for RngNoise {
    fn gauss(&self, mean: f64, std_dev: f64) -> f64 {
        let normal = match Normal::new(mean, std_dev.abs()) {
            Ok(normal) => normal,
            Err(_) => return mean,
        };
        match self.rng.lock() {
            Ok(mut rng) => normal.sample(&mut *rng),
            Err(poisoned) => normal.sample(&mut *poisoned.into_inner()),
        }
    }
}

/// Noise that always returns the distribution mean.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuietNoise;

impl NoiseSource for QuietNoise {
    fn gauss(&self, mean: f64, _std_dev: f64) -> f64 {
        mean
    }
}

#[derive(Clone)]
pub struct Ambient {
    pub clock: Arc<dyn Clock>,
    pub noise: Arc<dyn NoiseSource>,
}

impl Ambient {
    pub fn new(clock: Arc<dyn Clock>, noise: Arc<dyn NoiseSource>) -> Self {
        Self { clock, noise }
    }

    /// Wall clock with entropy-seeded noise.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(RngNoise::from_entropy()))
    }

    /// Wall clock with reproducible noise.
    pub fn seeded(seed: u64) -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(RngNoise::seeded(seed)))
    }

    /// Fixed clock and mean-only noise: every computation becomes deterministic.
    pub fn pinned(at: DateTime<Utc>) -> Self {
        Self::new(Arc::new(FixedClock(at)), Arc::new(QuietNoise))
    }

    /// Pinned at the Unix epoch, where every oscillation term is zero.
    pub fn at_epoch() -> Self {
        Self::pinned(DateTime::<Utc>::from(std::time::UNIX_EPOCH))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn epoch_seconds(&self) -> f64 {
        self.clock.epoch_seconds()
    }

    pub fn gauss(&self, mean: f64, std_dev: f64) -> f64 {
        self.noise.gauss(mean, std_dev)
    }
}

impl std::fmt::Debug for Ambient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ambient").field("now", &self.clock.now()).finish()
    }
}
