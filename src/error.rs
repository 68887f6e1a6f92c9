//! Error kinds surfaced to callers, plus the internal "death signal"
//! sum type that never crosses the public API.

use thiserror::Error;

/// Fatal error kinds. Every other recoverable condition (a death
/// signal, a null placeholder, a phase-alignment clamp, an empty
/// spectral map) is handled locally and never reaches a caller.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("track asset missing or malformed: {0}")]
    AssetMissing(String),

    #[error("requested mass {mass} Msol outside track grid [{lo}, {hi}]")]
    OutOfRange { mass: f64, lo: f64, hi: f64 },
}

pub type GenResult<T> = Result<T, GenError>;

/// Internal control-flow result for the track interpolator and the
/// stellar generator's retry loop: a `Result`-like sum in place of an
/// exception carrying a seed `Star`.
#[derive(Debug, Clone)]
pub enum StarOutcome<T> {
    /// Interpolation succeeded; state vector + blended lifetime.
    Alive(T),
    /// `targetAge` exceeded the blended lifetime; carries the lifetime
    /// so the caller can branch into the death-star processor.
    Died { lifetime_s: f64 },
}

impl<T> StarOutcome<T> {
    pub fn alive(self) -> Option<T> {
        match self {
            StarOutcome::Alive(v) => Some(v),
            StarOutcome::Died { .. } => None,
        }
    }
}
