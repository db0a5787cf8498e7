//! Discrete Fourier transforms over boundary samples.
//!
//! A boundary becomes a complex signal `x + iy` by putting each point's
//! column on the real axis and its row on the imaginary axis. The forward
//! transform of that signal is the boundary's Fourier spectrum; the
//! inverse transform turns (possibly filtered) coefficients back into
//! complex samples.
//!
//! Transforms run through `rustfft`. Transforms are unnormalized in the
//! forward direction and scaled by `1/n` in the inverse direction, so
//! `inverse(forward(x)) == x`.
//!
//! [`SpectralContext`] bundles everything that is worth caching between
//! calls: planned FFTs keyed by length and the dense matrices used by the
//! fixed-N descriptor. It is `Send + Sync`; create one and share it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::dft_matrix::{CacheStats, DftMatrix, DftMatrixCache, TransformDirection};
use crate::types::PointSequence;

type PlanKey = (usize, TransformDirection);

/// Shared transform state: planned FFTs and cached DFT matrices.
pub struct SpectralContext {
    plans: Mutex<HashMap<PlanKey, Arc<dyn Fft<f64>>>>,
    matrices: DftMatrixCache,
}

impl std::fmt::Debug for SpectralContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralContext")
            .field("planned_lengths", &self.plans.lock().len())
            .field("matrices", &self.matrices)
            .finish()
    }
}

impl Default for SpectralContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectralContext {
    /// A context with an empty plan table and a default-sized matrix
    /// cache.
    #[must_use]
    pub fn new() -> Self {
        Self::with_matrix_cache(DftMatrixCache::default())
    }

    /// A context using the given matrix cache.
    #[must_use]
    pub fn with_matrix_cache(matrices: DftMatrixCache) -> Self {
        Self {
            plans: Mutex::new(HashMap::new()),
            matrices,
        }
    }

    /// Fetch (or plan) the FFT for `len` samples.
    fn plan(&self, len: usize, direction: TransformDirection) -> Arc<dyn Fft<f64>> {
        let mut plans = self.plans.lock();
        Arc::clone(plans.entry((len, direction)).or_insert_with(|| {
            tracing::debug!(len, ?direction, "planning FFT");
            let mut planner = FftPlanner::<f64>::new();
            match direction {
                TransformDirection::Forward => planner.plan_fft_forward(len),
                TransformDirection::Inverse => planner.plan_fft_inverse(len),
            }
        }))
    }

    /// Forward DFT of `samples` (unnormalized).
    #[must_use]
    pub fn forward(&self, samples: &[Complex64]) -> Vec<Complex64> {
        let mut buffer = samples.to_vec();
        if !buffer.is_empty() {
            self.plan(buffer.len(), TransformDirection::Forward)
                .process(&mut buffer);
        }
        buffer
    }

    /// Inverse DFT of `coefficients`, scaled by `1/n`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn inverse(&self, coefficients: &[Complex64]) -> Vec<Complex64> {
        let mut buffer = coefficients.to_vec();
        if !buffer.is_empty() {
            self.plan(buffer.len(), TransformDirection::Inverse)
                .process(&mut buffer);
            let scale = 1.0 / buffer.len() as f64;
            for sample in &mut buffer {
                *sample *= scale;
            }
        }
        buffer
    }

    /// Forward spectrum of a boundary, without centering.
    #[must_use]
    pub fn forward_spectrum(&self, points: &PointSequence) -> Vec<Complex64> {
        self.forward(&points.to_complex())
    }

    /// Forward spectrum of a boundary translated to its centroid, so bin
    /// 0 is zero.
    #[must_use]
    pub fn centered_spectrum(&self, points: &PointSequence) -> Vec<Complex64> {
        self.forward(&points.centered_complex())
    }

    /// The cached DFT matrix for `size` samples.
    #[must_use]
    pub fn matrix(&self, size: usize, direction: TransformDirection) -> Arc<DftMatrix> {
        self.matrices.get(size, direction)
    }

    /// Counters of the matrix cache.
    #[must_use]
    pub fn matrix_stats(&self) -> CacheStats {
        self.matrices.stats()
    }
}

/// Forward spectrum of a boundary using a throwaway context.
///
/// Prefer [`SpectralContext::forward_spectrum`] when transforming many
/// boundaries.
#[must_use]
pub fn forward_spectrum(points: &PointSequence) -> Vec<Complex64> {
    SpectralContext::new().forward_spectrum(points)
}

/// Keep the DC bin and `harmonics` bins on each side of it, zeroing the
/// rest.
///
/// Bins `1..=harmonics` and `n-harmonics..n` survive. When `2 *
/// harmonics + 1 >= n` nothing is removed.
#[must_use]
pub fn truncate_spectrum(coefficients: &[Complex64], harmonics: usize) -> Vec<Complex64> {
    let n = coefficients.len();
    coefficients
        .iter()
        .enumerate()
        .map(|(k, &c)| {
            let frequency = k.min(n - k);
            if frequency <= harmonics {
                c
            } else {
                Complex64::new(0.0, 0.0)
            }
        })
        .collect()
}

/// Magnitude of every bin.
#[must_use]
pub fn magnitudes(spectrum: &[Complex64]) -> Vec<f64> {
    spectrum.iter().map(|c| c.norm()).collect()
}
