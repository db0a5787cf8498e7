//! Dense N x N DFT matrices and a small LRU cache of them.
//!
//! The fixed-N resampled descriptor multiplies a handful of samples by a
//! precomputed matrix instead of planning an FFT. Matrices are built on
//! demand, shared as [`Arc`]s, and kept in a [`DftMatrixCache`] keyed by
//! `(size, direction)`. The cache is locked, so concurrent callers asking
//! for different sizes neither race nor evict each other's matrix while
//! it is in use.

use std::f64::consts::TAU;
use std::sync::Arc;

use parking_lot::Mutex;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::types::DescriptorError;

/// Default number of matrices retained by a [`DftMatrixCache`].
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

/// Forward or inverse transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformDirection {
    /// `X[k] = sum_j x[j] e^{-2 pi i jk / n}`.
    Forward,
    /// `x[j] = (1/n) sum_k X[k] e^{+2 pi i jk / n}`.
    Inverse,
}

/// A row-major `size x size` DFT matrix.
///
/// Inverse matrices carry the `1/n` normalization, so applying the
/// inverse to the forward output returns the input.
#[derive(Debug, Clone, PartialEq)]
pub struct DftMatrix {
    size: usize,
    direction: TransformDirection,
    entries: Vec<Complex64>,
}

impl DftMatrix {
    /// Build the matrix for `size` samples.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(size: usize, direction: TransformDirection) -> Self {
        let (sign, scale) = match direction {
            TransformDirection::Forward => (-1.0, 1.0),
            TransformDirection::Inverse => (1.0, 1.0 / size.max(1) as f64),
        };
        let mut entries = Vec::with_capacity(size * size);
        for k in 0..size {
            for j in 0..size {
                // Reduce jk mod n first to keep the angle small.
                let angle = sign * TAU * ((j * k) % size) as f64 / size as f64;
                entries.push(Complex64::from_polar(scale, angle));
            }
        }
        Self {
            size,
            direction,
            entries,
        }
    }

    /// Number of samples the matrix transforms.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Transform direction.
    #[must_use]
    pub const fn direction(&self) -> TransformDirection {
        self.direction
    }

    /// Multiply `samples` by the matrix.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::MatrixSize`] when `samples.len()` is not
    /// the matrix size.
    pub fn apply(&self, samples: &[Complex64]) -> Result<Vec<Complex64>, DescriptorError> {
        if samples.len() != self.size {
            return Err(DescriptorError::MatrixSize {
                expected: self.size,
                found: samples.len(),
            });
        }
        if self.size == 0 {
            return Ok(Vec::new());
        }
        Ok(self
            .entries
            .chunks_exact(self.size)
            .map(|row| row.iter().zip(samples).map(|(w, x)| w * x).sum::<Complex64>())
            .collect())
    }
}

/// Hit/build counters of a [`DftMatrixCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Matrices built because of a miss.
    pub builds: u64,
    /// Matrices currently retained.
    pub entries: usize,
}

#[derive(Debug, Default)]
struct CacheState {
    /// Least recently used first.
    entries: Vec<((usize, TransformDirection), Arc<DftMatrix>)>,
    hits: u64,
    builds: u64,
}

/// A locked LRU of DFT matrices keyed by `(size, direction)`.
#[derive(Debug)]
pub struct DftMatrixCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl DftMatrixCache {
    /// A cache retaining at most `capacity` matrices (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Maximum number of retained matrices.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fetch the matrix for `size` samples, building it on a miss.
    #[must_use]
    pub fn get(&self, size: usize, direction: TransformDirection) -> Arc<DftMatrix> {
        let key = (size, direction);
        let mut state = self.state.lock();

        if let Some(pos) = state.entries.iter().position(|(k, _)| *k == key) {
            let entry = state.entries.remove(pos);
            let matrix = Arc::clone(&entry.1);
            state.entries.push(entry);
            state.hits += 1;
            return matrix;
        }

        tracing::debug!(size, ?direction, "building DFT matrix");
        let matrix = Arc::new(DftMatrix::new(size, direction));
        state.entries.push((key, Arc::clone(&matrix)));
        state.builds += 1;
        if state.entries.len() > self.capacity {
            let (evicted, _) = state.entries.remove(0);
            tracing::debug!(size = evicted.0, direction = ?evicted.1, "evicted DFT matrix");
        }
        matrix
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            hits: state.hits,
            builds: state.builds,
            entries: state.entries.len(),
        }
    }

    /// Drop every retained matrix. Counters are kept.
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }
}

impl Default for DftMatrixCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
