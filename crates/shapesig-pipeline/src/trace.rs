//! Boundary tracing: follow the outer boundary of one foreground region.
//!
//! Implements 8-connected Moore-neighbour tracing. The tracer is a small
//! cursor (`position`, `last_dir`) over a read-only [`PixelSource`]; each
//! [`advance`](BoundaryTracer::advance) moves it to the next boundary
//! pixel in clockwise order.
//!
//! # Termination
//!
//! Tracing starts at `start`, takes one step to `second`, and stops when
//! the step `start -> second` is taken again. Matching `start` alone is
//! not enough: figure-eight and self-touching boundaries pass through
//! the start pixel before the loop is complete.
//!
//! # Runaway guard
//!
//! A closed boundary never needs more than three points per foreground
//! pixel. A trace that grows past that budget is abandoned with
//! [`TraceError::RunawayTrace`].

use serde::{Deserialize, Serialize};

use crate::raster::PixelSource;
use crate::types::{GridPoint, PointSequence, TraceError};

/// Minimum foreground count in the 3x3 neighbourhood of the start pixel
/// (the start pixel included).
pub const MIN_START_NEIGHBORHOOD: usize = 2;

/// Boundary point budget per foreground pixel.
pub const RUNAWAY_FACTOR: usize = 3;

/// Initial capacity of the boundary buffer.
const INITIAL_CAPACITY: usize = 64;

/// `(d_row, d_col)` unit steps indexed by [`Direction`], clockwise from up.
const DIRECTION_STEPS: [(i64, i64); 8] = [
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
];

/// One of the eight compass directions, numbered 0..8 clockwise from
/// "up". Arithmetic on directions is modulo 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    /// All directions in clockwise order starting at [`North`](Self::North).
    pub const ALL: [Self; 8] = [
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
    ];

    /// The direction with index `index % 8`.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self::ALL[index % 8]
    }

    /// Index of this direction, 0 (north) to 7 (north-west).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Unit `(d_row, d_col)` step.
    #[must_use]
    pub const fn step(self) -> (i64, i64) {
        DIRECTION_STEPS[self as usize]
    }

    /// This direction turned clockwise by `eighths` eighth-turns.
    #[must_use]
    pub const fn rotate_cw(self, eighths: usize) -> Self {
        Self::from_index(self as usize + eighths)
    }

    /// The opposite direction.
    #[must_use]
    pub const fn reverse(self) -> Self {
        self.rotate_cw(4)
    }
}

/// Find the pixel to start tracing from.
///
/// Scans the middle row left to right first; if it holds no foreground,
/// scans the whole grid row by row, top to bottom, left to right.
/// Returns `None` when the source is entirely background.
///
/// Only the source's [`search_window`](PixelSource::search_window) is
/// visited; everything outside it is background, so the result is the
/// same as a scan of the full grid.
#[must_use]
pub fn locate_start<S: PixelSource + ?Sized>(source: &S) -> Option<GridPoint> {
    let middle = i64::from(source.height()) / 2;
    let (rows, cols) = source.search_window();

    let on_middle_row = if rows.contains(&middle) {
        cols.clone()
            .map(|col| GridPoint::new(middle, col))
            .find(|p| source.is_foreground(p.row, p.col))
    } else {
        None
    };
    on_middle_row.or_else(|| {
        rows.flat_map(|row| cols.clone().map(move |col| GridPoint::new(row, col)))
            .find(|p| source.is_foreground(p.row, p.col))
    })
}

/// Boundary point budget for a region of `foreground` pixels.
#[must_use]
pub const fn runaway_limit(foreground: usize) -> usize {
    RUNAWAY_FACTOR.saturating_mul(foreground)
}

/// Foreground pixels in the 3x3 neighbourhood centred on `center`,
/// `center` itself included.
#[must_use]
pub fn neighborhood_count<S: PixelSource + ?Sized>(source: &S, center: GridPoint) -> usize {
    (-1..=1)
        .flat_map(|dr| (-1..=1).map(move |dc| (dr, dc)))
        .filter(|&(dr, dc)| source.is_foreground(center.row + dr, center.col + dc))
        .count()
}

/// Growable boundary storage with fallible doubling.
///
/// Owned by exactly one trace in progress.
#[derive(Debug, Default)]
struct TraceBuffer {
    points: Vec<GridPoint>,
}

impl TraceBuffer {
    fn push(&mut self, point: GridPoint) -> Result<(), TraceError> {
        if self.points.len() == self.points.capacity() {
            let additional = self.points.capacity().max(INITIAL_CAPACITY);
            self.points.try_reserve_exact(additional)?;
        }
        self.points.push(point);
        Ok(())
    }

    fn pop(&mut self) -> Option<GridPoint> {
        self.points.pop()
    }

    const fn len(&self) -> usize {
        self.points.len()
    }

    fn into_sequence(self) -> PointSequence {
        PointSequence::new(self.points)
    }
}

/// Stateful Moore-neighbour cursor over a [`PixelSource`].
///
/// One tracer performs one trace at a time; distinct tracers over the
/// same source are independent.
#[derive(Debug)]
pub struct BoundaryTracer<'a, S: PixelSource + ?Sized> {
    source: &'a S,
    position: GridPoint,
    last_dir: Direction,
}

impl<'a, S: PixelSource + ?Sized> BoundaryTracer<'a, S> {
    /// Create a tracer over `source`, parked at the origin.
    #[must_use]
    pub const fn new(source: &'a S) -> Self {
        Self {
            source,
            position: GridPoint::new(0, 0),
            last_dir: Direction::East,
        }
    }

    /// Current cursor position.
    #[must_use]
    pub const fn position(&self) -> GridPoint {
        self.position
    }

    /// Direction of the step that reached the current position.
    #[must_use]
    pub const fn last_dir(&self) -> Direction {
        self.last_dir
    }

    /// Direction pointing back to the previous position.
    #[must_use]
    pub const fn from_dir(&self) -> Direction {
        self.last_dir.reverse()
    }

    /// Place the cursor at `position` as if it had arrived moving
    /// `last_dir`.
    pub const fn reset(&mut self, position: GridPoint, last_dir: Direction) {
        self.position = position;
        self.last_dir = last_dir;
    }

    /// Step to the next boundary pixel.
    ///
    /// Candidates are scanned clockwise starting two eighth-turns past
    /// the back-trace direction, wrapping through all eight directions.
    /// The first foreground neighbour wins. Returns `None` (cursor
    /// unchanged) when no neighbour is foreground.
    pub fn advance(&mut self) -> Option<GridPoint> {
        let first = self.from_dir().rotate_cw(2);
        for turn in 0..8 {
            let dir = first.rotate_cw(turn);
            let candidate = self.position.offset(dir.step());
            if self.source.is_foreground(candidate.row, candidate.col) {
                self.position = candidate;
                self.last_dir = dir;
                return Some(candidate);
            }
        }
        None
    }

    /// Locate the start pixel and trace the closed boundary from it.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::NoForegroundPixel`] for an all-background
    /// source, and otherwise the errors of [`trace_from`](Self::trace_from).
    pub fn trace(&mut self) -> Result<PointSequence, TraceError> {
        self.trace_with_limit(runaway_limit(self.source.foreground_count()))
    }

    /// [`trace`](Self::trace) with an explicit runaway budget, for
    /// callers that already know the foreground count.
    ///
    /// # Errors
    ///
    /// Same as [`trace`](Self::trace).
    pub fn trace_with_limit(&mut self, limit: usize) -> Result<PointSequence, TraceError> {
        let start = locate_start(self.source).ok_or(TraceError::NoForegroundPixel)?;
        self.trace_from_with_limit(start, limit)
    }

    /// Trace the closed boundary starting at `start`.
    ///
    /// The cursor begins as if it had arrived at `start` moving north,
    /// so the first scan starts at the west neighbour. A left-to-right
    /// start scan has already seen that pixel as background. The
    /// returned sequence begins with `start` and does not repeat it at
    /// the end.
    ///
    /// # Errors
    ///
    /// - [`TraceError::DegenerateStart`] if `start` has fewer than
    ///   [`MIN_START_NEIGHBORHOOD`] foreground pixels around it.
    /// - [`TraceError::RunawayTrace`] if the boundary exceeds
    ///   [`RUNAWAY_FACTOR`] points per foreground pixel.
    /// - [`TraceError::DeadEnd`] if the cursor finds no foreground
    ///   neighbour.
    /// - [`TraceError::Allocation`] if the boundary buffer cannot grow.
    pub fn trace_from(&mut self, start: GridPoint) -> Result<PointSequence, TraceError> {
        self.trace_from_with_limit(start, runaway_limit(self.source.foreground_count()))
    }

    /// [`trace_from`](Self::trace_from) with an explicit runaway budget.
    ///
    /// # Errors
    ///
    /// Same as [`trace_from`](Self::trace_from).
    pub fn trace_from_with_limit(
        &mut self,
        start: GridPoint,
        limit: usize,
    ) -> Result<PointSequence, TraceError> {
        let neighbors = neighborhood_count(self.source, start);
        if neighbors < MIN_START_NEIGHBORHOOD {
            tracing::warn!(
                row = start.row,
                col = start.col,
                neighbors,
                "rejecting isolated start pixel"
            );
            return Err(TraceError::DegenerateStart {
                row: start.row,
                col: start.col,
                neighbors,
            });
        }

        self.reset(start, Direction::North);

        let mut buffer = TraceBuffer::default();
        buffer.push(start)?;
        let second = self.advance().ok_or(TraceError::DeadEnd {
            row: start.row,
            col: start.col,
        })?;
        buffer.push(second)?;

        loop {
            let previous = self.position;
            let next = self.advance().ok_or(TraceError::DeadEnd {
                row: previous.row,
                col: previous.col,
            })?;
            if previous == start && next == second {
                // `start` was pushed when the loop came back around.
                buffer.pop();
                break;
            }
            buffer.push(next)?;
            if buffer.len() > limit {
                tracing::error!(
                    limit,
                    row = start.row,
                    col = start.col,
                    "boundary trace did not close; wrong threshold or region not simply connected?"
                );
                return Err(TraceError::RunawayTrace { limit });
            }
        }

        tracing::debug!(
            row = start.row,
            col = start.col,
            points = buffer.len(),
            "traced boundary"
        );
        Ok(buffer.into_sequence())
    }
}

/// Trace the outer boundary of the foreground in `source`.
///
/// # Errors
///
/// See [`BoundaryTracer::trace`].
pub fn trace_boundary<S: PixelSource + ?Sized>(source: &S) -> Result<PointSequence, TraceError> {
    BoundaryTracer::new(source).trace()
}
