//! Page merge restricted to a common timestamp grid
//!
//! Aggregations over several series sometimes must only consider timestamps
//! that are valid for all of them. The caller supplies that grid; the aligner
//! emits a point only when its timestamp is on the grid, and returns how far
//! along the grid it got so the next page of the series resumes there.
//!
//! A grid need not be in memory as a whole: [`GridCursor`] pulls it from a
//! [`GridSource`] in batches and hands the aligner one page's worth at a time.

use crate::codec::PageValue;
use crate::error::{ReadError, Result};
use crate::filter::Predicate;
use crate::insert::InsertBuffer;
use crate::overlay::{Overlay, OverlayCursor, Resolution};
use crate::page::EncodedPage;
use crate::result::ResultColumn;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tidal_core::Timestamp;
use tracing::{debug, error};

/// Strictly ascending timestamp grid, cheap to share between series readers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonTimestamps(Arc<[Timestamp]>);

impl CommonTimestamps {
    pub fn new(timestamps: Vec<Timestamp>) -> Result<Self> {
        if let Some(pair) = timestamps.windows(2).find(|w| w[1] <= w[0]) {
            return Err(ReadError::InvalidCommonTimestamps(format!(
                "not strictly ascending: {} after {}",
                pair[1], pair[0]
            )));
        }
        Ok(Self(timestamps.into()))
    }

    pub fn as_slice(&self) -> &[Timestamp] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Grid timestamps produced in ascending batches
pub trait GridSource: Send {
    /// Next batch, or `None` once the grid is complete. A batch may be empty.
    fn next_batch(&mut self) -> Result<Option<Vec<Timestamp>>>;
}

impl GridSource for Option<CommonTimestamps> {
    fn next_batch(&mut self) -> Result<Option<Vec<Timestamp>>> {
        Ok(self.take().map(|grid| grid.as_slice().to_vec()))
    }
}

/// Position in a lazily pulled grid.
///
/// Only the points between the last consumed one and the end of the latest
/// batch are held; batches must continue the strict ascending order.
pub struct GridCursor {
    source: Box<dyn GridSource>,
    pending: VecDeque<Timestamp>,
    last: Option<Timestamp>,
    consumed: usize,
    source_done: bool,
}

impl GridCursor {
    pub fn new(source: Box<dyn GridSource>) -> Self {
        Self {
            source,
            pending: VecDeque::new(),
            last: None,
            consumed: 0,
            source_done: false,
        }
    }

    /// Cursor over a grid already in memory
    pub fn fixed(grid: CommonTimestamps) -> Self {
        Self::new(Box::new(Some(grid)))
    }

    /// Pull one batch; false once the source is done
    fn pull(&mut self) -> Result<bool> {
        if self.source_done {
            return Ok(false);
        }
        let Some(batch) = self.source.next_batch()? else {
            self.source_done = true;
            return Ok(false);
        };
        for t in batch {
            if let Some(last) = self.last.filter(|&last| t <= last) {
                return Err(ReadError::InvalidCommonTimestamps(format!(
                    "not strictly ascending: {} after {}",
                    t, last
                )));
            }
            self.last = Some(t);
            self.pending.push_back(t);
        }
        Ok(true)
    }

    /// Remove and return the pending grid points at or before `bound`
    pub fn take_through(&mut self, bound: Timestamp) -> Result<CommonTimestamps> {
        while self.pending.back().map_or(true, |&t| t <= bound) && self.pull()? {}
        let n = self.pending.iter().take_while(|&&t| t <= bound).count();
        let chunk: Vec<Timestamp> = self.pending.drain(..n).collect();
        Ok(CommonTimestamps(chunk.into()))
    }

    /// Account for the first `used` points of `chunk` and return the rest
    pub fn advance(&mut self, chunk: &CommonTimestamps, used: usize) {
        let rest = chunk.as_slice().get(used..).unwrap_or(&[]);
        self.consumed += chunk.len() - rest.len();
        for &t in rest.iter().rev() {
            self.pending.push_front(t);
        }
    }

    /// Whether every grid point has been consumed
    pub fn is_exhausted(&mut self) -> Result<bool> {
        while self.pending.is_empty() {
            if !self.pull()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Grid points consumed so far
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Grid points pulled but not yet consumed
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}

impl fmt::Debug for GridCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridCursor")
            .field("buffered", &self.pending.len())
            .field("consumed", &self.consumed)
            .field("source_done", &self.source_done)
            .finish()
    }
}

/// Merge one page against the grid, starting at `grid_idx`.
///
/// Buffered writes drain first: one on the current grid point is emitted as is
/// and consumes the grid point (and the page value, when the page has the same
/// time); one before the grid point is off-grid and dropped. Then the page
/// point is compared with the grid point:
/// - equal: the overlay is applied and the point emitted, both cursors advance
/// - page earlier: the page value is dropped
/// - page later: the grid point has no data and is passed over
///
/// Only page points are checked against the time predicate. Stops when the
/// page or the grid runs out and returns the column with the grid index reached.
/// Grid points after the page's last time are never consumed, so passing just
/// the points up to it gives the same result as passing the whole grid.
pub fn align_page<T: PageValue>(
    page: &EncodedPage,
    inserts: &mut InsertBuffer<T>,
    overlay: &Overlay<T>,
    cursor: &mut OverlayCursor,
    time_filter: Option<&Predicate<Timestamp>>,
    grid: &CommonTimestamps,
    grid_idx: usize,
) -> Result<(ResultColumn<T>, usize)> {
    let grid = grid.as_slice();
    let time_ok = |t: Timestamp| time_filter.map_or(true, |p| p.matches(&t));

    let mut reader = page.reader::<T>()?;
    let mut column = ResultColumn::new();
    let mut idx = grid_idx;

    while let Some(time) = reader.current_time() {
        let mut shadowed = false;
        while idx < grid.len() {
            let Some(insert_time) = inserts.peek_time().filter(|&t| t <= time) else {
                break;
            };
            if insert_time == grid[idx] {
                if let Some(point) = inserts.pop() {
                    column.push_insert(point);
                }
                idx += 1;
                shadowed |= insert_time == time;
            } else if insert_time < grid[idx] {
                inserts.pop();
            } else {
                break;
            }
        }

        if idx >= grid.len() {
            break;
        }

        if shadowed {
            reader.skip()?;
        } else if time == grid[idx] {
            let point = reader.read_next()?.ok_or_else(|| {
                ReadError::PageLayout(format!("no value for page time {}", time))
            })?;
            match overlay.resolve(cursor, time) {
                Resolution::Override(value) => {
                    if time_ok(time) {
                        column.push(time, value.clone());
                    }
                }
                Resolution::Suppress => {
                    // The grid is built from visible points only
                    error!(
                        "Grid timestamp {} falls inside a delete interval; point dropped",
                        time
                    );
                }
                Resolution::Pass => {
                    if time_ok(time) {
                        column.push(time, point.value);
                    }
                }
            }
            idx += 1;
        } else if time < grid[idx] {
            reader.skip()?;
        } else {
            idx += 1;
        }

        if let Some(next) = reader.current_time() {
            overlay.seek(cursor, next);
        }
    }

    debug!(
        "Aligned page of {} points: {} emitted, grid index {} -> {}",
        page.len(),
        column.len(),
        grid_idx,
        idx
    );
    Ok((column, idx))
}

/// Match the buffered writes left after the last page against the rest of the grid
pub fn align_inserts<T: PageValue>(
    inserts: &mut InsertBuffer<T>,
    grid: &CommonTimestamps,
    grid_idx: usize,
) -> (ResultColumn<T>, usize) {
    let grid = grid.as_slice();
    let mut column = ResultColumn::new();
    let mut idx = grid_idx;

    while idx < grid.len() {
        let Some(insert_time) = inserts.peek_time() else {
            break;
        };
        if insert_time == grid[idx] {
            if let Some(point) = inserts.pop() {
                column.push_insert(point);
            }
            idx += 1;
        } else if insert_time < grid[idx] {
            inserts.pop();
        } else {
            idx += 1;
        }
    }

    (column, idx)
}
