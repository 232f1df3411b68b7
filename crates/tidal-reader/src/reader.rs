//! Whole-series pull readers
//!
//! A reader owns everything one scan of a series needs: the page source, the
//! insert buffer, the overlay with its cursor, and (aligned mode) the grid
//! cursor. Each call to [`SeriesReader::next_column`] merges one page.

use crate::align::{align_inserts, align_page, GridCursor};
use crate::codec::PageValue;
use crate::error::Result;
use crate::filter::{Filter, Predicate};
use crate::insert::InsertBuffer;
use crate::merge::{drain_inserts, merge_page};
use crate::overlay::{Overlay, OverlayCursor};
use crate::page::EncodedPage;
use crate::result::ResultColumn;
use crate::store::TypedSeries;
use std::collections::VecDeque;
use tidal_core::Timestamp;
use tracing::debug;

/// Pages of one series in ascending time order, pulled lazily
pub trait PageSource: Send {
    /// Next page, or `None` when the series has no more pages
    fn next_page(&mut self) -> Result<Option<EncodedPage>>;
}

/// Page source over pages already in memory
#[derive(Debug, Default)]
pub struct VecPageSource {
    pages: VecDeque<EncodedPage>,
}

impl VecPageSource {
    pub fn new(pages: Vec<EncodedPage>) -> Self {
        Self {
            pages: pages.into(),
        }
    }
}

impl PageSource for VecPageSource {
    fn next_page(&mut self) -> Result<Option<EncodedPage>> {
        Ok(self.pages.pop_front())
    }
}

/// Pull interface over the merged stream of one series
pub trait SeriesReader<T: PageValue>: Send {
    /// Next non-empty column, or `None` once the series is exhausted
    fn next_column(&mut self) -> Result<Option<ResultColumn<T>>>;
}

/// How a series is read
#[derive(Debug)]
pub enum ReadMode<T> {
    /// Full merge with a time and value filter
    Merge(Filter<T>),
    /// Restricted to a grid; only a time predicate applies
    Aligned {
        grid: GridCursor,
        time_filter: Option<Predicate<Timestamp>>,
    },
}

/// Open a reader; the merge/aligned choice is fixed here
pub fn open_reader<T: PageValue>(
    series: TypedSeries<T>,
    mode: ReadMode<T>,
) -> Box<dyn SeriesReader<T>> {
    match mode {
        ReadMode::Merge(filter) => Box::new(MergeReader::new(series, filter)),
        ReadMode::Aligned { grid, time_filter } => {
            Box::new(AlignedReader::new(series, grid, time_filter))
        }
    }
}

/// Reader applying the full merge to every page
pub struct MergeReader<T: PageValue> {
    pages: Box<dyn PageSource>,
    inserts: InsertBuffer<T>,
    overlay: Overlay<T>,
    cursor: OverlayCursor,
    filter: Filter<T>,
    pages_read: usize,
    done: bool,
}

impl<T: PageValue> MergeReader<T> {
    pub fn new(series: TypedSeries<T>, filter: Filter<T>) -> Self {
        Self {
            pages: series.pages,
            inserts: series.inserts,
            overlay: series.overlay,
            cursor: OverlayCursor::new(),
            filter,
            pages_read: 0,
            done: false,
        }
    }

    /// Pages pulled from the source so far
    pub fn pages_read(&self) -> usize {
        self.pages_read
    }
}

impl<T: PageValue> SeriesReader<T> for MergeReader<T> {
    fn next_column(&mut self) -> Result<Option<ResultColumn<T>>> {
        while !self.done {
            match self.pages.next_page()? {
                Some(page) => {
                    self.pages_read += 1;
                    let column = merge_page(
                        &page,
                        &mut self.inserts,
                        &self.overlay,
                        &mut self.cursor,
                        &self.filter,
                    )?;
                    if !column.is_empty() {
                        return Ok(Some(column));
                    }
                }
                None => {
                    self.done = true;
                    let column = drain_inserts(&mut self.inserts);
                    debug!(
                        "Merge read finished after {} pages, {} trailing buffered points",
                        self.pages_read,
                        column.len()
                    );
                    if !column.is_empty() {
                        return Ok(Some(column));
                    }
                }
            }
        }
        Ok(None)
    }
}

/// Reader restricted to a common timestamp grid.
///
/// The grid is pulled from its cursor one page at a time: only the points up
/// to the page's last timestamp are requested before the page is aligned.
pub struct AlignedReader<T: PageValue> {
    pages: Box<dyn PageSource>,
    inserts: InsertBuffer<T>,
    overlay: Overlay<T>,
    cursor: OverlayCursor,
    time_filter: Option<Predicate<Timestamp>>,
    grid: GridCursor,
    done: bool,
}

impl<T: PageValue> AlignedReader<T> {
    pub fn new(
        series: TypedSeries<T>,
        grid: GridCursor,
        time_filter: Option<Predicate<Timestamp>>,
    ) -> Self {
        Self {
            pages: series.pages,
            inserts: series.inserts,
            overlay: series.overlay,
            cursor: OverlayCursor::new(),
            time_filter,
            grid,
            done: false,
        }
    }

    /// Position reached in the grid
    pub fn grid_index(&self) -> usize {
        self.grid.consumed()
    }
}

impl<T: PageValue> SeriesReader<T> for AlignedReader<T> {
    fn next_column(&mut self) -> Result<Option<ResultColumn<T>>> {
        while !self.done {
            // Nothing left to align against; stop pulling pages
            if self.grid.is_exhausted()? {
                self.done = true;
                break;
            }

            match self.pages.next_page()? {
                Some(page) => {
                    let Some(last_time) = page.last_time() else {
                        continue;
                    };
                    let chunk = self.grid.take_through(last_time)?;
                    let (column, used) = align_page(
                        &page,
                        &mut self.inserts,
                        &self.overlay,
                        &mut self.cursor,
                        self.time_filter.as_ref(),
                        &chunk,
                        0,
                    )?;
                    self.grid.advance(&chunk, used);
                    if !column.is_empty() {
                        return Ok(Some(column));
                    }
                }
                None => {
                    self.done = true;
                    let Some(last_time) = self.inserts.last_time() else {
                        break;
                    };
                    let chunk = self.grid.take_through(last_time)?;
                    let (column, used) = align_inserts(&mut self.inserts, &chunk, 0);
                    self.grid.advance(&chunk, used);
                    if !column.is_empty() {
                        return Ok(Some(column));
                    }
                }
            }
        }
        Ok(None)
    }
}
