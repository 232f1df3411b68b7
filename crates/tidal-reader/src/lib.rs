//! Tidal Reader - read-time reconciliation of a single series
//!
//! A series is stored as immutable encoded pages, a buffer of writes not yet
//! flushed to pages, and an overlay of update/delete intervals. This crate
//! merges the three into one ordered stream:
//! - [`merge::merge_page`]: page + insert buffer + overlay + filter
//! - [`align::align_page`]: the same, restricted to a common timestamp grid
//! - [`reader`]: whole-series pull readers built on the two
//! - [`store`]: the storage interface the readers are opened from

pub mod align;
pub mod codec;
pub mod error;
pub mod filter;
pub mod insert;
pub mod merge;
pub mod overlay;
pub mod page;
pub mod reader;
pub mod result;
pub mod store;

pub use align::{align_inserts, align_page, CommonTimestamps, GridCursor, GridSource};
pub use codec::PageValue;
pub use error::{ReadError, Result};
pub use filter::{Filter, Predicate};
pub use insert::InsertBuffer;
pub use merge::{drain_inserts, merge_page};
pub use overlay::{
    DeleteInterval, Overlay, OverlayCursor, OverlayMode, Resolution, UpdateInterval,
};
pub use page::{EncodedPage, PageReader};
pub use reader::{
    open_reader, AlignedReader, MergeReader, PageSource, ReadMode, SeriesReader, VecPageSource,
};
pub use result::ResultColumn;
pub use store::{MemorySeriesStore, SeriesData, SeriesStore, TypedSeries};
