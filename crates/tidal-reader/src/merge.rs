//! Single-page merge of page data, buffered writes and the overlay

use crate::codec::PageValue;
use crate::error::{ReadError, Result};
use crate::filter::Filter;
use crate::insert::InsertBuffer;
use crate::overlay::{Overlay, OverlayCursor, Resolution};
use crate::page::EncodedPage;
use crate::result::ResultColumn;
use tracing::debug;

/// Merge one page with the insert buffer and the overlay.
///
/// For each page point, in time order:
/// 1. Buffered writes at or before the page time are emitted first. A write at
///    exactly the page time replaces the page value, which is decoded and dropped.
/// 2. Inside an update interval the override is emitted, subject to the time
///    predicate only.
/// 3. Inside a delete interval nothing is emitted.
/// 4. Otherwise the page value is emitted if it passes the filter.
///
/// Buffered writes are emitted as they are, with neither the overlay nor the
/// filter applied. Writes after the last page time stay in the buffer for the
/// next page.
/// `cursor` is left where the merge stopped so the next page resumes from it.
pub fn merge_page<T: PageValue>(
    page: &EncodedPage,
    inserts: &mut InsertBuffer<T>,
    overlay: &Overlay<T>,
    cursor: &mut OverlayCursor,
    filter: &Filter<T>,
) -> Result<ResultColumn<T>> {
    let mut reader = page.reader::<T>()?;
    let mut column = ResultColumn::with_capacity(page.len());

    while let Some(time) = reader.current_time() {
        let mut shadowed = false;
        while inserts.peek_time().map_or(false, |t| t <= time) {
            let Some(point) = inserts.pop() else { break };
            shadowed |= point.timestamp == time;
            column.push_insert(point);
        }

        if shadowed {
            reader.skip()?;
        } else {
            let point = reader.read_next()?.ok_or_else(|| {
                ReadError::PageLayout(format!("no value for page time {}", time))
            })?;
            match overlay.resolve(cursor, time) {
                Resolution::Override(value) => {
                    if filter.satisfies_time(time) {
                        column.push(time, value.clone());
                    }
                }
                Resolution::Suppress => {}
                Resolution::Pass => {
                    if filter.satisfies(time, &point.value) {
                        column.push(time, point.value);
                    }
                }
            }
        }

        if let Some(next) = reader.current_time() {
            overlay.seek(cursor, next);
        }
    }

    debug!(
        "Merged page of {} points into {} ({} from insert buffer)",
        page.len(),
        column.len(),
        column.insert_count
    );
    Ok(column)
}

/// Drain the buffered writes left after the last page
pub fn drain_inserts<T: PageValue>(inserts: &mut InsertBuffer<T>) -> ResultColumn<T> {
    let mut column = ResultColumn::with_capacity(inserts.len());
    while let Some(point) = inserts.pop() {
        column.push_insert(point);
    }
    column
}
