//! Property-based tests for the merge and aligned paths.
//!
//! Page and insert contents are generated as maps keyed by timestamp, so both
//! are strictly ascending as the readers require.

use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tidal_core::DataPoint;
use tidal_reader::{
    align_inserts, align_page, merge_page, CommonTimestamps, EncodedPage, Filter, GridCursor,
    InsertBuffer, Overlay, OverlayCursor, Predicate,
};

fn page_strategy() -> impl Strategy<Value = BTreeMap<i64, i32>> {
    prop::collection::btree_map(0i64..200, any::<i32>(), 1..60)
}

fn inserts_strategy() -> impl Strategy<Value = BTreeMap<i64, i32>> {
    prop::collection::btree_map(0i64..220, any::<i32>(), 0..30)
}

fn grid_strategy() -> impl Strategy<Value = BTreeSet<i64>> {
    prop::collection::btree_set(0i64..230, 0..80)
}

fn encode(points: &BTreeMap<i64, i32>) -> EncodedPage {
    let points: Vec<_> = points.iter().map(|(&t, &v)| DataPoint::new(t, v)).collect();
    EncodedPage::encode(&points).unwrap()
}

fn buffer(points: &BTreeMap<i64, i32>) -> InsertBuffer<i32> {
    InsertBuffer::from_writes(points.iter().map(|(&t, &v)| DataPoint::new(t, v)).collect())
}

proptest! {
    /// Without overlay or buffered writes the merge is exactly a filter over the page.
    #[test]
    fn test_plain_merge_equals_filtered_page(
        points in page_strategy(),
        min_time in 0i64..200,
        threshold in any::<i32>(),
    ) {
        let filter = Filter::none()
            .with_time(Predicate::GtEq(min_time))
            .with_value(Predicate::Gt(threshold));

        let column = merge_page(
            &encode(&points),
            &mut InsertBuffer::new(),
            &Overlay::empty(),
            &mut OverlayCursor::new(),
            &filter,
        )
        .unwrap();

        let expected: Vec<(i64, i32)> = points
            .iter()
            .filter(|&(&t, &v)| t >= min_time && v > threshold)
            .map(|(&t, &v)| (t, v))
            .collect();
        prop_assert_eq!(column.pairs(), expected);
        prop_assert_eq!(column.insert_count, 0);
    }

    /// Buffered writes interleave in time order and replace page values at equal times.
    #[test]
    fn test_merge_with_inserts_is_ordered_union(
        points in page_strategy(),
        writes in inserts_strategy(),
    ) {
        let mut inserts = buffer(&writes);
        let column = merge_page(
            &encode(&points),
            &mut inserts,
            &Overlay::empty(),
            &mut OverlayCursor::new(),
            &Filter::none(),
        )
        .unwrap();

        let last_page_time = *points.keys().last().unwrap();
        let mut expected = points.clone();
        for (&t, &v) in writes.range(..=last_page_time) {
            expected.insert(t, v);
        }
        let expected: Vec<(i64, i32)> = expected.into_iter().collect();

        prop_assert_eq!(column.pairs(), expected);
        prop_assert_eq!(column.insert_count, writes.range(..=last_page_time).count());
        prop_assert_eq!(inserts.len(), writes.range(last_page_time + 1..).count());
    }

    /// The filter only selects page points; every buffered write up to the last
    /// page time is emitted and hides the page value it collides with.
    #[test]
    fn test_filtered_merge_keeps_all_buffered_writes(
        points in page_strategy(),
        writes in inserts_strategy(),
        min_time in 0i64..200,
        threshold in any::<i32>(),
    ) {
        let filter = Filter::none()
            .with_time(Predicate::GtEq(min_time))
            .with_value(Predicate::Gt(threshold));
        let mut inserts = buffer(&writes);
        let column = merge_page(
            &encode(&points),
            &mut inserts,
            &Overlay::empty(),
            &mut OverlayCursor::new(),
            &filter,
        )
        .unwrap();

        let last_page_time = *points.keys().last().unwrap();
        let mut expected: BTreeMap<i64, i32> = points
            .iter()
            .filter(|&(t, &v)| !writes.contains_key(t) && *t >= min_time && v > threshold)
            .map(|(&t, &v)| (t, v))
            .collect();
        for (&t, &v) in writes.range(..=last_page_time) {
            expected.insert(t, v);
        }
        let expected: Vec<(i64, i32)> = expected.into_iter().collect();

        prop_assert_eq!(column.pairs(), expected);
        prop_assert_eq!(column.insert_count, writes.range(..=last_page_time).count());
    }

    /// Aligning a page against only the grid points up to its last time gives
    /// the same column as aligning it against the whole grid.
    #[test]
    fn test_page_sized_grid_chunks_match_whole_grid(
        points in page_strategy(),
        writes in inserts_strategy(),
        grid in grid_strategy(),
    ) {
        let common = CommonTimestamps::new(grid.iter().copied().collect()).unwrap();
        let page = encode(&points);

        let mut inserts = buffer(&writes);
        let (whole, idx) = align_page(
            &page,
            &mut inserts,
            &Overlay::empty(),
            &mut OverlayCursor::new(),
            None,
            &common,
            0,
        )
        .unwrap();

        let mut chunked_inserts = buffer(&writes);
        let mut cursor = GridCursor::fixed(common.clone());
        let chunk = cursor.take_through(page.last_time().unwrap()).unwrap();
        let (chunked, used) = align_page(
            &page,
            &mut chunked_inserts,
            &Overlay::empty(),
            &mut OverlayCursor::new(),
            None,
            &chunk,
            0,
        )
        .unwrap();
        cursor.advance(&chunk, used);

        prop_assert_eq!(chunked.pairs(), whole.pairs());
        prop_assert_eq!(cursor.consumed(), idx);
    }

    /// Aligned output is exactly the grid points that have a page or buffered value.
    #[test]
    fn test_aligned_output_matches_grid(
        points in page_strategy(),
        writes in inserts_strategy(),
        grid in grid_strategy(),
    ) {
        let common = CommonTimestamps::new(grid.iter().copied().collect()).unwrap();
        let mut inserts = buffer(&writes);

        let (mut column, idx) = align_page(
            &encode(&points),
            &mut inserts,
            &Overlay::empty(),
            &mut OverlayCursor::new(),
            None,
            &common,
            0,
        )
        .unwrap();
        let (tail, _) = align_inserts(&mut inserts, &common, idx);
        column.extend(tail);

        let expected: Vec<(i64, i32)> = grid
            .iter()
            .filter_map(|t| writes.get(t).or_else(|| points.get(t)).map(|&v| (*t, v)))
            .collect();

        for t in column.timestamps() {
            prop_assert!(grid.contains(&t));
        }
        prop_assert_eq!(column.pairs(), expected);
    }
}
