//! Update/delete overlay and its cursor resolver
//!
//! The overlay holds out-of-band modifications layered over immutable pages:
//! update intervals overriding every value inside them, and delete intervals
//! suppressing every value inside them. Both lists are sorted ascending and
//! non-overlapping, with closed bounds. Readers walk them with an
//! [`OverlayCursor`] whose position survives from one page to the next.

use crate::error::{ReadError, Result};
use serde::{Deserialize, Serialize};
use tidal_core::Timestamp;

/// Closed interval whose values are replaced by `value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateInterval<T> {
    pub start: Timestamp,
    pub end: Timestamp,
    pub value: T,
}

impl<T> UpdateInterval<T> {
    pub fn new(start: Timestamp, end: Timestamp, value: T) -> Self {
        Self { start, end, value }
    }

    pub fn contains(&self, t: Timestamp) -> bool {
        t >= self.start && t <= self.end
    }
}

/// Closed interval whose values are deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteInterval {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl DeleteInterval {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: Timestamp) -> bool {
        t >= self.start && t <= self.end
    }
}

/// Which overlay list governs the next page point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMode {
    /// Both lists exhausted
    None,
    /// The active interval is an update
    UpdateTrue,
    /// The active interval is a delete
    UpdateFalse,
}

/// Position in both overlay lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayCursor {
    pub update_idx: usize,
    pub delete_idx: usize,
}

impl OverlayCursor {
    pub fn new() -> Self {
        Self::default()
    }
}

/// What the overlay says about one page point
#[derive(Debug, PartialEq)]
pub enum Resolution<'a, T> {
    /// No interval covers the point
    Pass,
    /// Inside an update interval
    Override(&'a T),
    /// Inside a delete interval
    Suppress,
}

/// Update and delete lists of one series
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay<T> {
    updates: Vec<UpdateInterval<T>>,
    deletes: Vec<DeleteInterval>,
}

impl<T> Overlay<T> {
    /// Build an overlay, rejecting unsorted, overlapping or inverted intervals
    pub fn new(updates: Vec<UpdateInterval<T>>, deletes: Vec<DeleteInterval>) -> Result<Self> {
        validate("update", updates.iter().map(|u| (u.start, u.end)))?;
        validate("delete", deletes.iter().map(|d| (d.start, d.end)))?;
        Ok(Self { updates, deletes })
    }

    /// Overlay with no intervals
    pub fn empty() -> Self {
        Self {
            updates: Vec::new(),
            deletes: Vec::new(),
        }
    }

    pub fn updates(&self) -> &[UpdateInterval<T>] {
        &self.updates
    }

    pub fn deletes(&self) -> &[DeleteInterval] {
        &self.deletes
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Resolve the mode at a cursor position.
    ///
    /// Equal starts resolve to [`OverlayMode::UpdateFalse`].
    pub fn mode(&self, cursor: &OverlayCursor) -> OverlayMode {
        match (
            self.updates.get(cursor.update_idx),
            self.deletes.get(cursor.delete_idx),
        ) {
            (None, None) => OverlayMode::None,
            (Some(_), None) => OverlayMode::UpdateTrue,
            (Some(update), Some(delete)) if update.start < delete.start => OverlayMode::UpdateTrue,
            _ => OverlayMode::UpdateFalse,
        }
    }

    /// Advance past every active interval ending before `t`
    pub fn seek(&self, cursor: &mut OverlayCursor, t: Timestamp) -> OverlayMode {
        loop {
            let mode = self.mode(cursor);
            match mode {
                OverlayMode::UpdateTrue if t > self.updates[cursor.update_idx].end => {
                    cursor.update_idx += 1;
                }
                OverlayMode::UpdateFalse if t > self.deletes[cursor.delete_idx].end => {
                    cursor.delete_idx += 1;
                }
                _ => return mode,
            }
        }
    }

    /// Seek to `t` and report how the active interval treats a point at `t`
    pub fn resolve(&self, cursor: &mut OverlayCursor, t: Timestamp) -> Resolution<'_, T> {
        match self.seek(cursor, t) {
            OverlayMode::UpdateTrue => {
                let update = &self.updates[cursor.update_idx];
                if update.contains(t) {
                    Resolution::Override(&update.value)
                } else {
                    Resolution::Pass
                }
            }
            OverlayMode::UpdateFalse => {
                if self.deletes[cursor.delete_idx].contains(t) {
                    Resolution::Suppress
                } else {
                    Resolution::Pass
                }
            }
            OverlayMode::None => Resolution::Pass,
        }
    }
}

impl<T> Default for Overlay<T> {
    fn default() -> Self {
        Self::empty()
    }
}

fn validate(kind: &str, intervals: impl Iterator<Item = (Timestamp, Timestamp)>) -> Result<()> {
    let mut prev_end: Option<Timestamp> = None;
    for (start, end) in intervals {
        if start > end {
            return Err(ReadError::InvalidOverlay(format!(
                "{} interval [{}, {}] has start after end",
                kind, start, end
            )));
        }
        if let Some(prev_end) = prev_end {
            if start <= prev_end {
                return Err(ReadError::InvalidOverlay(format!(
                    "{} interval [{}, {}] overlaps or precedes one ending at {}",
                    kind, start, end, prev_end
                )));
            }
        }
        prev_end = Some(end);
    }
    Ok(())
}
