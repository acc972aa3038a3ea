//! Sibling ordering for columns and cards
//!
//! Columns are ordered within their board and cards within their column by
//! an integer `position`. Positions are caller-editable and never
//! renumbered, so they may contain gaps and duplicates. Two rules keep the
//! ordering usable anyway:
//!
//! - A new sibling goes after every existing one: `max(position) + 1`, or
//!   `0` for an empty scope.
//! - Reads sort by `(position, created_at, id)`, which is a total order
//!   even when positions collide.
//!
//! The stores compute the next position inside the same transaction (or
//! under the same lock) as the insert, so concurrent creates in one scope
//! cannot pick the same value.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Parent scope that sibling positions are relative to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionScope {
    /// Columns of a board
    Board(Uuid),

    /// Cards of a column
    Column(Uuid),
}

/// Entity ordered among its siblings
pub trait Positioned {
    /// Current position
    fn position(&self) -> i32;

    /// Secondary sort key for equal positions
    fn tie_break(&self) -> (DateTime<Utc>, Uuid);

    /// Full sort key
    fn sort_key(&self) -> (i32, DateTime<Utc>, Uuid) {
        let (created_at, id) = self.tie_break();
        (self.position(), created_at, id)
    }
}

/// Position after every sibling, or 0 when there are none
///
/// # Example
///
/// ```
/// use taskboard_shared::ordering::next_position_after;
///
/// assert_eq!(next_position_after([]), 0);
/// assert_eq!(next_position_after([0, 1, 2]), 3);
/// assert_eq!(next_position_after([7, 2]), 8);
/// ```
pub fn next_position_after<I>(positions: I) -> i32
where
    I: IntoIterator<Item = i32>,
{
    positions
        .into_iter()
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

/// Sorts siblings into display order
pub fn sort_siblings<T: Positioned>(items: &mut [T]) {
    items.sort_by_key(|item| item.sort_key());
}
