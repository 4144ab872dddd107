//! Page order: the mapping from source pages to output pages.
//!
//! A [`PageOrder`] is a list of output slots. Each slot names one or more
//! 0-based source page indices; a slot with a single index is a plain
//! reorder, a slot with several indices becomes one combined page (the
//! source images stacked top to bottom).
//!
//! Deciding the order is the caller's job. This type only validates it and
//! applies it, with no I/O, so it can be tested on its own.

use crate::error::ShuffleError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Ordered output slots, each holding the source page indices it is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOrder {
    slots: Vec<Vec<usize>>,
}

impl PageOrder {
    /// Keep every page where it is.
    pub fn identity(page_count: usize) -> Self {
        Self::from_indices((0..page_count).collect())
    }

    /// Last page first.
    pub fn reversed(page_count: usize) -> Self {
        Self::from_indices((0..page_count).rev().collect())
    }

    /// One output page per index, in the given order.
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self {
            slots: indices.into_iter().map(|i| vec![i]).collect(),
        }
    }

    /// Explicit slots; a slot with several indices is combined into one page.
    pub fn from_groups(slots: Vec<Vec<usize>>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[Vec<usize>] {
        &self.slots
    }

    /// Number of pages the assembled PDF will have.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// True when at least one slot stitches several pages together.
    pub fn has_groups(&self) -> bool {
        self.slots.iter().any(|s| s.len() > 1)
    }

    /// Check the order against a document of `page_count` pages.
    ///
    /// Every slot must be non-empty, every index in range, and no source page
    /// may appear twice. Pages may be left out.
    pub fn validate(&self, page_count: usize) -> Result<(), ShuffleError> {
        if self.slots.is_empty() {
            return Err(ShuffleError::EmptyInputSet {
                operation: "assemble",
            });
        }

        let mut seen = HashSet::new();
        for (k, slot) in self.slots.iter().enumerate() {
            if slot.is_empty() {
                return Err(ShuffleError::InvalidOrder(format!(
                    "output page {} has no source pages",
                    k
                )));
            }
            for &idx in slot {
                if idx >= page_count {
                    return Err(ShuffleError::InvalidOrder(format!(
                        "page {} is out of range (document has {} pages)",
                        idx, page_count
                    )));
                }
                if !seen.insert(idx) {
                    return Err(ShuffleError::InvalidOrder(format!(
                        "page {} is used more than once",
                        idx
                    )));
                }
            }
        }
        Ok(())
    }

    /// Map ordered inputs to ordered output slots.
    ///
    /// Call [`PageOrder::validate`] first; an out-of-range index here is an
    /// [`ShuffleError::InvalidOrder`].
    pub fn apply<T: Clone>(&self, items: &[T]) -> Result<Vec<Vec<T>>, ShuffleError> {
        self.slots
            .iter()
            .map(|slot| {
                slot.iter()
                    .map(|&idx| {
                        items.get(idx).cloned().ok_or_else(|| {
                            ShuffleError::InvalidOrder(format!(
                                "page {} is out of range ({} pages available)",
                                idx,
                                items.len()
                            ))
                        })
                    })
                    .collect()
            })
            .collect()
    }
}

impl fmt::Display for PageOrder {
    /// Formats as `2,0,3+1`, the same syntax [`FromStr`] accepts.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .slots
            .iter()
            .map(|slot| {
                slot.iter()
                    .map(|i| i.to_string())
                    .collect::<Vec<_>>()
                    .join("+")
            })
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

impl FromStr for PageOrder {
    type Err = ShuffleError;

    /// Parse `"2,0,3,1"` (0-based) where `+` joins pages into one slot,
    /// e.g. `"0+1,2"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ShuffleError::InvalidOrder("order is empty".into()));
        }

        let slots = s
            .split(',')
            .map(|slot| {
                slot.split('+')
                    .map(|p| {
                        p.trim().parse::<usize>().map_err(|_| {
                            ShuffleError::InvalidOrder(format!(
                                "invalid page index '{}'",
                                p.trim()
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { slots })
    }
}
