//! Narrow a request's frame list by filter, reduction mode and a per-filter window.

use std::collections::HashMap;

use crate::archive::{Frame, RAW_LEVEL, REDUCED_LEVEL};

/// Which pipeline product to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReductionMode {
    Raw,
    #[default]
    Reduced,
}

impl ReductionMode {
    pub fn from_raw_flag(raw: bool) -> Self {
        if raw {
            ReductionMode::Raw
        } else {
            ReductionMode::Reduced
        }
    }

    pub fn level(self) -> u8 {
        match self {
            ReductionMode::Raw => RAW_LEVEL,
            ReductionMode::Reduced => REDUCED_LEVEL,
        }
    }

    pub fn matches(self, frame: &Frame) -> bool {
        frame.reduction_level == self.level()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionCriteria {
    /// `None` keeps every filter.
    pub filter: Option<String>,
    pub mode: ReductionMode,
    /// 1-based index of the first frame kept in each filter.
    pub start: usize,
    /// Frames kept per filter; `None` keeps the rest.
    pub max_per_filter: Option<usize>,
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self {
            filter: None,
            mode: ReductionMode::Reduced,
            start: 1,
            max_per_filter: None,
        }
    }
}

impl SelectionCriteria {
    fn matches(&self, frame: &Frame) -> bool {
        self.mode.matches(frame)
            && self
                .filter
                .as_deref()
                .map_or(true, |f| frame.filter == f)
    }

    fn in_window(&self, ordinal: usize) -> bool {
        let start = self.start.max(1);
        ordinal >= start
            && self
                .max_per_filter
                .map_or(true, |max| ordinal - start < max)
    }
}

/// Frames of `frames` that satisfy `criteria`, in their original order.
///
/// The start/max window counts each filter separately: with `start = 3` the
/// first two matching frames of every filter are dropped.
pub fn select(frames: &[Frame], criteria: &SelectionCriteria) -> Vec<Frame> {
    let mut ordinals: HashMap<&str, usize> = HashMap::new();
    let mut selected = Vec::new();
    for frame in frames.iter().filter(|f| criteria.matches(f)) {
        let n = ordinals.entry(frame.filter.as_str()).or_insert(0);
        *n += 1;
        if criteria.in_window(*n) {
            selected.push(frame.clone());
        }
    }
    selected
}

/// Filters present in `frames`, in order of first appearance.
pub fn filters_in_order(frames: &[Frame]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for f in frames {
        if !seen.iter().any(|s| *s == f.filter) {
            seen.push(f.filter.clone());
        }
    }
    seen
}

/// `(filter, count)` pairs, in order of first appearance.
pub fn count_by_filter(frames: &[Frame]) -> Vec<(String, usize)> {
    filters_in_order(frames)
        .into_iter()
        .map(|filter| {
            let n = frames.iter().filter(|f| f.filter == filter).count();
            (filter, n)
        })
        .collect()
}
