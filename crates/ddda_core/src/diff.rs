//! Line-oriented change review between two payload serializations.
//!
//! Structure is fixed across a load→mutate→save cycle, so the two texts
//! line up line for line; every pair that differs is reported for operator
//! review. Nothing here applies changes.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    /// Zero-based line number, identical in both serializations.
    pub line: usize,
    pub old: String,
    pub new: String,
}

pub fn lines(old: &str, new: &str) -> Vec<DiffLine> {
    old.lines()
        .zip(new.lines())
        .enumerate()
        .filter(|(_, (old_line, new_line))| old_line != new_line)
        .map(|(line, (old_line, new_line))| DiffLine {
            line,
            old: old_line.to_string(),
            new: new_line.to_string(),
        })
        .collect()
}
