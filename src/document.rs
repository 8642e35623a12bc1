//! # Source Document
//!
//! Position-keyed edits against immutable original module text.
//!
//! ## Key Invariants
//!
//! 1. **Original Offsets**: every edit references byte offsets of the original
//!    text, never of an intermediate result.
//! 2. **Last Write Wins**: overwrites/removals of the same exact range replace
//!    each other; partially overlapping ranges are rejected with a warning.
//! 3. **Single Materialization**: the final text is assembled once, in
//!    ascending position order, from untouched slices and applied edits.
//!
//! Inserts at one position are emitted as: `insert_after` texts, then
//! `insert_before` texts, each in call order. Inserts strictly inside a
//! replaced range are dropped.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertSide {
    After,
    Before,
}

#[derive(Debug, Clone)]
struct Insert {
    pos: u32,
    side: InsertSide,
    text: String,
}

#[derive(Debug, Clone)]
pub struct SourceDocument {
    original: String,
    /// Replacements keyed by exact range; empty text is a removal.
    replacements: BTreeMap<(u32, u32), String>,
    inserts: Vec<Insert>,
}

impl SourceDocument {
    pub fn new(original: impl Into<String>) -> Self {
        SourceDocument {
            original: original.into(),
            replacements: BTreeMap::new(),
            inserts: Vec::new(),
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn slice(&self, start: u32, end: u32) -> &str {
        &self.original[start as usize..end as usize]
    }

    pub fn overwrite(&mut self, start: u32, end: u32, text: impl Into<String>) {
        self.replacements.insert((start, end), text.into());
    }

    pub fn remove(&mut self, start: u32, end: u32) {
        self.replacements.insert((start, end), String::new());
    }

    /// Remove a range plus the comma directly following it, if any.
    /// Returns whether a comma was consumed.
    pub fn remove_with_trailing_comma(&mut self, start: u32, end: u32) -> bool {
        let comma = self.original[end as usize..].starts_with(',');
        self.remove(start, if comma { end + 1 } else { end });
        comma
    }

    /// Insert text in front of whatever starts at `pos`.
    pub fn insert_before(&mut self, pos: u32, text: impl Into<String>) {
        self.inserts.push(Insert {
            pos,
            side: InsertSide::Before,
            text: text.into(),
        });
    }

    /// Insert text right after whatever ends at `pos`.
    pub fn insert_after(&mut self, pos: u32, text: impl Into<String>) {
        self.inserts.push(Insert {
            pos,
            side: InsertSide::After,
            text: text.into(),
        });
    }

    fn inserts_by_position(&self) -> BTreeMap<usize, Vec<&str>> {
        let mut by_pos: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
        for side in [InsertSide::After, InsertSide::Before] {
            for insert in self.inserts.iter().filter(|i| i.side == side) {
                by_pos
                    .entry(insert.pos as usize)
                    .or_default()
                    .push(insert.text.as_str());
            }
        }
        by_pos
    }

    fn accepted_replacements(&self) -> Vec<(usize, usize, &str)> {
        let mut accepted: Vec<(usize, usize, &str)> = Vec::new();
        let mut last_end = 0usize;
        for (&(start, end), text) in &self.replacements {
            let (start, end) = (start as usize, end as usize);
            if start < last_end || end > self.original.len() || start > end {
                tracing::warn!(
                    "dropping overlapping edit {}..{} (previous edit ends at {})",
                    start,
                    end,
                    last_end
                );
                continue;
            }
            accepted.push((start, end, text.as_str()));
            last_end = end;
        }
        accepted
    }

    /// Replay all edits over the original text.
    pub fn materialize(&self) -> String {
        let inserts = self.inserts_by_position();
        let mut out = String::with_capacity(self.original.len() + 256);
        let mut cursor = 0usize;

        for (start, end, text) in self.accepted_replacements() {
            self.emit_span(&mut out, &inserts, cursor, start);
            if let Some(texts) = inserts.get(&start) {
                texts.iter().for_each(|t| out.push_str(t));
            }
            out.push_str(text);
            cursor = end;
        }

        let len = self.original.len();
        self.emit_span(&mut out, &inserts, cursor, len);
        if let Some(texts) = inserts.get(&len) {
            if cursor <= len {
                texts.iter().for_each(|t| out.push_str(t));
            }
        }
        out
    }

    /// Original text of `[from, to)` with inserts at positions `from <= p < to`.
    fn emit_span(
        &self,
        out: &mut String,
        inserts: &BTreeMap<usize, Vec<&str>>,
        from: usize,
        to: usize,
    ) {
        if from >= to {
            return;
        }
        let mut last = from;
        for (&pos, texts) in inserts.range(from..to) {
            out.push_str(&self.original[last..pos]);
            texts.iter().for_each(|t| out.push_str(t));
            last = pos;
        }
        out.push_str(&self.original[last..to]);
    }
}
