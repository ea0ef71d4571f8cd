//! Text-edit transaction over an immutable source buffer.
//!
//! All rewrites for one unit accumulate here as half-open byte-range
//! replacements and are realized in a single linear pass. Overlapping edits
//! are a programming-invariant violation, not a recoverable error: the
//! classifier and synthesizer derive their spans from disjoint AST nodes, so
//! an overlap means the pipeline itself is broken.

#[derive(Debug, Clone)]
struct SourceEdit {
    start: u32,
    end: u32,
    replacement: String,
    seq: u32,
}

#[derive(Debug, Default)]
pub struct EditList {
    edits: Vec<SourceEdit>,
}

impl EditList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the half-open byte range `[start, end)`.
    pub fn replace(&mut self, start: u32, end: u32, replacement: impl Into<String>) {
        debug_assert!(start <= end, "inverted edit range");
        let seq = self.edits.len() as u32;
        self.edits.push(SourceEdit {
            start,
            end,
            replacement: replacement.into(),
            seq,
        });
    }

    /// Zero-width insertion. Multiple insertions at one offset keep their
    /// insertion order.
    pub fn insert(&mut self, at: u32, text: impl Into<String>) {
        self.replace(at, at, text);
    }

    pub fn delete(&mut self, start: u32, end: u32) {
        self.replace(start, end, "");
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Realizes the transaction. Panics on overlapping ranges.
    pub fn apply(mut self, source: &str) -> String {
        self.edits
            .sort_by_key(|e| (e.start, e.end, e.seq));

        let mut out = String::with_capacity(source.len());
        let mut cursor = 0usize;
        let mut prev_end = 0u32;

        for edit in &self.edits {
            assert!(
                edit.start >= prev_end,
                "overlapping source edits: [{}, {}) intersects an edit ending at {}",
                edit.start,
                edit.end,
                prev_end
            );
            let start = edit.start as usize;
            let end = edit.end as usize;
            assert!(end <= source.len(), "edit range outside source buffer");

            out.push_str(&source[cursor..start]);
            out.push_str(&edit.replacement);
            cursor = end;
            prev_end = edit.end;
        }

        out.push_str(&source[cursor..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_in_source_order() {
        let mut edits = EditList::new();
        edits.replace(9, 14, "verve");
        edits.replace(0, 5, "howdy");
        assert_eq!(edits.apply("hello to world"), "howdy to verve");
    }

    #[test]
    fn test_insertions_keep_order() {
        let mut edits = EditList::new();
        edits.insert(0, "a");
        edits.insert(0, "b");
        edits.insert(5, "!");
        assert_eq!(edits.apply("hello"), "abhello!");
    }

    #[test]
    fn test_delete_and_adjacent_edits() {
        let mut edits = EditList::new();
        edits.delete(0, 2);
        edits.replace(2, 3, "X");
        assert_eq!(edits.apply("abcd"), "Xd");
    }

    #[test]
    #[should_panic(expected = "overlapping source edits")]
    fn test_overlap_panics() {
        let mut edits = EditList::new();
        edits.replace(0, 3, "x");
        edits.replace(2, 4, "y");
        edits.apply("abcdef");
    }

    #[test]
    fn test_deterministic_output() {
        let source = "let a = 1; let b = 2;";
        let build = || {
            let mut edits = EditList::new();
            edits.replace(4, 5, "x");
            edits.replace(15, 16, "y");
            edits.apply(source)
        };
        assert_eq!(build(), build());
    }
}
