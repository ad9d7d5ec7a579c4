//! Lexical pass that turns `#p <thing>` into `__debug_<thing>` so the
//! ordinary JS/TS parser accepts marked sources.

use std::collections::HashSet;

use regex::Regex;

use crate::{config::Config, error::Error};

pub struct Preprocessor {
    pattern: Regex,
    prefix: String,
}

/// One marker occurrence that was rewritten into the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Insertion {
    /// Offset of the prefix in the rewritten text.
    out: usize,
    /// Offset of the marker in the original text.
    orig: usize,
    /// Length of the marker plus its trailing whitespace.
    orig_len: usize,
}

#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub source: String,
    original: String,
    prefix_len: usize,
    insertions: Vec<Insertion>,
}

impl Preprocessor {
    pub fn new(config: &Config) -> Result<Self, Error> {
        config.validate()?;
        let pattern = Regex::new(&format!(r"{}\s+", regex::escape(&config.marker)))?;
        Ok(Self {
            pattern,
            prefix: config.prefix.clone(),
        })
    }

    pub fn run(&self, source: &str) -> Preprocessed {
        self.run_except(source, &HashSet::new())
    }

    /// Like [`Preprocessor::run`], but markers starting at one of the
    /// `literal` offsets of `source` are kept as written.
    pub fn run_except(&self, source: &str, literal: &HashSet<usize>) -> Preprocessed {
        let mut out = String::with_capacity(source.len());
        let mut insertions = vec![];
        let mut last = 0;
        for m in self.pattern.find_iter(source) {
            if literal.contains(&m.start()) {
                continue;
            }
            out.push_str(&source[last..m.start()]);
            insertions.push(Insertion {
                out: out.len(),
                orig: m.start(),
                orig_len: m.len(),
            });
            out.push_str(&self.prefix);
            last = m.end();
        }
        out.push_str(&source[last..]);
        Preprocessed {
            source: out,
            original: source.to_string(),
            prefix_len: self.prefix.len(),
            insertions,
        }
    }
}

impl Preprocessed {
    /// Offsets in [`Preprocessed::source`] where a marker prefix starts.
    pub fn marker_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.insertions.iter().map(|i| i.out)
    }

    /// `(rewritten, original)` offset pairs of every marker.
    pub fn markers(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.insertions.iter().map(|i| (i.out, i.orig))
    }

    pub fn marker_count(&self) -> usize {
        self.insertions.len()
    }

    /// Map an offset in the rewritten text back to the original text.
    pub fn original_offset(&self, out: usize) -> usize {
        let idx = self.insertions.partition_point(|i| i.out <= out);
        if idx == 0 {
            return out;
        }
        let ins = self.insertions[idx - 1];
        if out < ins.out + self.prefix_len {
            ins.orig
        } else {
            ins.orig + ins.orig_len + (out - ins.out - self.prefix_len)
        }
    }

    /// 1-based line and column (in characters) in the original text.
    pub fn locate(&self, out: usize) -> (usize, usize) {
        let orig = self.original_offset(out).min(self.original.len());
        let before = self.original.get(..orig).unwrap_or(&self.original);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let col = before[line_start..].chars().count() + 1;
        (line, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Preprocessed {
        Preprocessor::new(&Config::default()).unwrap().run(source)
    }

    #[test]
    fn rewrites_marker_and_whitespace_into_prefix() {
        let pre = run("let #p count = 1;");
        assert_eq!(pre.source, "let __debug_count = 1;");
        assert_eq!(pre.marker_offsets().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn marker_before_expression_becomes_call_form() {
        let pre = run("const r = #p (1 + #p   (9 * 2));");
        assert_eq!(pre.source, "const r = __debug_(1 + __debug_(9 * 2));");
        assert_eq!(pre.marker_count(), 2);
    }

    #[test]
    fn marker_without_whitespace_is_left_alone() {
        let pre = run("class A { #private = 1; #p\n value = 2 }");
        assert_eq!(pre.source, "class A { #private = 1; __debug_value = 2 }");
    }

    #[test]
    fn maps_offsets_back_to_original_text() {
        let pre = run("a(#p  x, #p y)");
        // "a(__debug_x, __debug_y)"
        assert_eq!(pre.original_offset(0), 0);
        assert_eq!(pre.original_offset(2), 2);
        assert_eq!(pre.original_offset(5), 2);
        // the `x` after the first prefix
        assert_eq!(pre.original_offset(10), 6);
        // second prefix
        assert_eq!(pre.original_offset(13), 9);
        assert_eq!(pre.original_offset(21), 12);
    }

    #[test]
    fn locates_markers_on_later_lines() {
        let pre = run("let a = 1;\nlet b = #p ;");
        let offset = pre.marker_offsets().next().unwrap();
        assert_eq!(pre.locate(offset), (2, 9));
    }

    #[test]
    fn literal_markers_are_kept_as_written() {
        let preprocessor = Preprocessor::new(&Config::default()).unwrap();
        let source = r##"log("#p x", #p y)"##;
        let literal = [5].into_iter().collect();
        let pre = preprocessor.run_except(source, &literal);
        assert_eq!(pre.source, r##"log("#p x", __debug_y)"##);
        assert_eq!(pre.markers().collect::<Vec<_>>(), vec![(12, 12)]);
    }

    #[test]
    fn custom_marker_is_escaped() {
        let config = Config {
            marker: "$$".into(),
            ..Config::default()
        };
        let pre = Preprocessor::new(&config).unwrap().run("f($$ x)");
        assert_eq!(pre.source, "f(__debug_x)");
    }
}
