//! Range-based scanning primitives over the doc source.
//!
//! Everything downstream of the compiler works in terms of [`Span`]s: half-open
//! byte windows into the single doc string owned by the parser. Keeping views
//! instead of copies means an option's name, value, description and default
//! all stay addressable by offset for error reporting.

/// A half-open window `[start, start + len)` into the doc source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Span {
    pub(crate) start: usize,
    pub(crate) len: usize,
}

impl Span {
    pub(crate) const EMPTY: Span = Span { start: 0, len: 0 };

    pub(crate) fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub(crate) fn end(&self) -> usize {
        self.start + self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Grow into the smallest span covering both inputs. Merging with an
    /// empty span adopts the other side unchanged.
    pub(crate) fn merge(&mut self, other: Span) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = other;
            return;
        }
        let start = self.start.min(other.start);
        let end = self.end().max(other.end());
        self.start = start;
        self.len = end - start;
    }

    pub(crate) fn slice<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end()]
    }
}

/// Characters permitted in an option or command name.
pub(crate) fn valid_in_parameter(c: char) -> bool {
    !".|<>,=()[] \t\n".contains(c)
}

/// Characters permitted inside a `<variable>`.
pub(crate) fn valid_in_bracketed_word(c: char) -> bool {
    !"|()[]>\t\n".contains(c)
}

/// The next character of `remaining`, without consuming it.
pub(crate) fn peek(src: &str, remaining: &Span) -> Option<char> {
    if remaining.is_empty() {
        None
    } else {
        src[remaining.start..].chars().next()
    }
}

/// Consume characters from the front of `remaining` while `pred` holds,
/// returning the consumed span.
pub(crate) fn scan_while(src: &str, remaining: &mut Span, pred: impl Fn(char) -> bool) -> Span {
    let mut result = Span::new(remaining.start, 0);
    while let Some(c) = peek(src, remaining) {
        if !pred(c) {
            break;
        }
        let width = c.len_utf8();
        result.len += width;
        remaining.start += width;
        remaining.len -= width;
    }
    result
}

/// Consume a single expected character, returning an empty span on mismatch.
pub(crate) fn scan_char(src: &str, remaining: &mut Span, expected: char) -> Span {
    let mut result = Span::new(remaining.start, 0);
    if peek(src, remaining) == Some(expected) {
        let width = expected.len_utf8();
        result.len = width;
        remaining.start += width;
        remaining.len -= width;
    }
    result
}

/// A copy of `range` with leading and trailing whitespace dropped.
pub(crate) fn trim_whitespace(range: Span, src: &str) -> Span {
    let text = range.slice(src);
    let trimmed_front = text.trim_start();
    let left = range.start + (text.len() - trimmed_front.len());
    let trimmed = trimmed_front.trim_end();
    Span::new(left, trimmed.len())
}

/// Case-insensitive search for an ASCII `needle`, starting at byte `from`.
pub(crate) fn find_case_insensitive(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes();
    let ned = needle.as_bytes();
    if ned.is_empty() || ned.len() > hay.len() {
        return None;
    }
    let last = hay.len() - ned.len();
    for i in from..=last {
        if hay[i..i + ned.len()].eq_ignore_ascii_case(ned) {
            return Some(i);
        }
    }
    None
}

/// The display indent of `span`, counting a tab as rounding up to the next
/// multiple of 4.
pub(crate) fn compute_indent(src: &str, span: Span) -> usize {
    const TABSTOP: usize = 4;
    let mut result = 0;
    for c in span.slice(src).chars() {
        if c == '\t' {
            result = (result + TABSTOP) / TABSTOP * TABSTOP;
        } else {
            result += 1;
        }
    }
    result
}

/// Iterate the lines of `within`, each span including its trailing newline
/// (or running to the end of the window).
pub(crate) fn lines_in(src: &str, within: Span) -> LineSpans<'_> {
    LineSpans {
        src,
        pos: within.start,
        end: within.end(),
    }
}

pub(crate) struct LineSpans<'a> {
    src: &'a str,
    pos: usize,
    end: usize,
}

impl<'a> Iterator for LineSpans<'a> {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        if self.pos >= self.end {
            return None;
        }
        let line_end = match self.src[self.pos..self.end].find('\n') {
            Some(i) => self.pos + i + 1,
            None => self.end,
        };
        let span = Span::new(self.pos, line_end - self.pos);
        self.pos = line_end;
        Some(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn span_merge() {
        let mut span = Span::EMPTY;
        span.merge(Span::new(4, 3));
        assert_eq!(span, Span::new(4, 3));
        span.merge(Span::new(10, 2));
        assert_eq!(span, Span::new(4, 8));
        span.merge(Span::EMPTY);
        assert_eq!(span, Span::new(4, 8));
    }

    #[rstest]
    #[case("  foo  ", Span::new(2, 3))]
    #[case("foo", Span::new(0, 3))]
    #[case("   ", Span::new(3, 0))]
    #[case("", Span::new(0, 0))]
    fn trim(#[case] src: &str, #[case] expected: Span) {
        assert_eq!(trim_whitespace(Span::new(0, src.len()), src), expected);
    }

    #[test]
    fn scan_while_consumes_prefix() {
        let src = "---foo";
        let mut remaining = Span::new(0, src.len());
        let dashes = scan_while(src, &mut remaining, |c| c == '-');
        assert_eq!(dashes, Span::new(0, 3));
        assert_eq!(remaining, Span::new(3, 3));
    }

    #[test]
    fn scan_char_mismatch_is_empty() {
        let src = "abc";
        let mut remaining = Span::new(0, src.len());
        assert!(scan_char(src, &mut remaining, 'x').is_empty());
        assert_eq!(remaining.start, 0);
        assert_eq!(scan_char(src, &mut remaining, 'a'), Span::new(0, 1));
    }

    #[rstest]
    #[case("Usage: foo", "usage", 0, Some(0))]
    #[case("My Usage: foo", "usage", 0, Some(3))]
    #[case("My Usage: foo", "usage", 4, None)]
    #[case("short", "longer needle", 0, None)]
    fn case_insensitive_search(
        #[case] haystack: &str,
        #[case] needle: &str,
        #[case] from: usize,
        #[case] expected: Option<usize>,
    ) {
        assert_eq!(find_case_insensitive(haystack, needle, from), expected);
    }

    #[rstest]
    #[case("    ", 4)]
    #[case("\t", 4)]
    #[case(" \t", 4)]
    #[case("\t ", 5)]
    #[case("\t\t", 8)]
    #[case("", 0)]
    fn indents(#[case] src: &str, #[case] expected: usize) {
        assert_eq!(compute_indent(src, Span::new(0, src.len())), expected);
    }

    #[test]
    fn line_iteration() {
        let src = "one\ntwo\nthree";
        let lines: Vec<&str> = lines_in(src, Span::new(0, src.len()))
            .map(|span| span.slice(src))
            .collect();
        assert_eq!(lines, vec!["one\n", "two\n", "three"]);
    }

    #[test]
    fn line_iteration_clamps_to_window() {
        let src = "one\ntwo\nthree";
        let lines: Vec<&str> = lines_in(src, Span::new(4, 5))
            .map(|span| span.slice(src))
            .collect();
        assert_eq!(lines, vec!["two\n", "t"]);
    }
}
