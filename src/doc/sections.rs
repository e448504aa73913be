use std::collections::BTreeMap;

use crate::doc::spec::{self, OptionSpec};
use crate::error::DocError;
use crate::scan::{self, Span};

/// Locate every section introduced by a header naming `name` (for example
/// "Options:") and return one source range per section, header name excluded.
///
/// A line is a header when it carries a colon before any double-space and is
/// not indented deeper than the previously seen header (the first header sets
/// the reference). Non-header lines at header level end the current section,
/// unless `include_other_top_level` asks to absorb them; the Conditions
/// section needs that for variables expanded to a list of values across
/// lines.
pub(crate) fn section_ranges(
    source: &str,
    name: &str,
    include_other_top_level: bool,
) -> Vec<Span> {
    let mut result: Vec<Span> = Vec::new();
    let mut in_section = false;
    let mut header_indent = usize::MAX;

    for line in scan::lines_in(source, Span::new(0, source.len())) {
        let trimmed = scan::trim_whitespace(line, source);
        let indent = scan::compute_indent(source, Span::new(line.start, trimmed.start - line.start));

        let mut colon = None;
        let mut is_other_top_level = false;
        if !trimmed.is_empty() && indent <= header_indent {
            colon = find_header_colon(source, trimmed);
            is_other_top_level = colon.is_none();
        }

        if is_other_top_level && !include_other_top_level {
            in_section = false;
        } else if let Some(colon) = colon {
            header_indent = indent;
            let name_pos = scan::find_case_insensitive(source, name, trimmed.start);
            in_section = name_pos.map_or(false, |pos| pos < colon);
            if in_section {
                // Start the section's range right after the header's colon.
                let content_start = colon + 1;
                result.push(Span::new(content_start, line.end() - content_start));
            }
            continue;
        }

        if in_section {
            if let Some(last) = result.last_mut() {
                last.merge(line);
            }
        }
    }
    result
}

/// The position of the colon making `trimmed` a header line, if any: the
/// first colon, provided no double-space precedes it.
fn find_header_colon(source: &str, trimmed: Span) -> Option<usize> {
    let text = trimmed.slice(source);
    let colon = text.find(':')?;
    match text.find("  ") {
        Some(double_space) if double_space < colon => None,
        _ => Some(trimmed.start + colon),
    }
}

fn line_starts_option_spec(source: &str, line: Span) -> bool {
    let mut remaining = line;
    let space = scan::scan_while(source, &mut remaining, char::is_whitespace);
    let dashes = scan::scan_while(source, &mut remaining, |c| c == '-');
    !space.is_empty() && !dashes.is_empty()
}

fn line_starts_condition_spec(source: &str, line: Span) -> bool {
    let mut remaining = line;
    let space = scan::scan_while(source, &mut remaining, char::is_whitespace);
    let open = scan::scan_while(source, &mut remaining, |c| c == '<');
    !space.is_empty() && !open.is_empty()
}

/// Parse every Options section into its option records. A spec's description
/// may continue over lines that do not themselves start an option spec.
pub(crate) fn parse_options_sections(source: &str, errors: &mut Vec<DocError>) -> Vec<OptionSpec> {
    let mut result = Vec::new();
    for section in section_ranges(source, "Options", false) {
        let mut lines = scan::lines_in(source, section).peekable();
        while let Some(line) = lines.next() {
            let trimmed = scan::trim_whitespace(line, source);
            if trimmed.is_empty() {
                continue;
            }
            if !line_starts_option_spec(source, line) {
                errors.push(DocError::InvalidOptionName { offset: line.start });
                continue;
            }

            let mut spec_range = line;
            while let Some(&next) = lines.peek() {
                if line_starts_option_spec(source, next) {
                    break;
                }
                spec_range.merge(next);
                lines.next();
            }

            scan::scan_while(source, &mut spec_range, char::is_whitespace);
            result.extend(spec::parse_option_group(source, spec_range, errors));
        }
    }
    result
}

/// Parse every Conditions section into a map from variable token (angle
/// brackets retained) to the range holding its condition expression.
pub(crate) fn parse_conditions_sections(
    source: &str,
    errors: &mut Vec<DocError>,
) -> BTreeMap<String, Span> {
    let mut result = BTreeMap::new();
    for section in section_ranges(source, "Conditions", true) {
        let mut lines = scan::lines_in(source, section).peekable();
        while let Some(line) = lines.next() {
            let trimmed = scan::trim_whitespace(line, source);
            if trimmed.is_empty() {
                continue;
            }
            if !line_starts_condition_spec(source, line) {
                errors.push(DocError::InvalidVariableName { offset: line.start });
                continue;
            }

            let mut condition_range = line;
            while let Some(&next) = lines.peek() {
                if line_starts_condition_spec(source, next) {
                    break;
                }
                condition_range.merge(next);
                lines.next();
            }

            // `<pid>  expression`: the double-space separates key and value.
            let condition_range = scan::trim_whitespace(condition_range, source);
            let separator = source[condition_range.start..condition_range.end()].find("  ");
            if let Some(separator) = separator {
                let separator = condition_range.start + separator;
                let key = scan::trim_whitespace(
                    Span::new(condition_range.start, separator - condition_range.start),
                    source,
                );
                let value = scan::trim_whitespace(
                    Span::new(separator, condition_range.end() - separator),
                    source,
                );
                let key_text = key.slice(source).to_string();
                if result.contains_key(&key_text) {
                    errors.push(DocError::OneVariableMultipleConditions { offset: key.start });
                } else {
                    result.insert(key_text, value);
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case("Usage: prog foo\n", vec![" prog foo\n"])]
    #[case("usage: prog\nUSAGE: other\n", vec![" prog\n", " other\n"])]
    #[case("Overview text\nUsage: prog\n", vec![" prog\n"])]
    #[case("Options:\n  -f\n", vec![])]
    fn usage_extraction(#[case] source: &str, #[case] expected: Vec<&str>) {
        let found: Vec<&str> = section_ranges(source, "Usage", false)
            .into_iter()
            .map(|span| span.slice(source))
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn section_spans_following_lines() {
        let source = "Usage:\n  prog one\n  prog two\nOptions:\n  -f\n";
        let sections = section_ranges(source, "Usage", false);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].slice(source), "\n  prog one\n  prog two\n");
    }

    #[test]
    fn other_top_level_line_ends_the_section() {
        let source = "Usage: prog\nOTHER JUNK\n  still junk\n";
        let sections = section_ranges(source, "Usage", false);
        assert_eq!(sections[0].slice(source), " prog\n");
    }

    #[test]
    fn other_top_level_line_is_absorbed_on_request() {
        let source = "Usage: prog\nOTHER JUNK\n";
        let sections = section_ranges(source, "Usage", true);
        assert_eq!(sections[0].slice(source), " prog\nOTHER JUNK\n");
    }

    #[test]
    fn deeper_headers_do_not_reset_the_section() {
        // The second line is indented deeper than the header reference, so it
        // is body text even though it carries a colon.
        let source = "Usage: prog\n    see: below\nOptions: -f\n";
        let sections = section_ranges(source, "Usage", false);
        assert_eq!(sections[0].slice(source), " prog\n    see: below\n");
    }

    #[test]
    fn double_space_before_colon_is_not_a_header() {
        let source = "Usage: prog\nnot a header  x: y\n";
        let sections = section_ranges(source, "Usage", true);
        assert_eq!(sections[0].slice(source), " prog\nnot a header  x: y\n");
    }

    #[test]
    fn options_specs_merge_continuation_lines() {
        let source = "Options:\n  -f <file>  The input\n             spanning lines\n  -v  Verbose\n";
        let mut errors = Vec::new();
        let options = parse_options_sections(source, &mut errors);
        assert_eq!(errors, Vec::new());
        assert_eq!(options.len(), 2);
        assert!(options[0]
            .description
            .slice(source)
            .starts_with("The input"));
        assert!(options[0].description.slice(source).ends_with("spanning lines"));
        assert_eq!(options[1].description.slice(source), "Verbose");
    }

    #[test]
    fn options_line_without_dash_is_an_error() {
        let source = "Options:\n  not an option\n";
        let mut errors = Vec::new();
        let options = parse_options_sections(source, &mut errors);
        assert_eq!(options, Vec::new());
        assert_matches!(errors[..], [DocError::InvalidOptionName { .. }]);
    }

    #[test]
    fn conditions_map() {
        let source = "Conditions:\n  <pid>  __fish_pids\n  <branch>  git branch\n";
        let mut errors = Vec::new();
        let conditions = parse_conditions_sections(source, &mut errors);
        assert_eq!(errors, Vec::new());
        assert_eq!(conditions["<pid>"].slice(source), "__fish_pids");
        assert_eq!(conditions["<branch>"].slice(source), "git branch");
    }

    #[test]
    fn duplicate_condition_is_an_error() {
        let source = "Conditions:\n  <pid>  one\n  <pid>  two\n";
        let mut errors = Vec::new();
        let conditions = parse_conditions_sections(source, &mut errors);
        assert_matches!(
            errors[..],
            [DocError::OneVariableMultipleConditions { .. }]
        );
        assert_eq!(conditions["<pid>"].slice(source), "one");
    }

    #[test]
    fn condition_absorbs_expanded_values() {
        let source = "Conditions: <pid>  1\n2\n3\n";
        let mut errors = Vec::new();
        let conditions = parse_conditions_sections(source, &mut errors);
        assert_eq!(errors, Vec::new());
        assert_eq!(conditions["<pid>"].slice(source), "1\n2\n3");
    }
}
