use crate::error::DocError;
use crate::scan::{self, Span};

/// How an option binds to its value: `--foo <bar>`, `--foo=<bar>`, or the
/// concatenated `-D<macro>` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Separator {
    Space,
    Equals,
    None,
}

/// The dash-form class of an option. A single dash with a one-character name
/// is short; a single dash with a longer name is single-long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OptionKind {
    Short,
    SingleLong,
    DoubleLong,
}

impl OptionKind {
    pub(crate) fn from_parts(dash_count: usize, name_len: usize) -> Self {
        if dash_count > 1 {
            OptionKind::DoubleLong
        } else if name_len == 1 {
            OptionKind::Short
        } else {
            OptionKind::SingleLong
        }
    }

    pub(crate) fn dashes(&self) -> &'static str {
        match self {
            OptionKind::DoubleLong => "--",
            _ => "-",
        }
    }
}

/// One option as declared in the doc: `-f`, `--foo=<bar>`, `-D<macro>`.
///
/// All spans point into the doc source. Options declared together in a group
/// (`-m, --message <contents>`) share description, default, value and the
/// long-name linkage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OptionSpec {
    /// The name without leading dashes.
    pub(crate) name: Span,
    /// The variable placeholder, brackets included; empty when the option
    /// takes no value.
    pub(crate) value: Span,
    pub(crate) kind: OptionKind,
    pub(crate) separator: Separator,
    pub(crate) description: Span,
    pub(crate) default_value: Span,
    /// The double-long alias every member of the declaring group points to.
    pub(crate) corresponding_long_name: Span,
}

impl OptionSpec {
    pub(crate) fn has_value(&self) -> bool {
        !self.value.is_empty()
    }

    /// Two options are the same when their names read identically and they
    /// share a dash-form class.
    pub(crate) fn same_name(&self, other: &OptionSpec, source: &str) -> bool {
        self.kind == other.kind && self.name.slice(source) == other.name.slice(source)
    }

    /// The option as written, with its own dashes: `-f` or `--foo`.
    pub(crate) fn display_name(&self, source: &str) -> String {
        format!("{}{}", self.kind.dashes(), self.name.slice(source))
    }

    /// The canonical result-map key: the group's long alias when there is
    /// one, otherwise the option's own name.
    pub(crate) fn canonical_name(&self, source: &str) -> String {
        if self.corresponding_long_name.is_empty() {
            self.display_name(source)
        } else {
            format!("--{}", self.corresponding_long_name.slice(source))
        }
    }

    /// Parse a single option at the front of `remaining`, which must start
    /// with a dash. Consumes exactly the characters belonging to the option.
    pub(crate) fn parse_from_spec(
        source: &str,
        remaining: &mut Span,
        errors: &mut Vec<DocError>,
    ) -> OptionSpec {
        let spec_start = remaining.start;
        let dashes = scan::scan_while(source, remaining, |c| c == '-');
        if dashes.len > 2 {
            errors.push(DocError::ExcessiveDashes { offset: spec_start });
        }

        let name = scan::scan_while(source, remaining, scan::valid_in_parameter);

        let space_separator = scan::scan_while(source, remaining, char::is_whitespace);
        let equals = scan::scan_while(source, remaining, |c| c == '=');
        if equals.len > 1 {
            errors.push(DocError::ExcessiveEqualSigns {
                offset: equals.start,
            });
        }
        scan::scan_while(source, remaining, char::is_whitespace);

        let mut variable = Span::EMPTY;
        let open = scan::scan_char(source, remaining, '<');
        if !open.is_empty() {
            let variable_name = scan::scan_while(source, remaining, scan::valid_in_bracketed_word);
            let close = scan::scan_char(source, remaining, '>');
            if variable_name.is_empty() {
                errors.push(DocError::InvalidVariableName {
                    offset: variable_name.start,
                });
            } else if close.is_empty() {
                errors.push(DocError::InvalidVariableName { offset: open.start });
            } else {
                variable.merge(open);
                variable.merge(variable_name);
                variable.merge(close);
            }
            if !close.is_empty() {
                if let Some(c) = scan::peek(source, remaining) {
                    if scan::valid_in_parameter(c) {
                        errors.push(DocError::InvalidVariableName {
                            offset: remaining.start,
                        });
                    }
                }
            }
        }

        // A naked assignment like `--foo=` declares a value it never names.
        if variable.is_empty() && !equals.is_empty() {
            errors.push(DocError::InvalidVariableName {
                offset: equals.start,
            });
        }

        let separator = if variable.is_empty() {
            Separator::Space
        } else if !equals.is_empty() {
            Separator::Equals
        } else if !space_separator.is_empty() {
            Separator::Space
        } else {
            Separator::None
        };

        if separator == Separator::None && (dashes.len > 1 || name.len > 1) {
            errors.push(DocError::BadOptionSeparator { offset: name.start });
        }
        if name.is_empty() {
            errors.push(DocError::InvalidOptionName { offset: name.start });
        }

        OptionSpec {
            name,
            value: variable,
            kind: OptionKind::from_parts(dashes.len, name.len),
            separator,
            description: Span::EMPTY,
            default_value: Span::EMPTY,
            corresponding_long_name: Span::EMPTY,
        }
    }
}

/// Parse one option specification extending from its leading dash to the end
/// of the description, e.g. `-f, --foo=<bar>  The foo. [default: x]`.
pub(crate) fn parse_option_group(
    source: &str,
    range: Span,
    errors: &mut Vec<DocError>,
) -> Vec<OptionSpec> {
    let end = range.end();

    // The description starts at the first double-space.
    let options_end = match source[range.start..end].find("  ") {
        Some(i) => range.start + i,
        None => end,
    };
    let description = scan::trim_whitespace(Span::new(options_end, end - options_end), source);

    let mut default_value = Span::EMPTY;
    if !description.is_empty() {
        let prefix = "[default:";
        if let Some(loc) = scan::find_case_insensitive(source, prefix, description.start) {
            if loc < description.end() {
                let mut value_start = loc + prefix.len();
                while value_start < description.end()
                    && source.as_bytes()[value_start].is_ascii_whitespace()
                {
                    value_start += 1;
                }
                match source[value_start..].find(']') {
                    Some(i) if value_start + i < description.end() => {
                        default_value = Span::new(value_start, i);
                    }
                    _ => errors.push(DocError::MissingCloseBracketInDefault { offset: loc }),
                }
            }
        }
    }

    let mut remaining = Span::new(range.start, options_end - range.start);
    scan::scan_while(source, &mut remaining, char::is_whitespace);

    let mut result = Vec::new();
    let mut last_long_name = Span::EMPTY;
    let mut last_value = Span::EMPTY;
    while !remaining.is_empty() {
        if scan::peek(source, &remaining) != Some('-') {
            errors.push(DocError::InvalidOptionName {
                offset: remaining.start,
            });
            break;
        }
        let mut option = OptionSpec::parse_from_spec(source, &mut remaining, errors);
        if option.name.is_empty() {
            break;
        }
        option.description = description;
        option.default_value = default_value;
        if option.kind == OptionKind::DoubleLong {
            last_long_name = option.name;
        }
        if !option.value.is_empty() {
            last_value = option.value;
        }
        result.push(option);

        // Commas separate the aliases of a group.
        scan::scan_while(source, &mut remaining, char::is_whitespace);
        scan::scan_while(source, &mut remaining, |c| c == ',');
        scan::scan_while(source, &mut remaining, char::is_whitespace);
    }

    if !last_long_name.is_empty() {
        for option in result.iter_mut() {
            option.corresponding_long_name = last_long_name;
        }
    }
    // `-m, --message <contents>` gives -m the variable too.
    for option in result.iter_mut() {
        if option.value.is_empty() {
            option.value = last_value;
        }
    }
    result
}

/// Drop duplicate options (per [`OptionSpec::same_name`]), keeping the one
/// with the longest description. Stable with respect to non-duplicates.
pub(crate) fn uniqueize(
    options: &mut Vec<OptionSpec>,
    source: &str,
    error_on_duplicates: bool,
    errors: &mut Vec<DocError>,
) {
    let mut cursor = 0;
    while cursor < options.len() {
        let mut matching = vec![cursor];
        let mut best = cursor;
        for i in (cursor + 1)..options.len() {
            if options[i].same_name(&options[cursor], source) {
                if error_on_duplicates {
                    errors.push(DocError::OptionDuplicatedInOptionsSection {
                        offset: options[i].name.start,
                    });
                }
                matching.push(i);
                if options[i].description.len > options[best].description.len {
                    best = i;
                }
            }
        }

        let mut removed_cursor = false;
        for &i in matching.iter().rev() {
            if i != best {
                options.remove(i);
                if i == cursor {
                    removed_cursor = true;
                }
            }
        }
        if !removed_cursor {
            cursor += 1;
        }
    }
}
