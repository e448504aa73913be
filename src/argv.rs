//! The argv tokenizer: classify each argument as a positional or as one or
//! more option uses, resolved against the doc's option list.

use crate::doc::spec::{OptionKind, OptionSpec, Separator};
use crate::error::ArgvError;
use crate::scan::{self, Span};
use crate::ParseFlags;

/// Index of an argv token classified as non-option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Positional {
    pub(crate) idx_in_argv: usize,
}

/// One tokenized use of an option in argv.
///
/// A clustered short sequence like `-vf` yields one resolved option per
/// character, all sharing `name_idx`, so unused-index accounting can deduct
/// the whole argv position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedOption {
    pub(crate) spec: OptionSpec,
    pub(crate) name_idx: usize,
    pub(crate) value_idx: Option<usize>,
    /// Window into `argv[value_idx]` holding the value: the whole token when
    /// the value is separate, the part after `=` when joined, the part after
    /// the name when unseparated.
    pub(crate) value_span: Span,
}

/// The shape of a single argv token parsed as if it were an option spec.
/// Spans point into the token itself, not the doc.
#[derive(Debug, Clone, Copy)]
struct ArgvOptionShape {
    name: Span,
    value: Span,
    kind: OptionKind,
    separator: Separator,
}

impl ArgvOptionShape {
    fn parse(token: &str) -> Self {
        let mut remaining = Span::new(0, token.len());
        let dashes = scan::scan_while(token, &mut remaining, |c| c == '-');
        let name = scan::scan_while(token, &mut remaining, scan::valid_in_parameter);
        let equals = scan::scan_char(token, &mut remaining, '=');
        // After `=` anything goes; the value comes from the invocation, not
        // the doc.
        let value = if equals.is_empty() { Span::EMPTY } else { remaining };
        ArgvOptionShape {
            name,
            value,
            kind: OptionKind::from_parts(dashes.len, name.len),
            separator: if equals.is_empty() {
                Separator::Space
            } else {
                Separator::Equals
            },
        }
    }

    fn has_value(&self) -> bool {
        !self.value.is_empty()
    }
}

/// Everything the tokenizer produces for one argument vector.
#[derive(Debug, Default)]
pub(crate) struct TokenizedArgv {
    pub(crate) positionals: Vec<Positional>,
    pub(crate) resolved: Vec<ResolvedOption>,
    pub(crate) errors: Vec<ArgvError>,
    /// The variable token of an option left waiting for its value at the end
    /// of argv, captured instead of an error when suggestions are collected.
    pub(crate) value_suggestion: Option<String>,
}

pub(crate) struct ArgvTokenizer<'a> {
    source: &'a str,
    options: &'a [OptionSpec],
    flags: ParseFlags,
    collect_suggestion: bool,
}

impl<'a> ArgvTokenizer<'a> {
    pub(crate) fn new(
        source: &'a str,
        options: &'a [OptionSpec],
        flags: ParseFlags,
        collect_suggestion: bool,
    ) -> Self {
        Self {
            source,
            options,
            flags,
            collect_suggestion,
        }
    }

    pub(crate) fn tokenize(&self, argv: &[String]) -> TokenizedArgv {
        let mut out = TokenizedArgv::default();
        let mut idx = 0;
        while idx < argv.len() {
            let arg = argv[idx].as_str();
            if arg == "--" {
                // Everything after a literal -- is positional.
                idx += 1;
                while idx < argv.len() {
                    out.positionals.push(Positional { idx_in_argv: idx });
                    idx += 1;
                }
                break;
            } else if arg.starts_with("--") {
                match self.parse_long(
                    argv,
                    idx,
                    OptionKind::DoubleLong,
                    &mut out.resolved,
                    &mut out.errors,
                    &mut out.value_suggestion,
                ) {
                    Some(advance) => idx += advance,
                    None => idx += 1,
                }
            } else if arg.starts_with('-') && arg.len() > 1 {
                // A single leading dash can be a single-long option
                // (-std=c++), a short with a joined value (-DNDEBUG), or a
                // cluster of shorts (-vf). Try in that order, holding errors
                // locally so a successful later parse silences earlier ones.
                let mut long_errors = Vec::new();
                let mut short_errors = Vec::new();
                let parsed = self
                    .parse_long(
                        argv,
                        idx,
                        OptionKind::SingleLong,
                        &mut out.resolved,
                        &mut long_errors,
                        &mut out.value_suggestion,
                    )
                    .or_else(|| {
                        self.parse_unseparated_short(argv, idx, &mut out.resolved, &mut short_errors)
                    })
                    .or_else(|| {
                        self.parse_short(
                            argv,
                            idx,
                            &mut out.resolved,
                            &mut short_errors,
                            &mut out.value_suggestion,
                        )
                    });
                match parsed {
                    Some(advance) => idx += advance,
                    None => {
                        // Short errors surface first: for -Dfoo with a known
                        // -D, the short reading is the likelier intent.
                        let mut combined = short_errors;
                        combined.extend(long_errors);
                        combined.append(&mut out.errors);
                        out.errors = combined;
                        idx += 1;
                    }
                }
            } else {
                // Note a lone - lands here; it customarily stands for stdin.
                out.positionals.push(Positional { idx_in_argv: idx });
                idx += 1;
            }
        }
        out
    }

    /// Parse argv[idx] as a long option of the requested dash-form. Returns
    /// how far to advance on success.
    fn parse_long(
        &self,
        argv: &[String],
        idx: usize,
        kind: OptionKind,
        resolved: &mut Vec<ResolvedOption>,
        errors: &mut Vec<ArgvError>,
        suggestion: &mut Option<String>,
    ) -> Option<usize> {
        let arg = argv[idx].as_str();
        let mut shape = ArgvOptionShape::parse(arg);
        // A one-character name parses as a short shape; when a single-long
        // was requested, retype it so the error reporting matches the
        // request.
        if kind == OptionKind::SingleLong && shape.kind == OptionKind::Short {
            shape.kind = OptionKind::SingleLong;
        }

        let arg_name = shape.name.slice(arg);
        let mut matched = self
            .options
            .iter()
            .find(|option| option.kind == kind && option.name.slice(self.source) == arg_name);

        if matched.is_none() && self.flags.resolve_unambiguous_prefixes {
            let mut prefix_matches = self.options.iter().filter(|option| {
                option.kind == kind
                    && option.name.len > shape.name.len
                    && option.name.slice(self.source).starts_with(arg_name)
            });
            let first = prefix_matches.next();
            if first.is_some() && prefix_matches.next().is_some() {
                errors.push(ArgvError::AmbiguousPrefixMatch { index: idx });
                return None;
            }
            matched = first;
        }

        let matched = match matched {
            Some(matched) => matched,
            None => {
                errors.push(ArgvError::UnknownOption {
                    index: idx,
                    position: 0,
                });
                return None;
            }
        };

        let mut value_idx = None;
        let mut value_span = Span::EMPTY;
        let mut advance = 1;
        if matched.has_value() {
            if shape.has_value() {
                value_idx = Some(idx);
                value_span = shape.value;
            } else if idx + 1 < argv.len() {
                value_idx = Some(idx + 1);
                value_span = Span::new(0, argv[idx + 1].len());
                advance = 2;
            } else if self.collect_suggestion {
                // At the end of argv with a value owed: that variable is the
                // completion.
                *suggestion = Some(matched.value.slice(self.source).to_string());
                return None;
            } else {
                errors.push(ArgvError::OptionHasMissingArgument { index: idx });
                return None;
            }
        } else if shape.has_value() {
            errors.push(ArgvError::OptionUnexpectedArgument {
                index: idx,
                position: shape.value.start,
            });
            return None;
        }

        if self.flags.short_options_strict_separators && shape.separator != matched.separator {
            errors.push(ArgvError::WrongSeparator { index: idx });
            return None;
        }

        resolved.push(ResolvedOption {
            spec: matched.clone(),
            name_idx: idx,
            value_idx,
            value_span,
        });
        Some(advance)
    }

    /// Parse argv[idx] as a short option with its value joined on, -DNDEBUG
    /// style. Only shorts that take a value qualify; under strict separators
    /// the spec must declare the `none` separator.
    fn parse_unseparated_short(
        &self,
        argv: &[String],
        idx: usize,
        resolved: &mut Vec<ResolvedOption>,
        errors: &mut Vec<ArgvError>,
    ) -> Option<usize> {
        let arg = argv[idx].as_str();
        let relaxed = !self.flags.short_options_strict_separators;
        let matched = self.options.iter().find(|option| {
            option.kind == OptionKind::Short
                && option.has_value()
                && (relaxed || option.separator == Separator::None)
                && Some(option.name.slice(self.source)) == arg.get(1..2)
        })?;

        if arg.len() <= 2 {
            errors.push(ArgvError::OptionHasMissingArgument { index: idx });
            return None;
        }
        resolved.push(ResolvedOption {
            spec: matched.clone(),
            name_idx: idx,
            value_idx: Some(idx),
            value_span: Span::new(2, arg.len() - 2),
        });
        Some(1)
    }

    /// Parse argv[idx] as a cluster of short options, -vf style. Only the
    /// last may take a value, from the following argv token.
    fn parse_short(
        &self,
        argv: &[String],
        idx: usize,
        resolved: &mut Vec<ResolvedOption>,
        errors: &mut Vec<ArgvError>,
        suggestion: &mut Option<String>,
    ) -> Option<usize> {
        let arg = argv[idx].as_str();
        let mut sequence: Vec<&OptionSpec> = Vec::new();
        for (position, c) in arg.chars().enumerate().skip(1) {
            let matched = self.options.iter().find(|option| {
                option.kind == OptionKind::Short
                    && option.name.len == c.len_utf8()
                    && option.name.slice(self.source).chars().next() == Some(c)
            });
            match matched {
                Some(option) => sequence.push(option),
                None => {
                    errors.push(ArgvError::UnknownOption {
                        index: idx,
                        position,
                    });
                    return None;
                }
            }
        }

        let last = sequence.len() - 1;
        let mut last_takes_value = false;
        for (i, option) in sequence.iter().enumerate() {
            if option.has_value() {
                if i == last {
                    last_takes_value = true;
                } else {
                    errors.push(ArgvError::OptionUnexpectedArgument {
                        index: idx,
                        position: i + 1,
                    });
                }
            }
        }

        let mut last_value_idx = None;
        let mut last_value_span = Span::EMPTY;
        let mut advance = 1;
        if last_takes_value {
            if idx + 1 < argv.len() {
                last_value_idx = Some(idx + 1);
                last_value_span = Span::new(0, argv[idx + 1].len());
                advance = 2;
            } else if self.collect_suggestion {
                *suggestion = Some(sequence[last].value.slice(self.source).to_string());
                return None;
            } else {
                errors.push(ArgvError::OptionHasMissingArgument { index: idx });
                return None;
            }
        }

        for (i, option) in sequence.iter().enumerate() {
            let (value_idx, value_span) = if i == last && last_takes_value {
                (last_value_idx, last_value_span)
            } else {
                (None, Span::EMPTY)
            };
            resolved.push(ResolvedOption {
                spec: (*option).clone(),
                name_idx: idx,
                value_idx,
                value_span,
            });
        }
        Some(advance)
    }
}
