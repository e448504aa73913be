//! `docmatch` turns a human-written usage doc into a working argument parser.
//!
//! Instead of declaring parameters through a builder or derive Api, you hand
//! the library the help text you were going to write anyway:
//!
//! ```text
//! Usage:
//!   ship new <name>...
//!   ship move <name> <x> <y> [--speed=<kn>]
//! Options:
//!   -s, --speed <kn>  Speed in knots [default: 10]
//! ```
//!
//! Compiling that doc yields a parser which can bind an invocation's argument
//! vector to a map of named values, classify each token as used or unused,
//! suggest completions for a partial invocation, and report descriptions and
//! side-conditions for options and variables.
//!
//! # Usage
//!
//! ```
//! use docmatch::{ArgumentParser, ParseFlags};
//!
//! let mut parser = ArgumentParser::new();
//! parser
//!     .set_doc("Usage: checkout <branch>\nOptions:\n  -q, --quiet  Suppress output\n")
//!     .expect("the doc compiles");
//!
//! let argv = vec!["checkout".to_string(), "main".to_string()];
//! let outcome = parser.parse(&argv, ParseFlags::default());
//! assert_eq!(outcome.bindings["<branch>"].values, vec!["main".to_string()]);
//! assert_eq!(outcome.unused, Vec::<usize>::new());
//! ```
//!
//! # Matching model
//!
//! Parsing runs in two phases. The argv tokenizer classifies every argument
//! as a positional or as uses of the doc's options (long, short, clustered
//! short, or joined `-DNDEBUG` forms). The matcher then walks the usage tree
//! non-deterministically, keeping a frontier of candidate assignments, and
//! the assignment leaving the fewest arguments unused wins. Ambiguous docs
//! are therefore fine: `Usage: prog <src>... <dst>` splits three arguments
//! as two sources and one destination because that split leaves nothing
//! unused.
//!
//! # Errors
//!
//! Doc problems ([`DocError`]) are reported by [`ArgumentParser::set_doc`];
//! only a few are fatal. Invocation problems ([`ArgvError`]) never abort a
//! parse; the offending token is skipped and reported in the outcome.
//!
//! Diagnostics are emitted through `tracing` at debug level; the crate
//! installs no subscriber of its own.

mod argv;
mod doc;
mod error;
mod grammar;
mod matcher;
mod scan;

pub use error::{ArgvError, DocError};
pub use matcher::Binding;

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use argv::ArgvTokenizer;
use doc::sections;
use doc::spec::{self, OptionKind, OptionSpec};
use grammar::{ClauseCollector, Usage};
use matcher::{MatchContext, Matcher};
use scan::Span;

/// Behaviour toggles for [`ArgumentParser::parse`] and friends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseFlags {
    /// Let a long option match on an unambiguous prefix of its name.
    pub resolve_unambiguous_prefixes: bool,
    /// Require argv separators to agree with the doc's separators.
    pub short_options_strict_separators: bool,
    /// Populate suggestion sets during matching.
    pub generate_suggestions: bool,
    /// Treat missing positionals and unmatched option clauses as non-fatal.
    pub match_allow_incomplete: bool,
    /// Fill the result map with defaults and empty slots for every known key.
    pub generate_empty_args: bool,
}

/// Everything [`ArgumentParser::parse`] produces for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Keyed by option display name (the longest alias, dashes included),
    /// variable token (angle brackets included), or fixed word.
    pub bindings: BTreeMap<String, Binding>,
    pub errors: Vec<ArgvError>,
    /// Argv indexes the winning match state left unaccounted for, ascending.
    pub unused: Vec<usize>,
}

/// Per-index verdict from [`ArgumentParser::validate_arguments`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentStatus {
    Valid,
    Invalid,
}

#[derive(Debug, Clone)]
struct CompiledDoc {
    source: String,
    tree: Usage,
    /// Options eligible for the `[options]` shortcut. Options mentioned
    /// explicitly in usage are excised after compilation.
    shortcut_options: Vec<OptionSpec>,
    /// The de-duplicated union of usage options and Options-section options.
    all_options: Vec<OptionSpec>,
    all_variables: Vec<Span>,
    all_fixed_words: Vec<Span>,
    conditions: BTreeMap<String, Span>,
}

impl CompiledDoc {
    fn compile(source: String) -> Result<(Self, Vec<DocError>), Vec<DocError>> {
        let mut errors = Vec::new();

        let usage_ranges = sections::section_ranges(&source, "Usage", false);
        if usage_ranges.is_empty() {
            errors.push(DocError::MissingUsageSection);
            return Err(errors);
        }
        if usage_ranges.len() > 1 {
            errors.push(DocError::ExcessiveUsageSections);
            return Err(errors);
        }

        let mut shortcut_options = sections::parse_options_sections(&source, &mut errors);
        spec::uniqueize(&mut shortcut_options, &source, true, &mut errors);

        let tree = match grammar::parse_usage(&source, usage_ranges[0], &shortcut_options, &mut errors)
        {
            Ok(tree) => tree,
            Err(fatal) => {
                errors.push(fatal);
                return Err(errors);
            }
        };

        let mut collector = ClauseCollector::default();
        tree.visit_clauses(&mut collector);
        let usage_options = collector.options;

        let mut all_options = usage_options.clone();
        all_options.extend(shortcut_options.iter().cloned());
        spec::uniqueize(&mut all_options, &source, false, &mut errors);

        // An option mentioned in usage is never re-matched through
        // [options]; otherwise `prog -a -a` against `prog [options] [-a]`
        // would count the same use twice.
        shortcut_options.retain(|shortcut| {
            !usage_options
                .iter()
                .any(|usage_option| usage_option.same_name(shortcut, &source))
        });

        let conditions = sections::parse_conditions_sections(&source, &mut errors);

        debug!(
            "compiled doc: {} option(s), {} shortcut option(s), {} condition(s)",
            all_options.len(),
            shortcut_options.len(),
            conditions.len()
        );

        Ok((
            Self {
                source,
                tree,
                shortcut_options,
                all_options,
                all_variables: collector.variables,
                all_fixed_words: collector.fixed_words,
                conditions,
            },
            errors,
        ))
    }

    fn parse(&self, argv: &[String], flags: ParseFlags) -> ParseOutcome {
        let tokenizer = ArgvTokenizer::new(&self.source, &self.all_options, flags, false);
        let tokenized = tokenizer.tokenize(argv);

        let ctx = MatchContext {
            argv,
            positionals: &tokenized.positionals,
            resolved: &tokenized.resolved,
        };
        let mut matcher = Matcher::new(&self.source, &self.shortcut_options, flags, ctx);
        let (best, unused) = matcher.run(&self.tree);

        let bindings = best.map(|state| state.bindings).unwrap_or_default();
        ParseOutcome {
            bindings: self.finalize(bindings, flags),
            errors: tokenized.errors,
            unused,
        }
    }

    /// Under `generate_empty_args`, every option's canonical key and every
    /// variable and fixed word gets a slot, with defaults filling otherwise
    /// empty option slots.
    fn finalize(
        &self,
        mut bindings: BTreeMap<String, Binding>,
        flags: ParseFlags,
    ) -> BTreeMap<String, Binding> {
        if !flags.generate_empty_args {
            return bindings;
        }
        for option in &self.all_options {
            let binding = bindings
                .entry(option.canonical_name(&self.source))
                .or_default();
            if binding.values.is_empty() && !option.default_value.is_empty() {
                binding
                    .values
                    .push(option.default_value.slice(&self.source).to_string());
            }
        }
        for variable in &self.all_variables {
            bindings
                .entry(variable.slice(&self.source).to_string())
                .or_default();
        }
        for word in &self.all_fixed_words {
            bindings
                .entry(word.slice(&self.source).to_string())
                .or_default();
        }
        bindings
    }

    fn suggest(&self, argv: &[String], mut flags: ParseFlags) -> Vec<String> {
        flags.generate_suggestions = true;
        let tokenizer = ArgvTokenizer::new(&self.source, &self.all_options, flags, true);
        let tokenized = tokenizer.tokenize(argv);

        // A trailing option still waiting for its value pins the completion
        // to that value's variable.
        if let Some(value) = tokenized.value_suggestion {
            return vec![value];
        }

        let ctx = MatchContext {
            argv,
            positionals: &tokenized.positionals,
            resolved: &tokenized.resolved,
        };
        let mut matcher = Matcher::new(&self.source, &self.shortcut_options, flags, ctx);
        matcher.run_suggestions(&self.tree)
    }
}

/// Compiles a usage doc and matches argument vectors against it.
///
/// A fresh parser holds no doc; [`set_doc`](ArgumentParser::set_doc)
/// compiles one. All other operations are read-only over the compiled state,
/// so a compiled parser may be consulted from several threads at once.
#[derive(Debug, Clone, Default)]
pub struct ArgumentParser {
    compiled: Option<CompiledDoc>,
}

impl ArgumentParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `doc`. On success any previously compiled doc is replaced and
    /// the non-fatal doc errors come back in `Ok`; on failure the prior
    /// state is kept and `Err` carries everything found, the fatal error
    /// last.
    pub fn set_doc(&mut self, doc: impl Into<String>) -> Result<Vec<DocError>, Vec<DocError>> {
        match CompiledDoc::compile(doc.into()) {
            Ok((compiled, errors)) => {
                self.compiled = Some(compiled);
                Ok(errors)
            }
            Err(errors) => Err(errors),
        }
    }

    /// Bind `argv` to named values and classify every token as used or
    /// unused. Without a compiled doc the map is empty and every index is
    /// unused.
    pub fn parse(&self, argv: &[String], flags: ParseFlags) -> ParseOutcome {
        match &self.compiled {
            Some(compiled) => compiled.parse(argv, flags),
            None => ParseOutcome {
                unused: (0..argv.len()).collect(),
                ..ParseOutcome::default()
            },
        }
    }

    /// Suggest next arguments for a partial invocation: a sorted, unique
    /// list of display names drawn from the states tied for fewest unused
    /// arguments.
    pub fn suggest_next_argument(&self, argv: &[String], flags: ParseFlags) -> Vec<String> {
        match &self.compiled {
            Some(compiled) => compiled.suggest(argv, flags),
            None => Vec::new(),
        }
    }

    /// Classify each argv entry by whether the best assignment uses it.
    pub fn validate_arguments(&self, argv: &[String], flags: ParseFlags) -> Vec<ArgumentStatus> {
        let outcome = self.parse(argv, flags);
        let mut statuses = vec![ArgumentStatus::Valid; argv.len()];
        for idx in outcome.unused {
            statuses[idx] = ArgumentStatus::Invalid;
        }
        statuses
    }

    /// The side-condition recorded for `name` (angle brackets included) in
    /// the Conditions section.
    pub fn conditions_for_variable(&self, name: &str) -> Option<&str> {
        let compiled = self.compiled.as_ref()?;
        compiled
            .conditions
            .get(name)
            .map(|span| span.slice(&compiled.source))
    }

    /// The description of the option named with its dashes. A single-dash
    /// name matches short and single-long options; a double-dash name
    /// matches double-long options only.
    pub fn description_for_option(&self, name: &str) -> Option<&str> {
        let compiled = self.compiled.as_ref()?;
        if name.len() < 2 || !name.starts_with('-') {
            return None;
        }
        let double_dash = name.as_bytes()[1] == b'-';
        compiled.all_options.iter().find_map(|option| {
            if option.description.is_empty() {
                return None;
            }
            let matches = match option.kind {
                OptionKind::Short | OptionKind::SingleLong => {
                    !double_dash && option.name.slice(&compiled.source) == &name[1..]
                }
                OptionKind::DoubleLong => {
                    double_dash && option.name.slice(&compiled.source) == &name[2..]
                }
            };
            if matches {
                Some(option.description.slice(&compiled.source))
            } else {
                None
            }
        })
    }

    /// Program-name tokens across the usage continuation chain, in first
    /// occurrence order.
    pub fn get_command_names(&self) -> Vec<&str> {
        let compiled = match &self.compiled {
            Some(compiled) => compiled,
            None => return Vec::new(),
        };
        let mut seen = BTreeSet::new();
        let mut names = Vec::new();
        let mut cursor = Some(&compiled.tree);
        while let Some(usage) = cursor {
            if !usage.prog_name.is_empty() {
                let name = usage.prog_name.slice(&compiled.source);
                if seen.insert(name) {
                    names.push(name);
                }
            }
            cursor = usage.next.as_deref();
        }
        names
    }

    /// The sorted, unique union of variables from the usage tree and
    /// variable placeholders from option specs.
    pub fn get_variables(&self) -> Vec<&str> {
        let compiled = match &self.compiled {
            Some(compiled) => compiled,
            None => return Vec::new(),
        };
        let mut variables = BTreeSet::new();
        for span in &compiled.all_variables {
            variables.insert(span.slice(&compiled.source));
        }
        for option in &compiled.all_options {
            if !option.value.is_empty() {
                variables.insert(option.value.slice(&compiled.source));
            }
        }
        variables.into_iter().collect()
    }
}
