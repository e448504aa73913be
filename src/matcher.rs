//! The tree matcher: a non-deterministic walk of the usage AST against the
//! tokenized argument vector.
//!
//! Matching is a function from state to set-of-states. Each node visit takes
//! one frontier state and returns its successors; an empty list means the
//! branch failed. States clone only at true branching points (the usage
//! continuation, alternation, the square-bracket fallback, and ellipsis
//! seeds) and move through everything else.

mod state;

pub use state::Binding;
pub(crate) use state::{MatchContext, MatchState};

use std::collections::BTreeSet;
use std::slice;

use tracing::debug;

use crate::doc::spec::OptionSpec;
use crate::grammar::{AlternationList, Expression, ExpressionKind, SimpleClause, Usage};
use crate::scan::Span;
use crate::ParseFlags;

pub(crate) struct Matcher<'a> {
    source: &'a str,
    shortcut_options: &'a [OptionSpec],
    flags: ParseFlags,
    ctx: MatchContext<'a>,
    /// A clause inside square brackets is not required to match.
    in_square_brackets: bool,
}

impl<'a> Matcher<'a> {
    pub(crate) fn new(
        source: &'a str,
        shortcut_options: &'a [OptionSpec],
        flags: ParseFlags,
        ctx: MatchContext<'a>,
    ) -> Self {
        Self {
            source,
            shortcut_options,
            flags,
            ctx,
            in_square_brackets: false,
        }
    }

    /// Walk the full usage chain and pick the state leaving the fewest argv
    /// entries unused; ties break toward the earlier state. With an empty
    /// frontier every argv index is unused.
    pub(crate) fn run(&mut self, tree: &Usage) -> (Option<MatchState>, Vec<usize>) {
        let init = MatchState::new(self.ctx.resolved.len());
        let states = self.match_usage(tree, init);
        debug!("matched {} way(s)", states.len());

        let mut best: Option<(usize, Vec<usize>)> = None;
        for (i, state) in states.iter().enumerate() {
            let unused = self.ctx.unused_arguments(state);
            let better = match &best {
                Some((_, best_unused)) => unused.len() < best_unused.len(),
                None => true,
            };
            if better {
                let complete = unused.is_empty();
                best = Some((i, unused));
                if complete {
                    break;
                }
            }
        }

        match best {
            Some((i, unused)) => {
                debug!(
                    "selected state {i} leaving {} argument(s) unused",
                    unused.len()
                );
                let mut states = states;
                (Some(states.swap_remove(i)), unused)
            }
            None => (None, (0..self.ctx.argv.len()).collect()),
        }
    }

    /// Walk the chain and union the suggestion sets of every state tied for
    /// the fewest unused arguments.
    pub(crate) fn run_suggestions(&mut self, tree: &Usage) -> Vec<String> {
        let init = MatchState::new(self.ctx.resolved.len());
        let states = self.match_usage(tree, init);
        let best = states
            .iter()
            .map(|state| self.ctx.unused_arguments(state).len())
            .min();

        let mut suggestions = BTreeSet::new();
        if let Some(best) = best {
            for state in &states {
                if self.ctx.unused_arguments(state).len() == best {
                    suggestions.extend(state.suggestions.iter().cloned());
                }
            }
        }
        suggestions.into_iter().collect()
    }

    fn match_usage(&mut self, usage: &Usage, state: MatchState) -> Vec<MatchState> {
        if !self.ctx.has_more_positionals(&state) || usage.prog_name.is_empty() {
            return Vec::new();
        }

        let next_seed = usage.next.as_ref().map(|_| state.clone());
        let mut state = state;
        // The program name consumes a positional without matching its text.
        self.ctx.acquire_next_positional(&mut state);

        let mut results = match &usage.alternation {
            Some(alternation) => self.match_alternation(alternation, state),
            None => vec![state],
        };
        if let (Some(next), Some(seed)) = (usage.next.as_deref(), next_seed) {
            results.extend(self.match_usage(next, seed));
        }
        results
    }

    fn match_alternation(
        &mut self,
        alternation: &AlternationList,
        state: MatchState,
    ) -> Vec<MatchState> {
        let (last, rest) = alternation
            .branches
            .split_last()
            .expect("internal error - alternation lists hold at least one branch");
        let mut results = Vec::new();
        for branch in rest {
            results.extend(self.match_expression_list(&branch.expressions, state.clone()));
        }
        results.extend(self.match_expression_list(&last.expressions, state));
        results
    }

    fn match_expression_list(
        &mut self,
        expressions: &[Expression],
        state: MatchState,
    ) -> Vec<MatchState> {
        let mut frontier = vec![state];
        for expression in expressions {
            let mut next = Vec::new();
            for state in frontier {
                next.extend(self.match_expression(expression, state));
            }
            if next.is_empty() {
                return Vec::new();
            }
            frontier = next;
        }
        frontier
    }

    fn match_expression(&mut self, expression: &Expression, state: MatchState) -> Vec<MatchState> {
        let saved = self.in_square_brackets;
        let results = match &expression.kind {
            ExpressionKind::Simple(clause) => {
                let results = self.match_simple(clause, state);
                self.repeat_under_ellipsis(expression, results, |matcher, state| {
                    matcher.match_simple(clause, state)
                })
            }
            ExpressionKind::Parenthesized(alternation) => {
                self.in_square_brackets = false;
                let results = self.match_alternation(alternation, state);
                self.repeat_under_ellipsis(expression, results, |matcher, state| {
                    matcher.match_alternation(alternation, state)
                })
            }
            ExpressionKind::Bracketed(alternation) => {
                self.in_square_brackets = true;
                // The group is optional: the untaken branch survives as-is.
                let not_taken = state.clone();
                let results = self.match_alternation(alternation, state);
                let mut results =
                    self.repeat_under_ellipsis(expression, results, |matcher, state| {
                        matcher.match_alternation(alternation, state)
                    });
                results.push(not_taken);
                results
            }
            ExpressionKind::OptionsShortcut => {
                let shortcuts = self.shortcut_options;
                match self.match_options(shortcuts, state) {
                    Ok(state) => vec![state],
                    Err(mut state) => {
                        // The shortcut is optional; offer its options as
                        // completions instead.
                        if self.flags.generate_suggestions {
                            for option in shortcuts {
                                state.suggestions.insert(option.display_name(self.source));
                            }
                        }
                        vec![state]
                    }
                }
            }
        };
        self.in_square_brackets = saved;
        results
    }

    /// Under an ellipsis, re-run `step` against the frontier until it stops
    /// producing states, requiring progress each round so that patterns like
    /// `[foo]...` cannot spin on identical states.
    fn repeat_under_ellipsis(
        &mut self,
        expression: &Expression,
        mut results: Vec<MatchState>,
        mut step: impl FnMut(&mut Self, MatchState) -> Vec<MatchState>,
    ) -> Vec<MatchState> {
        if !expression.ellipsis {
            return results;
        }
        let mut frontier = results.clone();
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for state in frontier {
                let before = state.progress();
                for child in step(self, state) {
                    debug_assert!(child.progress() >= before);
                    if child.progress() > before {
                        next.push(child);
                    }
                }
            }
            results.extend(next.iter().cloned());
            frontier = next;
        }
        results
    }

    fn match_simple(&mut self, clause: &SimpleClause, state: MatchState) -> Vec<MatchState> {
        match clause {
            SimpleClause::Option(option) => self.match_option_clause(option, state),
            SimpleClause::Fixed(word) => self.match_fixed(*word, state),
            SimpleClause::Variable(word) => self.match_variable(*word, state),
        }
    }

    fn match_option_clause(&mut self, option: &OptionSpec, state: MatchState) -> Vec<MatchState> {
        match self.match_options(slice::from_ref(option), state) {
            Ok(state) => vec![state],
            Err(mut state) => {
                if self.flags.generate_suggestions {
                    state.suggestions.insert(option.display_name(self.source));
                }
                if self.in_square_brackets || self.flags.match_allow_incomplete {
                    vec![state]
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Match candidates against the unconsumed resolved options, first use
    /// wins. Candidates whose long alias was already matched are skipped, so
    /// an invocation matches `-f` or `--foo` but never both. Ok when at
    /// least one option matched or one suggestion was produced; Err hands
    /// the state back untouched.
    fn match_options(
        &self,
        candidates: &[OptionSpec],
        mut state: MatchState,
    ) -> Result<MatchState, MatchState> {
        let mut matched = false;
        let mut suggested = false;
        let mut matched_long_names: Vec<Span> = Vec::new();
        let mut potential_suggestions: Vec<&OptionSpec> = Vec::new();

        for candidate in candidates {
            let long_name = candidate.corresponding_long_name;
            if !long_name.is_empty() && matched_long_names.contains(&long_name) {
                continue;
            }

            let found = self.ctx.resolved.iter().enumerate().find(|(i, resolved)| {
                !state.consumed_options.get(*i) && resolved.spec.same_name(candidate, self.source)
            });

            match found {
                Some((i, resolved)) => {
                    let key = candidate.canonical_name(self.source);
                    let binding = state.bindings.entry(key).or_default();
                    if let Some(value_idx) = resolved.value_idx {
                        let value = resolved.value_span.slice(self.ctx.argv[value_idx].as_str());
                        binding.values.push(value.to_string());
                    }
                    binding.count += 1;
                    state.consumed_options.set(i);
                    matched = true;
                    if !long_name.is_empty() {
                        matched_long_names.push(long_name);
                    }
                }
                None => {
                    if self.flags.generate_suggestions {
                        potential_suggestions.push(candidate);
                    }
                }
            }
        }

        if self.flags.generate_suggestions {
            for candidate in potential_suggestions {
                let long_name = candidate.corresponding_long_name;
                // A later pass may have matched this option's long alias;
                // suggesting it then would be redundant.
                if long_name.is_empty() || !matched_long_names.contains(&long_name) {
                    state
                        .suggestions
                        .insert(candidate.display_name(self.source));
                    suggested = true;
                }
            }
        }

        if matched || suggested {
            Ok(state)
        } else {
            Err(state)
        }
    }

    fn match_fixed(&mut self, word: Span, state: MatchState) -> Vec<MatchState> {
        let mut state = state;
        if self.ctx.has_more_positionals(&state) {
            let positional = self.ctx.next_positional(&state);
            let text = self.ctx.argv[positional.idx_in_argv].as_str();
            if text == word.slice(self.source) {
                state.bindings.entry(text.to_string()).or_default().count += 1;
                self.ctx.acquire_next_positional(&mut state);
                vec![state]
            } else {
                Vec::new()
            }
        } else {
            if self.flags.generate_suggestions {
                state.suggestions.insert(word.slice(self.source).to_string());
            }
            if self.flags.match_allow_incomplete {
                vec![state]
            } else {
                Vec::new()
            }
        }
    }

    fn match_variable(&mut self, word: Span, state: MatchState) -> Vec<MatchState> {
        let mut state = state;
        if self.ctx.has_more_positionals(&state) {
            let positional = self.ctx.acquire_next_positional(&mut state);
            let value = self.ctx.argv[positional.idx_in_argv].clone();
            // The key keeps its angle brackets.
            let key = word.slice(self.source).to_string();
            state.bindings.entry(key).or_default().values.push(value);
            vec![state]
        } else {
            if self.flags.generate_suggestions {
                state.suggestions.insert(word.slice(self.source).to_string());
            }
            if self.flags.match_allow_incomplete {
                vec![state]
            } else {
                Vec::new()
            }
        }
    }
}
