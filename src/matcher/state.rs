use std::collections::{BTreeMap, BTreeSet};

use crate::argv::{Positional, ResolvedOption};

/// Accumulated assignment for one option, variable, or fixed word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Binding {
    /// How many times the key was matched.
    pub count: usize,
    /// The bound values, in argv order.
    pub values: Vec<String>,
}

/// Dense bitset sized to the resolved-option list; cheap to clone per branch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    pub(crate) fn with_len(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    pub(crate) fn get(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len);
        self.words[idx / 64] >> (idx % 64) & 1 == 1
    }

    pub(crate) fn set(&mut self, idx: usize) {
        debug_assert!(idx < self.len);
        self.words[idx / 64] |= 1 << (idx % 64);
    }

    pub(crate) fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// One candidate assignment on the matcher's frontier.
#[derive(Debug, Clone)]
pub(crate) struct MatchState {
    pub(crate) bindings: BTreeMap<String, Binding>,
    /// Cursor into the positionals list.
    pub(crate) next_positional_index: usize,
    /// Which resolved options the walk has absorbed.
    pub(crate) consumed_options: BitSet,
    /// Display names proposed for completion along this branch.
    pub(crate) suggestions: BTreeSet<String>,
}

impl MatchState {
    pub(crate) fn new(resolved_count: usize) -> Self {
        Self {
            bindings: BTreeMap::new(),
            next_positional_index: 0,
            consumed_options: BitSet::with_len(resolved_count),
            suggestions: BTreeSet::new(),
        }
    }

    /// How much of argv the state has absorbed. Monotonically non-decreasing
    /// under any transition; a child with its parent's progress is identical
    /// to its parent, which is what the ellipsis loop keys on.
    pub(crate) fn progress(&self) -> usize {
        self.next_positional_index + self.consumed_options.count_ones() + self.suggestions.len()
    }
}

/// Read-only context shared by every state during one matcher call.
pub(crate) struct MatchContext<'a> {
    pub(crate) argv: &'a [String],
    pub(crate) positionals: &'a [Positional],
    pub(crate) resolved: &'a [ResolvedOption],
}

impl<'a> MatchContext<'a> {
    pub(crate) fn has_more_positionals(&self, state: &MatchState) -> bool {
        state.next_positional_index < self.positionals.len()
    }

    pub(crate) fn next_positional(&self, state: &MatchState) -> Positional {
        self.positionals[state.next_positional_index]
    }

    pub(crate) fn acquire_next_positional(&self, state: &mut MatchState) -> Positional {
        let positional = self.positionals[state.next_positional_index];
        state.next_positional_index += 1;
        positional
    }

    /// The argv indexes `state` leaves unaccounted for, ascending. An index
    /// is unused when it is an unconsumed positional, an option the walk
    /// never absorbed, or an option the tokenizer could not place at all.
    pub(crate) fn unused_arguments(&self, state: &MatchState) -> Vec<usize> {
        let mut used = vec![false; self.argv.len()];
        for positional in &self.positionals[..state.next_positional_index] {
            used[positional.idx_in_argv] = true;
        }
        for (i, option) in self.resolved.iter().enumerate() {
            if state.consumed_options.get(i) {
                used[option.name_idx] = true;
                if let Some(value_idx) = option.value_idx {
                    used[value_idx] = true;
                }
            }
        }
        // -vv resolves to two shorts sharing one argv index; if either went
        // unconsumed the whole index reads as unused.
        for (i, option) in self.resolved.iter().enumerate() {
            if !state.consumed_options.get(i) {
                used[option.name_idx] = false;
            }
        }
        used.iter()
            .enumerate()
            .filter(|(_, used)| !**used)
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argv::ArgvTokenizer;
    use crate::doc::spec::parse_option_group;
    use crate::scan::Span;
    use crate::ParseFlags;
    use rstest::rstest;

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(64)]
    #[case(65)]
    #[case(130)]
    fn bitset_set_get_count(#[case] len: usize) {
        let mut bits = BitSet::with_len(len);
        assert_eq!(bits.count_ones(), 0);
        for idx in (0..len).step_by(3) {
            bits.set(idx);
        }
        for idx in 0..len {
            assert_eq!(bits.get(idx), idx % 3 == 0);
        }
        assert_eq!(bits.count_ones(), len.div_ceil(3));
    }

    #[test]
    fn bitset_set_is_idempotent() {
        let mut bits = BitSet::with_len(10);
        bits.set(7);
        bits.set(7);
        assert_eq!(bits.count_ones(), 1);
    }

    #[test]
    fn progress_counts_all_three_sources() {
        let mut state = MatchState::new(4);
        assert_eq!(state.progress(), 0);
        state.next_positional_index = 2;
        state.consumed_options.set(1);
        state.suggestions.insert("--foo".to_string());
        assert_eq!(state.progress(), 4);
    }

    #[test]
    fn partially_consumed_cluster_reads_as_unused() {
        let source = "-v  Verbose";
        let mut errors = Vec::new();
        let options = parse_option_group(source, Span::new(0, source.len()), &mut errors);
        let argv: Vec<String> = vec!["-vv".to_string()];
        let tokenized =
            ArgvTokenizer::new(source, &options, ParseFlags::default(), false).tokenize(&argv);
        assert_eq!(tokenized.resolved.len(), 2);

        let ctx = MatchContext {
            argv: &argv,
            positionals: &tokenized.positionals,
            resolved: &tokenized.resolved,
        };
        let mut state = MatchState::new(2);
        state.consumed_options.set(0);
        // One of the two -v uses is unconsumed, so index 0 stays unused.
        assert_eq!(ctx.unused_arguments(&state), vec![0]);

        state.consumed_options.set(1);
        assert_eq!(ctx.unused_arguments(&state), Vec::<usize>::new());
    }

    #[test]
    fn value_index_counts_as_used() {
        let source = "-f <file>  The input";
        let mut errors = Vec::new();
        let options = parse_option_group(source, Span::new(0, source.len()), &mut errors);
        let argv: Vec<String> = vec!["-f".to_string(), "in.txt".to_string()];
        let tokenized =
            ArgvTokenizer::new(source, &options, ParseFlags::default(), false).tokenize(&argv);

        let ctx = MatchContext {
            argv: &argv,
            positionals: &tokenized.positionals,
            resolved: &tokenized.resolved,
        };
        let mut state = MatchState::new(tokenized.resolved.len());
        assert_eq!(ctx.unused_arguments(&state), vec![0, 1]);
        state.consumed_options.set(0);
        assert_eq!(ctx.unused_arguments(&state), Vec::<usize>::new());
    }
}
