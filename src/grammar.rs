//! The usage grammar: AST, line parser, and clause traversal.
//!
//! Each non-empty line of the Usage section is one [`Usage`] alternative:
//! a program name followed by a pattern of clauses, alternations, optional
//! groups and repetitions. Usage lines chain through `next`, ending in
//! `None`; an empty section compiles to the terminal sentinel (empty program
//! name), which never matches.

use crate::doc::spec::OptionSpec;
use crate::error::DocError;
use crate::scan::{self, Span};

/// One usage alternative, chained to the next.
#[derive(Debug, Clone)]
pub(crate) struct Usage {
    pub(crate) prog_name: Span,
    pub(crate) alternation: Option<AlternationList>,
    pub(crate) next: Option<Box<Usage>>,
}

/// `expression_list ('|' expression_list)*`; always at least one branch.
#[derive(Debug, Clone)]
pub(crate) struct AlternationList {
    pub(crate) branches: Vec<ExpressionList>,
}

/// A sequence of expressions matched left to right; may be empty.
#[derive(Debug, Clone)]
pub(crate) struct ExpressionList {
    pub(crate) expressions: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub(crate) struct Expression {
    pub(crate) kind: ExpressionKind,
    pub(crate) ellipsis: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum ExpressionKind {
    Simple(SimpleClause),
    Parenthesized(AlternationList),
    Bracketed(AlternationList),
    /// The `[options]` shortcut over the Options-section list.
    OptionsShortcut,
}

#[derive(Debug, Clone)]
pub(crate) enum SimpleClause {
    Option(OptionSpec),
    Fixed(Span),
    Variable(Span),
}

/// Hook for walking the leaves of a usage tree. The options-shortcut
/// production is not descended.
pub(crate) trait ClauseVisitor {
    fn option(&mut self, option: &OptionSpec);
    fn fixed(&mut self, word: Span);
    fn variable(&mut self, word: Span);
}

impl Usage {
    pub(crate) fn visit_clauses<V: ClauseVisitor>(&self, visitor: &mut V) {
        if let Some(alternation) = &self.alternation {
            alternation.visit_clauses(visitor);
        }
        if let Some(next) = &self.next {
            next.visit_clauses(visitor);
        }
    }
}

impl AlternationList {
    fn visit_clauses<V: ClauseVisitor>(&self, visitor: &mut V) {
        for branch in &self.branches {
            for expression in &branch.expressions {
                match &expression.kind {
                    ExpressionKind::Simple(SimpleClause::Option(option)) => visitor.option(option),
                    ExpressionKind::Simple(SimpleClause::Fixed(word)) => visitor.fixed(*word),
                    ExpressionKind::Simple(SimpleClause::Variable(word)) => {
                        visitor.variable(*word)
                    }
                    ExpressionKind::Parenthesized(inner) | ExpressionKind::Bracketed(inner) => {
                        inner.visit_clauses(visitor)
                    }
                    ExpressionKind::OptionsShortcut => {}
                }
            }
        }
    }
}

/// Collects the leaves of a usage tree by kind.
#[derive(Debug, Default)]
pub(crate) struct ClauseCollector {
    pub(crate) options: Vec<OptionSpec>,
    pub(crate) fixed_words: Vec<Span>,
    pub(crate) variables: Vec<Span>,
}

impl ClauseVisitor for ClauseCollector {
    fn option(&mut self, option: &OptionSpec) {
        self.options.push(option.clone());
    }

    fn fixed(&mut self, word: Span) {
        self.fixed_words.push(word);
    }

    fn variable(&mut self, word: Span) {
        self.variables.push(word);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Word,
    Open,
    Close,
    BracketOpen,
    BracketClose,
    Pipe,
    Ellipsis,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    span: Span,
}

fn tokenize_line(source: &str, line: Span) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = line.start;
    let end = line.end();
    while pos < end {
        let c = source[pos..]
            .chars()
            .next()
            .expect("internal error - pos is always on a char boundary");
        if c.is_whitespace() {
            pos += c.len_utf8();
            continue;
        }
        // The ellipsis may be glued to the preceding word, as in `<name>...`.
        if source[pos..end].starts_with("...") {
            tokens.push(Token {
                kind: TokenKind::Ellipsis,
                span: Span::new(pos, 3),
            });
            pos += 3;
            continue;
        }
        let kind = match c {
            '(' => Some(TokenKind::Open),
            ')' => Some(TokenKind::Close),
            '[' => Some(TokenKind::BracketOpen),
            ']' => Some(TokenKind::BracketClose),
            '|' => Some(TokenKind::Pipe),
            _ => None,
        };
        if let Some(kind) = kind {
            tokens.push(Token {
                kind,
                span: Span::new(pos, 1),
            });
            pos += 1;
            continue;
        }
        let start = pos;
        while pos < end {
            let c = source[pos..]
                .chars()
                .next()
                .expect("internal error - pos is always on a char boundary");
            if c.is_whitespace()
                || matches!(c, '(' | ')' | '[' | ']' | '|')
                || source[pos..end].starts_with("...")
            {
                break;
            }
            pos += c.len_utf8();
        }
        tokens.push(Token {
            kind: TokenKind::Word,
            span: Span::new(start, pos - start),
        });
    }
    tokens
}

/// Parse the single Usage section into a usage chain. Option clauses with no
/// variable of their own adopt value and linkage from the same-named option
/// in `shortcut_options`.
pub(crate) fn parse_usage(
    source: &str,
    section: Span,
    shortcut_options: &[OptionSpec],
    errors: &mut Vec<DocError>,
) -> Result<Usage, DocError> {
    let mut parsed = Vec::new();
    for line in scan::lines_in(source, section) {
        let trimmed = scan::trim_whitespace(line, source);
        if trimmed.is_empty() {
            continue;
        }
        let mut parser = UsageParser {
            source,
            shortcut_options,
            tokens: tokenize_line(source, trimmed),
            pos: 0,
        };
        parsed.push(parser.parse_usage_line(errors)?);
    }

    let mut chain: Option<Box<Usage>> = None;
    while let Some(mut usage) = parsed.pop() {
        usage.next = chain;
        chain = Some(Box::new(usage));
    }
    match chain {
        Some(usage) => Ok(*usage),
        None => Ok(Usage {
            prog_name: Span::EMPTY,
            alternation: None,
            next: None,
        }),
    }
}

struct UsageParser<'a> {
    source: &'a str,
    shortcut_options: &'a [OptionSpec],
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> UsageParser<'a> {
    fn parse_usage_line(&mut self, errors: &mut Vec<DocError>) -> Result<Usage, DocError> {
        let prog_name = match self.tokens.first() {
            Some(token) if token.kind == TokenKind::Word => token.span,
            Some(token) => {
                return Err(DocError::MalformedUsage {
                    offset: token.span.start,
                })
            }
            None => unreachable!("internal error - blank usage lines are skipped before parsing"),
        };
        self.pos = 1;

        let alternation = if self.pos < self.tokens.len() {
            Some(self.parse_alternation(errors)?)
        } else {
            None
        };
        if self.pos < self.tokens.len() {
            return Err(DocError::MalformedUsage {
                offset: self.tokens[self.pos].span.start,
            });
        }
        Ok(Usage {
            prog_name,
            alternation,
            next: None,
        })
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|token| token.kind)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), DocError> {
        match self.tokens.get(self.pos) {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Ok(())
            }
            Some(token) => Err(DocError::MalformedUsage {
                offset: token.span.start,
            }),
            None => Err(DocError::MalformedUsage {
                offset: self.tokens.last().map(|t| t.span.end()).unwrap_or(0),
            }),
        }
    }

    fn parse_alternation(&mut self, errors: &mut Vec<DocError>) -> Result<AlternationList, DocError> {
        let mut branches = vec![self.parse_expression_list(errors)?];
        while self.peek_kind() == Some(TokenKind::Pipe) {
            self.pos += 1;
            branches.push(self.parse_expression_list(errors)?);
        }
        Ok(AlternationList { branches })
    }

    fn parse_expression_list(
        &mut self,
        errors: &mut Vec<DocError>,
    ) -> Result<ExpressionList, DocError> {
        let mut expressions = Vec::new();
        while matches!(
            self.peek_kind(),
            Some(TokenKind::Word | TokenKind::Open | TokenKind::BracketOpen)
        ) {
            expressions.push(self.parse_expression(errors)?);
        }
        Ok(ExpressionList { expressions })
    }

    fn parse_expression(&mut self, errors: &mut Vec<DocError>) -> Result<Expression, DocError> {
        let token = self.tokens[self.pos];
        let kind = match token.kind {
            TokenKind::Open => {
                self.pos += 1;
                let inner = self.parse_alternation(errors)?;
                self.expect(TokenKind::Close)?;
                ExpressionKind::Parenthesized(inner)
            }
            TokenKind::BracketOpen => {
                self.pos += 1;
                if self.at_options_shortcut() {
                    self.pos += 2;
                    ExpressionKind::OptionsShortcut
                } else {
                    let inner = self.parse_alternation(errors)?;
                    self.expect(TokenKind::BracketClose)?;
                    ExpressionKind::Bracketed(inner)
                }
            }
            TokenKind::Word => {
                self.pos += 1;
                ExpressionKind::Simple(self.classify_word(token.span, errors))
            }
            _ => unreachable!("internal error - parse_expression entered off a non-expression token"),
        };

        let ellipsis = if self.peek_kind() == Some(TokenKind::Ellipsis) {
            self.pos += 1;
            true
        } else {
            false
        };
        Ok(Expression { kind, ellipsis })
    }

    fn at_options_shortcut(&self) -> bool {
        let word = match self.tokens.get(self.pos) {
            Some(token) if token.kind == TokenKind::Word => token.span.slice(self.source),
            _ => return false,
        };
        word == "options"
            && matches!(
                self.tokens.get(self.pos + 1),
                Some(token) if token.kind == TokenKind::BracketClose
            )
    }

    fn classify_word(&self, word: Span, errors: &mut Vec<DocError>) -> SimpleClause {
        let text = word.slice(self.source);
        if text.starts_with('<') {
            SimpleClause::Variable(word)
        } else if text.starts_with('-') && !text.chars().all(|c| c == '-') {
            let mut remaining = word;
            let mut option = OptionSpec::parse_from_spec(self.source, &mut remaining, errors);
            if option.value.is_empty() {
                // `usage: prog -f` with `Options: -f <file>` means the usage
                // clause takes the file variable too.
                let known = self
                    .shortcut_options
                    .iter()
                    .find(|candidate| candidate.same_name(&option, self.source));
                if let Some(known) = known {
                    option.value = known.value;
                    option.separator = known.separator;
                    option.description = known.description;
                    option.default_value = known.default_value;
                    option.corresponding_long_name = known.corresponding_long_name;
                }
            }
            SimpleClause::Option(option)
        } else {
            // Bare words, and the `-`/`--` stand-ins.
            SimpleClause::Fixed(word)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn parse(source: &str) -> Usage {
        let mut errors = Vec::new();
        let usage = parse_usage(source, Span::new(0, source.len()), &[], &mut errors)
            .expect("usage parses");
        assert_eq!(errors, Vec::new());
        usage
    }

    fn expressions(usage: &Usage) -> &[Expression] {
        &usage
            .alternation
            .as_ref()
            .expect("alternation present")
            .branches[0]
            .expressions
    }

    #[test]
    fn plain_words_and_variables() {
        let source = "prog checkout <branch>";
        let usage = parse(source);
        assert_eq!(usage.prog_name.slice(source), "prog");
        assert!(usage.next.is_none());
        let expressions = expressions(&usage);
        assert_eq!(expressions.len(), 2);
        assert_matches!(
            &expressions[0].kind,
            ExpressionKind::Simple(SimpleClause::Fixed(word)) if word.slice(source) == "checkout"
        );
        assert_matches!(
            &expressions[1].kind,
            ExpressionKind::Simple(SimpleClause::Variable(word)) if word.slice(source) == "<branch>"
        );
    }

    #[test]
    fn glued_ellipsis() {
        let source = "prog <name>...";
        let usage = parse(source);
        let expressions = expressions(&usage);
        assert_eq!(expressions.len(), 1);
        assert!(expressions[0].ellipsis);
    }

    #[test]
    fn brackets_parens_and_alternation() {
        let source = "prog [-a] (go | stop)";
        let usage = parse(source);
        let expressions = expressions(&usage);
        assert_matches!(&expressions[0].kind, ExpressionKind::Bracketed(_));
        assert_matches!(
            &expressions[1].kind,
            ExpressionKind::Parenthesized(inner) if inner.branches.len() == 2
        );
    }

    #[test]
    fn options_shortcut() {
        let source = "prog [options] <file>";
        let usage = parse(source);
        let expressions = expressions(&usage);
        assert_matches!(&expressions[0].kind, ExpressionKind::OptionsShortcut);
        assert_matches!(
            &expressions[1].kind,
            ExpressionKind::Simple(SimpleClause::Variable(_))
        );
    }

    #[test]
    fn bracketed_word_is_not_the_shortcut() {
        let source = "prog [option]";
        let usage = parse(source);
        assert_matches!(
            &expressions(&usage)[0].kind,
            ExpressionKind::Bracketed(inner)
                if matches!(
                    &inner.branches[0].expressions[0].kind,
                    ExpressionKind::Simple(SimpleClause::Fixed(_))
                )
        );
    }

    #[test]
    fn usage_lines_chain() {
        let source = "prog go <speed>\nprog stop";
        let usage = parse(source);
        assert_eq!(usage.prog_name.slice(source), "prog");
        let next = usage.next.as_deref().expect("second usage");
        assert_eq!(next.prog_name.slice(source), "prog");
        assert!(next.next.is_none());
    }

    #[test]
    fn empty_section_is_the_terminal_sentinel() {
        let source = "  \n";
        let usage = parse(source);
        assert!(usage.prog_name.is_empty());
        assert!(usage.alternation.is_none());
    }

    #[test]
    fn dash_words_are_fixed_clauses() {
        let source = "prog [-] [--]";
        let usage = parse(source);
        for expression in expressions(&usage) {
            assert_matches!(
                &expression.kind,
                ExpressionKind::Bracketed(inner)
                    if matches!(
                        &inner.branches[0].expressions[0].kind,
                        ExpressionKind::Simple(SimpleClause::Fixed(_))
                    )
            );
        }
    }

    #[test]
    fn usage_option_adopts_the_options_section_variable() {
        // Both the usage line and the option spec live in one source string,
        // as they do in a real doc.
        let source = "prog -f\n-f <file>";
        let mut errors = Vec::new();
        let known = crate::doc::spec::parse_option_group(source, Span::new(8, 9), &mut errors);
        assert_eq!(errors, Vec::new());

        let mut parser = UsageParser {
            source,
            shortcut_options: &known,
            tokens: tokenize_line(source, Span::new(0, 7)),
            pos: 0,
        };
        let usage = parser.parse_usage_line(&mut errors).expect("parses");
        match &usage.alternation.as_ref().unwrap().branches[0].expressions[0].kind {
            ExpressionKind::Simple(SimpleClause::Option(option)) => {
                assert!(option.has_value());
                assert_eq!(option.value.slice(source), "<file>");
            }
            other => panic!("expected an option clause, got {other:?}"),
        }
    }

    #[test]
    fn unbalanced_group_is_malformed() {
        let source = "prog (go";
        let mut errors = Vec::new();
        let result = parse_usage(source, Span::new(0, source.len()), &[], &mut errors);
        assert_matches!(result, Err(DocError::MalformedUsage { .. }));
    }

    #[test]
    fn stray_closer_is_malformed() {
        let source = "prog go)";
        let mut errors = Vec::new();
        let result = parse_usage(source, Span::new(0, source.len()), &[], &mut errors);
        assert_matches!(result, Err(DocError::MalformedUsage { .. }));
    }

    #[test]
    fn clause_collection() {
        let source = "prog [-a] go <speed>\nprog stop";
        let usage = parse(source);
        let mut collector = ClauseCollector::default();
        usage.visit_clauses(&mut collector);
        assert_eq!(collector.options.len(), 1);
        assert_eq!(collector.fixed_words.len(), 2);
        assert_eq!(collector.variables.len(), 1);
    }
}
