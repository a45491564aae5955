//! The lexer: a hand-written state machine turning Hana source text into a
//! flat stream of [`Token`]s. See `SPEC_FULL.md` §4.1.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::OnceLock;

use ahash::AHashSet;

/// A `(line, column)` pair, 1-based. Hangul syllables (and every other code
/// point) count as a single column; only `\n` advances the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const START: Self = Self { line: 1, column: 1 };

    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The kind of a lexical token. See `SPEC_FULL.md` §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Number,
    String,
    Operator,
    Delimiter,
    Comment,
    /// A lexical error: unknown code point, unterminated string, or a
    /// mismatched/unbalanced delimiter. The lexeme carries a human-readable
    /// description of what went wrong.
    Error,
}

/// A single lexical token: its kind, its verbatim source lexeme, and the
/// position of its first character.
///
/// Invariant: every token corresponds to a contiguous, non-empty span of the
/// input (the lexeme), including the surrounding quotes of a string literal
/// and the leading `#` of a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub position: Position,
}

impl Token {
    fn new(kind: TokenKind, lexeme: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            position,
        }
    }
}

/// Reserved words that lex to [`TokenKind::Keyword`]. Matched by exact
/// string equality only; see `SPEC_FULL.md` §11 for why the union of
/// historical keyword spellings (`만약`/`만약에`) is kept rather than pruned.
const KEYWORDS: &[&str] = &[
    "함수", "만약에", "만약", "아니면", "동안에", "반환", "출력", "진실", "거짓", "널", "변수",
    "결과", "배열", "길이", "추가", "뽑기", "확장", "정렬", "딕셔너리", "키", "아이템", "랜덤",
    "절댓값", "최소값", "최대값",
];

/// Logical-connective words that lex to [`TokenKind::Operator`] rather than
/// [`TokenKind::Keyword`] (they behave like `&&`/`||`, not like statement
/// keywords).
const LOGICAL_OPERATORS: &[&str] = &["그리고", "이거나"];

fn keyword_set() -> &'static AHashSet<&'static str> {
    static SET: OnceLock<AHashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| KEYWORDS.iter().copied().collect())
}

fn logical_operator_set() -> &'static AHashSet<&'static str> {
    static SET: OnceLock<AHashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| LOGICAL_OPERATORS.iter().copied().collect())
}

fn classify_word(word: &str) -> TokenKind {
    if keyword_set().contains(word) {
        TokenKind::Keyword
    } else if logical_operator_set().contains(word) {
        TokenKind::Operator
    } else {
        TokenKind::Identifier
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic()
}

fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// The lexer-owned stack tracking unmatched opening delimiters, used purely
/// for balance checking; the parser never sees or manipulates it.
struct DelimiterStack {
    openers: Vec<(char, Position)>,
}

impl DelimiterStack {
    fn new() -> Self {
        Self {
            openers: Vec::new(),
        }
    }

    fn push(&mut self, opener: char, position: Position) {
        self.openers.push((opener, position));
    }

    /// Pops the matching opener for `closer`. A mismatch or a pop-on-empty
    /// leaves the stack in a defensively consistent state: a mismatched top
    /// is left untouched (skipped), an empty stack stays empty.
    fn pop_matching(&mut self, closer: char) -> Result<(), String> {
        let expected = match closer {
            ')' => '(',
            '}' => '{',
            ']' => '[',
            _ => unreachable!("pop_matching called with a non-closing delimiter"),
        };
        match self.openers.last() {
            Some((top, _)) if *top == expected => {
                self.openers.pop();
                Ok(())
            }
            Some((top, _)) => Err(format!(
                "mismatched delimiter: found '{closer}', expected closer for '{top}'"
            )),
            None => Err(format!(
                "unmatched delimiter: found '{closer}' with no open delimiter"
            )),
        }
    }

    fn is_empty(&self) -> bool {
        self.openers.is_empty()
    }
}

/// A source-position-tracking, delimiter-balance-tracking iterator over
/// [`Token`]s. Construct with [`Lexer::new`] and either iterate directly or
/// call [`Lexer::tokenize`] to materialize the whole stream at once (the
/// parser always wants the latter, since the pipeline is strictly staged —
/// see `SPEC_FULL.md` §2).
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    delimiters: DelimiterStack,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
            delimiters: DelimiterStack::new(),
        }
    }

    /// True iff every opened `( { [` in the input seen so far has been
    /// closed. Meaningful only after the stream has been fully drained.
    pub fn delimiters_balanced(&self) -> bool {
        self.delimiters.is_empty()
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn lex_number(&mut self, start: Position, first: char) -> Token {
        let mut lexeme = String::new();
        lexeme.push(first);
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                lexeme.push(c);
                self.advance();
            } else if c == '.' {
                // A single '.' is part of the number only if followed by
                // another digit; a run of two dots ('..') is not consumed.
                let mut lookahead = self.chars.clone();
                lookahead.next();
                if matches!(lookahead.peek(), Some(d) if d.is_ascii_digit()) {
                    lexeme.push(c);
                    self.advance();
                } else {
                    break;
                }
            } else {
                break;
            }
        }
        // Defensive rule for malformed source like `12abc`: a letter
        // immediately following digits with no separator reclassifies the
        // whole run as an identifier.
        if let Some(c) = self.peek_char() {
            if is_identifier_start(c) {
                while let Some(c) = self.peek_char() {
                    if is_identifier_continue(c) {
                        lexeme.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
                return Token::new(TokenKind::Identifier, lexeme, start);
            }
        }
        Token::new(TokenKind::Number, lexeme, start)
    }

    fn lex_identifier(&mut self, start: Position, first: char) -> Token {
        let mut lexeme = String::new();
        lexeme.push(first);
        while let Some(c) = self.peek_char() {
            if is_identifier_continue(c) {
                lexeme.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let kind = classify_word(&lexeme);
        Token::new(kind, lexeme, start)
    }

    fn lex_string(&mut self, start: Position) -> Token {
        let mut lexeme = String::from("\"");
        loop {
            match self.advance() {
                Some('"') => {
                    lexeme.push('"');
                    return Token::new(TokenKind::String, lexeme, start);
                }
                Some(c) => lexeme.push(c),
                None => {
                    return Token::new(TokenKind::Error, lexeme, start);
                }
            }
        }
    }

    fn lex_comment(&mut self, start: Position) -> Token {
        let mut lexeme = String::from("#");
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            lexeme.push(c);
            self.advance();
        }
        Token::new(TokenKind::Comment, lexeme, start)
    }

    fn lex_operator(&mut self, start: Position, first: char) -> Token {
        let mut lexeme = String::new();
        lexeme.push(first);
        if let Some(second) = self.peek_char() {
            let is_compound = matches!(
                (first, second),
                ('=', '=') | ('!', '=') | ('<', '=') | ('>', '=') | ('*', '*')
            );
            if is_compound {
                lexeme.push(second);
                self.advance();
            }
        }
        Token::new(TokenKind::Operator, lexeme, start)
    }

    fn lex_delimiter(&mut self, start: Position, c: char) -> Token {
        match c {
            '(' | '{' | '[' => self.delimiters.push(c, start),
            ')' | '}' | ']' => {
                if let Err(message) = self.delimiters.pop_matching(c) {
                    return Token::new(TokenKind::Error, message, start);
                }
            }
            _ => {}
        }
        Token::new(TokenKind::Delimiter, c.to_string(), start)
    }

    /// Produces the next token, or `None` at end-of-input. Whitespace is
    /// consumed silently; it never produces a token of its own.
    fn next_token(&mut self) -> Option<Token> {
        loop {
            let start = self.position();
            let c = self.advance()?;
            if c.is_whitespace() {
                continue;
            }
            return Some(match c {
                '0'..='9' => self.lex_number(start, c),
                '"' => self.lex_string(start),
                '#' => self.lex_comment(start),
                '+' | '-' | '*' | '=' | '!' | '<' | '>' | '%' | '/' => {
                    self.lex_operator(start, c)
                }
                '(' | ')' | '{' | '}' | '[' | ']' | ',' | ':' | '.' => {
                    self.lex_delimiter(start, c)
                }
                c if is_identifier_start(c) => self.lex_identifier(start, c),
                other => Token::new(
                    TokenKind::Error,
                    format!("unexpected character '{other}'"),
                    start,
                ),
            });
        }
    }

    /// Drains the entire input into an ordered token vector. This is what
    /// the parser always consumes — the pipeline has no reason to stream
    /// tokens one at a time across the stage boundary (`SPEC_FULL.md` §2).
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn reserved_words_are_keywords() {
        for kw in KEYWORDS {
            let tokens = Lexer::new(kw).tokenize();
            assert_eq!(tokens.len(), 1, "keyword {kw} should lex to one token");
            assert_eq!(tokens[0].kind, TokenKind::Keyword);
        }
    }

    #[test]
    fn logical_words_are_operators() {
        for op in LOGICAL_OPERATORS {
            let tokens = Lexer::new(op).tokenize();
            assert_eq!(tokens[0].kind, TokenKind::Operator);
        }
    }

    #[test]
    fn unknown_hangul_word_is_identifier() {
        let tokens = Lexer::new("나비").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme, "나비");
    }

    #[test]
    fn number_literal_with_decimal_point() {
        let tokens = Lexer::new("3.14").tokenize();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, "3.14");
    }

    #[test]
    fn double_dot_does_not_join_number() {
        let tokens = Lexer::new("1..2").tokenize();
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Number,
                TokenKind::Delimiter,
                TokenKind::Delimiter,
                TokenKind::Number
            ]
        );
    }

    #[test]
    fn malformed_number_reclassifies_as_identifier() {
        let tokens = Lexer::new("12abc").tokenize();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme, "12abc");
    }

    #[test]
    fn compound_operators() {
        for op in ["==", "!=", "<=", ">=", "**"] {
            let tokens = Lexer::new(op).tokenize();
            assert_eq!(tokens.len(), 1, "{op} should be a single token");
            assert_eq!(tokens[0].lexeme, op);
        }
    }

    #[test]
    fn single_char_operator_not_joined_with_unrelated_next_char() {
        let tokens = Lexer::new("+1").tokenize();
        assert_eq!(tokens[0].lexeme, "+");
        assert_eq!(tokens[0].kind, TokenKind::Operator);
    }

    #[test]
    fn unterminated_string_emits_error_token() {
        let tokens = Lexer::new("\"hello").tokenize();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert!(tokens[0].lexeme.starts_with('"'));
    }

    #[test]
    fn comment_runs_to_end_of_line_exclusive() {
        let tokens = Lexer::new("# hi\n출력").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[0].lexeme, "# hi");
        assert_eq!(tokens[1].kind, TokenKind::Keyword);
    }

    #[test]
    fn balanced_delimiters_leave_empty_stack() {
        let mut lexer = Lexer::new("(({}[]))");
        let mut saw_error = false;
        while let Some(token) = lexer.next_token() {
            saw_error |= token.kind == TokenKind::Error;
        }
        assert!(!saw_error);
        assert!(lexer.delimiters_balanced());
    }

    #[test]
    fn mismatched_delimiter_emits_error_token() {
        let tokens = Lexer::new("(]").tokenize();
        assert_eq!(tokens[1].kind, TokenKind::Error);
    }

    #[test]
    fn pop_on_empty_emits_error_and_stays_recoverable() {
        let tokens = Lexer::new(")()").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[1].kind, TokenKind::Delimiter);
        assert_eq!(tokens[2].kind, TokenKind::Delimiter);
    }

    #[test]
    fn position_tracks_lines_and_columns() {
        let tokens = Lexer::new("a\nb").tokenize();
        assert_eq!(tokens[0].position, Position::new(1, 1));
        assert_eq!(tokens[1].position, Position::new(2, 1));
    }

    #[test]
    fn idempotent_round_trip_under_single_space_join() {
        let source = "만약에 x < 5 { 출력 ( x ) }";
        let strip_comments = |ks: Vec<TokenKind>| -> Vec<TokenKind> {
            ks.into_iter().filter(|k| *k != TokenKind::Comment).collect()
        };
        let first = strip_comments(kinds(source));
        let joined: Vec<String> = Lexer::new(source)
            .tokenize()
            .into_iter()
            .filter(|t| t.kind != TokenKind::Comment)
            .map(|t| t.lexeme)
            .collect();
        let rejoined = joined.join(" ");
        let second = strip_comments(kinds(&rejoined));
        assert_eq!(first, second);
    }
}
