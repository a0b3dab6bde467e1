#![allow(clippy::module_name_repetitions)]

//! Lexer and parser for the serial line protocol.
//!
//! The lexer uses `winnow` string combinators to produce a bounded token
//! stream, while the parser composes `winnow` parsers over those tokens,
//! guided by the [`catalog`] table, to build [`Command`] values.

use core::fmt;
use core::ops::Range;

use heapless::Vec as HeaplessVec;
use winnow::ascii::{digit1, space0};
use winnow::combinator::{alt, opt};
use winnow::error::{ErrMode, ModalResult, ParserError};
use winnow::prelude::*;
use winnow::stream::Stream;
use winnow::token::{any, one_of, take_while};

use super::catalog::{self, CommandTag, Node, SubcommandBranch, SubcommandTag};

/// Maximum number of tokens produced per line.
pub const MAX_TOKENS: usize = 48;

/// Most integer fields any command accepts.
pub const MAX_FIELDS: usize = 6;

/// Lexical token kinds recognized by the protocol grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// Keyword such as `SET_PULSE` or `FIRE`.
    Ident,
    /// Decimal integer with an optional sign.
    Integer,
    Comma,
    /// `\r` or `\n`.
    Eol,
    /// Any other character.
    Error,
}

/// Token emitted by the lexer with a byte span back into the source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub span: Range<usize>,
}

/// Bounded token buffer to avoid dynamic allocation in `no_std` environments.
pub type TokenBuffer<'a> = HeaplessVec<Token<'a>, MAX_TOKENS>;

/// Integer fields captured by `SET_PULSE` and `SET_PREHEAT`.
pub type FieldList = HeaplessVec<i32, MAX_FIELDS>;

/// Lexer errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LexError {
    /// The token rules failed to match non-empty input.
    Engine { offset: usize },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::Engine { offset } => write!(f, "lexer stalled at byte {offset}"),
        }
    }
}

/// Grammar errors emitted by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrammarErrorKind<'a> {
    UnexpectedToken {
        expected: &'static str,
        found: Option<TokenKind>,
        span: Range<usize>,
    },
    UnexpectedEnd {
        expected: &'static str,
    },
    UnknownCommand {
        lexeme: &'a str,
        span: Range<usize>,
    },
    TooFewFields {
        command: CommandTag,
        found: usize,
        required: usize,
    },
    InvalidToken {
        lexeme: &'a str,
        span: Range<usize>,
    },
}

impl fmt::Display for GrammarErrorKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarErrorKind::UnexpectedToken {
                expected,
                found,
                span,
            } => write!(f, "expected {expected}, found {found:?} at {span:?}"),
            GrammarErrorKind::UnexpectedEnd { expected } => {
                write!(f, "unexpected end of input, expected {expected}")
            }
            GrammarErrorKind::UnknownCommand { lexeme, span } => {
                write!(f, "unknown command `{lexeme}` at {span:?}")
            }
            GrammarErrorKind::TooFewFields {
                command,
                found,
                required,
            } => write!(
                f,
                "{command:?} needs {required} fields, {found} parsed"
            ),
            GrammarErrorKind::InvalidToken { lexeme, span } => {
                write!(f, "unsupported token `{lexeme}` at {span:?}")
            }
        }
    }
}

/// Wrapper type enabling a consistent error surface for consumers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrammarError<'a> {
    pub kind: GrammarErrorKind<'a>,
}

impl fmt::Display for GrammarError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl<'a> GrammarError<'a> {
    fn unexpected(expected: &'static str, token: Option<&Token<'a>>) -> Self {
        GrammarError {
            kind: match token {
                Some(tok) if tok.kind == TokenKind::Error => GrammarErrorKind::InvalidToken {
                    lexeme: tok.lexeme,
                    span: tok.span.clone(),
                },
                Some(tok) => GrammarErrorKind::UnexpectedToken {
                    expected,
                    found: Some(tok.kind),
                    span: tok.span.clone(),
                },
                None => GrammarErrorKind::UnexpectedEnd { expected },
            },
        }
    }

    fn unknown_command(token: &Token<'a>) -> Self {
        GrammarError {
            kind: GrammarErrorKind::UnknownCommand {
                lexeme: token.lexeme,
                span: token.span.clone(),
            },
        }
    }

    fn too_few_fields(command: CommandTag, found: usize, required: usize) -> Self {
        GrammarError {
            kind: GrammarErrorKind::TooFewFields {
                command,
                found,
                required,
            },
        }
    }
}

type Input<'src, 'slice> = &'slice [Token<'src>];

impl<'src, 'slice> ParserError<Input<'src, 'slice>> for GrammarError<'src>
where
    'src: 'slice,
{
    type Inner = Self;

    fn from_input(input: &Input<'src, 'slice>) -> Self {
        GrammarError::unexpected("token", input.first())
    }

    fn into_inner(self) -> Result<Self::Inner, Self> {
        Ok(self)
    }
}

/// Combined lex/parse error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError<'a> {
    Lex(LexError),
    Grammar(GrammarError<'a>),
}

impl ParseError<'_> {
    /// Command whose field count fell short, if that is why parsing failed.
    #[must_use]
    pub fn short_command(&self) -> Option<CommandTag> {
        match self {
            ParseError::Grammar(GrammarError {
                kind: GrammarErrorKind::TooFewFields { command, .. },
            }) => Some(*command),
            _ => None,
        }
    }
}

impl fmt::Display for ParseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(err) => err.fmt(f),
            ParseError::Grammar(err) => err.fmt(f),
        }
    }
}

/// Structured commands produced by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `ARM,<v>`; only `1` arms.
    Arm(i32),
    /// `SET_PULSE` fields in order: mode, d1, gap1, d2, gap2, d3.
    SetPulse(FieldList),
    SetPower(i32),
    /// `SET_PREHEAT` fields in order: en, ms, pct, gap.
    SetPreheat(FieldList),
    Fire,
    Enable,
    Disable,
    Status,
    /// `CMD,SET,PULSE,<d1>`, range-checked.
    SetPulseChecked(i32),
    /// `CMD,SET,POWER,<pct>`, range-checked.
    SetPowerChecked(i32),
}

/// Tokenize the provided line.
///
/// Lexing stops once [`MAX_TOKENS`] tokens are buffered. Every command fits in
/// far fewer, so the dropped tail is trailing text the parser would ignore or
/// reject anyway.
pub fn lex(line: &str) -> Result<TokenBuffer<'_>, LexError> {
    let mut input = line;
    let mut buffer = TokenBuffer::new();

    while !buffer.is_full() {
        let _ = blanks(&mut input);
        if input.is_empty() {
            break;
        }

        let (kind, lexeme) = token(&mut input).map_err(|_| LexError::Engine {
            offset: line.len() - input.len(),
        })?;
        let end = line.len() - input.len();
        let span = end - lexeme.len()..end;

        let _ = buffer.push(Token { kind, lexeme, span });
    }

    Ok(buffer)
}

fn blanks<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    space0.parse_next(input)
}

fn token<'a>(input: &mut &'a str) -> ModalResult<(TokenKind, &'a str)> {
    alt((
        (opt(one_of(['+', '-'])), digit1).value(TokenKind::Integer),
        (
            one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
            take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
        )
            .value(TokenKind::Ident),
        ','.value(TokenKind::Comma),
        one_of(['\r', '\n']).value(TokenKind::Eol),
        any.value(TokenKind::Error),
    ))
    .with_taken()
    .parse_next(input)
}

/// Parse a protocol command from the provided line.
pub fn parse(line: &str) -> Result<Command, ParseError<'_>> {
    let tokens = lex(line).map_err(ParseError::Lex)?;
    let mut input = tokens.as_slice();

    match command().parse_next(&mut input) {
        Ok(command) => Ok(command),
        Err(ErrMode::Backtrack(err) | ErrMode::Cut(err)) => Err(ParseError::Grammar(err)),
        Err(ErrMode::Incomplete(_)) => Err(ParseError::Grammar(GrammarError::unexpected(
            "token",
            input.first(),
        ))),
    }
}

fn command<'src, 'slice>()
-> impl Parser<Input<'src, 'slice>, Command, ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    move |input: &mut Input<'src, 'slice>| {
        let keyword = expect_kind(TokenKind::Ident, "command keyword").parse_next(input)?;

        match catalog::find(keyword.lexeme) {
            Some(spec) => {
                let mut state = CommandState::new(spec.tag);
                parse_node(spec.grammar, input, &mut state, keyword.span.end)?;
                state.finish()
            }
            None => Err(ErrMode::Backtrack(GrammarError::unknown_command(&keyword))),
        }
    }
}

/// `keyword_end` is the byte offset just past the keyword that led to `node`.
fn parse_node<'src, 'slice>(
    node: &'static Node,
    input: &mut Input<'src, 'slice>,
    state: &mut CommandState,
    keyword_end: usize,
) -> ModalResult<(), GrammarError<'src>>
where
    'src: 'slice,
{
    match node {
        Node::End => parse_end(input),
        Node::Value => {
            let value = parse_value(input)?;
            state.set_value(value);
            Ok(())
        }
        Node::Fields { required, max } => {
            let fields = parse_fields(input, *max)?;
            if fields.len() < *required {
                return Err(ErrMode::Cut(GrammarError::too_few_fields(
                    state.tag(),
                    fields.len(),
                    *required,
                )));
            }
            state.set_fields(fields);
            Ok(())
        }
        Node::Subcommands(branches) => parse_subcommands(input, branches, state, keyword_end),
    }
}

fn parse_end<'src, 'slice>(input: &mut Input<'src, 'slice>) -> ModalResult<(), GrammarError<'src>>
where
    'src: 'slice,
{
    while let Some((token, rest)) = input.split_first() {
        if token.kind != TokenKind::Eol {
            return Err(ErrMode::Backtrack(GrammarError::unexpected(
                "end of command",
                Some(token),
            )));
        }
        *input = rest;
    }
    Ok(())
}

/// `,<int>` with a missing value reading as zero. The rest of the line is ignored.
fn parse_value<'src, 'slice>(input: &mut Input<'src, 'slice>) -> ModalResult<i32, GrammarError<'src>>
where
    'src: 'slice,
{
    expect_kind(TokenKind::Comma, ",").parse_next(input)?;
    let value = opt(expect_kind(TokenKind::Integer, "integer"))
        .parse_next(input)?
        .map_or(0, |token| integer_value(&token));
    let _ = input.finish();
    Ok(value)
}

/// `,<int>{,<int>}` stopping at the first field that does not parse.
fn parse_fields<'src, 'slice>(
    input: &mut Input<'src, 'slice>,
    max: usize,
) -> ModalResult<FieldList, GrammarError<'src>>
where
    'src: 'slice,
{
    expect_kind(TokenKind::Comma, ",").parse_next(input)?;

    let mut fields = FieldList::new();
    while fields.len() < max.min(MAX_FIELDS) {
        let Some(token) = opt(expect_kind(TokenKind::Integer, "integer")).parse_next(input)? else {
            break;
        };
        let _ = fields.push(integer_value(&token));

        if fields.len() == max
            || opt(expect_kind(TokenKind::Comma, ","))
                .parse_next(input)?
                .is_none()
        {
            break;
        }
    }

    let _ = input.finish();
    Ok(fields)
}

/// `,<KEYWORD>` written tight against the preceding keyword, as in `CMD,FIRE`.
fn parse_subcommands<'src, 'slice>(
    input: &mut Input<'src, 'slice>,
    branches: &'static [SubcommandBranch],
    state: &mut CommandState,
    keyword_end: usize,
) -> ModalResult<(), GrammarError<'src>>
where
    'src: 'slice,
{
    let label = branches.first().map_or("subcommand", |branch| branch.name);

    let comma = expect_kind(TokenKind::Comma, ",").parse_next(input)?;
    if comma.span.start != keyword_end {
        return Err(ErrMode::Backtrack(GrammarError::unexpected(",", Some(&comma))));
    }
    let keyword = expect_kind(TokenKind::Ident, label).parse_next(input)?;
    if keyword.span.start != comma.span.end {
        return Err(ErrMode::Backtrack(GrammarError::unexpected(
            label,
            Some(&keyword),
        )));
    }

    match branches.iter().find(|branch| branch.name == keyword.lexeme) {
        Some(branch) => {
            state.set_subcommand(branch.tag);
            parse_node(branch.grammar, input, state, keyword.span.end)
        }
        None => Err(ErrMode::Backtrack(GrammarError::unexpected(
            label,
            Some(&keyword),
        ))),
    }
}

enum CommandState {
    Arm {
        value: Option<i32>,
    },
    SetPulse {
        fields: FieldList,
    },
    SetPower {
        value: Option<i32>,
    },
    SetPreheat {
        fields: FieldList,
    },
    Cmd {
        subcommand: Option<SubcommandTag>,
        setting: Option<SubcommandTag>,
        value: Option<i32>,
    },
    Status,
}

impl CommandState {
    fn new(tag: CommandTag) -> Self {
        match tag {
            CommandTag::Arm => CommandState::Arm { value: None },
            CommandTag::SetPulse => CommandState::SetPulse {
                fields: FieldList::new(),
            },
            CommandTag::SetPower => CommandState::SetPower { value: None },
            CommandTag::SetPreheat => CommandState::SetPreheat {
                fields: FieldList::new(),
            },
            CommandTag::Cmd => CommandState::Cmd {
                subcommand: None,
                setting: None,
                value: None,
            },
            CommandTag::Status => CommandState::Status,
        }
    }

    fn tag(&self) -> CommandTag {
        match self {
            CommandState::Arm { .. } => CommandTag::Arm,
            CommandState::SetPulse { .. } => CommandTag::SetPulse,
            CommandState::SetPower { .. } => CommandTag::SetPower,
            CommandState::SetPreheat { .. } => CommandTag::SetPreheat,
            CommandState::Cmd { .. } => CommandTag::Cmd,
            CommandState::Status => CommandTag::Status,
        }
    }

    fn set_value(&mut self, parsed: i32) {
        match self {
            CommandState::Arm { value }
            | CommandState::SetPower { value }
            | CommandState::Cmd { value, .. } => *value = Some(parsed),
            CommandState::SetPulse { .. }
            | CommandState::SetPreheat { .. }
            | CommandState::Status => {}
        }
    }

    fn set_fields(&mut self, parsed: FieldList) {
        if let CommandState::SetPulse { fields } | CommandState::SetPreheat { fields } = self {
            *fields = parsed;
        }
    }

    fn set_subcommand(&mut self, tag: SubcommandTag) {
        if let CommandState::Cmd {
            subcommand,
            setting,
            ..
        } = self
        {
            if subcommand.is_none() {
                *subcommand = Some(tag);
            } else {
                *setting = Some(tag);
            }
        }
    }

    fn finish<'src>(self) -> ModalResult<Command, GrammarError<'src>> {
        let command = match self {
            CommandState::Arm { value: Some(value) } => Command::Arm(value),
            CommandState::SetPulse { fields } => Command::SetPulse(fields),
            CommandState::SetPower { value: Some(value) } => Command::SetPower(value),
            CommandState::SetPreheat { fields } => Command::SetPreheat(fields),
            CommandState::Status => Command::Status,
            CommandState::Cmd {
                subcommand: Some(subcommand),
                setting,
                value,
            } => match (subcommand, setting, value) {
                (SubcommandTag::Fire, None, None) => Command::Fire,
                (SubcommandTag::Enable, None, None) => Command::Enable,
                (SubcommandTag::Disable, None, None) => Command::Disable,
                (SubcommandTag::Status, None, None) => Command::Status,
                (SubcommandTag::Set, Some(SubcommandTag::Pulse), Some(value)) => {
                    Command::SetPulseChecked(value)
                }
                (SubcommandTag::Set, Some(SubcommandTag::Power), Some(value)) => {
                    Command::SetPowerChecked(value)
                }
                _ => {
                    return Err(ErrMode::Backtrack(GrammarError::unexpected(
                        "CMD argument",
                        None,
                    )));
                }
            },
            CommandState::Arm { value: None }
            | CommandState::SetPower { value: None }
            | CommandState::Cmd {
                subcommand: None, ..
            } => {
                return Err(ErrMode::Backtrack(GrammarError::unexpected(
                    "command argument",
                    None,
                )));
            }
        };
        Ok(command)
    }
}

fn expect_kind<'src, 'slice>(
    kind: TokenKind,
    label: &'static str,
) -> impl Parser<Input<'src, 'slice>, Token<'src>, ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    move |input: &mut Input<'src, 'slice>| match input.split_first() {
        Some((token, rest)) if token.kind == kind => {
            *input = rest;
            Ok(token.clone())
        }
        Some((token, _)) => Err(ErrMode::Backtrack(GrammarError::unexpected(
            label,
            Some(token),
        ))),
        None => Err(ErrMode::Backtrack(GrammarError::unexpected(label, None))),
    }
}

/// Integer value of a token, saturating at the `i32` bounds.
fn integer_value(token: &Token<'_>) -> i32 {
    token.lexeme.parse::<i32>().unwrap_or_else(|_| {
        if token.lexeme.starts_with('-') {
            i32::MIN
        } else {
            i32::MAX
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> Command {
        parse(input).expect("command should parse")
    }

    fn fields(values: &[i32]) -> FieldList {
        FieldList::from_slice(values).unwrap()
    }

    #[test]
    fn lexer_splits_keywords_integers_and_commas() {
        let tokens = lex("SET_POWER, -75\r\n").expect("lexing should succeed");
        let kinds: HeaplessVec<TokenKind, 8> = tokens.iter().map(|token| token.kind).collect();
        assert_eq!(
            kinds.as_slice(),
            &[
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::Integer,
                TokenKind::Eol,
                TokenKind::Eol
            ]
        );
        assert_eq!(tokens[2].lexeme, "-75");
        assert_eq!(tokens[2].span, 11..14);
    }

    #[test]
    fn lexer_emits_error_token_for_unknown_symbol() {
        let tokens = lex("STATUS$").expect("lexing should succeed");
        let last = tokens.last().expect("expected at least one token");
        assert_eq!(last.kind, TokenKind::Error);
        assert_eq!(last.lexeme, "$");
    }

    #[test]
    fn lexer_keeps_leading_tokens_of_a_long_line() {
        let mut line = heapless::String::<128>::new();
        for _ in 0..MAX_TOKENS {
            line.push_str("1,").unwrap();
        }
        let tokens = lex(&line).expect("long lines still lex");
        assert_eq!(tokens.len(), MAX_TOKENS);
        assert_eq!(tokens[MAX_TOKENS - 1].span, 47..48);
    }

    #[test]
    fn long_trailing_text_does_not_hide_a_valid_command() {
        let mut line = heapless::String::<128>::new();
        line.push_str("SET_PULSE,2,20,5,30,0,0").unwrap();
        for _ in 0..30 {
            line.push_str(",0").unwrap();
        }
        assert_eq!(
            parse_ok(&line),
            Command::SetPulse(fields(&[2, 20, 5, 30, 0, 0]))
        );

        let mut line = heapless::String::<128>::new();
        line.push_str("ARM,1").unwrap();
        for _ in 0..50 {
            line.push_str(" 1").unwrap();
        }
        assert_eq!(parse_ok(&line), Command::Arm(1));
    }

    #[test]
    fn parses_arm_values_like_atoi() {
        assert_eq!(parse_ok("ARM,1"), Command::Arm(1));
        assert_eq!(parse_ok("ARM,0"), Command::Arm(0));
        assert_eq!(parse_ok("ARM,"), Command::Arm(0));
        assert_eq!(parse_ok("ARM,abc"), Command::Arm(0));
        assert_eq!(parse_ok("ARM,1xyz"), Command::Arm(1));
        assert_eq!(parse_ok("ARM, 1"), Command::Arm(1));
    }

    #[test]
    fn argument_keywords_require_a_comma() {
        assert!(parse("ARM").is_err());
        assert!(parse("ARM 1").is_err());
        assert!(parse("SET_POWER").is_err());
    }

    #[test]
    fn parses_set_pulse_fields() {
        assert_eq!(
            parse_ok("SET_PULSE,2,20,5,30,0,0"),
            Command::SetPulse(fields(&[2, 20, 5, 30, 0, 0]))
        );
        assert_eq!(parse_ok("SET_PULSE,1,15"), Command::SetPulse(fields(&[1, 15])));
        assert_eq!(
            parse_ok("SET_PULSE,1,15,x,9"),
            Command::SetPulse(fields(&[1, 15]))
        );
        assert_eq!(
            parse_ok("SET_PULSE,1,2,3,4,5,6,7"),
            Command::SetPulse(fields(&[1, 2, 3, 4, 5, 6]))
        );
    }

    #[test]
    fn short_field_lists_are_reported_per_command() {
        let err = parse("SET_PULSE,2").unwrap_err();
        assert_eq!(err.short_command(), Some(CommandTag::SetPulse));
        let err = parse("SET_PULSE,").unwrap_err();
        assert_eq!(err.short_command(), Some(CommandTag::SetPulse));
        let err = parse("SET_PREHEAT,1,2").unwrap_err();
        assert_eq!(err.short_command(), Some(CommandTag::SetPreheat));
        assert!(matches!(
            err,
            ParseError::Grammar(GrammarError {
                kind: GrammarErrorKind::TooFewFields {
                    found: 2,
                    required: 3,
                    ..
                }
            })
        ));
    }

    #[test]
    fn parses_set_preheat_with_optional_gap() {
        assert_eq!(
            parse_ok("SET_PREHEAT,1,20,30"),
            Command::SetPreheat(fields(&[1, 20, 30]))
        );
        assert_eq!(
            parse_ok("SET_PREHEAT,1,20,30,4"),
            Command::SetPreheat(fields(&[1, 20, 30, 4]))
        );
    }

    #[test]
    fn parses_cmd_subcommands() {
        assert_eq!(parse_ok("CMD,FIRE"), Command::Fire);
        assert_eq!(parse_ok("CMD,ENABLE"), Command::Enable);
        assert_eq!(parse_ok("CMD,DISABLE\r\n"), Command::Disable);
        assert_eq!(parse_ok("CMD,STATUS"), Command::Status);
        assert_eq!(parse_ok("STATUS"), Command::Status);
        assert_eq!(parse_ok("CMD,SET,PULSE,25"), Command::SetPulseChecked(25));
        assert_eq!(parse_ok("CMD,SET,POWER,80"), Command::SetPowerChecked(80));
        assert_eq!(parse_ok("CMD,SET,PULSE,"), Command::SetPulseChecked(0));
    }

    #[test]
    fn exact_commands_reject_trailing_text() {
        assert!(parse("CMD,FIRE,NOW").is_err());
        assert!(parse("STATUS,1").is_err());
        assert!(matches!(
            parse("STATUS$"),
            Err(ParseError::Grammar(GrammarError {
                kind: GrammarErrorKind::InvalidToken { lexeme: "$", .. }
            }))
        ));
    }

    #[test]
    fn subcommand_keywords_must_be_written_tight() {
        for line in ["CMD , FIRE", "CMD ,FIRE", "CMD,  FIRE", "CMD, FIRE", "CMD,SET, PULSE,10"] {
            assert!(
                matches!(
                    parse(line),
                    Err(ParseError::Grammar(GrammarError {
                        kind: GrammarErrorKind::UnexpectedToken { .. }
                    }))
                ),
                "line {line:?}"
            );
        }
        assert_eq!(parse_ok("CMD,FIRE  "), Command::Fire);
        assert_eq!(parse_ok("CMD,SET,PULSE, 10"), Command::SetPulseChecked(10));
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert!(matches!(
            parse("status"),
            Err(ParseError::Grammar(GrammarError {
                kind: GrammarErrorKind::UnknownCommand {
                    lexeme: "status",
                    ..
                }
            }))
        ));
        assert!(parse("CMD,fire").is_err());
        assert!(parse("CMD,SET,pulse,10").is_err());
    }

    #[test]
    fn empty_and_incomplete_lines_fail() {
        assert!(parse("").is_err());
        assert!(parse("CMD").is_err());
        assert!(parse("CMD,").is_err());
        assert!(parse("CMD,SET").is_err());
        assert!(parse(",ARM,1").is_err());
    }

    #[test]
    fn oversized_integers_saturate() {
        assert_eq!(parse_ok("SET_POWER,99999999999"), Command::SetPower(i32::MAX));
        assert_eq!(parse_ok("SET_POWER,-99999999999"), Command::SetPower(i32::MIN));
    }
}
