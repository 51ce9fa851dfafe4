use super::{BreakpointIdentity, Command, FrameCommand};
use chumsky::error::Rich;
use chumsky::prelude::{any, choice, end, just};
use chumsky::text::Char;
use chumsky::{extra, text, Boxed, Parser};
use std::fmt::Display;
use std::str::FromStr;

pub const CONTINUE_COMMAND: &str = "continue";
pub const CONTINUE_COMMAND_SHORT: &str = "c";
pub const NEXT_COMMAND: &str = "next";
pub const NEXT_COMMAND_SHORT: &str = "n";
pub const STEP_COMMAND: &str = "step";
pub const STEP_COMMAND_SHORT: &str = "s";
pub const STEP_OUT_COMMAND: &str = "stepout";
pub const STEP_OUT_COMMAND_SHORT: &str = "so";
pub const RESTART_COMMAND: &str = "restart";
pub const RESTART_COMMAND_SHORT: &str = "r";
pub const BREAK_COMMAND: &str = "break";
pub const BREAK_COMMAND_SHORT: &str = "b";
pub const CLEAR_COMMAND: &str = "clear";
pub const THREAD_COMMAND: &str = "thread";
pub const THREAD_COMMAND_SHORT: &str = "tr";
pub const GOROUTINE_COMMAND: &str = "goroutine";
pub const GOROUTINE_COMMAND_SHORT: &str = "gr";
pub const FRAME_COMMAND: &str = "frame";
pub const UP_COMMAND: &str = "up";
pub const DOWN_COMMAND: &str = "down";
pub const PRINT_COMMAND: &str = "print";
pub const PRINT_COMMAND_SHORT: &str = "p";
pub const DISPLAY_COMMAND: &str = "display";
pub const UNDISPLAY_COMMAND: &str = "undisplay";
pub const HELP_COMMAND: &str = "help";
pub const HELP_COMMAND_SHORT: &str = "h";
pub const EXIT_COMMAND: &str = "exit";
pub const EXIT_COMMAND_ALIAS: &str = "quit";
pub const EXIT_COMMAND_SHORT: &str = "q";

type Err<'a> = extra::Err<Rich<'a, char>>;

pub fn brkpt_at_line_parser<'a>() -> impl Parser<'a, &'a str, BreakpointIdentity, Err<'a>> {
    any()
        .filter(|c: &char| c.to_char() != ':')
        .repeated()
        .at_least(1)
        .to_slice()
        .then_ignore(just(':'))
        .then(integer())
        .map(|(file, line): (&str, usize)| BreakpointIdentity::Line(file.trim().to_string(), line))
        .padded()
}

pub fn brkpt_at_fn<'a>() -> impl Parser<'a, &'a str, BreakpointIdentity, Err<'a>> {
    any()
        .filter(|c: &char| !c.is_whitespace())
        .repeated()
        .at_least(1)
        .to_slice()
        .map(|fn_name: &str| BreakpointIdentity::Function(fn_name.to_string()))
        .padded()
}

/// Rest of the line as a non empty expression.
fn expression<'a>() -> impl Parser<'a, &'a str, String, Err<'a>> + Clone {
    any()
        .repeated()
        .at_least(1)
        .to_slice()
        .map(|s: &str| s.trim().to_string())
        .filter(|s: &String| !s.is_empty())
        .labelled("expression")
}

/// Decimal integer, out of range values are a parse error.
fn integer<'a, T>() -> impl Parser<'a, &'a str, T, Err<'a>> + Clone
where
    T: FromStr,
    T::Err: Display,
{
    text::int(10).try_map(|s: &str, span| s.parse().map_err(|e| Rich::custom(span, e)))
}

fn number<'a>() -> impl Parser<'a, &'a str, i64, Err<'a>> + Clone {
    integer().padded().labelled("number")
}

fn index<'a>() -> impl Parser<'a, &'a str, usize, Err<'a>> + Clone {
    integer().padded().labelled("number")
}

fn command<'a, I>(ctx: &'static str, inner: I) -> Boxed<'a, 'a, &'a str, Command, Err<'a>>
where
    I: Parser<'a, &'a str, Command, Err<'a>> + 'a,
{
    inner.then_ignore(end()).labelled(ctx).boxed()
}

impl Command {
    /// Parse input string into command.
    pub fn parse(input: &str) -> Result<Command, String> {
        Self::parser()
            .parse(input)
            .into_result()
            .map_err(|e| e[0].to_string())
    }

    fn parser<'a>() -> impl Parser<'a, &'a str, Command, Err<'a>> {
        // keyword followed by a separator or the end of input
        let op = |sym| {
            just(sym)
                .then_ignore(text::whitespace().at_least(1).or(end()))
                .padded()
        };
        let op2 = |full, short| op(full).or(op(short));

        let r#continue = op2(CONTINUE_COMMAND, CONTINUE_COMMAND_SHORT).to(Command::Continue);
        let next = op2(NEXT_COMMAND, NEXT_COMMAND_SHORT).to(Command::Next);
        let step = op2(STEP_COMMAND, STEP_COMMAND_SHORT).to(Command::Step);
        let step_out = op2(STEP_OUT_COMMAND, STEP_OUT_COMMAND_SHORT).to(Command::StepOut);
        let restart = op2(RESTART_COMMAND, RESTART_COMMAND_SHORT).to(Command::Restart);
        let exit = choice((
            op(EXIT_COMMAND),
            op(EXIT_COMMAND_ALIAS),
            op(EXIT_COMMAND_SHORT),
        ))
        .to(Command::Exit);

        let r#break = op2(BREAK_COMMAND, BREAK_COMMAND_SHORT)
            .ignore_then(choice((brkpt_at_line_parser(), brkpt_at_fn())))
            .map(Command::Break)
            .boxed();

        let clear = op(CLEAR_COMMAND).ignore_then(number()).map(Command::Clear);
        let thread = op2(THREAD_COMMAND, THREAD_COMMAND_SHORT)
            .ignore_then(number())
            .map(Command::Thread);
        let goroutine = op2(GOROUTINE_COMMAND, GOROUTINE_COMMAND_SHORT)
            .ignore_then(number())
            .map(Command::Goroutine);

        let frame = choice((
            op(FRAME_COMMAND)
                .ignore_then(index())
                .map(|num| Command::Frame(FrameCommand::Switch(num))),
            op(UP_COMMAND).to(Command::Frame(FrameCommand::Up)),
            op(DOWN_COMMAND).to(Command::Frame(FrameCommand::Down)),
        ))
        .boxed();

        let print = op2(PRINT_COMMAND, PRINT_COMMAND_SHORT)
            .ignore_then(expression())
            .map(Command::Print);
        let display = op(DISPLAY_COMMAND)
            .ignore_then(expression())
            .map(Command::Display);
        let undisplay = op(UNDISPLAY_COMMAND)
            .ignore_then(index())
            .map(Command::Undisplay);

        let help = op2(HELP_COMMAND, HELP_COMMAND_SHORT)
            .ignore_then(text::ident().padded().or_not())
            .map(|s: Option<&str>| Command::Help(s.map(ToOwned::to_owned)))
            .boxed();

        choice((
            command(CONTINUE_COMMAND, r#continue),
            command(NEXT_COMMAND, next),
            command(STEP_OUT_COMMAND, step_out),
            command(STEP_COMMAND, step),
            command(RESTART_COMMAND, restart),
            command(BREAK_COMMAND, r#break),
            command(CLEAR_COMMAND, clear),
            command(THREAD_COMMAND, thread),
            command(GOROUTINE_COMMAND, goroutine),
            command(FRAME_COMMAND, frame),
            command(PRINT_COMMAND, print),
            command(DISPLAY_COMMAND, display),
            command(UNDISPLAY_COMMAND, undisplay),
            command(HELP_COMMAND, help),
            command(EXIT_COMMAND, exit),
        ))
        .map_err(|e| {
            let span = e.span();
            if span.start == 0 && span.end == 0 {
                Rich::custom(*e.span(), "type help for list of commands")
            } else {
                e
            }
        })
    }
}
