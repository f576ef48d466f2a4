// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

//! Incremental command-line parser
//!
//! Input bytes are [fed](Parser::feed) to the parser as they arrive;
//! [`pop_next`](Parser::pop_next) yields one [`CommandLine`] per complete
//! line. A line is complete at the first newline that is not escaped and
//! not inside quotes, so a quoted newline or a `\` continuation keeps the
//! parser waiting for more input. Bytes that never form a complete line are
//! silently discarded when the parser is dropped at end of input.
//!
//! Word rules: whitespace separates words; single quotes are literal;
//! double quotes are literal except for `\"` and `\\`; a backslash outside
//! quotes escapes the next byte; `#` at the start of a word comments out
//! the rest of the line. There is no globbing and no expansion.

use crate::syntax::{Command, CommandLine, Expr, Output};
use thiserror::Error;

/// Reason a command line was rejected
///
/// The offending line is consumed; parsing continues with the next line.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum ParseError {
    #[error("syntax error: redirection without a file name")]
    MissingRedirectTarget,

    #[error("syntax error: `&` must end the command line")]
    BackgroundNotLast,
}

/// Splits a byte stream into command lines.
#[derive(Debug, Default)]
pub struct Parser {
    buffer: Vec<u8>,
}

/// Lexical element of one line
#[derive(Clone, Debug, Eq, PartialEq)]
enum Token {
    Word(String),
    /// `|`
    Pipe,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `&`
    Background,
    /// `>` or `>>`
    Redirect { append: bool },
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw input bytes to the parse buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Takes the next complete command line out of the buffer.
    ///
    /// Returns `Ok(None)` when no complete line is buffered yet. Lines
    /// containing nothing but whitespace or a comment are skipped.
    pub fn pop_next(&mut self) -> Result<Option<CommandLine>, ParseError> {
        loop {
            let Some((tokens, consumed)) = scan(&self.buffer) else {
                return Ok(None);
            };
            self.buffer.drain(..consumed);
            match assemble(tokens)? {
                Some(line) => return Ok(Some(line)),
                None => continue,
            }
        }
    }
}

/// Tokenizes the first complete line of `buffer`.
///
/// Returns the tokens and the number of bytes consumed (including the
/// terminating newline), or `None` if the buffered input does not contain a
/// complete line yet.
fn scan(buffer: &[u8]) -> Option<(Vec<Token>, usize)> {
    let mut tokens = Vec::new();
    let mut word: Option<Vec<u8>> = None;
    let flush = |word: &mut Option<Vec<u8>>, tokens: &mut Vec<Token>| {
        if let Some(bytes) = word.take() {
            tokens.push(Token::Word(String::from_utf8_lossy(&bytes).into_owned()));
        }
    };

    let mut i = 0;
    while i < buffer.len() {
        match buffer[i] {
            b'\n' => {
                flush(&mut word, &mut tokens);
                return Some((tokens, i + 1));
            }
            b' ' | b'\t' | b'\r' => {
                flush(&mut word, &mut tokens);
                i += 1;
            }
            b'#' if word.is_none() => {
                while i < buffer.len() && buffer[i] != b'\n' {
                    i += 1;
                }
            }
            b'\\' => {
                let &next = buffer.get(i + 1)?;
                if next != b'\n' {
                    word.get_or_insert_with(Vec::new).push(next);
                }
                i += 2;
            }
            b'\'' => {
                let quoted = word.get_or_insert_with(Vec::new);
                i += 1;
                loop {
                    match *buffer.get(i)? {
                        b'\'' => break,
                        byte => {
                            quoted.push(byte);
                            i += 1;
                        }
                    }
                }
                i += 1;
            }
            b'"' => {
                let quoted = word.get_or_insert_with(Vec::new);
                i += 1;
                loop {
                    match *buffer.get(i)? {
                        b'"' => {
                            i += 1;
                            break;
                        }
                        b'\\' => {
                            let &next = buffer.get(i + 1)?;
                            if next == b'"' || next == b'\\' {
                                quoted.push(next);
                                i += 2;
                            } else {
                                quoted.push(b'\\');
                                i += 1;
                            }
                        }
                        byte => {
                            quoted.push(byte);
                            i += 1;
                        }
                    }
                }
            }
            b'|' => {
                flush(&mut word, &mut tokens);
                if buffer.get(i + 1) == Some(&b'|') {
                    tokens.push(Token::Or);
                    i += 2;
                } else {
                    tokens.push(Token::Pipe);
                    i += 1;
                }
            }
            b'&' => {
                flush(&mut word, &mut tokens);
                if buffer.get(i + 1) == Some(&b'&') {
                    tokens.push(Token::And);
                    i += 2;
                } else {
                    tokens.push(Token::Background);
                    i += 1;
                }
            }
            b'>' => {
                flush(&mut word, &mut tokens);
                if buffer.get(i + 1) == Some(&b'>') {
                    tokens.push(Token::Redirect { append: true });
                    i += 2;
                } else {
                    tokens.push(Token::Redirect { append: false });
                    i += 1;
                }
            }
            byte => {
                word.get_or_insert_with(Vec::new).push(byte);
                i += 1;
            }
        }
    }
    None
}

/// Builds a command line out of one line's tokens.
///
/// Returns `Ok(None)` for a line with no content.
fn assemble(tokens: Vec<Token>) -> Result<Option<CommandLine>, ParseError> {
    let mut exprs = Vec::new();
    let mut current: Option<Command> = None;
    let mut output = Output::Inherit;
    let mut redirect: Option<bool> = None;
    let mut is_background = false;

    for token in tokens {
        if is_background {
            return Err(ParseError::BackgroundNotLast);
        }
        match token {
            Token::Word(word) => match redirect.take() {
                Some(append) => output = Output::File { path: word, append },
                None => match &mut current {
                    None => {
                        current = Some(Command {
                            name: word,
                            args: Vec::new(),
                        })
                    }
                    Some(command) => command.args.push(word),
                },
            },
            Token::Pipe | Token::And | Token::Or => {
                if let Some(command) = current.take() {
                    exprs.push(Expr::Command(command));
                }
                exprs.push(match token {
                    Token::Pipe => Expr::Pipe,
                    Token::And => Expr::And,
                    _ => Expr::Or,
                });
            }
            Token::Background => is_background = true,
            Token::Redirect { append } => redirect = Some(append),
        }
    }

    if redirect.is_some() {
        return Err(ParseError::MissingRedirectTarget);
    }
    if let Some(command) = current {
        exprs.push(Expr::Command(command));
    }
    if exprs.is_empty() && output == Output::Inherit && !is_background {
        return Ok(None);
    }
    Ok(Some(CommandLine {
        exprs,
        output,
        is_background,
    }))
}
