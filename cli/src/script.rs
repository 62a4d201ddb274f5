//! Request scripts.
//!
//! A script has one request per line:
//!
//! ```text
//! write ADDRESS DATA [BYTE_ENABLES]
//! read ADDRESS
//! ```
//!
//! Everything after `#` is a comment.  Numbers are decimal, or
//! hexadecimal with a `0x` prefix.  DATA may also be a floating-point
//! number with an `f` suffix (for example `1.5f`), which is written as
//! its IEEE binary32 representation.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use soc::HostOp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    UnknownCommand { line: usize, command: String },
    MissingArgument { line: usize, what: &'static str },
    ExtraArgument { line: usize, text: String },
    BadNumber { line: usize, text: String },
    /// Byte enables must select at least one of the four bytes.
    BadByteEnables { line: usize, value: u32 },
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            ScriptError::UnknownCommand { line, command } => {
                write!(f, "line {line}: unknown command '{command}'")
            }
            ScriptError::MissingArgument { line, what } => write!(f, "line {line}: missing {what}"),
            ScriptError::ExtraArgument { line, text } => {
                write!(f, "line {line}: unexpected '{text}'")
            }
            ScriptError::BadNumber { line, text } => {
                write!(f, "line {line}: '{text}' is not a valid number")
            }
            ScriptError::BadByteEnables { line, value } => write!(
                f,
                "line {line}: byte enables {value:#x} must be between 0x1 and 0xf"
            ),
        }
    }
}

impl Error for ScriptError {}

fn parse_integer(text: &str) -> Option<u32> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(&hex.replace('_', ""), 16).ok()
    } else if text.starts_with('-') {
        text.parse::<i32>().ok().map(|n| n as u32)
    } else {
        text.parse::<u32>().ok()
    }
}

fn parse_data(text: &str) -> Option<u32> {
    match text.strip_suffix('f') {
        Some(float) if !text.starts_with("0x") => float.parse::<f32>().ok().map(f32::to_bits),
        _ => parse_integer(text),
    }
}

struct Fields<'a> {
    line: usize,
    words: std::str::SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn next(&mut self, what: &'static str) -> Result<&'a str, ScriptError> {
        self.words.next().ok_or(ScriptError::MissingArgument {
            line: self.line,
            what,
        })
    }

    fn number(&mut self, what: &'static str, parse: fn(&str) -> Option<u32>) -> Result<u32, ScriptError> {
        let text = self.next(what)?;
        parse(text).ok_or_else(|| ScriptError::BadNumber {
            line: self.line,
            text: text.to_string(),
        })
    }

    fn finish(mut self) -> Result<(), ScriptError> {
        match self.words.next() {
            Some(text) => Err(ScriptError::ExtraArgument {
                line: self.line,
                text: text.to_string(),
            }),
            None => Ok(()),
        }
    }
}

fn parse_line(line: usize, text: &str) -> Result<Option<HostOp>, ScriptError> {
    let text = match text.split_once('#') {
        Some((before, _comment)) => before,
        None => text,
    };
    let mut fields = Fields {
        line,
        words: text.split_whitespace(),
    };
    let Some(command) = fields.words.next() else {
        return Ok(None);
    };
    let op = match command.to_ascii_lowercase().as_str() {
        "write" => {
            let address = fields.number("address", parse_integer)?;
            let data = fields.number("data", parse_data)?;
            let byte_enable = match fields.words.next() {
                None => 0xF,
                Some(text) => match parse_integer(text) {
                    Some(value @ 1..=0xF) => value as u8,
                    Some(value) => return Err(ScriptError::BadByteEnables { line, value }),
                    None => {
                        return Err(ScriptError::BadNumber {
                            line,
                            text: text.to_string(),
                        })
                    }
                },
            };
            HostOp::Write {
                address,
                data,
                byte_enable,
            }
        }
        "read" => HostOp::Read {
            address: fields.number("address", parse_integer)?,
        },
        _ => {
            return Err(ScriptError::UnknownCommand {
                line,
                command: command.to_string(),
            })
        }
    };
    fields.finish()?;
    Ok(Some(op))
}

/// Parse a whole script.  Line numbers in errors start at 1.
pub fn parse_script(text: &str) -> Result<Vec<HostOp>, ScriptError> {
    let mut ops = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if let Some(op) = parse_line(i + 1, line)? {
            ops.push(op);
        }
    }
    Ok(ops)
}
