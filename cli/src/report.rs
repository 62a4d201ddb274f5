use std::io::Write;

use serde::Serialize;
use termcolor::{self, ColorChoice, ColorSpec, StandardStream, WriteColor};

use soc::{Completion, HostOp, PhaseLog};

fn get_colour_choice() -> termcolor::ColorChoice {
    if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

/// What happened when a script was run.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub cycles: u64,
    /// False if the cycle budget ran out before every request
    /// completed.
    pub finished: bool,
    pub completions: &'a [Completion],
    pub phases: &'a PhaseLog,
}

impl Report<'_> {
    pub fn write_json<W: Write>(&self, out: W) -> Result<(), serde_json::Error> {
        serde_json::to_writer_pretty(out, self)
    }

    pub fn print(&self) -> Result<(), std::io::Error> {
        let mut stream = StandardStream::stdout(get_colour_choice());
        for c in self.completions {
            write!(stream, "[{:>6}..{:>6}] {:<36}", c.issued, c.completed, c.op.to_string())?;
            let mut colour = ColorSpec::new();
            colour.set_fg(Some(if c.status.is_okay() {
                termcolor::Color::Green
            } else {
                termcolor::Color::Red
            }));
            stream.set_color(&colour)?;
            write!(stream, " {}", c.status)?;
            stream.reset()?;
            match c.op {
                HostOp::Read { .. } => {
                    let as_float = f32::from_bits(c.read_data);
                    writeln!(stream, " {:#010x} ({as_float:e})", c.read_data)?;
                }
                HostOp::Write { .. } => writeln!(stream)?,
            }
        }
        if !self.finished {
            let mut colour = ColorSpec::new();
            colour.set_fg(Some(termcolor::Color::Yellow)).set_bold(true);
            stream.set_color(&colour)?;
            writeln!(stream, "stalled after {} cycles", self.cycles)?;
            stream.reset()?;
        } else {
            writeln!(stream, "finished in {} cycles", self.cycles)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base::prelude::Response;

    #[test]
    fn test_json_report() {
        let completions = [Completion {
            op: HostOp::read(0x10),
            read_data: 7,
            status: Response::Okay,
            issued: 0,
            completed: 2,
        }];
        let phases = PhaseLog::new();
        let report = Report {
            cycles: 3,
            finished: true,
            completions: &completions,
            phases: &phases,
        };
        let mut out = Vec::new();
        report.write_json(&mut out).expect("serialisation succeeds");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");
        assert_eq!(value["cycles"], 3);
        assert_eq!(value["completions"][0]["read_data"], 7);
        assert_eq!(value["completions"][0]["op"]["Read"]["address"], 16);
    }
}
