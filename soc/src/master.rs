//! The requester of the burst system.
//!
//! The burst master holds a queue of commands and carries them out
//! one at a time.  A write presents its address phase and its data
//! beats concurrently, one beat at a time, marking the final beat;
//! once the address and every beat have been accepted it waits for
//! the write response.  A read presents its address phase and then
//! collects data beats until the last one.
use std::collections::VecDeque;

use serde::Serialize;
use tracing::{event, Level};

use base::prelude::*;

use crate::bus::{
    Burst, BurstAddress, BurstRequest, BurstResponse, BurstWriteData, Protocol,
};
use crate::context::Context;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BurstCommand {
    Write {
        desc: BurstDescriptor,
        /// Beat data and byte strobes, one per beat.
        beats: Vec<(Line, u128)>,
    },
    Read {
        desc: BurstDescriptor,
    },
}

impl BurstCommand {
    /// A write burst.  The number of beats must match the descriptor.
    pub fn write(desc: BurstDescriptor, beats: Vec<(Line, u128)>) -> Result<BurstCommand, BurstError> {
        if beats.len() == usize::from(desc.len) {
            Ok(BurstCommand::Write { desc, beats })
        } else {
            Err(BurstError::BeatCount {
                expected: desc.len,
                actual: beats.len(),
            })
        }
    }

    /// A burst of 32-bit beats writing `words` starting at `address`.
    pub fn write_words(id: u8, address: u32, mode: BurstMode, words: &[u32]) -> Result<BurstCommand, BurstError> {
        let len = u16::try_from(words.len()).map_err(|_| BurstError::TooLong(u16::MAX))?;
        let desc = BurstDescriptor::new(id, address, len, BeatSize::B4, mode)?;
        let beats = words
            .iter()
            .enumerate()
            .map(|(beat, value)| Line::with_word(desc.beat_address(beat as u16), *value))
            .collect();
        BurstCommand::write(desc, beats)
    }

    /// A burst of `len` 32-bit beats reading from `address`.
    pub fn read_words(id: u8, address: u32, len: u16, mode: BurstMode) -> Result<BurstCommand, BurstError> {
        Ok(BurstCommand::Read {
            desc: BurstDescriptor::new(id, address, len, BeatSize::B4, mode)?,
        })
    }

    pub fn descriptor(&self) -> &BurstDescriptor {
        match self {
            BurstCommand::Write { desc, .. } | BurstCommand::Read { desc } => desc,
        }
    }
}

/// The outcome of one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BurstCompletion {
    pub desc: BurstDescriptor,
    pub direction: Direction,
    /// The write response, or for a read the first status other than
    /// OK among its beats.
    pub status: Response,
    /// The data of each read beat.  Empty for writes.
    pub beats: Vec<Line>,
    pub issued: u64,
    pub completed: u64,
}

impl BurstCompletion {
    /// The 32-bit word each read beat carried at its beat address.
    pub fn words(&self) -> Vec<u32> {
        self.beats
            .iter()
            .enumerate()
            .map(|(i, line)| line.word_at(self.desc.beat_address(i as u16)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Idle,
    Write {
        desc: BurstDescriptor,
        beats: Vec<(Line, u128)>,
        address_done: bool,
        /// The number of beats accepted so far.
        sent: usize,
        issued: u64,
    },
    WriteResponse {
        desc: BurstDescriptor,
        issued: u64,
    },
    Read {
        desc: BurstDescriptor,
        issued: u64,
    },
    ReadData {
        desc: BurstDescriptor,
        beats: Vec<Line>,
        status: Response,
        issued: u64,
    },
}

#[derive(Debug)]
pub struct BurstMaster {
    commands: VecDeque<BurstCommand>,
    state: State,
    completions: Vec<BurstCompletion>,
}

impl BurstMaster {
    pub fn new<I: IntoIterator<Item = BurstCommand>>(commands: I) -> BurstMaster {
        BurstMaster {
            commands: commands.into_iter().collect(),
            state: State::Idle,
            completions: Vec::new(),
        }
    }

    pub fn push(&mut self, command: BurstCommand) {
        self.commands.push_back(command);
    }

    pub fn completions(&self) -> &[BurstCompletion] {
        &self.completions
    }

    /// True when every command has completed.
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle && self.commands.is_empty()
    }

    pub fn outputs(&self) -> BurstRequest {
        match &self.state {
            State::Idle => BurstRequest::default(),
            State::Write {
                desc,
                beats,
                address_done,
                sent,
                ..
            } => {
                let mut req = BurstRequest::default();
                if !address_done {
                    req.aw = BurstAddress {
                        valid: true,
                        desc: *desc,
                    };
                }
                if let Some((data, strobe)) = beats.get(*sent) {
                    req.w = BurstWriteData {
                        valid: true,
                        data: *data,
                        strobe: *strobe,
                        last: *sent + 1 == beats.len(),
                    };
                }
                req
            }
            State::WriteResponse { .. } => BurstRequest {
                bready: true,
                ..BurstRequest::default()
            },
            State::Read { desc, .. } => BurstRequest {
                ar: BurstAddress {
                    valid: true,
                    desc: *desc,
                },
                ..BurstRequest::default()
            },
            State::ReadData { .. } => BurstRequest {
                rready: true,
                ..BurstRequest::default()
            },
        }
    }

    fn complete(&mut self, ctx: &Context, completion: BurstCompletion) {
        event!(
            Level::DEBUG,
            "cycle {}: {:?} burst {} complete: {}",
            ctx.cycle,
            completion.direction,
            completion.desc.id,
            completion.status
        );
        self.completions.push(completion);
    }

    pub fn clock(&mut self, ctx: &Context, req: &BurstRequest, resp: &BurstResponse) {
        let hs = Burst::handshakes(req, resp);
        let state = std::mem::replace(&mut self.state, State::Idle);
        self.state = match state {
            State::Idle => match self.commands.pop_front() {
                Some(BurstCommand::Write { desc, beats }) => State::Write {
                    desc,
                    beats,
                    address_done: false,
                    sent: 0,
                    issued: ctx.cycle,
                },
                Some(BurstCommand::Read { desc }) => State::Read {
                    desc,
                    issued: ctx.cycle,
                },
                None => State::Idle,
            },
            State::Write {
                desc,
                beats,
                address_done,
                sent,
                issued,
            } => {
                let address_done = address_done || hs.write_address.is_some();
                let sent = sent + usize::from(hs.write_data.is_some());
                if address_done && sent == beats.len() {
                    State::WriteResponse { desc, issued }
                } else {
                    State::Write {
                        desc,
                        beats,
                        address_done,
                        sent,
                        issued,
                    }
                }
            }
            State::WriteResponse { desc, issued } => match hs.write_response {
                Some(status) => {
                    self.complete(
                        ctx,
                        BurstCompletion {
                            desc,
                            direction: Direction::Write,
                            status,
                            beats: Vec::new(),
                            issued,
                            completed: ctx.cycle,
                        },
                    );
                    State::Idle
                }
                None => State::WriteResponse { desc, issued },
            },
            State::Read { desc, issued } if hs.read_address.is_some() => State::ReadData {
                desc,
                beats: Vec::new(),
                status: Response::Okay,
                issued,
            },
            State::ReadData {
                desc,
                mut beats,
                status,
                issued,
            } => match hs.read_data {
                Some((last, beat_status)) => {
                    beats.push(resp.r.data);
                    let status = if status.is_okay() { beat_status } else { status };
                    if last {
                        if beats.len() != usize::from(desc.len) {
                            event!(
                                Level::ERROR,
                                "cycle {}: read burst {} ended after {} of {} beats",
                                ctx.cycle,
                                desc.id,
                                beats.len(),
                                desc.len
                            );
                        }
                        self.complete(
                            ctx,
                            BurstCompletion {
                                desc,
                                direction: Direction::Read,
                                status,
                                beats,
                                issued,
                                completed: ctx.cycle,
                            },
                        );
                        State::Idle
                    } else {
                        State::ReadData {
                            desc,
                            beats,
                            status,
                            issued,
                        }
                    }
                }
                None => State::ReadData {
                    desc,
                    beats,
                    status,
                    issued,
                },
            },
            unchanged => unchanged,
        };
    }

    /// Abandon the command in progress.  Queued commands are kept.
    pub fn reset(&mut self) {
        if self.state != State::Idle {
            event!(Level::INFO, "burst master abandoning command on reset");
        }
        self.state = State::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{BurstReadData, BurstWriteResponse};

    #[test]
    fn test_beat_count_must_match() {
        let desc = BurstDescriptor::new(0, 0, 2, BeatSize::B4, BurstMode::Incrementing)
            .expect("valid burst");
        assert_eq!(
            BurstCommand::write(desc, vec![Line::with_word(0, 1)]),
            Err(BurstError::BeatCount {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_write_presents_beats_in_order() {
        let command = BurstCommand::write_words(3, 0x100, BurstMode::Incrementing, &[10, 11])
            .expect("valid burst");
        let mut master = BurstMaster::new([command]);
        assert!(!master.is_idle());
        master.clock(&Context::new(0), &BurstRequest::default(), &BurstResponse::default());

        let ready = BurstResponse {
            awready: true,
            wready: true,
            ..BurstResponse::default()
        };
        let req = master.outputs();
        assert!(req.aw.valid);
        assert_eq!(req.w.data.word_at(0x100), 10);
        assert!(!req.w.last);
        master.clock(&Context::new(1), &req, &ready);

        let req = master.outputs();
        assert!(!req.aw.valid);
        assert_eq!(req.w.data.word_at(0x104), 11);
        assert_eq!(req.w.strobe, word_strobe(0x104));
        assert!(req.w.last);
        master.clock(&Context::new(2), &req, &ready);

        let req = master.outputs();
        assert!(req.bready);
        let resp = BurstResponse {
            b: BurstWriteResponse {
                valid: true,
                id: 3,
                resp: Response::Okay,
            },
            ..BurstResponse::default()
        };
        master.clock(&Context::new(3), &req, &resp);
        assert!(master.is_idle());
        let done = &master.completions()[0];
        assert_eq!(done.direction, Direction::Write);
        assert_eq!((done.issued, done.completed), (0, 3));
    }

    #[test]
    fn test_read_collects_beats_until_last() {
        let command = BurstCommand::read_words(1, 0x200, 2, BurstMode::Fixed).expect("valid burst");
        let mut master = BurstMaster::new([command]);
        master.clock(&Context::new(0), &BurstRequest::default(), &BurstResponse::default());
        let req = master.outputs();
        assert!(req.ar.valid);
        master.clock(
            &Context::new(1),
            &req,
            &BurstResponse {
                arready: true,
                ..BurstResponse::default()
            },
        );
        for (cycle, (value, last)) in [(5, false), (6, true)].into_iter().enumerate() {
            let req = master.outputs();
            assert!(req.rready);
            let (data, _) = Line::with_word(0x200, value);
            let resp = BurstResponse {
                r: BurstReadData {
                    valid: true,
                    id: 1,
                    data,
                    resp: if last { Response::SlaveError } else { Response::Okay },
                    last,
                },
                ..BurstResponse::default()
            };
            master.clock(&Context::new(2 + cycle as u64), &req, &resp);
        }
        assert!(master.is_idle());
        let done = &master.completions()[0];
        assert_eq!(done.words(), vec![5, 6]);
        assert_eq!(done.status, Response::SlaveError);
    }
}
