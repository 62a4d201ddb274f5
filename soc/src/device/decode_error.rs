//! Default slaves which answer requests for unmapped addresses.
//!
//! These are only attached when the interconnect is configured to
//! report unmapped addresses (see [`crate::UnmappedPolicy`]).  They
//! never touch storage; every response carries
//! [`Response::DecodeError`] and read data is zero.
use tracing::{event, Level};

use base::prelude::*;

use crate::bus::{
    Burst, BurstReadData, BurstRequest, BurstResponse, BurstWriteResponse, Lite, LiteRequest,
    LiteResponse, ReadData, Slave, WriteResponse,
};
use crate::context::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiteState {
    Idle,
    WriteResponse,
    ReadResponse,
}

#[derive(Debug)]
pub struct LiteDecodeError {
    state: LiteState,
}

impl LiteDecodeError {
    pub fn new() -> LiteDecodeError {
        LiteDecodeError {
            state: LiteState::Idle,
        }
    }
}

impl Default for LiteDecodeError {
    fn default() -> Self {
        Self::new()
    }
}

impl Slave<Lite> for LiteDecodeError {
    fn outputs(&self, req: &LiteRequest) -> LiteResponse {
        match self.state {
            LiteState::Idle => {
                let write = req.aw.valid && req.w.valid;
                LiteResponse {
                    awready: write,
                    wready: write,
                    arready: req.ar.valid && !write,
                    ..LiteResponse::default()
                }
            }
            LiteState::WriteResponse => LiteResponse {
                b: WriteResponse {
                    valid: true,
                    resp: Response::DecodeError,
                },
                ..LiteResponse::default()
            },
            LiteState::ReadResponse => LiteResponse {
                r: ReadData {
                    valid: true,
                    data: 0,
                    resp: Response::DecodeError,
                },
                ..LiteResponse::default()
            },
        }
    }

    fn clock(&mut self, ctx: &Context, req: &LiteRequest, resp: &LiteResponse) {
        self.state = match self.state {
            LiteState::Idle if req.aw.valid && resp.awready => {
                event!(
                    Level::WARN,
                    "cycle {}: write to unmapped address {:#010x}",
                    ctx.cycle,
                    req.aw.addr
                );
                LiteState::WriteResponse
            }
            LiteState::Idle if req.ar.valid && resp.arready => {
                event!(
                    Level::WARN,
                    "cycle {}: read from unmapped address {:#010x}",
                    ctx.cycle,
                    req.ar.addr
                );
                LiteState::ReadResponse
            }
            LiteState::WriteResponse if req.bready => LiteState::Idle,
            LiteState::ReadResponse if req.rready => LiteState::Idle,
            unchanged => unchanged,
        };
    }

    fn reset(&mut self) {
        self.state = LiteState::Idle;
    }

    fn name(&self) -> String {
        "decode error".to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BurstWriteState {
    Idle,
    /// Discarding write data until the last beat.
    Draining { id: u8 },
    Respond { id: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BurstReadState {
    Idle,
    Data { desc: BurstDescriptor, beat: u16 },
}

#[derive(Debug)]
pub struct BurstDecodeError {
    write: BurstWriteState,
    read: BurstReadState,
}

impl BurstDecodeError {
    pub fn new() -> BurstDecodeError {
        BurstDecodeError {
            write: BurstWriteState::Idle,
            read: BurstReadState::Idle,
        }
    }
}

impl Default for BurstDecodeError {
    fn default() -> Self {
        Self::new()
    }
}

impl Slave<Burst> for BurstDecodeError {
    fn outputs(&self, _req: &BurstRequest) -> BurstResponse {
        let mut resp = BurstResponse {
            awready: self.write == BurstWriteState::Idle,
            wready: matches!(self.write, BurstWriteState::Draining { .. }),
            arready: self.read == BurstReadState::Idle,
            ..BurstResponse::default()
        };
        if let BurstWriteState::Respond { id } = self.write {
            resp.b = BurstWriteResponse {
                valid: true,
                id,
                resp: Response::DecodeError,
            };
        }
        if let BurstReadState::Data { desc, beat } = self.read {
            resp.r = BurstReadData {
                valid: true,
                id: desc.id,
                data: Line::ZERO,
                resp: Response::DecodeError,
                last: desc.is_last(beat),
            };
        }
        resp
    }

    fn clock(&mut self, ctx: &Context, req: &BurstRequest, resp: &BurstResponse) {
        self.write = match self.write {
            BurstWriteState::Idle if req.aw.valid && resp.awready => {
                event!(
                    Level::WARN,
                    "cycle {}: write burst to unmapped address {:#010x}",
                    ctx.cycle,
                    req.aw.desc.address
                );
                BurstWriteState::Draining { id: req.aw.desc.id }
            }
            BurstWriteState::Draining { id } if req.w.valid && resp.wready && req.w.last => {
                BurstWriteState::Respond { id }
            }
            BurstWriteState::Respond { .. } if req.bready => BurstWriteState::Idle,
            unchanged => unchanged,
        };
        self.read = match self.read {
            BurstReadState::Idle if req.ar.valid && resp.arready => {
                event!(
                    Level::WARN,
                    "cycle {}: read burst from unmapped address {:#010x}",
                    ctx.cycle,
                    req.ar.desc.address
                );
                BurstReadState::Data {
                    desc: req.ar.desc,
                    beat: 0,
                }
            }
            BurstReadState::Data { desc, beat } if resp.r.valid && req.rready => {
                if desc.is_last(beat) {
                    BurstReadState::Idle
                } else {
                    BurstReadState::Data {
                        desc,
                        beat: beat + 1,
                    }
                }
            }
            unchanged => unchanged,
        };
    }

    fn reset(&mut self) {
        self.write = BurstWriteState::Idle;
        self.read = BurstReadState::Idle;
    }

    fn name(&self) -> String {
        "decode error".to_string()
    }
}
