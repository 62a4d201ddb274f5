//! The compute engine on the lite bus.
use tracing::{event, Level};

use base::prelude::*;

use super::{EngineConfig, RegisterFile};
use crate::bus::{Lite, LiteRequest, LiteResponse, ReadData, Slave, WriteResponse};
use crate::context::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    WriteResponse,
    /// The register is read when the response is presented, so the
    /// value is the one current on that cycle.
    ReadResponse { offset: u32 },
}

#[derive(Debug)]
pub struct ComputeEngine {
    window: Window,
    config: EngineConfig,
    regs: RegisterFile,
    state: State,
}

impl ComputeEngine {
    pub fn new(window: Window, config: EngineConfig) -> ComputeEngine {
        ComputeEngine {
            window,
            config,
            regs: RegisterFile::default(),
            state: State::Idle,
        }
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }
}

impl Slave<Lite> for ComputeEngine {
    fn outputs(&self, req: &LiteRequest) -> LiteResponse {
        match self.state {
            State::Idle => {
                let write = req.aw.valid && req.w.valid;
                LiteResponse {
                    awready: write,
                    wready: write,
                    arready: req.ar.valid && !write,
                    ..LiteResponse::default()
                }
            }
            State::WriteResponse => LiteResponse {
                b: WriteResponse {
                    valid: true,
                    resp: Response::Okay,
                },
                ..LiteResponse::default()
            },
            State::ReadResponse { offset } => LiteResponse {
                r: ReadData {
                    valid: true,
                    data: self.regs.read(offset),
                    resp: Response::Okay,
                },
                ..LiteResponse::default()
            },
        }
    }

    fn clock(&mut self, ctx: &Context, req: &LiteRequest, resp: &LiteResponse) {
        // The operation started by a previous write completes before
        // this cycle's write is applied.
        self.regs.step(&self.config, ctx.cycle);
        self.state = match self.state {
            State::Idle if req.aw.valid && resp.awready => {
                let offset = self.window.offset_of(req.aw.addr);
                if !self.regs.write(offset, req.w.data, req.w.strobe) {
                    event!(
                        Level::DEBUG,
                        "cycle {}: ignoring engine write to offset {:#x}",
                        ctx.cycle,
                        offset
                    );
                }
                State::WriteResponse
            }
            State::Idle if req.ar.valid && resp.arready => State::ReadResponse {
                offset: self.window.offset_of(req.ar.addr),
            },
            State::WriteResponse if req.bready => State::Idle,
            State::ReadResponse { .. } if req.rready => State::Idle,
            unchanged => unchanged,
        };
    }

    fn reset(&mut self) {
        self.regs = RegisterFile::default();
        self.state = State::Idle;
    }

    fn name(&self) -> String {
        "engine".to_string()
    }
}
