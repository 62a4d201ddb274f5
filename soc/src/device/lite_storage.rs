//! Program and data storage on the lite bus.
use tracing::{event, Level};

use base::prelude::*;

use super::storage::WordStorage;
use crate::bus::{Lite, LiteRequest, LiteResponse, ReadData, Slave, WriteResponse};
use crate::context::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    /// A write has been performed; the response is due when
    /// `remaining` reaches zero.
    WriteWait { remaining: u32 },
    WriteResponse,
    ReadWait { remaining: u32, data: u32 },
    ReadResponse { data: u32 },
}

/// A storage slave which responds to each single-beat transaction
/// after a fixed latency.  The address and data phases of a write are
/// accepted together.  If a write and a read are presented in the
/// same cycle, the write is accepted first.
#[derive(Debug)]
pub struct StorageSlave {
    name: String,
    window: Window,
    storage: WordStorage,
    latency: u32,
    state: State,
}

impl StorageSlave {
    /// `latency` is the number of cycles between accepting a request
    /// and presenting its response, beyond the minimum of one.
    pub fn new(name: &str, window: Window, storage: WordStorage, latency: u32) -> StorageSlave {
        StorageSlave {
            name: name.to_string(),
            window,
            storage,
            latency,
            state: State::Idle,
        }
    }

    fn write_accepted(req: &LiteRequest) -> bool {
        req.aw.valid && req.w.valid
    }
}

impl Slave<Lite> for StorageSlave {
    fn outputs(&self, req: &LiteRequest) -> LiteResponse {
        match self.state {
            State::Idle => {
                let write = StorageSlave::write_accepted(req);
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
            State::ReadResponse { data } => LiteResponse {
                r: ReadData {
                    valid: true,
                    data,
                    resp: Response::Okay,
                },
                ..LiteResponse::default()
            },
            State::WriteWait { .. } | State::ReadWait { .. } => LiteResponse::default(),
        }
    }

    fn clock(&mut self, ctx: &Context, req: &LiteRequest, resp: &LiteResponse) {
        self.state = match self.state {
            State::Idle => {
                if req.aw.valid && resp.awready {
                    let offset = self.window.offset_of(req.aw.addr);
                    if !self.storage.write(offset, req.w.data, req.w.strobe) {
                        event!(
                            Level::WARN,
                            "cycle {}: ignoring write of {:#010x} to read-only {} at {:#010x}",
                            ctx.cycle,
                            req.w.data,
                            self.name,
                            req.aw.addr
                        );
                    } else {
                        event!(
                            Level::DEBUG,
                            "cycle {}: {} write {:#010x} <- {:#010x} (strobe {:04b})",
                            ctx.cycle,
                            self.name,
                            req.aw.addr,
                            req.w.data,
                            req.w.strobe
                        );
                    }
                    match self.latency {
                        0 => State::WriteResponse,
                        n => State::WriteWait { remaining: n },
                    }
                } else if req.ar.valid && resp.arready {
                    let data = self.storage.read(self.window.offset_of(req.ar.addr));
                    event!(
                        Level::DEBUG,
                        "cycle {}: {} read {:#010x} -> {:#010x}",
                        ctx.cycle,
                        self.name,
                        req.ar.addr,
                        data
                    );
                    match self.latency {
                        0 => State::ReadResponse { data },
                        n => State::ReadWait { remaining: n, data },
                    }
                } else {
                    State::Idle
                }
            }
            State::WriteWait { remaining: 1 } => State::WriteResponse,
            State::WriteWait { remaining } => State::WriteWait {
                remaining: remaining - 1,
            },
            State::ReadWait { remaining: 1, data } => State::ReadResponse { data },
            State::ReadWait { remaining, data } => State::ReadWait {
                remaining: remaining - 1,
                data,
            },
            State::WriteResponse if req.bready => State::Idle,
            State::ReadResponse { .. } if req.rready => State::Idle,
            unchanged => unchanged,
        };
    }

    fn reset(&mut self) {
        self.state = State::Idle;
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{AddressPhase, WriteData};

    fn write_request(addr: u32, data: u32) -> LiteRequest {
        LiteRequest {
            aw: AddressPhase { valid: true, addr },
            w: WriteData {
                valid: true,
                data,
                strobe: 0xF,
            },
            bready: true,
            ..LiteRequest::default()
        }
    }

    fn read_request(addr: u32) -> LiteRequest {
        LiteRequest {
            ar: AddressPhase { valid: true, addr },
            rready: true,
            ..LiteRequest::default()
        }
    }

    /// Clock the slave with `req` until it produces a response,
    /// returning the response and the number of cycles taken.
    fn run(slave: &mut StorageSlave, req: &LiteRequest) -> (LiteResponse, u64) {
        for cycle in 0..100 {
            let resp = slave.outputs(req);
            let done = resp.b.valid || resp.r.valid;
            slave.clock(&Context::new(cycle), req, &resp);
            if done {
                return (resp, cycle);
            }
        }
        panic!("{} did not respond", slave.name());
    }

    #[test]
    fn test_write_then_read() {
        let window = Window::new(0x1000_0000, 0x100);
        let mut ram = StorageSlave::new("ram", window, WordStorage::ram(0x100), 0);
        let (resp, cycles) = run(&mut ram, &write_request(0x1000_0010, 0x1234_5678));
        assert_eq!(resp.b.resp, Response::Okay);
        assert_eq!(cycles, 1);
        let (resp, _) = run(&mut ram, &read_request(0x1000_0010));
        assert_eq!(resp.r.data, 0x1234_5678);
    }

    #[test]
    fn test_latency() {
        let window = Window::new(0, 0x100);
        let mut ram = StorageSlave::new("ram", window, WordStorage::ram(0x100), 3);
        let (_, cycles) = run(&mut ram, &read_request(0));
        assert_eq!(cycles, 4);
    }

    #[test]
    fn test_write_waits_for_both_phases() {
        let window = Window::new(0, 0x100);
        let ram = StorageSlave::new("ram", window, WordStorage::ram(0x100), 0);
        let mut req = write_request(0, 1);
        req.w.valid = false;
        let resp = ram.outputs(&req);
        assert!(!resp.awready);
        assert!(!resp.wready);
    }

    #[test]
    fn test_rom_write_is_acknowledged() {
        let window = Window::new(0, 0x100);
        let mut rom = StorageSlave::new("rom", window, WordStorage::rom(0x100, &[7]), 0);
        let (resp, _) = run(&mut rom, &write_request(0, 99));
        assert_eq!(resp.b.resp, Response::Okay);
        let (resp, _) = run(&mut rom, &read_request(0));
        assert_eq!(resp.r.data, 7);
    }
}
