//! Program and data storage on the burst bus.
use tracing::{event, Level};

use base::prelude::*;

use super::storage::WordStorage;
use crate::bus::{Burst, BurstReadData, BurstRequest, BurstResponse, BurstWriteResponse, Slave};
use crate::context::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    Idle,
    Data {
        desc: BurstDescriptor,
        beat: u16,
        resp: Response,
    },
    Wait {
        id: u8,
        resp: Response,
        remaining: u32,
    },
    Respond {
        id: u8,
        resp: Response,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Idle,
    Wait { desc: BurstDescriptor, remaining: u32 },
    Data { desc: BurstDescriptor, beat: u16 },
}

/// A storage slave for the burst bus.  The write and read channels
/// are independent; each handles one burst at a time.  A burst's
/// address phase is accepted first, then one data beat is transferred
/// per cycle.  Read data starts (and the write response is given)
/// `latency` cycles after the minimum.
#[derive(Debug)]
pub struct BurstStorageSlave {
    name: String,
    window: Window,
    storage: WordStorage,
    latency: u32,
    write: WriteState,
    read: ReadState,
}

impl BurstStorageSlave {
    pub fn new(
        name: &str,
        window: Window,
        storage: WordStorage,
        latency: u32,
    ) -> BurstStorageSlave {
        BurstStorageSlave {
            name: name.to_string(),
            window,
            storage,
            latency,
            write: WriteState::Idle,
            read: ReadState::Idle,
        }
    }

    /// Assemble the data for one beat from the bytes of storage it
    /// covers.  Bytes beyond the end of the storage read as zero.
    fn read_beat(&self, desc: &BurstDescriptor, beat: u16) -> Line {
        let addr = desc.beat_address(beat);
        let first_lane = Line::lane_of(addr);
        let mut line = Line::ZERO;
        for i in 0..desc.size.bytes() {
            let byte = self
                .storage
                .read_byte(self.window.offset_of(addr.wrapping_add(i)));
            line.set_byte(first_lane + i as usize, byte);
        }
        line
    }

    /// Store the strobed bytes of one beat.  Returns false if the
    /// storage is read-only.
    fn write_beat(&mut self, desc: &BurstDescriptor, beat: u16, data: &Line, strobe: u128) -> bool {
        let addr = desc.beat_address(beat);
        let first_lane = Line::lane_of(addr);
        let mut stored = true;
        for i in 0..desc.size.bytes() {
            let lane = first_lane + i as usize;
            if strobe & (1u128 << lane) != 0 {
                let offset = self.window.offset_of(addr.wrapping_add(i));
                stored &= self.storage.write_byte(offset, data.byte(lane));
            }
        }
        stored
    }

    fn respond_after_latency(&self, id: u8, resp: Response) -> WriteState {
        match self.latency {
            0 => WriteState::Respond { id, resp },
            remaining => WriteState::Wait {
                id,
                resp,
                remaining,
            },
        }
    }

    fn next_write_state(&mut self, ctx: &Context, req: &BurstRequest, resp: &BurstResponse) -> WriteState {
        match self.write {
            WriteState::Idle if req.aw.valid && resp.awready => {
                event!(
                    Level::DEBUG,
                    "cycle {}: {} accepted write burst {:?}",
                    ctx.cycle,
                    self.name,
                    req.aw.desc
                );
                WriteState::Data {
                    desc: req.aw.desc,
                    beat: 0,
                    resp: Response::Okay,
                }
            }
            WriteState::Data { desc, beat, resp: status } if req.w.valid && resp.wready => {
                if !self.write_beat(&desc, beat, &req.w.data, req.w.strobe) {
                    event!(
                        Level::WARN,
                        "cycle {}: ignoring write to read-only {} at {:#010x}",
                        ctx.cycle,
                        self.name,
                        desc.beat_address(beat)
                    );
                }
                let final_beat = desc.is_last(beat);
                let mut status = status;
                if req.w.last != final_beat {
                    event!(
                        Level::ERROR,
                        "cycle {}: {} burst {:?}: beat {} has last={} but the burst has {} beats",
                        ctx.cycle,
                        self.name,
                        desc,
                        beat,
                        req.w.last,
                        desc.len
                    );
                    status = Response::SlaveError;
                }
                if req.w.last || final_beat {
                    self.respond_after_latency(desc.id, status)
                } else {
                    WriteState::Data {
                        desc,
                        beat: beat + 1,
                        resp: status,
                    }
                }
            }
            WriteState::Wait { id, resp, remaining: 1 } => WriteState::Respond { id, resp },
            WriteState::Wait { id, resp, remaining } => WriteState::Wait {
                id,
                resp,
                remaining: remaining - 1,
            },
            WriteState::Respond { .. } if req.bready => WriteState::Idle,
            unchanged => unchanged,
        }
    }

    fn next_read_state(&self, ctx: &Context, req: &BurstRequest, resp: &BurstResponse) -> ReadState {
        match self.read {
            ReadState::Idle if req.ar.valid && resp.arready => {
                event!(
                    Level::DEBUG,
                    "cycle {}: {} accepted read burst {:?}",
                    ctx.cycle,
                    self.name,
                    req.ar.desc
                );
                match self.latency {
                    0 => ReadState::Data {
                        desc: req.ar.desc,
                        beat: 0,
                    },
                    remaining => ReadState::Wait {
                        desc: req.ar.desc,
                        remaining,
                    },
                }
            }
            ReadState::Wait { desc, remaining: 1 } => ReadState::Data { desc, beat: 0 },
            ReadState::Wait { desc, remaining } => ReadState::Wait {
                desc,
                remaining: remaining - 1,
            },
            ReadState::Data { desc, beat } if resp.r.valid && req.rready => {
                if desc.is_last(beat) {
                    ReadState::Idle
                } else {
                    ReadState::Data {
                        desc,
                        beat: beat + 1,
                    }
                }
            }
            unchanged => unchanged,
        }
    }
}

impl Slave<Burst> for BurstStorageSlave {
    fn outputs(&self, _req: &BurstRequest) -> BurstResponse {
        let mut resp = BurstResponse {
            awready: self.write == WriteState::Idle,
            wready: matches!(self.write, WriteState::Data { .. }),
            arready: self.read == ReadState::Idle,
            ..BurstResponse::default()
        };
        if let WriteState::Respond { id, resp: status } = self.write {
            resp.b = BurstWriteResponse {
                valid: true,
                id,
                resp: status,
            };
        }
        if let ReadState::Data { desc, beat } = self.read {
            resp.r = BurstReadData {
                valid: true,
                id: desc.id,
                data: self.read_beat(&desc, beat),
                resp: Response::Okay,
                last: desc.is_last(beat),
            };
        }
        resp
    }

    fn clock(&mut self, ctx: &Context, req: &BurstRequest, resp: &BurstResponse) {
        let read = self.next_read_state(ctx, req, resp);
        self.write = self.next_write_state(ctx, req, resp);
        self.read = read;
    }

    fn reset(&mut self) {
        self.write = WriteState::Idle;
        self.read = ReadState::Idle;
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{BurstAddress, BurstWriteData};

    fn ram() -> BurstStorageSlave {
        BurstStorageSlave::new(
            "ram",
            Window::new(0x1000_0000, 0x1000),
            WordStorage::ram(0x1000),
            0,
        )
    }

    fn cycle(slave: &mut BurstStorageSlave, n: u64, req: &BurstRequest) -> BurstResponse {
        let resp = slave.outputs(req);
        slave.clock(&Context::new(n), req, &resp);
        resp
    }

    fn write_beat(desc: BurstDescriptor, beat: u16, value: u32, last: bool) -> BurstRequest {
        let (data, strobe) = Line::with_word(desc.beat_address(beat), value);
        BurstRequest {
            w: BurstWriteData {
                valid: true,
                data,
                strobe,
                last,
            },
            bready: true,
            ..BurstRequest::default()
        }
    }

    #[test]
    fn test_incrementing_write_then_read() {
        let mut slave = ram();
        let desc = BurstDescriptor::new(5, 0x1000_0040, 3, BeatSize::B4, BurstMode::Incrementing)
            .expect("valid burst");
        let aw = BurstRequest {
            aw: BurstAddress { valid: true, desc },
            ..BurstRequest::default()
        };
        assert!(cycle(&mut slave, 0, &aw).awready);
        for beat in 0..3 {
            let req = write_beat(desc, beat, 0x100 + u32::from(beat), beat == 2);
            assert!(cycle(&mut slave, 1 + u64::from(beat), &req).wready);
        }
        let b = cycle(&mut slave, 4, &BurstRequest { bready: true, ..BurstRequest::default() });
        assert!(b.b.valid);
        assert_eq!(b.b.id, 5);
        assert_eq!(b.b.resp, Response::Okay);

        let ar = BurstRequest {
            ar: BurstAddress { valid: true, desc },
            rready: true,
            ..BurstRequest::default()
        };
        assert!(cycle(&mut slave, 5, &ar).arready);
        let mut words = Vec::new();
        for n in 6..9 {
            let r = cycle(&mut slave, n, &BurstRequest { rready: true, ..BurstRequest::default() });
            assert!(r.r.valid);
            words.push((r.r.data.word_at(desc.beat_address(words.len() as u16)), r.r.last));
        }
        assert_eq!(words, vec![(0x100, false), (0x101, false), (0x102, true)]);
    }

    #[test]
    fn test_early_last_is_a_slave_error() {
        let mut slave = ram();
        let desc = BurstDescriptor::new(1, 0x1000_0000, 4, BeatSize::B4, BurstMode::Incrementing)
            .expect("valid burst");
        cycle(
            &mut slave,
            0,
            &BurstRequest {
                aw: BurstAddress { valid: true, desc },
                ..BurstRequest::default()
            },
        );
        cycle(&mut slave, 1, &write_beat(desc, 0, 1, false));
        cycle(&mut slave, 2, &write_beat(desc, 1, 2, true));
        let b = cycle(&mut slave, 3, &BurstRequest { bready: true, ..BurstRequest::default() });
        assert!(b.b.valid);
        assert_eq!(b.b.resp, Response::SlaveError);
    }

    #[test]
    fn test_missing_last_on_final_beat_is_a_slave_error() {
        let mut slave = ram();
        let desc = BurstDescriptor::new(2, 0x1000_0010, 2, BeatSize::B4, BurstMode::Incrementing)
            .expect("valid burst");
        let aw = BurstRequest {
            aw: BurstAddress { valid: true, desc },
            ..BurstRequest::default()
        };
        cycle(&mut slave, 0, &aw);
        cycle(&mut slave, 1, &write_beat(desc, 0, 0xA, false));
        assert!(cycle(&mut slave, 2, &write_beat(desc, 1, 0xB, false)).wready);
        let b = cycle(&mut slave, 3, &BurstRequest { bready: true, ..BurstRequest::default() });
        assert!(b.b.valid);
        assert_eq!(b.b.id, 2);
        assert_eq!(b.b.resp, Response::SlaveError);
        // The beats were still written, and the slave is ready for the
        // next burst.
        assert_eq!(slave.storage.read(0x10), 0xA);
        assert_eq!(slave.storage.read(0x14), 0xB);
        assert!(cycle(&mut slave, 4, &aw).awready);
    }

    #[test]
    fn test_wide_beat_uses_all_lanes() {
        let mut slave = ram();
        let desc = BurstDescriptor::new(0, 0x1000_0080, 1, BeatSize::B128, BurstMode::Incrementing)
            .expect("valid burst");
        let mut data = Line::ZERO;
        for i in 0..32u32 {
            data.set_word_at(i * 4, i * 3);
        }
        cycle(
            &mut slave,
            0,
            &BurstRequest {
                aw: BurstAddress { valid: true, desc },
                ..BurstRequest::default()
            },
        );
        cycle(
            &mut slave,
            1,
            &BurstRequest {
                w: BurstWriteData {
                    valid: true,
                    data,
                    strobe: u128::MAX,
                    last: true,
                },
                ..BurstRequest::default()
            },
        );
        assert_eq!(slave.storage.read(0x80), 0);
        assert_eq!(slave.storage.read(0x84), 3);
        assert_eq!(slave.storage.read(0xFC), 93);
    }
}
