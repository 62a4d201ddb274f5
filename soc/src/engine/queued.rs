//! The queued compute engine on the burst bus.
//!
//! In addition to the register block of the lite engine, this engine
//! has two operand queues and a result queue.  Words written to the
//! push registers enter the operand queues.  Whenever both operand
//! queues are non-empty and the result queue has room, the engine
//! takes one word from each operand queue, performs the operation
//! selected by the opcode and precision registers, and appends the
//! result to the result queue.  Reading the pop register removes the
//! oldest result.
//!
//! A write beat which would overflow an operand queue is not accepted
//! until there is room, and a read beat of the pop register is not
//! presented until a result is available.
use tracing::{event, Level};

use base::prelude::*;

use super::fifo::BoundedFifo;
use super::{
    EngineConfig, RegisterFile, REG_LEVELS, REG_POP_RESULT, REG_PUSH_A, REG_PUSH_B,
};
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
    Respond {
        id: u8,
        resp: Response,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Idle,
    Data { desc: BurstDescriptor, beat: u16 },
}

/// The addresses of the 32-bit words covered by one beat.  A beat
/// narrower than a word covers the word containing it.
fn beat_words(desc: &BurstDescriptor, beat: u16) -> impl Iterator<Item = u32> {
    let first = desc.beat_address(beat) & !3;
    let count = (desc.size.bytes() / 4).max(1);
    (0..count).map(move |k| first.wrapping_add(4 * k))
}

/// The byte enables of the word at `addr` within a beat's strobe.
fn word_enables(strobe: u128, addr: u32) -> u8 {
    ((strobe >> Line::lane_of(addr)) & 0xF) as u8
}

#[derive(Debug)]
pub struct QueuedEngine {
    window: Window,
    config: EngineConfig,
    regs: RegisterFile,
    operands_a: BoundedFifo<u32>,
    operands_b: BoundedFifo<u32>,
    results: BoundedFifo<u32>,
    write: WriteState,
    read: ReadState,
}

impl QueuedEngine {
    pub fn new(window: Window, config: EngineConfig) -> QueuedEngine {
        QueuedEngine {
            window,
            config,
            regs: RegisterFile::default(),
            operands_a: BoundedFifo::new(config.fifo_depth),
            operands_b: BoundedFifo::new(config.fifo_depth),
            results: BoundedFifo::new(config.fifo_depth),
            write: WriteState::Idle,
            read: ReadState::Idle,
        }
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// The number of words in the A, B and result queues.
    pub fn levels(&self) -> (usize, usize, usize) {
        (
            self.operands_a.len(),
            self.operands_b.len(),
            self.results.len(),
        )
    }

    fn levels_register(&self) -> u32 {
        let (a, b, r) = self.levels();
        let clamp = |n: usize| u32::try_from(n.min(0xFF)).unwrap_or(0xFF);
        clamp(a) | (clamp(b) << 8) | (clamp(r) << 16)
    }

    /// The number of words a write beat pushes onto each operand queue.
    fn pushes(&self, desc: &BurstDescriptor, beat: u16, strobe: u128) -> (usize, usize) {
        let mut counts = (0, 0);
        for addr in beat_words(desc, beat) {
            if word_enables(strobe, addr) == 0 {
                continue;
            }
            match self.window.offset_of(addr) {
                REG_PUSH_A => counts.0 += 1,
                REG_PUSH_B => counts.1 += 1,
                _ => (),
            }
        }
        counts
    }

    /// The number of results a read beat pops.
    fn pops(&self, desc: &BurstDescriptor, beat: u16) -> usize {
        beat_words(desc, beat)
            .filter(|addr| self.window.offset_of(*addr) == REG_POP_RESULT)
            .count()
    }

    fn read_beat(&self, desc: &BurstDescriptor, beat: u16) -> Line {
        let mut line = Line::ZERO;
        let mut popped = 0;
        for addr in beat_words(desc, beat) {
            let value = match self.window.offset_of(addr) {
                REG_POP_RESULT => {
                    let value = self.results.peek(popped).copied().unwrap_or(0);
                    popped += 1;
                    value
                }
                REG_LEVELS => self.levels_register(),
                offset => self.regs.read(offset),
            };
            line.set_word_at(addr, value);
        }
        line
    }

    fn write_beat(&mut self, ctx: &Context, desc: &BurstDescriptor, beat: u16, data: &Line, strobe: u128) {
        for addr in beat_words(desc, beat) {
            let enables = word_enables(strobe, addr);
            if enables == 0 {
                continue;
            }
            let value = merge_bytes(0, data.word_at(addr), enables);
            let pushed = match self.window.offset_of(addr) {
                REG_PUSH_A => Some(self.operands_a.push(value)),
                REG_PUSH_B => Some(self.operands_b.push(value)),
                offset => {
                    self.regs.write(offset, value, enables);
                    None
                }
            };
            match pushed {
                Some(Ok(())) => event!(
                    Level::TRACE,
                    "cycle {}: pushed {:#010x} via {:#010x}",
                    ctx.cycle,
                    value,
                    addr
                ),
                Some(Err(e)) => event!(
                    Level::ERROR,
                    "cycle {}: dropped operand {:#010x}: {}",
                    ctx.cycle,
                    e.0,
                    e
                ),
                None => (),
            }
        }
    }

    /// Take one word from each operand queue and queue the result.
    fn compute_step(&mut self, ctx: &Context) {
        let (Some(a), Some(b)) = (self.operands_a.pop(), self.operands_b.pop()) else {
            return;
        };
        let (result, unsupported) = self
            .config
            .evaluate(self.regs.opcode, self.regs.precision, a, b);
        self.regs.unsupported = unsupported;
        event!(
            Level::TRACE,
            "cycle {}: queued op {:#010x}, {:#010x} -> {:#010x}",
            ctx.cycle,
            a,
            b,
            result
        );
        if let Err(e) = self.results.push(result) {
            event!(
                Level::ERROR,
                "cycle {}: dropped result {:#010x}: {}",
                ctx.cycle,
                e.0,
                e
            );
        }
    }

    fn next_write_state(&mut self, ctx: &Context, req: &BurstRequest, resp: &BurstResponse) -> WriteState {
        match self.write {
            WriteState::Idle if req.aw.valid && resp.awready => {
                event!(
                    Level::DEBUG,
                    "cycle {}: engine accepted write burst {:?}",
                    ctx.cycle,
                    req.aw.desc
                );
                WriteState::Data {
                    desc: req.aw.desc,
                    beat: 0,
                    resp: Response::Okay,
                }
            }
            WriteState::Data { desc, beat, resp: status } if req.w.valid && resp.wready => {
                self.write_beat(ctx, &desc, beat, &req.w.data, req.w.strobe);
                let final_beat = desc.is_last(beat);
                let mut status = status;
                if req.w.last != final_beat {
                    event!(
                        Level::ERROR,
                        "cycle {}: engine burst {:?}: beat {} has last={} but the burst has {} beats",
                        ctx.cycle,
                        desc,
                        beat,
                        req.w.last,
                        desc.len
                    );
                    status = Response::SlaveError;
                }
                if req.w.last || final_beat {
                    WriteState::Respond {
                        id: desc.id,
                        resp: status,
                    }
                } else {
                    WriteState::Data {
                        desc,
                        beat: beat + 1,
                        resp: status,
                    }
                }
            }
            WriteState::Respond { .. } if req.bready => WriteState::Idle,
            unchanged => unchanged,
        }
    }

    fn next_read_state(&self, ctx: &Context, req: &BurstRequest, resp: &BurstResponse) -> ReadState {
        match self.read {
            ReadState::Idle if req.ar.valid && resp.arready => {
                event!(
                    Level::DEBUG,
                    "cycle {}: engine accepted read burst {:?}",
                    ctx.cycle,
                    req.ar.desc
                );
                ReadState::Data {
                    desc: req.ar.desc,
                    beat: 0,
                }
            }
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

impl Slave<Burst> for QueuedEngine {
    fn outputs(&self, req: &BurstRequest) -> BurstResponse {
        let wready = match self.write {
            WriteState::Data { desc, beat, .. } => {
                let (a, b) = self.pushes(&desc, beat, req.w.strobe);
                a <= self.operands_a.free() && b <= self.operands_b.free()
            }
            _ => false,
        };
        let mut resp = BurstResponse {
            awready: self.write == WriteState::Idle,
            wready,
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
            if self.pops(&desc, beat) <= self.results.len() {
                resp.r = BurstReadData {
                    valid: true,
                    id: desc.id,
                    data: self.read_beat(&desc, beat),
                    resp: Response::Okay,
                    last: desc.is_last(beat),
                };
            }
        }
        resp
    }

    fn clock(&mut self, ctx: &Context, req: &BurstRequest, resp: &BurstResponse) {
        // Decisions are taken on the state at the start of the cycle.
        let popped = match self.read {
            ReadState::Data { desc, beat } if resp.r.valid && req.rready => self.pops(&desc, beat),
            _ => 0,
        };
        let can_compute = !self.operands_a.is_empty()
            && !self.operands_b.is_empty()
            && !self.results.is_full();

        self.regs.step(&self.config, ctx.cycle);
        for _ in 0..popped {
            self.results.pop();
        }
        if can_compute {
            self.compute_step(ctx);
        }
        let read = self.next_read_state(ctx, req, resp);
        self.write = self.next_write_state(ctx, req, resp);
        self.read = read;
    }

    fn reset(&mut self) {
        self.regs = RegisterFile::default();
        self.operands_a.clear();
        self.operands_b.clear();
        self.results.clear();
        self.write = WriteState::Idle;
        self.read = ReadState::Idle;
    }

    fn name(&self) -> String {
        "engine".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::super::{REG_OPCODE, REG_PRECISION, REG_RESULT, REG_START, REG_STATUS, STATUS_DONE};
    use super::*;
    use crate::bus::{BurstAddress, BurstWriteData};

    const BASE: u32 = 0x2000_0000;

    struct Bench {
        engine: QueuedEngine,
        cycle: u64,
    }

    impl Bench {
        fn new(depth: usize) -> Bench {
            let config = EngineConfig {
                fifo_depth: depth,
                ..EngineConfig::default()
            };
            Bench {
                engine: QueuedEngine::new(Window::new(BASE, 0x100), config),
                cycle: 0,
            }
        }

        fn tick(&mut self, req: &BurstRequest) -> BurstResponse {
            let resp = self.engine.outputs(req);
            self.engine.clock(&Context::new(self.cycle), req, &resp);
            self.cycle += 1;
            resp
        }

        fn start_write(&mut self, desc: BurstDescriptor) {
            let aw = BurstRequest {
                aw: BurstAddress { valid: true, desc },
                ..BurstRequest::default()
            };
            assert!(self.tick(&aw).awready);
        }

        /// Offer one write beat; returns whether it was accepted.
        fn offer(&mut self, addr: u32, value: u32, last: bool) -> bool {
            let (data, strobe) = Line::with_word(addr, value);
            let req = BurstRequest {
                w: BurstWriteData {
                    valid: true,
                    data,
                    strobe,
                    last,
                },
                ..BurstRequest::default()
            };
            self.tick(&req).wready
        }

        fn finish_write(&mut self) -> Response {
            let resp = self.tick(&BurstRequest {
                bready: true,
                ..BurstRequest::default()
            });
            assert!(resp.b.valid);
            resp.b.resp
        }

        fn write_words(&mut self, offset: u32, values: &[u32]) {
            let len = u16::try_from(values.len()).expect("short stream");
            let desc = BurstDescriptor::new(0, BASE + offset, len, BeatSize::B4, BurstMode::Fixed)
                .expect("valid burst");
            self.start_write(desc);
            for (i, value) in values.iter().enumerate() {
                assert!(self.offer(BASE + offset, *value, i + 1 == values.len()));
            }
            assert_eq!(self.finish_write(), Response::Okay);
        }

        fn read_words(&mut self, offset: u32, len: u16) -> Vec<u32> {
            let desc = BurstDescriptor::new(1, BASE + offset, len, BeatSize::B4, BurstMode::Fixed)
                .expect("valid burst");
            let ar = BurstRequest {
                ar: BurstAddress { valid: true, desc },
                ..BurstRequest::default()
            };
            assert!(self.tick(&ar).arready);
            let mut words = Vec::new();
            for _ in 0..100 {
                let r = self.tick(&BurstRequest {
                    rready: true,
                    ..BurstRequest::default()
                });
                if r.r.valid {
                    words.push(r.r.data.word_at(BASE + offset));
                    if r.r.last {
                        return words;
                    }
                }
            }
            panic!("read burst did not complete");
        }

        fn configure(&mut self, opcode: Opcode, precision: Precision) {
            self.write_words(REG_OPCODE, &[opcode.code()]);
            self.write_words(REG_PRECISION, &[precision.code()]);
        }
    }

    #[test]
    fn test_results_are_popped_in_order() {
        let mut bench = Bench::new(4);
        bench.configure(Opcode::Sub, Precision::Fp32);
        bench.write_words(REG_PUSH_A, &[10, 20, 30].map(|x: i32| x as f32).map(f32::to_bits));
        bench.write_words(REG_PUSH_B, &[1, 2, 3].map(|x: i32| x as f32).map(f32::to_bits));
        let results: Vec<f32> = bench
            .read_words(REG_POP_RESULT, 3)
            .into_iter()
            .map(f32::from_bits)
            .collect();
        assert_eq!(results, vec![9.0, 18.0, 27.0]);
        assert_eq!(bench.engine.levels(), (0, 0, 0));
    }

    #[test]
    fn test_full_operand_queue_stalls_push() {
        let mut bench = Bench::new(2);
        let desc = BurstDescriptor::new(0, BASE + REG_PUSH_A, 3, BeatSize::B4, BurstMode::Fixed)
            .expect("valid burst");
        bench.start_write(desc);
        assert!(bench.offer(BASE + REG_PUSH_A, 1, false));
        assert!(bench.offer(BASE + REG_PUSH_A, 2, false));
        for _ in 0..5 {
            assert!(!bench.offer(BASE + REG_PUSH_A, 3, true));
        }
        assert_eq!(bench.engine.levels(), (2, 0, 0));
        assert_eq!(bench.engine.levels_register(), 2);
    }

    #[test]
    fn test_compute_waits_for_room_in_result_queue() {
        let mut bench = Bench::new(1);
        bench.configure(Opcode::Add, Precision::Int8x4);
        bench.write_words(REG_PUSH_A, &[0x0102_0304]);
        bench.write_words(REG_PUSH_B, &[0x0101_0101]);
        bench.write_words(REG_PUSH_A, &[0x1000_0000]);
        bench.write_words(REG_PUSH_B, &[0x0100_0000]);
        // One result is queued; the second pair is held back.
        assert_eq!(bench.engine.levels(), (1, 1, 1));
        assert_eq!(bench.read_words(REG_POP_RESULT, 2), vec![0x0203_0405, 0x1100_0000]);
    }

    #[test]
    fn test_pop_waits_for_a_result() {
        let mut bench = Bench::new(2);
        let desc = BurstDescriptor::new(1, BASE + REG_POP_RESULT, 1, BeatSize::B4, BurstMode::Fixed)
            .expect("valid burst");
        let ar = BurstRequest {
            ar: BurstAddress { valid: true, desc },
            rready: true,
            ..BurstRequest::default()
        };
        assert!(bench.tick(&ar).arready);
        let idle = BurstRequest {
            rready: true,
            ..BurstRequest::default()
        };
        for _ in 0..5 {
            assert!(!bench.tick(&idle).r.valid);
        }
    }

    #[test]
    fn test_wide_beat_writes_consecutive_registers() {
        let mut bench = Bench::new(2);
        let desc = BurstDescriptor::new(0, BASE, 1, BeatSize::B16, BurstMode::Incrementing)
            .expect("valid burst");
        bench.start_write(desc);
        let mut data = Line::ZERO;
        data.set_word_at(BASE, 7.0f32.to_bits());
        data.set_word_at(BASE + 4, 5.0f32.to_bits());
        data.set_word_at(BASE + REG_OPCODE, Opcode::Mul.code());
        data.set_word_at(BASE + REG_PRECISION, Precision::Fp32.code());
        let req = BurstRequest {
            w: BurstWriteData {
                valid: true,
                data,
                strobe: 0xFFFF,
                last: true,
            },
            ..BurstRequest::default()
        };
        assert!(bench.tick(&req).wready);
        assert_eq!(bench.finish_write(), Response::Okay);
        let regs = bench.engine.registers();
        assert_eq!(f32::from_bits(regs.operand_a), 7.0);
        assert_eq!(f32::from_bits(regs.operand_b), 5.0);
        assert_eq!(regs.opcode, Opcode::Mul.code());

        bench.write_words(REG_START, &[1]);
        assert_eq!(bench.read_words(REG_STATUS, 1), vec![STATUS_DONE]);
        assert_eq!(f32::from_bits(bench.read_words(REG_RESULT, 1)[0]), 35.0);
    }

    #[test]
    fn test_reset_empties_queues() {
        let mut bench = Bench::new(2);
        bench.write_words(REG_PUSH_A, &[1, 2]);
        bench.engine.reset();
        assert_eq!(bench.engine.levels(), (0, 0, 0));
    }

    #[test]
    fn test_missing_last_on_final_beat_is_a_slave_error() {
        let mut bench = Bench::new(4);
        let desc = BurstDescriptor::new(3, BASE + REG_PUSH_A, 2, BeatSize::B4, BurstMode::Fixed)
            .expect("valid burst");
        bench.start_write(desc);
        assert!(bench.offer(BASE + REG_PUSH_A, 1, false));
        assert!(bench.offer(BASE + REG_PUSH_A, 2, false));
        assert_eq!(bench.finish_write(), Response::SlaveError);
        // Both operands were still queued.
        assert_eq!(bench.engine.levels(), (2, 0, 0));
        // The first of them pairs with the next B operand.
        bench.write_words(REG_PUSH_B, &[5]);
        assert_eq!(bench.engine.levels(), (1, 0, 1));
    }
}
