//! The requester side of the generic request interface.
//!
//! The host core itself is outside the simulation; all we model is
//! the sequence of requests it issues.  A requester holds a request
//! valid until the adapter signals that it is complete.  Only one
//! request is outstanding at a time.
use std::collections::VecDeque;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use tracing::{event, Level};

use base::prelude::*;

use crate::context::Context;

/// Signals driven by the requester.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostRequest {
    pub valid: bool,
    pub address: u32,
    pub data: u32,
    /// Zero for a read.
    pub byte_enable: u8,
}

/// Signals driven by the adapter.  `ready` is asserted for one cycle
/// when the request completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostResponse {
    pub ready: bool,
    pub read_data: u32,
    pub status: Response,
}

pub trait Requester {
    /// The request presented this cycle.  Must not change any state.
    fn request(&self) -> HostRequest;
    fn clock(&mut self, ctx: &Context, resp: &HostResponse);
    /// Abandon any request in progress.
    fn reset(&mut self);
    /// True when the requester has nothing further to issue.
    fn is_idle(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HostOp {
    Write {
        address: u32,
        data: u32,
        byte_enable: u8,
    },
    Read {
        address: u32,
    },
}

impl HostOp {
    /// A write of a whole word.
    pub fn write(address: u32, data: u32) -> HostOp {
        HostOp::Write {
            address,
            data,
            byte_enable: 0xF,
        }
    }

    pub fn read(address: u32) -> HostOp {
        HostOp::Read { address }
    }

    pub fn address(&self) -> u32 {
        match self {
            HostOp::Write { address, .. } | HostOp::Read { address } => *address,
        }
    }

    fn to_request(self) -> HostRequest {
        match self {
            HostOp::Write {
                address,
                data,
                byte_enable,
            } => HostRequest {
                valid: true,
                address,
                data,
                byte_enable,
            },
            HostOp::Read { address } => HostRequest {
                valid: true,
                address,
                data: 0,
                byte_enable: 0,
            },
        }
    }
}

impl Display for HostOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            HostOp::Write {
                address,
                data,
                byte_enable,
            } => write!(f, "write {address:#010x} {data:#010x} {byte_enable:#x}"),
            HostOp::Read { address } => write!(f, "read {address:#010x}"),
        }
    }
}

/// A request which was completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub op: HostOp,
    /// Meaningful only for reads.
    pub read_data: u32,
    pub status: Response,
    /// The cycle on which the request was first presented.
    pub issued: u64,
    /// The cycle on which the adapter signalled completion.
    pub completed: u64,
}

/// A requester which issues a fixed list of requests in order.
#[derive(Debug, Default)]
pub struct ScriptedHost {
    pending: VecDeque<HostOp>,
    /// The cycle on which the request at the front of `pending` was
    /// first presented.
    issued: Option<u64>,
    completions: Vec<Completion>,
    abandoned: Vec<HostOp>,
}

impl ScriptedHost {
    pub fn new<I: IntoIterator<Item = HostOp>>(ops: I) -> ScriptedHost {
        ScriptedHost {
            pending: ops.into_iter().collect(),
            ..ScriptedHost::default()
        }
    }

    pub fn push(&mut self, op: HostOp) {
        self.pending.push_back(op);
    }

    pub fn completions(&self) -> &[Completion] {
        &self.completions
    }

    /// Requests which were in progress when the host was reset.
    pub fn abandoned(&self) -> &[HostOp] {
        &self.abandoned
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Requester for ScriptedHost {
    fn request(&self) -> HostRequest {
        self.pending
            .front()
            .map(|op| op.to_request())
            .unwrap_or_default()
    }

    fn clock(&mut self, ctx: &Context, resp: &HostResponse) {
        let Some(op) = self.pending.front().copied() else {
            return;
        };
        let issued = *self.issued.get_or_insert(ctx.cycle);
        if resp.ready {
            event!(
                Level::DEBUG,
                "cycle {}: completed {} (data {:#010x}, {})",
                ctx.cycle,
                op,
                resp.read_data,
                resp.status
            );
            self.completions.push(Completion {
                op,
                read_data: resp.read_data,
                status: resp.status,
                issued,
                completed: ctx.cycle,
            });
            self.pending.pop_front();
            self.issued = None;
        }
    }

    fn reset(&mut self) {
        if self.issued.take().is_some() {
            if let Some(op) = self.pending.pop_front() {
                event!(Level::INFO, "abandoning {} on reset", op);
                self.abandoned.push(op);
            }
        }
    }

    fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_is_held_until_ready() {
        let mut host = ScriptedHost::new([HostOp::write(0x10, 5), HostOp::read(0x10)]);
        let busy = HostResponse::default();
        for cycle in 0..3 {
            let req = host.request();
            assert!(req.valid);
            assert_eq!(req.byte_enable, 0xF);
            host.clock(&Context::new(cycle), &busy);
        }
        let done = HostResponse {
            ready: true,
            ..HostResponse::default()
        };
        host.clock(&Context::new(3), &done);
        assert_eq!(host.request().byte_enable, 0);
        assert_eq!(host.completions().len(), 1);
        assert_eq!(host.completions()[0].issued, 0);
        assert_eq!(host.completions()[0].completed, 3);
        assert!(!host.is_idle());
    }

    #[test]
    fn test_reset_abandons_request_in_progress() {
        let mut host = ScriptedHost::new([HostOp::read(0x10), HostOp::read(0x20)]);
        host.clock(&Context::new(0), &HostResponse::default());
        host.reset();
        assert_eq!(host.abandoned(), &[HostOp::read(0x10)]);
        assert_eq!(host.request().address, 0x20);
        // A request which was never presented is not abandoned.
        host.reset();
        assert_eq!(host.abandoned().len(), 1);
    }

    #[test]
    fn test_idle_host_presents_nothing() {
        let host = ScriptedHost::default();
        assert!(host.is_idle());
        assert_eq!(host.request(), HostRequest::default());
    }
}
