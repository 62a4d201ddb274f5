//! Address decoding, routing and response merging.
//!
//! The interconnect connects the single requester to a number of
//! slaves, each occupying a window of the address space.  An address
//! phase is routed only to the slave whose window contains its
//! address.  When an address phase is accepted, the selected slave is
//! latched until the response of that transaction completes, and
//! while the latch is held no further address phase is routed in the
//! same direction.  Writes and reads have separate latches.
//!
//! An address phase for an address outside every window is routed to
//! the default slave if there is one.  Otherwise no slave sees it and
//! it is never accepted.
use std::fmt::{self, Debug, Formatter};

use tracing::{event, Level};

use base::prelude::*;

use crate::bus::{Merge, Protocol, Route, Slave};
use crate::context::Context;

pub struct AttachedSlave<P: Protocol> {
    inner: Box<dyn Slave<P>>,
    /// None for the default slave.
    pub window: Option<Window>,
}

impl<P: Protocol> Debug for AttachedSlave<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("AttachedSlave")
            .field("inner", &format_args!("<slave: {}>", self.inner.name()))
            .field("window", &self.window)
            .finish()
    }
}

/// The signals of one cycle, as computed in the evaluation phase.
#[derive(Debug)]
pub struct Routed<P: Protocol> {
    /// The request seen by each port.
    pub requests: Vec<P::Request>,
    /// The response produced by each port.
    pub responses: Vec<P::Response>,
    /// The response seen by the requester.
    pub merged: P::Response,
    /// The port to which a write address phase was routed this cycle.
    pub write_target: Option<usize>,
    /// The port to which a read address phase was routed this cycle.
    pub read_target: Option<usize>,
}

#[derive(Debug)]
pub struct Interconnect<P: Protocol> {
    map: MemoryMap,
    ports: Vec<AttachedSlave<P>>,
    default_port: Option<usize>,
    write_selected: Option<usize>,
    read_selected: Option<usize>,
    /// Unmapped addresses we already warned about, so that a stalled
    /// address phase is reported once rather than on every cycle.
    stalled_write: Option<u32>,
    stalled_read: Option<u32>,
}

impl<P: Protocol> Interconnect<P> {
    /// Build an interconnect with one port per slave.  The windows
    /// must not overlap.
    pub fn new(
        slaves: Vec<(Window, Box<dyn Slave<P>>)>,
        default_slave: Option<Box<dyn Slave<P>>>,
    ) -> Result<Interconnect<P>, MemoryMapError> {
        let map = MemoryMap::new(slaves.iter().map(|(w, _)| *w).collect())?;
        let mut ports: Vec<AttachedSlave<P>> = slaves
            .into_iter()
            .map(|(window, inner)| AttachedSlave {
                inner,
                window: Some(window),
            })
            .collect();
        let default_port = default_slave.map(|inner| {
            ports.push(AttachedSlave {
                inner,
                window: None,
            });
            ports.len() - 1
        });
        Ok(Interconnect {
            map,
            ports,
            default_port,
            write_selected: None,
            read_selected: None,
            stalled_write: None,
            stalled_read: None,
        })
    }

    pub fn port_name(&self, port: usize) -> Option<String> {
        self.ports.get(port).map(|p| p.inner.name())
    }

    /// The port latched for the write in progress, if any.
    pub fn write_selected(&self) -> Option<usize> {
        self.write_selected
    }

    /// The port latched for the read in progress, if any.
    pub fn read_selected(&self) -> Option<usize> {
        self.read_selected
    }

    pub fn is_busy(&self) -> bool {
        self.write_selected.is_some() || self.read_selected.is_some()
    }

    fn target(&self, addr: u32) -> Option<usize> {
        self.map.decode(addr).or(self.default_port)
    }

    pub fn outputs(&self, req: &P::Request) -> Routed<P> {
        let write_target = match self.write_selected {
            Some(_) => None,
            None => P::write_address(req).and_then(|addr| self.target(addr)),
        };
        let read_target = match self.read_selected {
            Some(_) => None,
            None => P::read_address(req).and_then(|addr| self.target(addr)),
        };
        // Write data follows the latched slave, or the slave being
        // addressed when the data is presented with its address.
        let data_target = self.write_selected.or(write_target);

        let requests: Vec<P::Request> = (0..self.ports.len())
            .map(|i| {
                let route = Route {
                    write_address: write_target == Some(i),
                    write_data: data_target == Some(i),
                    write_response: self.write_selected == Some(i),
                    read_address: read_target == Some(i),
                    read_data: self.read_selected == Some(i),
                };
                P::route(req, route)
            })
            .collect();
        let responses: Vec<P::Response> = self
            .ports
            .iter()
            .zip(requests.iter())
            .map(|(port, r)| port.inner.outputs(r))
            .collect();
        let pick = |port: Option<usize>| port.and_then(|i| responses.get(i));
        let merged = P::merge(Merge {
            write_address: pick(write_target),
            write_data: pick(data_target),
            write_response: pick(self.write_selected),
            read_address: pick(read_target),
            read_data: pick(self.read_selected),
        });
        Routed {
            requests,
            responses,
            merged,
            write_target,
            read_target,
        }
    }

    fn warn_unmapped(&mut self, ctx: &Context, req: &P::Request, routed: &Routed<P>) {
        let unmapped = |addr: Option<u32>, target: Option<usize>, latched: Option<usize>| {
            addr.filter(|_| target.is_none() && latched.is_none())
        };
        let write = unmapped(P::write_address(req), routed.write_target, self.write_selected);
        if let Some(addr) = write.filter(|a| self.stalled_write != Some(*a)) {
            event!(
                Level::WARN,
                "cycle {}: write address {:#010x} is not mapped to any slave; the transaction will stall",
                ctx.cycle,
                addr
            );
        }
        self.stalled_write = write;
        let read = unmapped(P::read_address(req), routed.read_target, self.read_selected);
        if let Some(addr) = read.filter(|a| self.stalled_read != Some(*a)) {
            event!(
                Level::WARN,
                "cycle {}: read address {:#010x} is not mapped to any slave; the transaction will stall",
                ctx.cycle,
                addr
            );
        }
        self.stalled_read = read;
    }

    pub fn clock(&mut self, ctx: &Context, req: &P::Request, routed: &Routed<P>) {
        self.warn_unmapped(ctx, req, routed);
        let hs = P::handshakes(req, &routed.merged);
        if hs.write_address.is_some() {
            self.write_selected = routed.write_target;
            event!(
                Level::DEBUG,
                "cycle {}: write latched to port {:?}",
                ctx.cycle,
                self.write_selected
            );
        }
        if hs.write_complete() {
            self.write_selected = None;
        }
        if hs.read_address.is_some() {
            self.read_selected = routed.read_target;
            event!(
                Level::DEBUG,
                "cycle {}: read latched to port {:?}",
                ctx.cycle,
                self.read_selected
            );
        }
        if hs.read_complete() {
            self.read_selected = None;
        }
        for ((port, r), resp) in self
            .ports
            .iter_mut()
            .zip(routed.requests.iter())
            .zip(routed.responses.iter())
        {
            port.inner.clock(ctx, r, resp);
        }
    }

    /// Clear the selection latches and reset every slave.
    pub fn reset(&mut self) {
        self.write_selected = None;
        self.read_selected = None;
        self.stalled_write = None;
        self.stalled_read = None;
        for port in self.ports.iter_mut() {
            port.inner.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{AddressPhase, Lite, LiteRequest, WriteData};
    use crate::device::{LiteDecodeError, StorageSlave, WordStorage};

    fn ram(name: &str, base: u32) -> (Window, Box<dyn Slave<Lite>>) {
        let window = Window::new(base, 0x100);
        let slave = StorageSlave::new(name, window, WordStorage::ram(0x100), 0);
        (window, Box::new(slave))
    }

    fn two_rams(default_slave: Option<Box<dyn Slave<Lite>>>) -> Interconnect<Lite> {
        Interconnect::new(vec![ram("a", 0x1000), ram("b", 0x2000)], default_slave)
            .expect("windows are disjoint")
    }

    fn write(addr: u32, data: u32) -> LiteRequest {
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

    fn read(addr: u32) -> LiteRequest {
        LiteRequest {
            ar: AddressPhase { valid: true, addr },
            rready: true,
            ..LiteRequest::default()
        }
    }

    fn tick(ic: &mut Interconnect<Lite>, cycle: u64, req: &LiteRequest) -> Routed<Lite> {
        let routed = ic.outputs(req);
        ic.clock(&Context::new(cycle), req, &routed);
        routed
    }

    #[test]
    fn test_overlapping_windows_are_rejected() {
        let result = Interconnect::<Lite>::new(vec![ram("a", 0x1000), ram("b", 0x1080)], None);
        assert!(result.is_err());
    }

    #[test]
    fn test_only_the_selected_slave_sees_the_request() {
        let mut ic = two_rams(None);
        let routed = tick(&mut ic, 0, &write(0x2010, 5));
        assert_eq!(routed.write_target, Some(1));
        assert!(!routed.requests[0].aw.valid);
        assert!(!routed.requests[0].w.valid);
        assert!(routed.requests[1].aw.valid);
        assert!(routed.merged.awready);
        assert_eq!(ic.write_selected(), Some(1));
        assert!(ic.is_busy());

        // The write response comes from the latched slave and clears
        // the latch.
        let routed = tick(&mut ic, 1, &LiteRequest { bready: true, ..LiteRequest::default() });
        assert!(routed.merged.b.valid);
        assert!(routed.requests[1].bready);
        assert!(!routed.requests[0].bready);
        assert_eq!(ic.write_selected(), None);
        assert!(!ic.is_busy());
    }

    #[test]
    fn test_no_new_address_phase_while_latched() {
        let mut ic = two_rams(None);
        let slow = read(0x1000);
        let routed = tick(&mut ic, 0, &LiteRequest { rready: false, ..slow });
        assert!(routed.merged.arready);
        // The response is pending; another address phase is not routed.
        let routed = tick(&mut ic, 1, &LiteRequest { rready: false, ..read(0x2000) });
        assert_eq!(routed.read_target, None);
        assert!(!routed.requests[1].ar.valid);
        assert!(!routed.merged.arready);
        assert!(routed.merged.r.valid);
        assert_eq!(ic.read_selected(), Some(0));
        tick(&mut ic, 2, &LiteRequest { rready: true, ..LiteRequest::default() });
        assert_eq!(ic.read_selected(), None);
    }

    #[test]
    fn test_unmapped_address_stalls() {
        let mut ic = two_rams(None);
        for cycle in 0..10 {
            let routed = tick(&mut ic, cycle, &read(0x9000));
            assert!(!routed.merged.arready);
            assert!(routed.requests.iter().all(|r| !r.ar.valid));
        }
        assert!(!ic.is_busy());
    }

    #[test]
    fn test_unmapped_address_decode_error() {
        let mut ic = two_rams(Some(Box::new(LiteDecodeError::new())));
        let routed = tick(&mut ic, 0, &read(0x9000));
        assert_eq!(routed.read_target, Some(2));
        assert!(routed.merged.arready);
        let routed = tick(&mut ic, 1, &read(0x9000));
        assert!(routed.merged.r.valid);
        assert_eq!(routed.merged.r.resp, Response::DecodeError);
        assert_eq!(ic.port_name(2).as_deref(), Some("decode error"));
    }

    #[test]
    fn test_reset_clears_latches() {
        let mut ic = two_rams(None);
        tick(&mut ic, 0, &LiteRequest { rready: false, ..read(0x1000) });
        assert!(ic.is_busy());
        ic.reset();
        assert!(!ic.is_busy());
    }
}
