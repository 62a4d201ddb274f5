//! Split-phase bus protocols.
//!
//! Both buses have five channels: write address, write data, write
//! response, read address and read data.  Each channel carries a
//! `valid` signal driven by its source and a `ready` signal driven by
//! its sink; a transfer happens on a cycle where both are asserted.
//!
//! Two protocols are modelled:
//!
//! - [`Lite`]: 32-bit data, one beat per transaction, no IDs.
//! - [`Burst`]: 1024-bit data, up to 256 beats per transaction, with
//!   transaction IDs and an explicit last-beat flag.
//!
//! The interconnect is generic over [`Protocol`]; it only needs to know
//! how to find the addresses in a request, how to mask a request so
//! that a slave sees no valid signals on channels not routed to it,
//! how to assemble the response seen by the requester from the
//! responses of the selected slaves, and which handshakes completed.
use std::fmt::Debug;

use serde::Serialize;

use base::prelude::*;

use super::context::Context;

mod burst;
mod lite;

pub use burst::*;
pub use lite::*;

/// Which channels of a request are routed to a particular slave.  A
/// slave sees `valid` (or `ready`, for the response channels)
/// deasserted on every channel not routed to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Route {
    pub write_address: bool,
    pub write_data: bool,
    pub write_response: bool,
    pub read_address: bool,
    pub read_data: bool,
}

impl Route {
    pub fn is_empty(&self) -> bool {
        *self == Route::default()
    }
}

/// For each channel, the slave response from which the requester-side
/// signals of that channel are taken.  `None` means the channel is
/// not connected to any slave this cycle, so the requester sees the
/// default (deasserted) signals.
#[derive(Debug, Clone, Copy)]
pub struct Merge<'a, R> {
    pub write_address: Option<&'a R>,
    pub write_data: Option<&'a R>,
    pub write_response: Option<&'a R>,
    pub read_address: Option<&'a R>,
    pub read_data: Option<&'a R>,
}

impl<R> Default for Merge<'_, R> {
    fn default() -> Self {
        Merge {
            write_address: None,
            write_data: None,
            write_response: None,
            read_address: None,
            read_data: None,
        }
    }
}

/// A handshake completed on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhaseEvent {
    WriteAddress { addr: u32 },
    WriteData { last: bool },
    WriteResponse { resp: Response },
    ReadAddress { addr: u32 },
    ReadData { last: bool, resp: Response },
}

/// The handshakes which completed during one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Handshakes {
    /// Address of the accepted write address phase.
    pub write_address: Option<u32>,
    /// The `last` flag of the accepted write data beat.
    pub write_data: Option<bool>,
    pub write_response: Option<Response>,
    pub read_address: Option<u32>,
    /// The `last` flag and status of the accepted read data beat.
    pub read_data: Option<(bool, Response)>,
}

impl Handshakes {
    /// True when the final read data beat of a transaction was accepted.
    pub fn read_complete(&self) -> bool {
        matches!(self.read_data, Some((true, _)))
    }

    pub fn write_complete(&self) -> bool {
        self.write_response.is_some()
    }

    /// The events in channel order.
    pub fn events(&self) -> Vec<PhaseEvent> {
        let mut events = Vec::new();
        if let Some(addr) = self.write_address {
            events.push(PhaseEvent::WriteAddress { addr });
        }
        if let Some(last) = self.write_data {
            events.push(PhaseEvent::WriteData { last });
        }
        if let Some(resp) = self.write_response {
            events.push(PhaseEvent::WriteResponse { resp });
        }
        if let Some(addr) = self.read_address {
            events.push(PhaseEvent::ReadAddress { addr });
        }
        if let Some((last, resp)) = self.read_data {
            events.push(PhaseEvent::ReadData { last, resp });
        }
        events
    }
}

pub trait Protocol: 'static {
    /// Signals driven by the requester (address/data valids, response
    /// readies).
    type Request: Clone + Default + Debug;
    /// Signals driven by the slave (address/data readies, response
    /// valids and payloads).
    type Response: Clone + Default + Debug;

    /// The address of the write address phase, if one is being
    /// presented.
    fn write_address(req: &Self::Request) -> Option<u32>;

    /// The address of the read address phase, if one is being
    /// presented.
    fn read_address(req: &Self::Request) -> Option<u32>;

    /// The request as seen by a slave to which only the channels in
    /// `route` are connected.  Payloads are fanned out unchanged; only
    /// the handshake signals are masked.
    fn route(req: &Self::Request, route: Route) -> Self::Request;

    /// Assemble the response seen by the requester.
    fn merge(parts: Merge<'_, Self::Response>) -> Self::Response;

    /// Determine which handshakes complete given the request and the
    /// response on the same wires.
    fn handshakes(req: &Self::Request, resp: &Self::Response) -> Handshakes;
}

/// A device attached to one port of the interconnect.
///
/// The simulation uses a two-phase clock.  In the first phase every
/// component computes its combinational outputs from its current state
/// and its current inputs; [`Slave::outputs`] must not change any
/// state.  In the second phase [`Slave::clock`] computes the registered
/// state for the next cycle from the current state and the inputs and
/// outputs of this cycle (all of which were computed in the first
/// phase).  Since a slave never observes another component's state,
/// the order in which components are clocked does not matter.
pub trait Slave<P: Protocol> {
    fn outputs(&self, req: &P::Request) -> P::Response;
    fn clock(&mut self, ctx: &Context, req: &P::Request, resp: &P::Response);
    /// Return to the power-on state, abandoning any transaction in
    /// progress.  Storage contents are not affected.
    fn reset(&mut self);
    fn name(&self) -> String;
}
