//! The bus adapter turns requests on the generic request interface
//! into the split phases of the lite bus.
//!
//! A write presents its address and data phases together; they may be
//! accepted on the same cycle or on different cycles, and the adapter
//! waits for the write response only once both have been accepted.  A
//! read presents its address phase and then waits for read data.
//!
//! The adapter's bus outputs depend only on its state.  Every output
//! is deasserted (and its payload zero) outside the state which
//! drives it.
use tracing::{event, Level};

use base::prelude::*;

use crate::bus::{AddressPhase, Lite, LiteRequest, LiteResponse, Protocol, WriteData};
use crate::context::Context;
use crate::host::{HostRequest, HostResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Write {
        txn: Transaction,
        address_done: bool,
        data_done: bool,
    },
    WriteResponse,
    Read {
        txn: Transaction,
    },
    ReadData,
}

#[derive(Debug)]
pub struct BusAdapter {
    state: State,
}

impl Default for BusAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl BusAdapter {
    pub fn new() -> BusAdapter {
        BusAdapter { state: State::Idle }
    }

    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    pub fn bus_outputs(&self) -> LiteRequest {
        match self.state {
            State::Idle => LiteRequest::default(),
            State::Write {
                txn,
                address_done,
                data_done,
            } => LiteRequest {
                aw: if address_done {
                    AddressPhase::default()
                } else {
                    AddressPhase {
                        valid: true,
                        addr: txn.address,
                    }
                },
                w: if data_done {
                    WriteData::default()
                } else {
                    WriteData {
                        valid: true,
                        data: txn.data,
                        strobe: txn.byte_enable,
                    }
                },
                ..LiteRequest::default()
            },
            State::WriteResponse => LiteRequest {
                bready: true,
                ..LiteRequest::default()
            },
            State::Read { txn } => LiteRequest {
                ar: AddressPhase {
                    valid: true,
                    addr: txn.address,
                },
                ..LiteRequest::default()
            },
            State::ReadData => LiteRequest {
                rready: true,
                ..LiteRequest::default()
            },
        }
    }

    /// The response to the requester, given the bus response seen this
    /// cycle.
    pub fn host_response(&self, bus: &LiteResponse) -> HostResponse {
        match self.state {
            State::WriteResponse if bus.b.valid => HostResponse {
                ready: true,
                read_data: 0,
                status: bus.b.resp,
            },
            State::ReadData if bus.r.valid => HostResponse {
                ready: true,
                read_data: bus.r.data,
                status: bus.r.resp,
            },
            _ => HostResponse::default(),
        }
    }

    pub fn clock(&mut self, ctx: &Context, host: &HostRequest, req: &LiteRequest, resp: &LiteResponse) {
        let hs = Lite::handshakes(req, resp);
        let next = match self.state {
            State::Idle if host.valid => {
                let txn = Transaction::from_request(host.address, host.data, host.byte_enable);
                event!(Level::DEBUG, "cycle {}: adapter accepted {:?}", ctx.cycle, txn);
                match txn.direction {
                    Direction::Write => State::Write {
                        txn,
                        address_done: false,
                        data_done: false,
                    },
                    Direction::Read => State::Read { txn },
                }
            }
            State::Write {
                txn,
                address_done,
                data_done,
            } => {
                let address_done = address_done || hs.write_address.is_some();
                let data_done = data_done || hs.write_data.is_some();
                if address_done && data_done {
                    State::WriteResponse
                } else {
                    State::Write {
                        txn,
                        address_done,
                        data_done,
                    }
                }
            }
            State::WriteResponse if hs.write_complete() => State::Idle,
            State::Read { .. } if hs.read_address.is_some() => State::ReadData,
            State::ReadData if hs.read_complete() => State::Idle,
            unchanged => unchanged,
        };
        if next != self.state {
            event!(
                Level::TRACE,
                "cycle {}: adapter {:?} -> {:?}",
                ctx.cycle,
                self.state,
                next
            );
        }
        self.state = next;
    }

    /// Return to the idle state, abandoning any transaction.
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{ReadData, WriteResponse};

    fn clock(adapter: &mut BusAdapter, cycle: u64, host: &HostRequest, resp: &LiteResponse) -> LiteRequest {
        let req = adapter.bus_outputs();
        adapter.clock(&Context::new(cycle), host, &req, resp);
        req
    }

    fn write_request() -> HostRequest {
        HostRequest {
            valid: true,
            address: 0x1000_0004,
            data: 0xCAFE_F00D,
            byte_enable: 0x3,
        }
    }

    #[test]
    fn test_idle_outputs_are_deasserted() {
        let adapter = BusAdapter::new();
        assert_eq!(adapter.bus_outputs(), LiteRequest::default());
        assert_eq!(
            adapter.host_response(&LiteResponse {
                r: ReadData {
                    valid: true,
                    data: 9,
                    resp: Response::Okay,
                },
                ..LiteResponse::default()
            }),
            HostResponse::default()
        );
    }

    #[test]
    fn test_write_phases_complete_separately() {
        let mut adapter = BusAdapter::new();
        let host = write_request();
        clock(&mut adapter, 0, &host, &LiteResponse::default());

        // Only the address phase is accepted.
        let req = clock(
            &mut adapter,
            1,
            &host,
            &LiteResponse {
                awready: true,
                ..LiteResponse::default()
            },
        );
        assert!(req.aw.valid && req.w.valid);
        assert_eq!(req.w.strobe, 0x3);

        // The data phase is still presented, but the address is not.
        let req = clock(
            &mut adapter,
            2,
            &host,
            &LiteResponse {
                wready: true,
                ..LiteResponse::default()
            },
        );
        assert!(!req.aw.valid);
        assert!(req.w.valid);
        assert_eq!(req.w.data, 0xCAFE_F00D);

        let bus = LiteResponse {
            b: WriteResponse {
                valid: true,
                resp: Response::Okay,
            },
            ..LiteResponse::default()
        };
        assert!(adapter.bus_outputs().bready);
        assert!(adapter.host_response(&bus).ready);
        clock(&mut adapter, 3, &host, &bus);
        assert!(adapter.is_idle());
    }

    #[test]
    fn test_read_waits_for_data() {
        let mut adapter = BusAdapter::new();
        let host = HostRequest {
            valid: true,
            address: 0x20,
            ..HostRequest::default()
        };
        clock(&mut adapter, 0, &host, &LiteResponse::default());
        let req = clock(
            &mut adapter,
            1,
            &host,
            &LiteResponse {
                arready: true,
                ..LiteResponse::default()
            },
        );
        assert!(req.ar.valid);
        assert_eq!(req.ar.addr, 0x20);
        for cycle in 2..6 {
            let req = clock(&mut adapter, cycle, &host, &LiteResponse::default());
            assert!(req.rready);
            assert!(!req.ar.valid);
        }
        let bus = LiteResponse {
            r: ReadData {
                valid: true,
                data: 0x77,
                resp: Response::Okay,
            },
            ..LiteResponse::default()
        };
        assert_eq!(adapter.host_response(&bus).read_data, 0x77);
        clock(&mut adapter, 6, &host, &bus);
        assert!(adapter.is_idle());
    }

    #[test]
    fn test_reset_abandons_transaction() {
        let mut adapter = BusAdapter::new();
        clock(&mut adapter, 0, &write_request(), &LiteResponse::default());
        assert!(!adapter.is_idle());
        adapter.reset();
        assert!(adapter.is_idle());
        assert_eq!(adapter.bus_outputs(), LiteRequest::default());
    }
}
