//! The lite protocol: 32-bit data, a single beat per transaction.
use base::prelude::*;

use super::{Handshakes, Merge, Protocol, Route};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressPhase {
    pub valid: bool,
    pub addr: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteData {
    pub valid: bool,
    pub data: u32,
    /// Byte enables; bit 0 selects the least significant byte.
    pub strobe: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteResponse {
    pub valid: bool,
    pub resp: Response,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadData {
    pub valid: bool,
    pub data: u32,
    pub resp: Response,
}

/// Signals driven by the requester side of a lite port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiteRequest {
    pub aw: AddressPhase,
    pub w: WriteData,
    pub bready: bool,
    pub ar: AddressPhase,
    pub rready: bool,
}

/// Signals driven by the slave side of a lite port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiteResponse {
    pub awready: bool,
    pub wready: bool,
    pub b: WriteResponse,
    pub arready: bool,
    pub r: ReadData,
}

#[derive(Debug)]
pub struct Lite;

impl Protocol for Lite {
    type Request = LiteRequest;
    type Response = LiteResponse;

    fn write_address(req: &LiteRequest) -> Option<u32> {
        req.aw.valid.then_some(req.aw.addr)
    }

    fn read_address(req: &LiteRequest) -> Option<u32> {
        req.ar.valid.then_some(req.ar.addr)
    }

    fn route(req: &LiteRequest, route: Route) -> LiteRequest {
        LiteRequest {
            aw: AddressPhase {
                valid: req.aw.valid && route.write_address,
                ..req.aw
            },
            w: WriteData {
                valid: req.w.valid && route.write_data,
                ..req.w
            },
            bready: req.bready && route.write_response,
            ar: AddressPhase {
                valid: req.ar.valid && route.read_address,
                ..req.ar
            },
            rready: req.rready && route.read_data,
        }
    }

    fn merge(parts: Merge<'_, LiteResponse>) -> LiteResponse {
        LiteResponse {
            awready: parts.write_address.is_some_and(|r| r.awready),
            wready: parts.write_data.is_some_and(|r| r.wready),
            b: parts.write_response.map(|r| r.b).unwrap_or_default(),
            arready: parts.read_address.is_some_and(|r| r.arready),
            r: parts.read_data.map(|r| r.r).unwrap_or_default(),
        }
    }

    fn handshakes(req: &LiteRequest, resp: &LiteResponse) -> Handshakes {
        Handshakes {
            write_address: (req.aw.valid && resp.awready).then_some(req.aw.addr),
            write_data: (req.w.valid && resp.wready).then_some(true),
            write_response: (resp.b.valid && req.bready).then_some(resp.b.resp),
            read_address: (req.ar.valid && resp.arready).then_some(req.ar.addr),
            read_data: (resp.r.valid && req.rready).then_some((true, resp.r.resp)),
        }
    }
}

#[test]
fn test_route_masks_only_handshakes() {
    let req = LiteRequest {
        aw: AddressPhase {
            valid: true,
            addr: 0x1000_0000,
        },
        w: WriteData {
            valid: true,
            data: 0x55,
            strobe: 0xF,
        },
        bready: true,
        ar: AddressPhase::default(),
        rready: false,
    };
    let routed = Lite::route(&req, Route::default());
    assert!(!routed.aw.valid);
    assert!(!routed.w.valid);
    assert!(!routed.bready);
    assert_eq!(routed.aw.addr, 0x1000_0000);
    assert_eq!(routed.w.data, 0x55);
    assert_eq!(
        Lite::route(
            &req,
            Route {
                write_address: true,
                ..Route::default()
            }
        )
        .aw,
        req.aw
    );
}

#[test]
fn test_merge_of_nothing_is_idle() {
    assert_eq!(Lite::merge(Merge::default()), LiteResponse::default());
}
