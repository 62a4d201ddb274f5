//! The burst protocol: 1024-bit data, multi-beat transactions with IDs.
use base::prelude::*;

use super::{Handshakes, Merge, Protocol, Route};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstAddress {
    pub valid: bool,
    pub desc: BurstDescriptor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstWriteData {
    pub valid: bool,
    pub data: Line,
    /// One bit per byte lane of `data`.
    pub strobe: u128,
    pub last: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstWriteResponse {
    pub valid: bool,
    pub id: u8,
    pub resp: Response,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstReadData {
    pub valid: bool,
    pub id: u8,
    pub data: Line,
    pub resp: Response,
    pub last: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstRequest {
    pub aw: BurstAddress,
    pub w: BurstWriteData,
    pub bready: bool,
    pub ar: BurstAddress,
    pub rready: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstResponse {
    pub awready: bool,
    pub wready: bool,
    pub b: BurstWriteResponse,
    pub arready: bool,
    pub r: BurstReadData,
}

#[derive(Debug)]
pub struct Burst;

impl Protocol for Burst {
    type Request = BurstRequest;
    type Response = BurstResponse;

    fn write_address(req: &BurstRequest) -> Option<u32> {
        req.aw.valid.then_some(req.aw.desc.address)
    }

    fn read_address(req: &BurstRequest) -> Option<u32> {
        req.ar.valid.then_some(req.ar.desc.address)
    }

    fn route(req: &BurstRequest, route: Route) -> BurstRequest {
        BurstRequest {
            aw: BurstAddress {
                valid: req.aw.valid && route.write_address,
                ..req.aw
            },
            w: BurstWriteData {
                valid: req.w.valid && route.write_data,
                ..req.w
            },
            bready: req.bready && route.write_response,
            ar: BurstAddress {
                valid: req.ar.valid && route.read_address,
                ..req.ar
            },
            rready: req.rready && route.read_data,
        }
    }

    fn merge(parts: Merge<'_, BurstResponse>) -> BurstResponse {
        BurstResponse {
            awready: parts.write_address.is_some_and(|r| r.awready),
            wready: parts.write_data.is_some_and(|r| r.wready),
            b: parts.write_response.map(|r| r.b).unwrap_or_default(),
            arready: parts.read_address.is_some_and(|r| r.arready),
            r: parts.read_data.map(|r| r.r).unwrap_or_default(),
        }
    }

    fn handshakes(req: &BurstRequest, resp: &BurstResponse) -> Handshakes {
        Handshakes {
            write_address: (req.aw.valid && resp.awready).then_some(req.aw.desc.address),
            write_data: (req.w.valid && resp.wready).then_some(req.w.last),
            write_response: (resp.b.valid && req.bready).then_some(resp.b.resp),
            read_address: (req.ar.valid && resp.arready).then_some(req.ar.desc.address),
            read_data: (resp.r.valid && req.rready).then_some((resp.r.last, resp.r.resp)),
        }
    }
}

#[test]
fn test_read_completes_only_on_last_beat() {
    let req = BurstRequest {
        rready: true,
        ..BurstRequest::default()
    };
    let mut resp = BurstResponse::default();
    resp.r.valid = true;
    assert!(!Burst::handshakes(&req, &resp).read_complete());
    resp.r.last = true;
    assert!(Burst::handshakes(&req, &resp).read_complete());
}
