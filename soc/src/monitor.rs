//! A record of the handshakes completed on the bus, cycle by cycle.
use serde::Serialize;

use crate::bus::{Handshakes, PhaseEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseRecord {
    pub cycle: u64,
    pub event: PhaseEvent,
}

/// Every handshake since the system was built.  The log is kept across
/// `reset()`, as the requester's completions are, so a report covers the
/// whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseLog {
    records: Vec<PhaseRecord>,
}

impl PhaseLog {
    pub fn new() -> PhaseLog {
        PhaseLog::default()
    }

    pub fn record(&mut self, cycle: u64, hs: &Handshakes) {
        self.records
            .extend(hs.events().into_iter().map(|event| PhaseRecord { cycle, event }));
    }

    pub fn records(&self) -> &[PhaseRecord] {
        &self.records
    }

    /// The events, without their cycle numbers.
    pub fn events(&self) -> Vec<PhaseEvent> {
        self.records.iter().map(|r| r.event).collect()
    }
}

#[test]
fn test_events_are_recorded_in_channel_order() {
    let mut log = PhaseLog::new();
    log.record(
        4,
        &Handshakes {
            write_address: Some(0x10),
            write_data: Some(true),
            ..Handshakes::default()
        },
    );
    log.record(5, &Handshakes::default());
    assert_eq!(
        log.records(),
        &[
            PhaseRecord {
                cycle: 4,
                event: PhaseEvent::WriteAddress { addr: 0x10 }
            },
            PhaseRecord {
                cycle: 4,
                event: PhaseEvent::WriteData { last: true }
            },
        ]
    );
}
