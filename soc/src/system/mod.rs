//! The two top-level systems.
//!
//! [`System`] connects a requester through the bus adapter to the
//! lite interconnect, which serves program storage, data storage and
//! the compute engine.  [`BurstSystem`] connects a burst master to the
//! burst interconnect, which serves the same windows with burst
//! storage and the queued compute engine.
//!
//! Each call to `tick` simulates one clock cycle in two phases.
//! First every signal of the cycle is computed from the current
//! state of the components, in the order in which the signals depend
//! on each other.  Then every component updates its state from its
//! own state and those signals.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use tracing::{event, span, Level};

use crate::adapter::BusAdapter;
use crate::bus::{Burst, Lite, Protocol, Slave};
use crate::config::{ConfigError, SystemConfig, UnmappedPolicy};
use crate::context::Context;
use crate::device::{BurstDecodeError, BurstStorageSlave, LiteDecodeError, StorageSlave, WordStorage};
use crate::engine::{ComputeEngine, QueuedEngine};
use crate::host::{Requester, ScriptedHost};
use crate::interconnect::Interconnect;
use crate::master::BurstMaster;
use crate::monitor::PhaseLog;


/// Interconnect port numbers of the slaves.  Both interconnects attach
/// the slaves in this order.
pub const PROGRAM_PORT: usize = 0;
pub const DATA_PORT: usize = 1;
pub const ENGINE_PORT: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// The system still had work in progress when the cycle budget was
    /// used up.
    Stalled { cycle: u64 },
}

impl Display for RunError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            RunError::Stalled { cycle } => {
                write!(f, "system was still busy at cycle {cycle}")
            }
        }
    }
}

impl Error for RunError {}

fn default_slave<P, S>(config: &SystemConfig, make: fn() -> S) -> Option<Box<dyn Slave<P>>>
where
    P: Protocol,
    S: Slave<P> + 'static,
{
    match config.unmapped {
        UnmappedPolicy::Stall => None,
        UnmappedPolicy::DecodeError => Some(Box::new(make())),
    }
}

/// Attaches the program, data and engine slaves at [`PROGRAM_PORT`],
/// [`DATA_PORT`] and [`ENGINE_PORT`].
fn lite_interconnect(config: &SystemConfig) -> Result<Interconnect<Lite>, ConfigError> {
    config.validate()?;
    let (program, data, engine) = (config.program_window, config.data_window, config.engine_window);
    let program_slave: Box<dyn Slave<Lite>> = Box::new(StorageSlave::new(
        "program",
        program,
        WordStorage::rom(program.size, &config.program_image),
        config.storage_latency,
    ));
    let data_slave: Box<dyn Slave<Lite>> = Box::new(StorageSlave::new(
        "data",
        data,
        WordStorage::ram(data.size),
        config.storage_latency,
    ));
    let engine_slave: Box<dyn Slave<Lite>> = Box::new(ComputeEngine::new(engine, config.engine));
    Interconnect::new(
        vec![(program, program_slave), (data, data_slave), (engine, engine_slave)],
        default_slave(config, LiteDecodeError::new),
    )
    .map_err(ConfigError::from)
}

/// The burst counterpart of [`lite_interconnect`].
fn burst_interconnect(config: &SystemConfig) -> Result<Interconnect<Burst>, ConfigError> {
    config.validate()?;
    let (program, data, engine) = (config.program_window, config.data_window, config.engine_window);
    let program_slave: Box<dyn Slave<Burst>> = Box::new(BurstStorageSlave::new(
        "program",
        program,
        WordStorage::rom(program.size, &config.program_image),
        config.storage_latency,
    ));
    let data_slave: Box<dyn Slave<Burst>> = Box::new(BurstStorageSlave::new(
        "data",
        data,
        WordStorage::ram(data.size),
        config.storage_latency,
    ));
    let engine_slave: Box<dyn Slave<Burst>> = Box::new(QueuedEngine::new(engine, config.engine));
    Interconnect::new(
        vec![(program, program_slave), (data, data_slave), (engine, engine_slave)],
        default_slave(config, BurstDecodeError::new),
    )
    .map_err(ConfigError::from)
}

/// The lite system.
#[derive(Debug)]
pub struct System<H: Requester = ScriptedHost> {
    cycle: u64,
    host: H,
    adapter: BusAdapter,
    interconnect: Interconnect<Lite>,
    log: PhaseLog,
}

impl<H: Requester> System<H> {
    pub fn new(config: &SystemConfig, host: H) -> Result<System<H>, ConfigError> {
        Ok(System {
            cycle: 0,
            host,
            adapter: BusAdapter::new(),
            interconnect: lite_interconnect(config)?,
            log: PhaseLog::new(),
        })
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn interconnect(&self) -> &Interconnect<Lite> {
        &self.interconnect
    }

    pub fn phase_log(&self) -> &PhaseLog {
        &self.log
    }

    /// True when the host has nothing more to issue and no
    /// transaction is in progress.
    pub fn is_idle(&self) -> bool {
        self.host.is_idle() && self.adapter.is_idle() && !self.interconnect.is_busy()
    }

    pub fn tick(&mut self) {
        let span = span!(Level::INFO, "tick", cycle = self.cycle);
        let _enter = span.enter();
        let ctx = Context::new(self.cycle);

        let host_req = self.host.request();
        let bus_req = self.adapter.bus_outputs();
        let routed = self.interconnect.outputs(&bus_req);
        let host_resp = self.adapter.host_response(&routed.merged);
        let hs = Lite::handshakes(&bus_req, &routed.merged);
        event!(Level::TRACE, "request {:?}, response {:?}", bus_req, routed.merged);
        self.log.record(self.cycle, &hs);

        self.host.clock(&ctx, &host_resp);
        self.adapter.clock(&ctx, &host_req, &bus_req, &routed.merged);
        self.interconnect.clock(&ctx, &bus_req, &routed);
        self.cycle += 1;
    }

    /// Tick until the system is idle, returning the number of cycles
    /// simulated.
    pub fn run_until_idle(&mut self, max_cycles: u64) -> Result<u64, RunError> {
        let start = self.cycle;
        while !self.is_idle() {
            if self.cycle - start >= max_cycles {
                return Err(RunError::Stalled { cycle: self.cycle });
            }
            self.tick();
        }
        Ok(self.cycle - start)
    }

    /// Return every component to its initial state, abandoning the
    /// transaction in progress.  Storage contents and the phase log
    /// are kept.
    pub fn reset(&mut self) {
        event!(Level::INFO, "cycle {}: reset", self.cycle);
        self.host.reset();
        self.adapter.reset();
        self.interconnect.reset();
    }
}

/// The burst system.
#[derive(Debug)]
pub struct BurstSystem {
    cycle: u64,
    master: BurstMaster,
    interconnect: Interconnect<Burst>,
    log: PhaseLog,
}

impl BurstSystem {
    pub fn new(config: &SystemConfig, master: BurstMaster) -> Result<BurstSystem, ConfigError> {
        Ok(BurstSystem {
            cycle: 0,
            master,
            interconnect: burst_interconnect(config)?,
            log: PhaseLog::new(),
        })
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn master(&self) -> &BurstMaster {
        &self.master
    }

    pub fn master_mut(&mut self) -> &mut BurstMaster {
        &mut self.master
    }

    pub fn interconnect(&self) -> &Interconnect<Burst> {
        &self.interconnect
    }

    pub fn phase_log(&self) -> &PhaseLog {
        &self.log
    }

    pub fn is_idle(&self) -> bool {
        self.master.is_idle() && !self.interconnect.is_busy()
    }

    pub fn tick(&mut self) {
        let span = span!(Level::INFO, "tick", cycle = self.cycle);
        let _enter = span.enter();
        let ctx = Context::new(self.cycle);

        let bus_req = self.master.outputs();
        let routed = self.interconnect.outputs(&bus_req);
        let hs = Burst::handshakes(&bus_req, &routed.merged);
        self.log.record(self.cycle, &hs);

        self.master.clock(&ctx, &bus_req, &routed.merged);
        self.interconnect.clock(&ctx, &bus_req, &routed);
        self.cycle += 1;
    }

    pub fn run_until_idle(&mut self, max_cycles: u64) -> Result<u64, RunError> {
        let start = self.cycle;
        while !self.is_idle() {
            if self.cycle - start >= max_cycles {
                return Err(RunError::Stalled { cycle: self.cycle });
            }
            self.tick();
        }
        Ok(self.cycle - start)
    }

    pub fn reset(&mut self) {
        event!(Level::INFO, "cycle {}: reset", self.cycle);
        self.master.reset();
        self.interconnect.reset();
    }
}
