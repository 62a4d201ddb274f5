//! This module manages the context in which the simulator is
//! performing a single clock cycle.
//!
//! Every registered update happens at a rising clock edge.  The
//! components are told which edge this is so that their log events
//! can be correlated with each other (and with a phase log).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    /// Number of clock edges simulated before this one.
    pub cycle: u64,
}

impl Context {
    #[must_use]
    pub fn new(cycle: u64) -> Context {
        Context { cycle }
    }
}
