//! A single-threaded discrete-event simulator.
//!
//! All simulated work runs on the thread that drives the [`Simulator`], one event at a time,
//! in timestamp order. Events with equal timestamps run in the order they were scheduled.
//! Other threads take part only by posting events through a [`SimHandle`], which is how
//! blocking I/O happening outside the simulation gets handed into it.

mod scheduler;

pub use scheduler::{Context, EventId, SimHandle, SimTime, Simulator, NO_CONTEXT};
