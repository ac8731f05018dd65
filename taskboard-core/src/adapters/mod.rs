//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies. The
//! in-memory store backs tests and default wiring; production document
//! stores plug in behind the same port.

pub mod memory;
