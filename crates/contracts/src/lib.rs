//! # Contracts
//!
//! Frozen interface contracts (ICD) shared by every crate of the capture workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - `Tick` (the simulator frame number) is the primary clock: one tick is one
//!   fixed simulation step while the world runs in synchronous mode
//! - Simulation timestamps (seconds, f64) are carried for diagnostics only

mod blueprint;
mod error;
mod frame;
mod runtime;
mod sensor;
mod sensor_source;
mod sink;
mod tick;
mod world;

pub use blueprint::*;
pub use error::*;
pub use frame::*;
pub use runtime::*;
pub use sensor::*;
pub use sensor_source::{SensorRecordCallback, SensorSource};
pub use sink::*;
pub use tick::Tick;
pub use world::*;
