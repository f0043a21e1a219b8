//! Request/response client for a remote cartridge controller.
//!
//! One request register (plus a frame for writes) goes out, one response
//! register (plus a frame for reads) comes back. [`BusClient`] speaks this
//! over a lazily opened socket; [`LoopbackController`] answers in memory.

pub mod bus;
pub mod client;
pub mod config;
pub mod connector;
pub mod error;
pub mod loopback;

pub use bus::{CartBus, Request, Response};
pub use client::BusClient;
pub use config::ClientConfig;
pub use connector::{connect, Connection};
pub use error::{ClientError, Result};
pub use loopback::{Fault, LoopbackController};
