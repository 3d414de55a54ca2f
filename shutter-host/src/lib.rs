//! Shutter Remote Host Backends
//!
//! Runs the remote's control logic on a desktop. BLE goes through
//! `btleplug`, IR is logged instead of emitted, and the configuration lives
//! in a JSON file.
//!
//! # Example
//!
//! ```ignore
//! use shutter_host::{ble, ir::DryRunIr, peripheral::UnsupportedPeripheral, store};
//! use shutter_mcu::{CommandDispatcher, EventQueue};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = store::load_or_create(&home.join("config.json"))?;
//!     let events = EventQueue::new();
//!     let central = ble::HostCentral::new(events.sink()).await?;
//!     let mut remote = CommandDispatcher::new(
//!         &config, DryRunIr::default(), central, UnsupportedPeripheral, events,
//!     )?;
//!     remote.start();
//!     Ok(())
//! }
//! ```

pub mod ble;
pub mod error;
pub mod ir;
pub mod peripheral;
pub mod store;

pub use error::HostError;
