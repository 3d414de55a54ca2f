//! Shutter Remote MCU Library
//!
//! Camera control logic for a handheld remote that fires shutters over
//! infrared and Bluetooth LE.
//!
//! This crate provides:
//! - Camera selection ([`CameraSelector`]) and the transport-agnostic
//!   [`CommandDispatcher`]
//! - Per-transport controllers: IR ([`IrCommandEncoder`]), BLE client
//!   ([`BleConnectionManager`]) and BLE server ([`BlePeripheralRole`])
//! - Pairing policy and session tracking ([`BleSecurityNegotiator`])
//! - Traits for the radio and IR hardware
//!
//! Everything here is synchronous and meant to be driven from one
//! cooperative polling loop. BLE stack callbacks never touch a state machine
//! directly: they push [`StackEvent`]s into an [`EventSink`] and the
//! dispatcher applies them on the next [`CommandDispatcher::poll`].
//!
//! # Example
//!
//! ```ignore
//! let events = EventQueue::new();
//! let central = MyCentral::new(events.sink());
//! let mut remote = CommandDispatcher::new(&config, my_ir, central, my_peripheral, events)?;
//! remote.start();
//!
//! loop {
//!     if let Some(input) = buttons.poll() {
//!         remote.handle_input(input);
//!     }
//!     remote.poll(clock.millis());
//!     display.show(&remote.status_text());
//!     sleep(config.poll_interval_ms);
//! }
//! ```

pub mod ble;
pub mod config;
pub mod connection;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod ir;
pub mod peripheral;
pub mod security;
pub mod selector;
pub mod target;

#[cfg(test)]
pub(crate) mod mock;

pub use ble::*;
pub use config::*;
pub use connection::*;
pub use controller::*;
pub use dispatcher::*;
pub use error::*;
pub use events::*;
pub use ir::*;
pub use peripheral::*;
pub use security::*;
pub use selector::*;
pub use target::*;
