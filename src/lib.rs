//! A software-driven, GPIO bit-banged 32-bit PCI bus master.
//!
//! This crate drives every conventional-PCI signal (CLK, FRAME#, IRDY#,
//! TRDY#, DEVSEL#, STOP#, IDSEL, AD\[31:0\], C/BE\[3:0\]#, PAR, RST#) from a
//! microcontroller's GPIO, as the sole bus initiator on a single-slot bus.
//! It performs configuration, I/O, and memory transactions at the protocol
//! level; it does not know anything about a particular target device.
//!
//! The [`Pins`](pins::Pins) trait is the only thing a platform needs to
//! implement to get a working [`Bus`](bus::Bus). Bring one up with
//! [`Bus::initialize`](bus::Bus::initialize), then use its typed accessors
//! (`config_read32`, `io_write16`, `mem_read8`, ...).
//!
//! This crate does not implement bus arbitration, bursting, 64-bit AD,
//! target-retry, or interrupt-driven completion: it is a single-master,
//! single-data-phase engine built for commodity NICs that never ask for
//! any of those.

#![cfg_attr(not(test), no_std)]

#[cfg(test)]
extern crate std;

pub mod bus;
pub mod command;
pub mod control;
pub mod error;
pub mod interrupts;
pub mod pins;
pub mod transaction;

#[cfg(test)]
pub mod mock;

/// Installs `env_logger` for the current test binary. Only the first call
/// actually installs a logger; later calls from other tests in the same
/// binary are no-ops, so every test that wants to see `log::debug!`/
/// `warn!`/`error!` output on failure can call this at its start without
/// worrying about double-init panics.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
            .is_test(true)
            .try_init();
    });
}

pub use bus::Bus;
pub use command::{ByteEnable, Command};
pub use error::FaultError;
pub use interrupts::{on_perr_serr_change, on_req_change, PerrSerrStatus};
pub use pins::Pins;
pub use transaction::{Mode, TransactionOutcome};
