//! The master transaction engine: one clocked state walk per call, from an
//! idle bus back to an idle bus.
//!
//! [`perform`] is the only entry point. It owns the whole phase sequence —
//! address phase, turnaround, DEVSEL#/TRDY# waits, data phase, recovery —
//! and never suspends partway through: once called it runs the bus to a
//! defined outcome before returning, with no cooperative yield points.

use embedded_hal::digital::OutputPin;

use crate::command::{ByteEnable, Command};
use crate::control;
use crate::error::FaultError;
use crate::pins::{ParityPin, Pins, WideBus, WideOutBus};

/// How many clocks after FRAME# the target has to assert DEVSEL#.
const DEVSEL_TIMEOUT: u32 = 4;

/// How many further clocks the target then has to assert TRDY#.
const TRDY_TIMEOUT: u32 = 12;

/// The value a read returns on Master-Abort or Target-Abort, bit-exact with
/// the PCI convention that lets a caller detect "no device" from config
/// register 0.
pub const ABORT_DATA: u32 = 0xFFFF_FFFF;

/// Whether this transaction moves data master→target or target→master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
}

/// The result of a completed [`perform`] call. Only the two recoverable
/// outcomes live here: parity errors, protocol violations, and unimplemented
/// target-retry are fatal and surface as `Err(FaultError)` instead, since
/// there is nothing soft about them to report back to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// The transaction completed normally. For a write this carries no
    /// information beyond "it happened"; callers use [`Self::data`].
    Completed(u32),
    MasterAbort,
    TargetAbort,
}

impl TransactionOutcome {
    /// The 32-bit AD value a read should report: the transferred word, or
    /// [`ABORT_DATA`] on either abort.
    pub fn data(self) -> u32 {
        match self {
            TransactionOutcome::Completed(v) => v,
            TransactionOutcome::MasterAbort | TransactionOutcome::TargetAbort => ABORT_DATA,
        }
    }
}

/// XOR of all bits of `x`: `true` when `x` has an odd number of one bits.
#[inline]
pub const fn parity(x: u32) -> bool {
    x.count_ones() % 2 == 1
}

#[inline(always)]
fn clock_rise<P: Pins>(pins: &mut P) {
    pins.clk().set_high().unwrap();
}

#[inline(always)]
fn clock_fall<P: Pins>(pins: &mut P) {
    pins.clk().set_low().unwrap();
}

#[inline(always)]
fn clock_pulse<P: Pins>(pins: &mut P) {
    clock_rise(pins);
    clock_fall(pins);
}

fn is_config(command: Command) -> bool {
    matches!(command, Command::ConfigRead | Command::ConfigWrite)
}

/// Run one complete master-initiated transaction: address phase through
/// return to idle. Fatal protocol conditions are returned as `Err` rather
/// than handled here; the caller (ordinarily [`crate::bus::Bus`]) is the one
/// that owns the decision to hand them to the fault sink.
pub fn perform<P: Pins>(
    pins: &mut P,
    address: u32,
    command: Command,
    byte_enable: ByteEnable,
    data: u32,
    mode: Mode,
) -> Result<TransactionOutcome, FaultError> {
    if control::is_asserted(pins.frame()) || control::is_asserted(pins.irdy()) {
        return Err(FaultError::ProtocolViolation("FRAME# or IRDY# asserted on idle bus"));
    }

    // --- 1. Address phase ---
    clock_pulse(pins);
    control::assert(pins.frame());
    if is_config(command) {
        pins.idsel().set_high().unwrap();
    }

    pins.ad().output_mode();
    pins.ad().set(address);
    pins.cbe().output_mode();
    pins.cbe().set(command.bits() as u32);
    let addr_par = parity(address) ^ parity(command.bits() as u32);

    // --- 2. Transition to data setup ---
    clock_rise(pins);
    let data_par = match mode {
        Mode::Read => {
            pins.ad().tristate();
            None
        }
        Mode::Write => {
            pins.ad().set(data);
            Some(parity(data) ^ parity(byte_enable.bits() as u32))
        }
    };
    pins.cbe().set(byte_enable.bits() as u32);

    clock_fall(pins);
    control::assert(pins.irdy());
    control::deassert_phase1(pins.frame());
    if is_config(command) {
        pins.idsel().set_low().unwrap();
    }
    pins.par().output_mode();
    pins.par().set(addr_par);

    // --- 3. Wait for DEVSEL# (<=4 additional clocks) ---
    let mut devsel_seen = control::is_asserted(pins.devsel());
    let mut remaining = DEVSEL_TIMEOUT;
    while !devsel_seen {
        clock_rise(pins);
        match mode {
            Mode::Read => pins.par().tristate(),
            Mode::Write => pins.par().set(data_par.unwrap()),
        }
        clock_fall(pins);
        remaining -= 1;
        if remaining == 0 {
            return recover(pins, TransactionOutcome::MasterAbort);
        }
        devsel_seen = control::is_asserted(pins.devsel());
    }

    // --- 4. Wait for TRDY# (<=12 additional clocks) ---
    let mut remaining = TRDY_TIMEOUT;
    while !control::is_asserted(pins.trdy()) {
        if control::is_asserted(pins.stop()) {
            return if control::is_asserted(pins.devsel()) {
                Err(FaultError::UnimplementedRetry)
            } else {
                recover(pins, TransactionOutcome::TargetAbort)
            };
        }

        clock_rise(pins);
        match mode {
            Mode::Read => pins.par().tristate(),
            Mode::Write => pins.par().set(data_par.unwrap()),
        }
        clock_fall(pins);
        remaining -= 1;
        if remaining == 0 {
            return recover(pins, TransactionOutcome::MasterAbort);
        }
    }

    // --- 5. Data phase ---
    let transferred = match mode {
        Mode::Read => {
            let value = pins.ad().get();
            clock_rise(pins);
            pins.par().tristate();
            value
        }
        Mode::Write => {
            clock_rise(pins);
            pins.par().set(data_par.unwrap());
            pins.ad().tristate();
            data
        }
    };
    control::deassert_phase1(pins.irdy());
    control::deassert_phase2(pins.frame());
    WideOutBus::tristate(pins.cbe());
    clock_fall(pins);

    // --- 6. Return to idle ---
    if mode == Mode::Read {
        let observed_par = pins.par().get();
        let expected_par = parity(transferred) ^ parity(byte_enable.bits() as u32);
        clock_rise(pins);
        control::deassert_phase2(pins.irdy());
        pins.par().tristate();
        clock_fall(pins);
        if observed_par != expected_par {
            return Err(FaultError::Parity { par: observed_par, expected: expected_par });
        }
    } else {
        clock_rise(pins);
        control::deassert_phase2(pins.irdy());
        pins.par().tristate();
        clock_fall(pins);
    }

    check_idle_postcondition(pins)?;
    Ok(TransactionOutcome::Completed(transferred))
}

/// Shared abort recovery path: release every control line the master still
/// holds via the full three-step discipline, on the defined clock, then
/// re-verify the idle postcondition before reporting `outcome` back.
fn recover<P: Pins>(pins: &mut P, outcome: TransactionOutcome) -> Result<TransactionOutcome, FaultError> {
    control::deassert_phase1(pins.irdy());
    control::deassert_phase1(pins.frame());
    WideBus::tristate(pins.ad());
    WideOutBus::tristate(pins.cbe());
    pins.par().tristate();
    clock_rise(pins);
    control::deassert_phase2(pins.irdy());
    control::deassert_phase2(pins.frame());
    clock_fall(pins);

    check_idle_postcondition(pins)?;
    Ok(outcome)
}

/// DEVSEL# and TRDY# must both be deasserted once a transaction returns to
/// idle; a violation here is fatal.
fn check_idle_postcondition<P: Pins>(pins: &mut P) -> Result<(), FaultError> {
    if control::is_asserted(pins.devsel()) || control::is_asserted(pins.trdy()) {
        return Err(FaultError::ProtocolViolation("DEVSEL# or TRDY# still asserted on return to idle"));
    }
    Ok(())
}
