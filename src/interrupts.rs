//! Diagnostic-only interrupt observers.
//!
//! PERR#/SERR# and REQ# are pin-change interrupt sources on the platforms
//! this crate targets, handled by whatever interrupt-controller glue the
//! embedding firmware owns. These two functions are what that glue calls
//! into; neither takes a [`crate::bus::Bus`] or a pin handle; there is no
//! parameter through which an interrupt context could reach the bus, so
//! there is no way for a handler built on top of this to violate the
//! single-owner discipline in [`crate::pins`] even by accident.

/// Snapshot of the two system-error lines sampled at the moment PERR# or
/// SERR# changed level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PerrSerrStatus {
    /// PERR#: the target observed a parity error on the last data phase it
    /// took part in.
    pub perr: bool,
    /// SERR#: a target reported a system error (address parity, or a
    /// catastrophic condition unrelated to this master's own transaction).
    pub serr: bool,
}

/// Call from the platform's PERR#/SERR# pin-change interrupt handler.
///
/// This core does not act on parity or system errors reported this way: the
/// transaction engine already checks parity itself on every data phase it
/// drives, and treats a mismatch as fatal. This observer exists only so the
/// embedding firmware can log or count out-of-band error reports.
pub fn on_perr_serr_change(status: PerrSerrStatus) {
    log::warn!(
        "PERR#/SERR# changed: perr={} serr={}",
        status.perr,
        status.serr
    );
}

/// Call from the platform's REQ# pin-change interrupt handler.
///
/// This master never arbitrates the bus away, so a REQ# assertion is purely
/// informational; the embedding firmware decides what, if anything, to do
/// about another agent wanting the bus.
pub fn on_req_change(asserted: bool) {
    log::debug!("REQ# changed: asserted={}", asserted);
}
