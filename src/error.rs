//! Error taxonomy for this core.
//!
//! Soft outcomes (Master-Abort, Target-Abort) are not errors: they are
//! fully-recovered, valid results of [`crate::transaction::perform`] and
//! live in [`crate::transaction::TransactionOutcome`] instead. Everything
//! in [`FaultError`] is fatal and is only ever handed to
//! [`crate::bus::Bus::fault`], which never returns.

/// A fatal protocol condition. Every variant here ends the bus's usable
/// lifetime: the crate's only consumer of this type is the fault sink.
#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum FaultError {
    /// FRAME# or IRDY# was found asserted while the bus was expected idle,
    /// or DEVSEL#/TRDY# was still asserted after a transaction returned to
    /// idle.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// The target-supplied data parity did not match the value this master
    /// computed over the data word and byte-enable mask.
    #[error("parity error: target drove PAR={par}, expected {expected}")]
    Parity { par: bool, expected: bool },

    /// The target asked for Target-Retry. This core does not implement
    /// retry: the commodity NICs it targets never issue one, so recovering
    /// from it was never built.
    #[error("target requested retry, which this core does not implement")]
    UnimplementedRetry,

    /// A 16-bit access was requested at an address whose low two bits are
    /// `01` or `11`.
    #[error("unaligned 16-bit access at address {0:#x}")]
    UnalignedAccess(u32),
}
