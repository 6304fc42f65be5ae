//! The downward-facing GPIO substrate this crate drives.
//!
//! Every PCI signal is grouped by width: [`WideBus`] for the two multi-bit
//! buses (AD, C/BE), [`ControlPin`] for the five open-collector-style shared
//! control lines (FRAME#, IRDY#, TRDY#, DEVSEL#, STOP#), [`ParityPin`] for
//! PAR, and plain `embedded_hal::digital::OutputPin` for CLK and IDSEL,
//! which are always master-driven and never tri-stated.
//!
//! CLK and IDSEL are the only lines expressed against `embedded-hal`
//! directly: they are ordinary single-direction output pins and that trait
//! is exactly what the ecosystem already uses for such pins. The other
//! groups need bulk set/get or a tri-state mode `embedded-hal`'s
//! `OutputPin`/`InputPin` split doesn't model, so this crate defines its
//! own traits for them. Those traits are infallible: on the microcontroller
//! ports this core targets, driving a GPIO register is a plain memory
//! write that cannot fail, so there is nothing useful an `Err` path could
//! recover from — mirroring the original C driver, where every pin
//! primitive is a `void`-returning register poke.

use embedded_hal::digital::OutputPin;

/// A multi-bit bus that can be switched between output and high-impedance
/// (tri-state) and driven or sampled as a single value (AD).
pub trait WideBus {
    /// Switch every line of the bus to output mode.
    fn output_mode(&mut self);

    /// Switch every line of the bus to high-impedance (input, no pull).
    fn tristate(&mut self);

    /// Drive the bus with `value`. Only meaningful while in output mode.
    fn set(&mut self, value: u32);

    /// Sample the bus. Only meaningful while the bus is tri-stated and
    /// some other agent is driving it.
    fn get(&mut self) -> u32;
}

/// A bus that is only ever driven by the master, never sampled (C/BE).
pub trait WideOutBus {
    fn output_mode(&mut self);
    fn tristate(&mut self);
    fn set(&mut self, value: u32);
}

/// The PAR line: a single bit driven by whichever side just placed a word
/// on AD, one clock in arrears.
pub trait ParityPin {
    fn output_mode(&mut self);
    fn tristate(&mut self);
    fn set(&mut self, value: bool);
    fn get(&mut self) -> bool;
}

/// One of the five shared, sustained-tri-state PCI control lines.
///
/// These lines carry a weak pull-up: asserting them means driving low
/// against that pull-up, and deasserting is the two-step
/// drive-high-then-release sequence. This trait
/// exposes exactly those primitives; [`crate::control`] builds the
/// three-step assert/deassert discipline on top of it and is what the
/// transaction engine actually calls.
pub trait ControlPin {
    /// Enable the pin as an output. Does not change the driven level.
    fn output_mode(&mut self);

    /// Drive the pin high. Used only during phase-1 deassert.
    fn drive_high(&mut self);

    /// Drive the pin low. Used only during assert.
    fn drive_low(&mut self);

    /// Release the pin to high-impedance, leaving only the pull-up.
    fn tristate(&mut self);

    /// Sample the line. Active-low: `true` means the master observes the
    /// line as asserted (driven low, by either side).
    fn is_asserted(&mut self) -> bool;
}

/// The full set of pin groups a [`crate::bus::Bus`] owns, provided by the
/// platform's GPIO bring-up.
///
/// This is a single-owner capability object: it is moved into
/// [`crate::bus::Bus::initialize`] and never copied, so the type system —
/// not a runtime lock — enforces that only one piece of code is ever
/// driving the bus.
pub trait Pins {
    type Ad: WideBus;
    type Cbe: WideOutBus;
    type Par: ParityPin;
    type Clk: OutputPin;
    type IdSel: OutputPin;
    type Rst: OutputPin;
    type Frame: ControlPin;
    type Irdy: ControlPin;
    type Trdy: ControlPin;
    type Devsel: ControlPin;
    type Stop: ControlPin;

    fn ad(&mut self) -> &mut Self::Ad;
    fn cbe(&mut self) -> &mut Self::Cbe;
    fn par(&mut self) -> &mut Self::Par;
    fn clk(&mut self) -> &mut Self::Clk;
    fn idsel(&mut self) -> &mut Self::IdSel;

    /// RST#: active-low, driven low throughout bus reset and emergency
    /// disconnect, driven high (deasserted) otherwise. Unlike the five
    /// shared control lines it is never tri-stated: this master is the only
    /// agent allowed to drive it.
    fn rst(&mut self) -> &mut Self::Rst;

    fn frame(&mut self) -> &mut Self::Frame;
    fn irdy(&mut self) -> &mut Self::Irdy;
    fn trdy(&mut self) -> &mut Self::Trdy;
    fn devsel(&mut self) -> &mut Self::Devsel;
    fn stop(&mut self) -> &mut Self::Stop;

    /// Mask whatever interrupt the platform wires to PERR#/SERR# pin
    /// changes, so that releasing those lines during [`crate::bus::Bus::fault`]
    /// cannot trigger a spurious notification. Most platforms either wire
    /// no such interrupt or mask it elsewhere; the default is a no-op.
    fn mask_fault_interrupts(&mut self) {}
}
