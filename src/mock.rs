//! A recording mock GPIO substrate, used only by this crate's own test
//! suite in place of real silicon.
//!
//! Every pin shares a [`Trace`] that records every operation, in order, so
//! a test can assert on the sequence control lines and the data bus were
//! touched in rather than just their final state. The clock index comes
//! from a shared rising-edge counter: every
//! `CLK.set_high()` ticks it, and a [`MockTarget`]'s script is indexed by
//! that same counter, so a scripted target reacting "on clock N" means
//! exactly what it says regardless of how [`crate::transaction::perform`]
//! is internally structured.

extern crate alloc;

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use embedded_hal::digital::{Error, ErrorKind, ErrorType, OutputPin, PinState};

use crate::pins::{ControlPin, ParityPin, Pins, WideBus, WideOutBus};

/// One entry in a [`Trace`]: which line moved, and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    OutputMode(&'static str),
    Tristate(&'static str),
    DriveHigh(&'static str),
    DriveLow(&'static str),
    SetWide(&'static str, u32),
    SetBit(&'static str, bool),
    Get(&'static str),
}

/// The shared log every mock pin in a [`MockPins`] appends to.
#[derive(Debug, Default, Clone)]
pub struct Trace(Rc<RefCell<Vec<Event>>>);

impl Trace {
    pub fn new() -> Self {
        Trace(Rc::new(RefCell::new(Vec::new())))
    }

    fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }
}

/// Standalone mock for a single control line, used directly by
/// [`crate::control`]'s unit tests without a full [`MockPins`] bring-up.
#[derive(Debug, Default)]
pub struct MockControlPin {
    pub is_output: bool,
    pub level_high: bool,
}

impl ControlPin for MockControlPin {
    fn output_mode(&mut self) {
        self.is_output = true;
    }

    fn drive_high(&mut self) {
        self.level_high = true;
    }

    fn drive_low(&mut self) {
        self.level_high = false;
    }

    fn tristate(&mut self) {
        self.is_output = false;
    }

    fn is_asserted(&mut self) -> bool {
        !self.level_high
    }
}

/// What a scripted target does once `clock` rising edges have elapsed:
/// whether it is asserting DEVSEL#/TRDY#/STOP#, and what it drives onto
/// AD/PAR while the master has those lines tri-stated.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetAction {
    pub assert_devsel: bool,
    pub assert_trdy: bool,
    pub assert_stop: bool,
    pub drive_ad: Option<u32>,
    pub drive_par: Option<bool>,
}

/// A scripted PCI target: a per-clock list of [`TargetAction`]s, indexed by
/// the number of CLK rising edges [`MockPins`] has driven so far. Reading
/// past the end of the script repeats [`TargetAction::default`] (nothing
/// asserted) forever, which is exactly "target never claims the bus".
#[derive(Debug, Default, Clone)]
pub struct MockTarget {
    pub script: Vec<TargetAction>,
}

impl MockTarget {
    pub fn new(script: Vec<TargetAction>) -> Self {
        MockTarget { script }
    }

    fn at(&self, clock: u32) -> TargetAction {
        self.script.get(clock as usize).copied().unwrap_or_default()
    }
}

type Clock = Rc<Cell<u32>>;
type SharedTarget = Rc<RefCell<MockTarget>>;

/// A named control line backed by a shared [`Trace`] and, for DEVSEL#/
/// TRDY#/STOP#, a [`SharedTarget`] it consults whenever the master samples
/// it while it is not the one driving it.
#[derive(Debug)]
pub struct MockControlLine {
    name: &'static str,
    trace: Trace,
    is_output: bool,
    level_high: bool,
    clock: Clock,
    target: SharedTarget,
    read: fn(&TargetAction) -> bool,
}

impl MockControlLine {
    fn new(name: &'static str, trace: Trace, clock: Clock, target: SharedTarget, read: fn(&TargetAction) -> bool) -> Self {
        MockControlLine { name, trace, is_output: false, level_high: true, clock, target, read }
    }
}

impl ControlPin for MockControlLine {
    fn output_mode(&mut self) {
        self.is_output = true;
        self.trace.push(Event::OutputMode(self.name));
    }

    fn drive_high(&mut self) {
        self.level_high = true;
        self.trace.push(Event::DriveHigh(self.name));
    }

    fn drive_low(&mut self) {
        self.level_high = false;
        self.trace.push(Event::DriveLow(self.name));
    }

    fn tristate(&mut self) {
        self.is_output = false;
        self.trace.push(Event::Tristate(self.name));
    }

    fn is_asserted(&mut self) -> bool {
        self.trace.push(Event::Get(self.name));
        if self.is_output {
            !self.level_high
        } else {
            (self.read)(&self.target.borrow().at(self.clock.get()))
        }
    }
}

/// The AD bus, backed by a shared [`Trace`]. Consults the [`SharedTarget`]
/// on `get()`, since a read's data word comes from whatever the target is
/// driving while AD is tri-stated.
#[derive(Debug)]
pub struct MockAdLine {
    trace: Trace,
    is_output: bool,
    value: u32,
    clock: Clock,
    target: SharedTarget,
}

impl MockAdLine {
    fn new(trace: Trace, clock: Clock, target: SharedTarget) -> Self {
        MockAdLine { trace, is_output: false, value: 0, clock, target }
    }
}

impl WideBus for MockAdLine {
    fn output_mode(&mut self) {
        self.is_output = true;
        self.trace.push(Event::OutputMode("AD"));
    }

    fn tristate(&mut self) {
        self.is_output = false;
        self.trace.push(Event::Tristate("AD"));
    }

    fn set(&mut self, value: u32) {
        self.value = value;
        self.trace.push(Event::SetWide("AD", value));
    }

    fn get(&mut self) -> u32 {
        self.trace.push(Event::Get("AD"));
        self.target.borrow().at(self.clock.get()).drive_ad.unwrap_or(self.value)
    }
}

/// The C/BE bus: master-only, never sampled, so it carries no target link.
#[derive(Debug)]
pub struct MockCbeLine {
    trace: Trace,
    is_output: bool,
    value: u32,
}

impl MockCbeLine {
    fn new(trace: Trace) -> Self {
        MockCbeLine { trace, is_output: false, value: 0 }
    }
}

impl WideOutBus for MockCbeLine {
    fn output_mode(&mut self) {
        self.is_output = true;
        self.trace.push(Event::OutputMode("C/BE#"));
    }

    fn tristate(&mut self) {
        self.is_output = false;
        self.trace.push(Event::Tristate("C/BE#"));
    }

    fn set(&mut self, value: u32) {
        self.value = value;
        self.trace.push(Event::SetWide("C/BE#", value));
    }
}

/// PAR, backed by a shared [`Trace`] and the [`SharedTarget`] (consulted by
/// `get()`, when the target is driving read-data parity).
#[derive(Debug)]
pub struct MockParPin {
    trace: Trace,
    is_output: bool,
    value: bool,
    clock: Clock,
    target: SharedTarget,
}

impl MockParPin {
    fn new(trace: Trace, clock: Clock, target: SharedTarget) -> Self {
        MockParPin { trace, is_output: false, value: false, clock, target }
    }
}

impl ParityPin for MockParPin {
    fn output_mode(&mut self) {
        self.is_output = true;
        self.trace.push(Event::OutputMode("PAR"));
    }

    fn tristate(&mut self) {
        self.is_output = false;
        self.trace.push(Event::Tristate("PAR"));
    }

    fn set(&mut self, value: bool) {
        self.value = value;
        self.trace.push(Event::SetBit("PAR", value));
    }

    fn get(&mut self) -> bool {
        self.trace.push(Event::Get("PAR"));
        self.target.borrow().at(self.clock.get()).drive_par.unwrap_or(self.value)
    }
}

/// An `embedded-hal` output pin, for CLK and IDSEL. CLK additionally ticks
/// the shared rising-edge [`Clock`] on every `set_high()`.
#[derive(Debug)]
pub struct MockOutputPin {
    name: &'static str,
    trace: Trace,
    clock: Option<Clock>,
    pub high: bool,
}

impl MockOutputPin {
    fn new(name: &'static str, trace: Trace) -> Self {
        MockOutputPin { name, trace, clock: None, high: false }
    }

    fn clocked(name: &'static str, trace: Trace, clock: Clock) -> Self {
        MockOutputPin { name, trace, clock: Some(clock), high: false }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MockPinError;

impl Error for MockPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl ErrorType for MockOutputPin {
    type Error = MockPinError;
}

impl OutputPin for MockOutputPin {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        self.trace.push(Event::DriveHigh(self.name));
        if let Some(clock) = &self.clock {
            clock.set(clock.get() + 1);
        }
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        self.trace.push(Event::DriveLow(self.name));
        Ok(())
    }

    fn set_state(&mut self, state: PinState) -> Result<(), Self::Error> {
        match state {
            PinState::High => self.set_high(),
            PinState::Low => self.set_low(),
        }
    }
}

/// A complete mock [`Pins`] bring-up: every line shares one [`Trace`] and
/// one rising-edge [`Clock`], and DEVSEL#/TRDY#/STOP#/AD/PAR all consult
/// the same [`MockTarget`].
pub struct MockPins {
    pub trace: Trace,
    clock: Clock,
    target: SharedTarget,
    ad: MockAdLine,
    cbe: MockCbeLine,
    par: MockParPin,
    clk: MockOutputPin,
    idsel: MockOutputPin,
    rst: MockOutputPin,
    frame: MockControlLine,
    irdy: MockControlLine,
    trdy: MockControlLine,
    devsel: MockControlLine,
    stop: MockControlLine,
}

impl MockPins {
    /// A bus with no target attached: every line the target would drive
    /// reads as "never asserted" / `0`, which is exactly scenario S2
    /// (master-abort, nobody claims the bus).
    pub fn new() -> Self {
        Self::with_target(MockTarget::default())
    }

    pub fn with_target(target: MockTarget) -> Self {
        let trace = Trace::new();
        let clock: Clock = Rc::new(Cell::new(0));
        let target: SharedTarget = Rc::new(RefCell::new(target));
        MockPins {
            ad: MockAdLine::new(trace.clone(), clock.clone(), target.clone()),
            cbe: MockCbeLine::new(trace.clone()),
            par: MockParPin::new(trace.clone(), clock.clone(), target.clone()),
            clk: MockOutputPin::clocked("CLK", trace.clone(), clock.clone()),
            idsel: MockOutputPin::new("IDSEL", trace.clone()),
            rst: MockOutputPin::new("RST#", trace.clone()),
            frame: MockControlLine::new("FRAME#", trace.clone(), clock.clone(), target.clone(), |_| false),
            irdy: MockControlLine::new("IRDY#", trace.clone(), clock.clone(), target.clone(), |_| false),
            trdy: MockControlLine::new("TRDY#", trace.clone(), clock.clone(), target.clone(), |a| a.assert_trdy),
            devsel: MockControlLine::new("DEVSEL#", trace.clone(), clock.clone(), target.clone(), |a| a.assert_devsel),
            stop: MockControlLine::new("STOP#", trace.clone(), clock.clone(), target.clone(), |a| a.assert_stop),
            trace,
            clock,
            target,
        }
    }

    /// Rising edges elapsed so far, for tests that want to assert on
    /// exactly how many clocks a transaction took.
    pub fn clock(&self) -> u32 {
        self.clock.get()
    }
}

impl Default for MockPins {
    fn default() -> Self {
        Self::new()
    }
}

impl Pins for MockPins {
    type Ad = MockAdLine;
    type Cbe = MockCbeLine;
    type Par = MockParPin;
    type Clk = MockOutputPin;
    type IdSel = MockOutputPin;
    type Rst = MockOutputPin;
    type Frame = MockControlLine;
    type Irdy = MockControlLine;
    type Trdy = MockControlLine;
    type Devsel = MockControlLine;
    type Stop = MockControlLine;

    fn ad(&mut self) -> &mut Self::Ad {
        &mut self.ad
    }

    fn cbe(&mut self) -> &mut Self::Cbe {
        &mut self.cbe
    }

    fn par(&mut self) -> &mut Self::Par {
        &mut self.par
    }

    fn clk(&mut self) -> &mut Self::Clk {
        &mut self.clk
    }

    fn idsel(&mut self) -> &mut Self::IdSel {
        &mut self.idsel
    }

    fn rst(&mut self) -> &mut Self::Rst {
        &mut self.rst
    }

    fn frame(&mut self) -> &mut Self::Frame {
        &mut self.frame
    }

    fn irdy(&mut self) -> &mut Self::Irdy {
        &mut self.irdy
    }

    fn trdy(&mut self) -> &mut Self::Trdy {
        &mut self.trdy
    }

    fn devsel(&mut self) -> &mut Self::Devsel {
        &mut self.devsel
    }

    fn stop(&mut self) -> &mut Self::Stop {
        &mut self.stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_is_shared_across_all_lines() {
        let mut pins = MockPins::new();
        pins.frame().output_mode();
        pins.ad().set(0xdead_beef);
        let events = pins.trace.events();
        assert_eq!(events[0], Event::OutputMode("FRAME#"));
        assert_eq!(events[1], Event::SetWide("AD", 0xdead_beef));
    }

    #[test]
    fn target_script_is_indexed_by_rising_edge_count() {
        let mut pins = MockPins::with_target(MockTarget::new(alloc::vec![
            TargetAction::default(),
            TargetAction::default(),
            TargetAction { assert_devsel: true, drive_ad: Some(0x1234_5678), ..Default::default() },
        ]));
        assert!(!pins.devsel().is_asserted());
        pins.clk().set_high().unwrap();
        pins.clk().set_low().unwrap();
        assert!(!pins.devsel().is_asserted());
        pins.clk().set_high().unwrap();
        pins.clk().set_low().unwrap();
        assert!(pins.devsel().is_asserted());
        assert_eq!(pins.ad().get(), 0x1234_5678);
    }
}
