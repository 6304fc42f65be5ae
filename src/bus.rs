//! The owned bus handle: lifecycle (reset, warm-up, emergency disconnect,
//! fault sink) plus the typed byte/half/word access layer built on top of
//! [`crate::transaction::perform`].

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::command::{ByteEnable, Command};
use crate::control;
use crate::error::FaultError;
use crate::pins::{ParityPin, Pins, WideBus, WideOutBus};
use crate::transaction::{self, Mode};

/// The owned PCI bus: a move-only handle over a platform's [`Pins`]
/// capability object. There is exactly one way to get one (`initialize`)
/// and exactly one way to retire it for good (`fault`, which never
/// returns); nothing else can construct or duplicate a `Bus`, so "only one
/// piece of code drives the bus at a time" is a property of the type, not
/// a convention callers have to honor.
pub struct Bus<P: Pins> {
    pins: P,
}

impl<P: Pins> Bus<P> {
    /// Reset the bus and bring it up: assert RST#, configure the lines the
    /// master always drives, hold reset for at least 1 ms, deassert RST#,
    /// and issue `warmup_cycles` CLK pulses before returning.
    ///
    /// PCI specifies 2^25 clocks between RST# deassertion and the first
    /// configuration access; this core does not enforce that and instead
    /// takes the cycle count from the caller, matching the commodity NICs
    /// this was built against, which respond correctly after far fewer.
    /// There is deliberately no default: 1 cycle is not silently assumed to
    /// be enough, since that's a deliberate deviation from the PCI-mandated
    /// figure, not a substitute for it.
    pub fn initialize<D: DelayNs>(mut pins: P, delay: &mut D, warmup_cycles: u32) -> Self {
        log::debug!("asserting RST# for bus reset");
        pins.rst().set_low().ok();

        WideBus::tristate(pins.ad());
        WideOutBus::tristate(pins.cbe());
        pins.par().tristate();
        control::force_release(pins.frame());
        control::force_release(pins.irdy());
        control::force_release(pins.trdy());
        control::force_release(pins.devsel());
        control::force_release(pins.stop());
        pins.idsel().set_high().ok();

        delay.delay_ms(1);

        pins.rst().set_high().ok();
        log::debug!("RST# deasserted, issuing {} warm-up clock(s)", warmup_cycles);

        let mut bus = Bus { pins };
        bus.warmup(warmup_cycles);
        bus
    }

    /// Pulse CLK `cycles` times with no transaction in progress. Callers
    /// that see Master-Abort on early configuration reads may call this
    /// again to inject more warm-up clocks before retrying.
    pub fn warmup(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.pins.clk().set_high().ok();
            self.pins.clk().set_low().ok();
        }
    }

    /// Electrically release the bus: assert RST#, tri-state every line the
    /// master drives. Safe to call from any state, including mid-recovery
    /// from [`Self::fault`]; every partially-asserted control line is
    /// unconditionally released regardless of what it was doing.
    pub fn disconnect(&mut self) {
        log::warn!("disconnecting bus");
        self.pins.rst().set_low().ok();
        WideBus::tristate(self.pins.ad());
        WideOutBus::tristate(self.pins.cbe());
        self.pins.par().tristate();
        control::force_release(self.pins.frame());
        control::force_release(self.pins.irdy());
        control::force_release(self.pins.trdy());
        control::force_release(self.pins.devsel());
        control::force_release(self.pins.stop());
    }

    /// The terminal failure path: mask whatever interrupt the platform
    /// wires to PERR#/SERR# so a spurious pin-change notification cannot
    /// fire once those lines are released, disconnect, and halt. Never
    /// returns, so nothing downstream of a fatal error can run — this is
    /// the only way `perform`'s `Err` path is ever handled.
    pub fn fault(&mut self, err: FaultError) -> ! {
        self.pins.mask_fault_interrupts();
        self.disconnect();
        log::error!("fatal PCI bus fault: {}", err);
        #[cfg(test)]
        panic!("fatal PCI bus fault: {}", err);
        #[cfg(not(test))]
        loop {}
    }

    fn run(&mut self, address: u32, command: Command, be: ByteEnable, data: u32, mode: Mode) -> u32 {
        match transaction::perform(&mut self.pins, address, command, be, data, mode) {
            Ok(outcome) => outcome.data(),
            Err(err) => self.fault(err),
        }
    }

    fn run_write(&mut self, address: u32, command: Command, be: ByteEnable, data: u32) {
        match transaction::perform(&mut self.pins, address, command, be, data, Mode::Write) {
            Ok(_) => {}
            Err(err) => self.fault(err),
        }
    }

    /// `(effective_address, byte_enable, shift)` for an 8-bit access at
    /// `address`: the mask selects exactly one byte lane and the shift
    /// recovers it after a 32-bit transfer at the aligned address.
    fn byte_lane(address: u32) -> (u32, ByteEnable, u32) {
        let shift = (address & 0b11) * 8;
        (address & !0b11, ByteEnable::lane((address & 0b11) as u8), shift)
    }

    /// `(effective_address, byte_enable, shift)` for a 16-bit access, or a
    /// fatal protocol violation if `address` isn't 16-bit-aligned.
    fn half_lane(address: u32) -> Result<(u32, ByteEnable, u32), FaultError> {
        match address & 0b11 {
            0b00 => Ok((address, ByteEnable::low_half(), 0)),
            0b10 => Ok((address & !0b11, ByteEnable::high_half(), 16)),
            _ => Err(FaultError::UnalignedAccess(address)),
        }
    }

    fn read8(&mut self, address: u32, command: Command) -> u8 {
        let (effective, be, shift) = Self::byte_lane(address);
        (self.run(effective, command, be, 0, Mode::Read) >> shift) as u8
    }

    fn read16(&mut self, address: u32, command: Command) -> u16 {
        let (effective, be, shift) = match Self::half_lane(address) {
            Ok(t) => t,
            Err(err) => self.fault(err),
        };
        (self.run(effective, command, be, 0, Mode::Read) >> shift) as u16
    }

    fn read32(&mut self, address: u32, command: Command) -> u32 {
        self.run(address, command, ByteEnable::ALL, 0, Mode::Read)
    }

    fn write8(&mut self, address: u32, command: Command, value: u8) {
        let (effective, be, shift) = Self::byte_lane(address);
        self.run_write(effective, command, be, (value as u32) << shift);
    }

    fn write16(&mut self, address: u32, command: Command, value: u16) {
        let (effective, be, shift) = match Self::half_lane(address) {
            Ok(t) => t,
            Err(err) => self.fault(err),
        };
        self.run_write(effective, command, be, (value as u32) << shift);
    }

    fn write32(&mut self, address: u32, command: Command, value: u32) {
        self.run_write(address, command, ByteEnable::ALL, value);
    }

    // --- Configuration space. IDSEL replaces device-select in single-slot
    // mode, so the low 8 bits of `offset` are the whole address; there is
    // no config_read8/16, matching the upward interface this was built
    // from, which never needed sub-word configuration reads. ---

    pub fn config_read32(&mut self, offset: u8) -> u32 {
        self.read32(offset as u32, Command::ConfigRead)
    }

    pub fn config_write8(&mut self, offset: u8, value: u8) {
        self.write8(offset as u32, Command::ConfigWrite, value)
    }

    pub fn config_write16(&mut self, offset: u8, value: u16) {
        self.write16(offset as u32, Command::ConfigWrite, value)
    }

    pub fn config_write32(&mut self, offset: u8, value: u32) {
        self.write32(offset as u32, Command::ConfigWrite, value)
    }

    // --- I/O space. ---

    pub fn io_read8(&mut self, address: u32) -> u8 {
        self.read8(address, Command::IoRead)
    }

    pub fn io_read16(&mut self, address: u32) -> u16 {
        self.read16(address, Command::IoRead)
    }

    pub fn io_read32(&mut self, address: u32) -> u32 {
        self.read32(address, Command::IoRead)
    }

    pub fn io_write8(&mut self, address: u32, value: u8) {
        self.write8(address, Command::IoWrite, value)
    }

    pub fn io_write16(&mut self, address: u32, value: u16) {
        self.write16(address, Command::IoWrite, value)
    }

    pub fn io_write32(&mut self, address: u32, value: u32) {
        self.write32(address, Command::IoWrite, value)
    }

    // --- Memory space. ---

    pub fn mem_read8(&mut self, address: u32) -> u8 {
        self.read8(address, Command::MemoryRead)
    }

    pub fn mem_read16(&mut self, address: u32) -> u16 {
        self.read16(address, Command::MemoryRead)
    }

    pub fn mem_read32(&mut self, address: u32) -> u32 {
        self.read32(address, Command::MemoryRead)
    }

    pub fn mem_write8(&mut self, address: u32, value: u8) {
        self.write8(address, Command::MemoryWrite, value)
    }

    pub fn mem_write16(&mut self, address: u32, value: u16) {
        self.write16(address, Command::MemoryWrite, value)
    }

    pub fn mem_write32(&mut self, address: u32, value: u32) {
        self.write32(address, Command::MemoryWrite, value)
    }

    /// Read config registers 0x00 and 0x2c and return the vendor/device id
    /// word together with the subsystem-vendor/subsystem-device id word.
    /// Performs no device identification or BAR sizing of its own — that is
    /// driver-level policy, out of scope here — it is purely two
    /// [`Self::config_read32`] calls. A Master-Abort surfaces in either word
    /// as `0xFFFF_FFFF`, the PCI-standard "no device responded" sentinel
    /// callers use to detect an empty slot.
    pub fn enumerate_vendor_device(&mut self) -> (u32, u32) {
        let vendor_device = self.config_read32(0x00);
        let subsystem = self.config_read32(0x2c);
        (vendor_device, subsystem)
    }
}
