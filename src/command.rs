//! The PCI bus command carried on C/BE# during the address phase, and the
//! byte-enable mask carried on the same lines during the data phase.

/// A 4-bit PCI bus command. Only the six commands this master ever issues
/// are named; anything else observed on the bus (memory-read-multiple,
/// memory-read-line, memory-write-and-invalidate) is a target-only command
/// this core never drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    IoRead = 0b0010,
    IoWrite = 0b0011,
    MemoryRead = 0b0110,
    MemoryWrite = 0b0111,
    ConfigRead = 0b1010,
    ConfigWrite = 0b1011,
}

impl Command {
    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

bitflags::bitflags! {
    /// The active-low byte-enable mask driven on C/BE# during the data
    /// phase: a clear bit means that byte lane participates in the
    /// transfer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ByteEnable: u8 {
        const LANE0 = 0b0001;
        const LANE1 = 0b0010;
        const LANE2 = 0b0100;
        const LANE3 = 0b1000;
    }
}

impl ByteEnable {
    /// All four lanes participate (a 32-bit transfer).
    pub const ALL: ByteEnable = ByteEnable::empty();

    /// The mask selecting only byte lane `n` (0..=3).
    #[inline]
    pub fn lane(n: u8) -> ByteEnable {
        ByteEnable::from_bits_truncate(!(1 << n) & 0b1111)
    }

    /// The mask selecting the low 16 bits (lanes 0-1).
    #[inline]
    pub const fn low_half() -> ByteEnable {
        ByteEnable::LANE2.union(ByteEnable::LANE3)
    }

    /// The mask selecting the high 16 bits (lanes 2-3).
    #[inline]
    pub const fn high_half() -> ByteEnable {
        ByteEnable::LANE0.union(ByteEnable::LANE1)
    }
}
