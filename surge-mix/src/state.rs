#![forbid(unsafe_code)]

use std::fmt;

/// Traffic intensity level, ordered from silent to busiest.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrafficState {
    Off = 0,
    Idle = 1,
    Low = 2,
    High = 3,
}

impl TrafficState {
    pub const COUNT: usize = 4;
    pub const ALL: [TrafficState; Self::COUNT] = [Self::Off, Self::Idle, Self::Low, Self::High];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// LOW and HIGH run exactly one sender; OFF and IDLE run none.
    #[must_use]
    pub fn is_transmitting(self) -> bool {
        matches!(self, Self::Low | Self::High)
    }
}

impl fmt::Display for TrafficState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Off => "OFF",
            Self::Idle => "IDLE",
            Self::Low => "LOW",
            Self::High => "HIGH",
        };
        f.write_str(s)
    }
}
