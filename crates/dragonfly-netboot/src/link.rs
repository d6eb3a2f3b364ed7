//! Link layer and time source seams
//!
//! The stack does not own a network driver or a timer. The caller supplies
//! both: a [`LinkLayer`] that moves raw Ethernet frames, and a [`Clock`] that
//! provides monotonic time for deadlines, retry delays and tick-derived
//! identifiers.

use crate::error::LinkError;
use crate::session::MacAddr;
use std::time::{Duration, Instant};

/// Raw Ethernet frame device
pub trait LinkLayer {
    /// Check whether a usable device is present
    fn probe(&mut self) -> bool;

    /// Bring the device up
    fn init(&mut self) -> Result<(), LinkError>;

    /// Get the device's MAC address
    fn hardware_address(&self) -> MacAddr;

    /// Transmit one complete Ethernet frame (without FCS)
    fn send(&mut self, frame: &[u8]) -> Result<(), LinkError>;

    /// Receive one Ethernet frame into `buf`, returning its length
    ///
    /// Blocks until a frame arrives or the device's own timeout elapses,
    /// in which case it returns [`LinkError::Timeout`].
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;
}

impl<L: LinkLayer + ?Sized> LinkLayer for &mut L {
    fn probe(&mut self) -> bool {
        (**self).probe()
    }

    fn init(&mut self) -> Result<(), LinkError> {
        (**self).init()
    }

    fn hardware_address(&self) -> MacAddr {
        (**self).hardware_address()
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        (**self).send(frame)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        (**self).receive(buf)
    }
}

/// Monotonic time source
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;

    /// Block for `duration`
    fn sleep(&self, duration: Duration);

    /// Tick counter in milliseconds, used to seed transaction ids and ports
    fn ticks(&self) -> u64 {
        self.now().as_millis() as u64
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }

    fn ticks(&self) -> u64 {
        (**self).ticks()
    }
}

/// [`Clock`] backed by `std::time::Instant`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    // Offset by the process id so back-to-back sessions differ
    fn ticks(&self) -> u64 {
        (self.now().as_millis() as u64).wrapping_add(u64::from(std::process::id()) << 16)
    }
}
