//! Session addressing state
//!
//! One [`SessionContext`] exists per boot session. The local MAC is fixed
//! when the link comes up; everything else is learned by BOOTP discovery and
//! treated as read-only once a reply is accepted.

use std::fmt;
use std::net::Ipv4Addr;

/// 6-byte Ethernet hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Broadcast address (all ones)
    pub const BROADCAST: MacAddr = MacAddr([0xFF; 6]);

    /// Unset address (all zeros)
    pub const UNKNOWN: MacAddr = MacAddr([0; 6]);

    /// Get the raw octets
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Check if this is the broadcast address
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Check if this is the unset address
    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(octets: [u8; 6]) -> Self {
        MacAddr(octets)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

/// Addresses of the local client and its boot server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    my_hw: MacAddr,
    /// Our IP address, `0.0.0.0` until discovery succeeds
    pub my_ip: Ipv4Addr,
    /// Boot server IP, broadcast until discovery succeeds
    pub server_ip: Ipv4Addr,
    /// Boot server MAC, broadcast until discovery succeeds
    pub server_hw: MacAddr,
}

impl SessionContext {
    /// Create a session for the given local MAC with nothing discovered yet
    pub fn new(my_hw: MacAddr) -> Self {
        Self {
            my_hw,
            my_ip: Ipv4Addr::UNSPECIFIED,
            server_ip: Ipv4Addr::BROADCAST,
            server_hw: MacAddr::BROADCAST,
        }
    }

    /// Our MAC address
    pub fn my_hw(&self) -> MacAddr {
        self.my_hw
    }

    /// Forget everything learned from the network
    pub fn reset(&mut self) {
        self.my_ip = Ipv4Addr::UNSPECIFIED;
        self.server_ip = Ipv4Addr::BROADCAST;
        self.server_hw = MacAddr::BROADCAST;
    }

    /// Check if our own IP is known
    pub fn has_ip(&self) -> bool {
        !self.my_ip.is_unspecified()
    }

    /// Check if a specific server has been pinned
    pub fn has_server(&self) -> bool {
        !self.server_ip.is_broadcast()
    }
}
