//! Dragonfly Netboot
//!
//! This crate provides a small network boot client that runs directly on a
//! raw Ethernet link: there is no operating system network stack underneath
//! it. It discovers its address and boot file with BOOTP (RFC 951) and then
//! downloads that file with TFTP (RFC 1350) into a chunked in-memory image.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 NetbootClient                       │
//! │  ┌─────────────────────┐  ┌──────────────────────┐  │
//! │  │    BootpClient      │  │     TftpClient       │  │
//! │  │  discovery, retry   │  │  RRQ / DATA / ACK    │  │
//! │  └─────────────────────┘  └──────────────────────┘  │
//! │             │                       │               │
//! │             ▼                       ▼               │
//! │  ┌───────────────────────────────────────────────┐  │
//! │  │    UdpTransport (SessionContext, ARP reply)   │  │
//! │  └───────────────────────────────────────────────┘  │
//! │                       │                             │
//! │                       ▼                             │
//! │  ┌───────────────────────────────────────────────┐  │
//! │  │    LinkLayer (raw frames)  +  Clock (ticks)   │  │
//! │  └───────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! The downloaded bytes land in a [`ChunkedImageStore`], which implements
//! `std::io::Read` and `std::io::Seek`.
//!
//! # Example
//!
//! ```ignore
//! use dragonfly_netboot::{NetbootClient, NetbootConfig, SystemClock};
//!
//! let config = NetbootConfig::default().with_boot_filename("vmlinux");
//! let mut client = NetbootClient::start(my_link, SystemClock::new(), config)?;
//! let image = client.boot()?;
//! println!("downloaded {} bytes", image.total_size());
//! ```

pub mod arp;
pub mod bootp;
pub mod checksum;
pub mod client;
pub mod config;
pub mod error;
pub mod ethernet;
pub mod image;
pub mod ipv4;
pub mod link;
pub mod session;
pub mod store;
pub mod tftp;
pub mod udp;

pub use bootp::{BootpClient, BootpPacket};
pub use checksum::compute_ip_checksum;
pub use client::NetbootClient;
pub use config::NetbootConfig;
pub use error::*;
pub use image::{BootImage, ImageSource};
pub use link::{Clock, LinkLayer, SystemClock};
pub use session::{MacAddr, SessionContext};
pub use store::{ChunkedImageStore, Whence};
pub use tftp::{TftpClient, TftpPacket};
pub use udp::{Datagram, UdpTransport};
