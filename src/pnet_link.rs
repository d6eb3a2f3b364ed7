// Raw Ethernet link over pnet's datalink channel
use dragonfly_netboot::{LinkError, LinkLayer, MacAddr};
use pnet::datalink::{self, Channel, DataLinkReceiver, DataLinkSender, NetworkInterface};
use std::io;
use std::time::Duration;
use tracing::{debug, error, warn};

/// [`LinkLayer`] bound to one host interface
pub struct PnetLink {
    name: Option<String>,
    read_timeout: Duration,
    interface: Option<NetworkInterface>,
    tx: Option<Box<dyn DataLinkSender>>,
    rx: Option<Box<dyn DataLinkReceiver>>,
}

impl PnetLink {
    /// Use interface `name`, or the first usable one when None
    pub fn new(name: Option<String>, read_timeout: Duration) -> Self {
        Self {
            name,
            read_timeout,
            interface: None,
            tx: None,
            rx: None,
        }
    }

    /// Name of the interface found by [`LinkLayer::probe`]
    pub fn interface_name(&self) -> Option<&str> {
        self.interface.as_ref().map(|iface| iface.name.as_str())
    }

    fn usable(&self, iface: &NetworkInterface) -> bool {
        let wanted = match &self.name {
            Some(name) => &iface.name == name,
            None => !iface.is_loopback(),
        };
        wanted && iface.is_up() && iface.mac.is_some()
    }
}

impl LinkLayer for PnetLink {
    fn probe(&mut self) -> bool {
        self.interface = datalink::interfaces()
            .into_iter()
            .find(|iface| self.usable(iface));

        match &self.interface {
            Some(iface) => debug!(interface = %iface.name, "Found network interface"),
            None => warn!(interface = ?self.name, "No usable network interface"),
        }
        self.interface.is_some()
    }

    fn init(&mut self) -> Result<(), LinkError> {
        let Some(iface) = &self.interface else {
            return Err(LinkError::ReceiveError);
        };

        let config = datalink::Config {
            read_timeout: Some(self.read_timeout),
            ..Default::default()
        };
        match datalink::channel(iface, config) {
            Ok(Channel::Ethernet(tx, rx)) => {
                self.tx = Some(tx);
                self.rx = Some(rx);
                Ok(())
            }
            Ok(_) => {
                error!(interface = %iface.name, "Unsupported datalink channel type");
                Err(LinkError::FramingError)
            }
            Err(e) => {
                error!(interface = %iface.name, error = %e, "Failed to open datalink channel");
                Err(LinkError::ReceiveError)
            }
        }
    }

    fn hardware_address(&self) -> MacAddr {
        match self.interface.as_ref().and_then(|iface| iface.mac) {
            Some(mac) => MacAddr([mac.0, mac.1, mac.2, mac.3, mac.4, mac.5]),
            None => MacAddr::UNKNOWN,
        }
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        let tx = self.tx.as_mut().ok_or(LinkError::SendError)?;
        match tx.send_to(frame, None) {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => {
                debug!(error = %e, "Frame transmit failed");
                Err(LinkError::SendError)
            }
            None => Err(LinkError::SendError),
        }
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let rx = self.rx.as_mut().ok_or(LinkError::ReceiveError)?;
        match rx.next() {
            Ok(frame) if frame.len() > buf.len() => Err(LinkError::Overflow),
            Ok(frame) => {
                buf[..frame.len()].copy_from_slice(frame);
                Ok(frame.len())
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                Err(LinkError::Timeout)
            }
            Err(e) => {
                debug!(error = %e, "Frame receive failed");
                Err(LinkError::ReceiveError)
            }
        }
    }
}
