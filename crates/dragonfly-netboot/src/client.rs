//! Netboot session driver
//!
//! Ties the pieces together: bring the link up, discover with BOOTP,
//! download with TFTP.

use crate::bootp::BootpClient;
use crate::config::NetbootConfig;
use crate::error::{NetbootError, Result};
use crate::link::{Clock, LinkLayer};
use crate::session::SessionContext;
use crate::store::ChunkedImageStore;
use crate::tftp::TftpClient;
use crate::udp::UdpTransport;
use tracing::{debug, info};

/// One netboot session over a link
pub struct NetbootClient<L, C> {
    transport: UdpTransport<L, C>,
    config: NetbootConfig,
}

impl<L: LinkLayer, C: Clock> NetbootClient<L, C> {
    /// Probe and initialize `link`, then set up a session for its MAC
    pub fn start(mut link: L, clock: C, config: NetbootConfig) -> Result<Self> {
        config.validate()?;

        if !link.probe() {
            return Err(NetbootError::NoDevice);
        }
        link.init().map_err(NetbootError::LinkInit)?;

        let mac = link.hardware_address();
        info!(mac = %mac, "Network device ready");
        debug!(config = ?config, "Netboot configuration");

        let session = SessionContext::new(mac);
        let transport = UdpTransport::new(link, clock, session, config.receive_timeout);
        Ok(Self { transport, config })
    }

    /// Run BOOTP discovery, returning the boot file name
    pub fn discover(&mut self) -> Result<String> {
        let bootp = BootpClient::from_config(&self.config);
        let filename = bootp.discover(&mut self.transport, self.config.boot_filename.as_deref())?;
        Ok(filename)
    }

    /// Download `filename` from the discovered server
    pub fn download(&mut self, filename: &str) -> Result<ChunkedImageStore> {
        let mut store = ChunkedImageStore::from_config(&self.config);
        TftpClient::from_config(&self.config).download(&mut self.transport, filename, &mut store)?;
        Ok(store)
    }

    /// Discover, then download the boot file
    pub fn boot(&mut self) -> Result<ChunkedImageStore> {
        let filename = self.discover()?;
        self.download(&filename)
    }

    pub fn session(&self) -> &SessionContext {
        self.transport.session()
    }

    pub fn config(&self) -> &NetbootConfig {
        &self.config
    }

    pub fn transport(&self) -> &UdpTransport<L, C> {
        &self.transport
    }
}

impl<L, C> std::fmt::Debug for NetbootClient<L, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetbootClient")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .finish()
    }
}
