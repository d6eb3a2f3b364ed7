// Network boot client: discover with BOOTP, fetch with TFTP, write the image out
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use dragonfly_netboot::config::{
    DEFAULT_BOOTP_RETRIES, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CHUNKS, DEFAULT_RECEIVE_TIMEOUT,
};
use dragonfly_netboot::{BootImage, ChunkedImageStore, NetbootClient, NetbootConfig, SystemClock};
use std::fs::File;
use std::io::{self, stderr};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

mod pnet_link;

use pnet_link::PnetLink;

// Define the command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Dragonfly network boot client", long_about = None)]
struct Cli {
    /// Network interface to boot from (default: first active non-loopback interface)
    #[arg(short, long)]
    interface: Option<String>,

    /// Boot file to request; the server may name a different one
    #[arg(short, long)]
    file: Option<String>,

    /// Where to write the boot image
    #[arg(short, long)]
    output: PathBuf,

    /// Local image to use when network boot fails
    #[arg(short, long)]
    local: Option<PathBuf>,

    /// Attempts per BOOTP discovery and per TFTP step
    #[arg(long, default_value_t = DEFAULT_BOOTP_RETRIES)]
    retries: u32,

    /// Receive timeout in seconds
    #[arg(long, default_value_t = DEFAULT_RECEIVE_TIMEOUT.as_secs())]
    timeout: u64,

    /// Image store chunk size in bytes
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Maximum number of image store chunks
    #[arg(long, default_value_t = DEFAULT_MAX_CHUNKS)]
    max_chunks: usize,

    /// Verbose output - shows more detailed logs
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> NetbootConfig {
        let mut config = NetbootConfig::default()
            .with_bootp_retries(self.retries)
            .with_tftp_retries(self.retries)
            .with_receive_timeout(Duration::from_secs(self.timeout))
            .with_chunk_size(self.chunk_size)
            .with_max_chunks(self.max_chunks);
        if let Some(file) = &self.file {
            config = config.with_boot_filename(file.clone());
        }
        config
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Respect RUST_LOG, fall back to verbose/info for our crates
    let level = if cli.verbose { "debug" } else { "info" };
    let default_directives = format!("dragonfly_boot={level},dragonfly_netboot={level}");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    registry().with(filter).with(fmt::layer().with_writer(stderr)).init();

    let config = cli.config();
    config.validate().wrap_err("Invalid boot configuration")?;
    debug!(?config, "Boot configuration");

    let store = match network_boot(cli.interface.clone(), config) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, "Network boot failed");
            None
        }
    };

    let mut image = BootImage::select(store, cli.local.as_deref())
        .wrap_err("No boot image: network boot failed and no usable local image")?;

    let mut output = File::create(&cli.output)
        .wrap_err_with(|| format!("Failed to create {}", cli.output.display()))?;
    let written = io::copy(&mut image, &mut output)
        .wrap_err_with(|| format!("Failed to write {}", cli.output.display()))?;

    info!(
        source = %image.source(),
        bytes = written,
        output = %cli.output.display(),
        "Boot image written"
    );
    println!(
        "Wrote {} bytes ({} image) to {}",
        written,
        image.source(),
        cli.output.display()
    );
    Ok(())
}

fn network_boot(
    interface: Option<String>,
    config: NetbootConfig,
) -> dragonfly_netboot::Result<ChunkedImageStore> {
    let link = PnetLink::new(interface, config.receive_timeout);
    let mut client = NetbootClient::start(link, SystemClock::new(), config)?;
    if let Some(name) = client.transport().link().interface_name() {
        info!(interface = %name, "Starting network boot");
    }
    client.boot()
}
