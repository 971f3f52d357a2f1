use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use physbridge::config::MAX_PAGE_SIZE;
use physbridge::page::{parse_address, parse_byte};
use physbridge::{
    BridgeConfig, DriverEngine, MemoryPage, MonitorSettings, NativeTransport, PageMonitor,
    PhysMemBridge,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Physical memory viewer for the PhysMemRW driver", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print one page as hex and ASCII
    Dump {
        /// Base address in hex (defaults to the configured address)
        #[arg(short, long, value_parser = parse_address_arg)]
        address: Option<u64>,

        /// Number of bytes to show (1..=4096)
        #[arg(short, long, value_parser = parse_length_arg)]
        length: Option<usize>,
    },

    /// Read a single byte
    Read {
        #[arg(short, long, value_parser = parse_address_arg)]
        address: u64,
    },

    /// Write a single byte and read it back
    Write {
        #[arg(short, long, value_parser = parse_address_arg)]
        address: u64,

        /// Byte value in hex
        #[arg(long, value_parser = parse_byte_arg)]
        value: u8,
    },

    /// Re-read a page periodically until interrupted
    Watch {
        #[arg(short, long, value_parser = parse_address_arg)]
        address: Option<u64>,

        /// Refresh period in milliseconds (100..=5000)
        #[arg(short, long)]
        interval_ms: Option<u64>,
    },
}

fn parse_address_arg(s: &str) -> Result<u64, String> {
    parse_address(s).map_err(|e| e.to_string())
}

fn parse_length_arg(s: &str) -> Result<usize, String> {
    let len: usize = s.parse().map_err(|e| format!("'{s}': {e}"))?;
    if len == 0 || len > MAX_PAGE_SIZE {
        return Err(format!("length {len} outside 1..={MAX_PAGE_SIZE}"));
    }
    Ok(len)
}

fn parse_byte_arg(s: &str) -> Result<u8, String> {
    parse_byte(s).map_err(|e| e.to_string())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "physbridge=debug" } else { "physbridge=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn open_bridge(config: &BridgeConfig) -> anyhow::Result<PhysMemBridge> {
    let engine = DriverEngine::with_service(NativeTransport::new(), config.service_name.clone());
    let mut bridge = PhysMemBridge::from_engine(engine);
    bridge
        .try_connect()
        .with_context(|| format!("failed to connect to driver service '{}'", config.service_name))?;
    Ok(bridge)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };

    match cli.command {
        Commands::Dump { address, length } => {
            let base = address.unwrap_or(config.base_address);
            let len = length.unwrap_or(config.page_size);
            let mut bridge = open_bridge(&config)?;
            if config.auto_refresh {
                let settings = MonitorSettings { base, len, ..MonitorSettings::from(&config) };
                watch(bridge, settings).await;
                return Ok(());
            }
            let page = MemoryPage::capture(&mut bridge, base, len)?;
            print!("{page}");
            if page.unreadable_count() > 0 {
                info!("{} bytes could not be read", page.unreadable_count());
            }
        }
        Commands::Read { address } => {
            let mut bridge = open_bridge(&config)?;
            let byte = bridge.try_read_at(address)?;
            println!("{address:#018X}: {byte:02X}");
        }
        Commands::Write { address, value } => {
            let mut bridge = open_bridge(&config)?;
            bridge.try_write_at(address, value)?;
            let readback = bridge.try_read_at(address)?;
            println!("{address:#018X}: {readback:02X}");
            if readback != value {
                bail!("wrote {value:02X} but read back {readback:02X}");
            }
        }
        Commands::Watch { address, interval_ms } => {
            let bridge = open_bridge(&config)?;
            let mut settings = MonitorSettings::from(&config);
            if let Some(base) = address {
                settings.base = base;
            }
            if let Some(ms) = interval_ms {
                settings.interval = Duration::from_millis(ms);
            }

            watch(bridge, settings).await;
        }
    }

    Ok(())
}

async fn watch(bridge: PhysMemBridge, settings: MonitorSettings) {
    let monitor = PageMonitor::spawn(bridge, settings);
    let mut snapshots = monitor.subscribe();
    while let Some(snapshot) = snapshots.next().await {
        // Clear screen and home the cursor before each redraw
        print!("\x1b[2J\x1b[H");
        println!(
            "PhysMemRW @ {:#X}  refresh {:?}  #{}",
            snapshot.page.base(),
            monitor.settings().interval,
            snapshot.sequence
        );
        print!("{}", snapshot.page);
    }
}
