//! cart-filler - Supermarket price comparison and basket-to-cart playback CLI

use anyhow::Result;
use cart_filler::commands::{
    CompareCommand, CompareQuery, ExportCommand, FillCommand, ProbeCommand, ShowCommand,
};
use cart_filler::config::{Config, OutputFormat};
use cart_filler::format::Formatter;
use cart_filler::retailers::Retailer;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cart-filler",
    version,
    about = "Compare supermarket prices and fill an online cart",
    long_about = "Loads supermarket price-transparency feeds, compares prices across chains, and replays a basket against a retailer's online store."
)]
struct Cli {
    /// Proxy URL for feed downloads (e.g., socks5://host:port)
    #[arg(long, global = true, env = "CART_PROXY")]
    proxy: Option<String>,

    /// Delay between feed downloads in milliseconds
    #[arg(long, global = true, env = "CART_FEEDS_DELAY")]
    delay: Option<u64>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare prices across markets
    #[command(alias = "c")]
    Compare {
        /// Name search (case-insensitive)
        #[arg(short, long)]
        query: Option<String>,

        /// Exact category
        #[arg(long)]
        category: Option<String>,

        /// Maximum best price
        #[arg(long)]
        max_price: Option<String>,

        /// Markets to compare (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        markets: Vec<String>,

        /// Export the matching products to a retailer
        #[arg(long, value_name = "RETAILER")]
        export: Option<String>,
    },

    /// Show one product's price at each market
    Show {
        /// Matching key (barcode:... or name:...) or item code
        key: String,

        /// Markets to compare (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        markets: Vec<String>,
    },

    /// List supported retailers
    Markets,

    /// Export a basket (JSON file, or - for stdin) to a retailer
    Export {
        /// Export request file
        input: String,
    },

    /// Show the pending export
    Status {
        /// Drop the pending export
        #[arg(long)]
        clear: bool,
    },

    /// Fill the retailer cart with the pending export in a browser
    Fill {
        /// Page to open instead of the retailer's shop page
        #[arg(long)]
        url: Option<String>,

        /// Chrome or Chromium executable
        #[arg(long, env = "CART_CHROME_PATH")]
        chrome: Option<PathBuf>,
    },

    /// Check a retailer's cart selectors against its page
    Probe {
        /// Retailer to probe
        retailer: Retailer,

        /// Saved HTML page to probe instead of fetching the live site
        #[arg(long)]
        html: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(delay) = cli.delay {
        config.delay_ms = delay;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }

    match cli.command {
        Commands::Compare { query, category, max_price, markets, export } => {
            let cmd = CompareCommand::new(config);
            let query = CompareQuery { query, category, max_price, markets, export_to: export };
            println!("{}", cmd.execute(&query).await?);
        }

        Commands::Show { key, markets } => {
            let cmd = ShowCommand::new(config);
            println!("{}", cmd.execute(&key, &markets).await?);
        }

        Commands::Markets => {
            println!("{}", Formatter::new(config.format).format_retailers(Retailer::all()));
        }

        Commands::Export { input } => {
            let cmd = ExportCommand::new(config);
            println!("{}", cmd.execute(&input)?);
        }

        Commands::Status { clear } => {
            let cmd = ExportCommand::new(config);
            let output = if clear { cmd.clear()? } else { cmd.status()? };
            println!("{}", output);
        }

        Commands::Fill { url, chrome } => {
            let cmd = FillCommand::new(config);
            let output = cmd.execute(url.as_deref(), chrome.as_deref()).await?;
            println!("{}", output);
        }

        Commands::Probe { retailer, html } => {
            let cmd = ProbeCommand::new(config);
            println!("{}", cmd.execute(retailer, html.as_deref()).await?);
        }
    }

    Ok(())
}
