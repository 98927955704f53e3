use alloy::primitives::Address;
use clap::{
    ArgGroup,
    Parser,
};
use color_eyre::eyre::Result;
use red_packet::{
    ChainChangePolicy,
    deployment,
    wallets,
};
use std::path::{
    Path,
    PathBuf,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod client;
mod ui;

const DEFAULT_LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "red-packet-playground.log";

#[derive(Parser, Debug)]
#[command(
    name = "red-packet-playground",
    about = "Terminal playground for the Red packet, DataLogger and USDTDataStorage contracts",
    version,
    group(
        ArgGroup::new("network")
            .args(["local", "sepolia", "mainnet"])
    ),
    group(
        ArgGroup::new("signer")
            .args(["wallet", "external_signer"])
            .required(true)
    )
)]
struct Args {
    /// Connect to a local hardhat node (the default)
    #[arg(long)]
    local: bool,

    /// Connect to Sepolia
    #[arg(long)]
    sepolia: bool,

    /// Connect to Ethereum mainnet
    #[arg(long)]
    mainnet: bool,

    /// Override the RPC URL for the selected network
    #[arg(long)]
    rpc_url: Option<String>,

    /// Keystore to sign with
    #[arg(long)]
    wallet: Option<String>,

    /// Override the keystore directory (defaults to ~/.foundry/keystores)
    #[arg(long, requires = "wallet")]
    wallet_dir: Option<String>,

    /// Let the RPC endpoint sign with its own accounts
    #[arg(long)]
    external_signer: bool,

    /// Red contract address
    #[arg(long)]
    red_packet: Option<Address>,

    /// DataLogger contract address
    #[arg(long)]
    data_logger: Option<Address>,

    /// USDTDataStorage contract address
    #[arg(long)]
    data_storage: Option<Address>,

    /// On a chain switch: `reload` everything or refresh `in-place`
    #[arg(long, default_value_t = ChainChangePolicy::FullReload)]
    chain_change: ChainChangePolicy,

    /// Directory for the daily log file
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    log_dir: String,
}

struct CliArgs {
    app: client::AppConfig,
    log_dir: PathBuf,
}

impl Args {
    fn network(&self) -> client::NetworkTarget {
        let url = |default: &str| {
            self.rpc_url
                .clone()
                .unwrap_or_else(|| default.to_string())
        };
        if self.sepolia {
            client::NetworkTarget::Sepolia {
                url: url(client::DEFAULT_SEPOLIA_RPC_URL),
            }
        } else if self.mainnet {
            client::NetworkTarget::Mainnet {
                url: url(client::DEFAULT_MAINNET_RPC_URL),
            }
        } else {
            client::NetworkTarget::Local {
                url: url(client::DEFAULT_LOCAL_RPC_URL),
            }
        }
    }

    fn into_cli(self) -> Result<CliArgs> {
        let network = self.network();
        let wallet = match self.wallet {
            Some(name) => client::WalletConfig::Keystore {
                name,
                dir: wallets::resolve_keystore_dir(self.wallet_dir.as_deref())?,
            },
            None => client::WalletConfig::ExternalSigner,
        };
        Ok(CliArgs {
            app: client::AppConfig {
                network,
                wallet,
                red_packet: self.red_packet,
                data_logger: self.data_logger,
                data_storage: self.data_storage,
                chain_change: self.chain_change,
            },
            log_dir: PathBuf::from(shellexpand::tilde(&self.log_dir).into_owned()),
        })
    }
}

/// Logs go to a daily file; the terminal belongs to the UI.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    let appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Args::parse().into_cli()?;
    let _log_guard = init_tracing(&cli.log_dir);
    tracing::info!("starting red-packet-playground");
    deployment::ensure_structure()?;
    client::run_app(cli.app).await
}
