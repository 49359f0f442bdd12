use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueHint};
use htlc_escrow_client::{ledger_time, parse_secret, EscrowSession};
use htlc_escrow_core::interface::load_escrow_data;
use htlc_escrow_core::{
    make_hash, AssetId, CreateEscrow, EscrowConfig, Identity, KeyRegistration, Memo, SecretHash,
    Transfer,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "./escrow_config.json";
const DEFAULT_STATE_PATH: &str = "./escrow_state.json";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let now = ledger_time(cli.now);

    match cli.command {
        Commands::Init {
            app_address,
            creator,
            force,
        } => {
            let config = EscrowConfig::new(app_address, creator);
            EscrowSession::init(&cli.config, &cli.state, &config, force)?;
            tracing::info!("Escrow contract initialized");
        }
        Commands::Hash { secret } => {
            println!("{}", make_hash(&parse_secret(&secret)?));
        }
        Commands::Time => println!("{now}"),
        command => run(command, &cli.config, &cli.state, now)?,
    }

    Ok(())
}

/// Runs a command against the persisted contract, saving state if it mutated.
fn run(command: Commands, config: &Path, state: &Path, now: u64) -> anyhow::Result<()> {
    let mut session = EscrowSession::open(config, state, now)?;
    let contract = session.contract_mut();
    let app = contract.config().app_address;

    let mutated = match command {
        Commands::Admit {
            sender,
            asset,
            amount,
        } => {
            let fee = match amount {
                Some(amount) => amount,
                None => contract.config().costs.admission_fee(asset)?,
            };
            contract.admit_asset(sender, &Transfer::payment(sender, app, fee), asset)?;
            tracing::info!("Asset {asset} admitted");
            true
        }
        Commands::Create {
            sender,
            amount,
            asset,
            rescue_delay,
            secret,
            secret_hash,
            recipient,
            destination_setter,
            memo,
            reserve,
        } => {
            let secret_hash = match (secret_hash, secret) {
                (Some(hash), _) => hash,
                (None, Some(secret)) => make_hash(&parse_secret(&secret)?),
                (None, None) => anyhow::bail!("either --secret or --secret-hash is required"),
            };
            let deposit = if asset.is_native() {
                Transfer::payment(sender, app, amount)
            } else {
                Transfer::token(sender, app, asset, amount)
            };
            let memo = match memo {
                Some(text) => Memo::from_slice(text.as_bytes())?,
                None => Memo::EMPTY,
            };
            let reserve = match reserve {
                Some(reserve) => reserve,
                None => contract.quote_reserve_amount()?,
            };
            contract.create(
                sender,
                CreateEscrow {
                    deposit,
                    reserve: Transfer::payment(sender, app, reserve),
                    rescue_delay,
                    secret_hash,
                    recipient,
                    destination_setter,
                    memo,
                },
            )?;
            print_json(contract.get_escrow(&secret_hash)?)?;
            true
        }
        Commands::Withdraw {
            sender,
            secret_hash,
            secret,
        } => {
            let payouts = contract.withdraw(sender, secret_hash, &parse_secret(&secret)?)?;
            print_json(&payouts)?;
            true
        }
        Commands::Cancel {
            sender,
            secret_hash,
        } => {
            let payouts = contract.cancel(sender, secret_hash)?;
            print_json(&payouts)?;
            true
        }
        Commands::SetRecipient {
            sender,
            secret_hash,
            recipient,
        } => {
            contract.set_recipient(sender, secret_hash, recipient)?;
            print_json(contract.get_escrow(&secret_hash)?)?;
            true
        }
        Commands::Show { secret_hash } => {
            match secret_hash {
                Some(hash) => print_json(contract.get_escrow(&hash)?)?,
                None => print_json(contract.state())?,
            }
            false
        }
        Commands::Quote => {
            println!("{}", contract.quote_reserve_amount()?);
            false
        }
        Commands::Excess { asset } => {
            println!("{}", contract.withdrawable_excess(asset)?);
            false
        }
        Commands::AdminWithdraw {
            sender,
            asset,
            amount,
        } => {
            let payout = contract.admin_withdraw(sender, asset, amount)?;
            print_json(&payout)?;
            true
        }
        Commands::Accrue { asset, amount } => {
            contract.accrue(asset, amount)?;
            true
        }
        Commands::Keyreg {
            sender,
            registration,
        } => {
            let registration: KeyRegistration = load_escrow_data(&registration)?;
            let receipt = contract.register_online(sender, registration)?;
            print_json(&receipt)?;
            true
        }
        Commands::Init { .. } | Commands::Hash { .. } | Commands::Time => false,
    };

    if mutated {
        session.save()?;
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Parser)]
#[command(name = "htlc-cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Contract configuration file
    #[arg(long, global = true,
        default_value = DEFAULT_CONFIG_PATH,
        value_hint = ValueHint::FilePath)]
    config: PathBuf,

    /// Contract state file
    #[arg(long, global = true,
        default_value = DEFAULT_STATE_PATH,
        value_hint = ValueHint::FilePath)]
    state: PathBuf,

    /// Ledger time in Unix seconds. Defaults to the wall clock.
    #[arg(long, global = true)]
    now: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a new contract with default storage costs
    Init {
        #[arg(long)]
        app_address: Identity,
        #[arg(long)]
        creator: Identity,
        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },
    /// Admit an asset, paying its admission fee. Asset 0 bootstraps the contract.
    Admit {
        #[arg(short, long)]
        sender: Identity,
        #[arg(short, long, default_value_t = AssetId::NATIVE)]
        asset: AssetId,
        /// Fee to pay. Defaults to the exact admission fee.
        #[arg(long)]
        amount: Option<u64>,
    },
    /// Lock funds behind a secret hash
    Create {
        #[arg(short, long)]
        sender: Identity,
        #[arg(long)]
        amount: u64,
        #[arg(short, long, default_value_t = AssetId::NATIVE)]
        asset: AssetId,
        /// Seconds until only cancellation is possible
        #[arg(long)]
        rescue_delay: u64,
        /// Secret to hash (0x-prefixed hex or text)
        #[arg(long, conflicts_with = "secret_hash")]
        secret: Option<String>,
        #[arg(long)]
        secret_hash: Option<SecretHash>,
        /// Fixed recipient; without one the withdrawing caller is paid
        #[arg(short, long)]
        recipient: Option<Identity>,
        /// Account allowed to change the recipient before the rescue time
        #[arg(long)]
        destination_setter: Option<Identity>,
        /// Free-form note stored with the escrow, at most 256 bytes
        #[arg(long)]
        memo: Option<String>,
        /// Reserve to pay. Defaults to the current quote.
        #[arg(long)]
        reserve: Option<u64>,
    },
    /// Claim an escrow by revealing its secret
    Withdraw {
        #[arg(short, long)]
        sender: Identity,
        #[arg(long)]
        secret_hash: SecretHash,
        #[arg(long)]
        secret: String,
    },
    /// Refund an expired escrow to its depositor
    Cancel {
        #[arg(short, long)]
        sender: Identity,
        #[arg(long)]
        secret_hash: SecretHash,
    },
    /// Change the recipient of an open escrow
    SetRecipient {
        #[arg(short, long)]
        sender: Identity,
        #[arg(long)]
        secret_hash: SecretHash,
        #[arg(short, long)]
        recipient: Identity,
    },
    /// Print one escrow record, or the whole contract state
    Show {
        #[arg(long)]
        secret_hash: Option<SecretHash>,
    },
    /// Print keccak256 of a secret
    Hash {
        #[arg(long)]
        secret: String,
    },
    /// Print the reserve the next escrow must pay
    Quote,
    /// Print the withdrawable excess of an asset
    Excess {
        #[arg(short, long, default_value_t = AssetId::NATIVE)]
        asset: AssetId,
    },
    /// Pay excess funds to the creator
    AdminWithdraw {
        #[arg(short, long)]
        sender: Identity,
        #[arg(short, long, default_value_t = AssetId::NATIVE)]
        asset: AssetId,
        /// Defaults to the whole excess
        #[arg(long)]
        amount: Option<u64>,
    },
    /// Record funds that reached the contract outside any escrow
    Accrue {
        #[arg(short, long, default_value_t = AssetId::NATIVE)]
        asset: AssetId,
        #[arg(long)]
        amount: u64,
    },
    /// Register participation keys from a JSON file
    Keyreg {
        #[arg(short, long)]
        sender: Identity,
        #[arg(long, value_hint = ValueHint::FilePath)]
        registration: PathBuf,
    },
    /// Print the ledger time this invocation runs at
    Time,
}
