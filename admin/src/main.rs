//! Promogate admin tool
//!
//! Mints promo codes, maintains the digest registry compiled into the app,
//! and answers support questions about individual codes.
//!
//! Usage:
//!   promogate-admin generate --type lifetime --count 50 --registry registry.json
//!   promogate-admin hash LT-AB12-CD34
//!   promogate-admin redeem --registry registry.json LT-AB12-CD34
//!
//! Plaintext codes are printed to stdout only; the registry file holds
//! digests.

use std::path::PathBuf;
use anyhow::Result;
use clap::{Parser, Subcommand};
use promogate_admin::{dry_run, hash_code, issue_codes, load_registry, save_registry};
use promogate_crypto::{CodeGenerator, OsSecureRandom};
use promogate_redeem::RedemptionConfig;
use promogate_types::CodeType;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "promogate-admin")]
#[command(about = "Promogate code issuance and support tool")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mint new codes and append their digests to a registry
    Generate {
        /// Code type: lifetime or monthly
        #[arg(short = 't', long = "type")]
        code_type: CodeType,

        /// Number of codes to mint
        #[arg(short, long, default_value = "10")]
        count: usize,

        /// Registry to extend (created if missing; built-in if omitted)
        #[arg(short, long)]
        registry: Option<PathBuf>,

        /// Where to write the extended registry (defaults to --registry)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print a code's canonical form and digest
    Hash {
        /// The code, in any formatting
        code: String,
    },

    /// Check what redeeming a code would do, without persisting anything
    Redeem {
        /// Registry to check against (built-in if omitted)
        #[arg(short, long)]
        registry: Option<PathBuf>,

        /// Redemption config file
        #[arg(long, default_value = "promogate.toml")]
        config: PathBuf,

        /// The code, in any formatting
        code: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match args.command {
        Command::Generate {
            code_type,
            count,
            registry,
            out,
        } => {
            let shipped = load_registry(registry.as_deref())?;
            let generator = CodeGenerator::new(OsSecureRandom);
            let issued = issue_codes(&generator, &shipped, code_type, count)?;

            match out.or(registry) {
                Some(path) => save_registry(&issued.registry, &path)?,
                None => println!("{}", serde_json::to_string_pretty(&issued.registry.to_file())?),
            }

            info!(
                "Issued {} {} codes; registry now holds {} digests",
                issued.codes.len(),
                issued.code_type,
                issued.registry.len()
            );
            for code in &issued.codes {
                println!("{}", code.display_form());
            }
        }
        Command::Hash { code } => {
            let hashed = hash_code(&code)?;
            println!("{}", serde_json::to_string_pretty(&hashed)?);
        }
        Command::Redeem {
            registry,
            config,
            code,
        } => {
            let registry = load_registry(registry.as_deref())?;
            let config = RedemptionConfig::load_from(&config);
            let report = dry_run(registry, config, &code)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
