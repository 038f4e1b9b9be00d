// Tessera operator CLI

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tessera_cli::commands;
use tessera_core::{ConfigLoader, TesseraConfig};

#[derive(Parser)]
#[command(name = "tessera")]
#[command(about = "Tessera - threshold-encrypted secret storage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Deal a key-server committee
    Keygen {
        /// Shares needed to decrypt
        #[arg(short = 't', long, default_value = "2")]
        threshold: u16,

        /// Number of key servers
        #[arg(short = 'n', long, default_value = "3")]
        servers: u8,

        /// Output directory for committee and secret files
        #[arg(short, long, default_value = ".tessera")]
        out: PathBuf,
    },

    /// Load and validate a configuration file
    CheckConfig {
        /// Config file path
        #[arg(short, long, default_value = "tessera.toml")]
        config: PathBuf,
    },

    /// Run the store/retrieve scenario in-process
    Demo {
        /// Config file path; defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
        .init();

    match cli.command {
        Commands::Keygen {
            threshold,
            servers,
            out,
        } => {
            let output = commands::keygen::run(threshold, servers, &out)?;
            println!("committee: {}", output.committee.display());
            for path in &output.secrets {
                println!("secret:    {}", path.display());
            }
        }
        Commands::CheckConfig { config } => {
            commands::check_config::run(&config)?;
            println!("{}: ok", config.display());
        }
        Commands::Demo { config } => {
            let config = match config {
                Some(path) => TesseraConfig::load(&path)?,
                None => TesseraConfig::default(),
            };
            let report = commands::demo::run(config).await?;
            println!("policy:        {}", report.policy_id);
            println!("secret id:     {}", report.secret_id);
            println!("blob id:       {}", report.blob_id);
            println!("key identity:  {}", report.key_identity);
            println!("alice decrypt: {}", report.member_decrypted);
            match report.outsider_error {
                Some(kind) => println!("bob decrypt:   refused ({kind})"),
                None => println!("bob decrypt:   succeeded"),
            }
        }
    }

    Ok(())
}
