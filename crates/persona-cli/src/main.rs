//! Persona - synthetic identity generator CLI
//!
//! ## Commands
//!
//! - `generate`: synthesize one identity from the people-search service
//! - `demo`: run the three reference generations back to back
//! - `usernames`: username candidates for a name pair (offline)
//! - `password`: a random password (offline)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use persona_core::credentials::random_password_length;
use persona_core::{
    generate_password, generate_usernames, init_tracing, Gender, Generation, GenerationRequest,
    IdentityOrchestrator, Locale, PersonaConfig,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "persona")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Synthesize identities from a people-search service",
    long_about = None
)]
struct Cli {
    /// Path to the YAML config
    #[arg(
        short,
        long,
        global = true,
        env = "PERSONA_CONFIG",
        default_value = "config.yaml"
    )]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one identity
    Generate {
        /// Target age in years (random 18-45 when omitted)
        #[arg(long)]
        age: Option<u32>,

        /// male or female (random when omitted)
        #[arg(long)]
        gender: Option<Gender>,

        /// en or ru (random when omitted)
        #[arg(long)]
        locale: Option<Locale>,

        /// Identifier for the photo directory (derived from the name when omitted)
        #[arg(long)]
        identifier: Option<String>,
    },

    /// Run the three reference generations
    Demo,

    /// Print username candidates for a name pair
    Usernames {
        #[arg(long)]
        first: String,

        #[arg(long)]
        last: String,

        #[arg(long, default_value = "en")]
        locale: Locale,
    },

    /// Print a random password
    Password {
        /// Length (random 7-10 when omitted)
        #[arg(short, long)]
        length: Option<usize>,
    },
}

/// The reference invocations: two derived identifiers, one supplied
fn demo_requests() -> Vec<GenerationRequest> {
    vec![
        GenerationRequest::new().age(25).gender(Gender::Male),
        GenerationRequest::new().age(30).gender(Gender::Female),
        GenerationRequest::new()
            .age(35)
            .gender(Gender::Female)
            .locale(Locale::Ru)
            .identifier("12534466"),
    ]
}

fn load_config(path: &Path) -> Result<PersonaConfig> {
    PersonaConfig::load(path)
        .and_then(PersonaConfig::apply_env_overrides)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

fn print_generation(generation: &Generation) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(generation)?);
    Ok(())
}

async fn run_generation(config: &PersonaConfig, request: GenerationRequest) -> Result<Generation> {
    let mut orchestrator = IdentityOrchestrator::from_config(config)
        .context("Failed to build the search client")?;
    let generation = orchestrator
        .generate(request)
        .await
        .context("Identity generation failed")?;
    Ok(generation)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Generate {
            age,
            gender,
            locale,
            identifier,
        } => {
            let config = load_config(&cli.config)?;
            let request = GenerationRequest {
                age,
                gender,
                locale,
                identifier,
            };
            let generation = run_generation(&config, request).await?;
            print_generation(&generation)?;
        }
        Commands::Demo => {
            let config = load_config(&cli.config)?;
            let requests = demo_requests();
            let total = requests.len();
            let mut failures = 0;
            for (index, request) in requests.into_iter().enumerate() {
                info!(run = index + 1, total, "Starting demo generation");
                match run_generation(&config, request).await {
                    Ok(generation) => print_generation(&generation)?,
                    Err(e) => {
                        failures += 1;
                        error!(
                            run = index + 1,
                            error = %format!("{e:#}"),
                            "Demo generation failed"
                        );
                    }
                }
            }
            if failures > 0 {
                anyhow::bail!("{failures} of {total} demo generations failed");
            }
        }
        Commands::Usernames {
            first,
            last,
            locale,
        } => {
            let usernames = generate_usernames(&first, &last, locale)?;
            for username in usernames {
                println!("{username}");
            }
        }
        Commands::Password { length } => {
            let length = match length {
                Some(length) => length,
                None => random_password_length(&mut rand::thread_rng()),
            };
            println!("{}", generate_password(length));
        }
    }

    Ok(())
}
