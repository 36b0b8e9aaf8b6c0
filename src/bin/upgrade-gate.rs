use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use upgrade_gate::{
    BrowserGate, EnvironmentProfile, FileStore, GateConfig, GateOutcome, HttpReporter,
    LogNavigator, PageContext, PromptThrottle,
};

#[derive(Parser, Debug)]
#[command(name = "upgrade-gate")]
#[command(version, about = "Runs the unsupported-browser check against a client profile", long_about = None)]
struct Args {
    /// Path to a YAML gate configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Client-local store holding the prompt flags
    #[arg(long, global = true, default_value = "upgrade-gate-store.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe a client profile and run the report/redirect flow
    Check {
        /// YAML profile describing the client runtime
        #[arg(long)]
        profile: PathBuf,

        /// Full URL of the page being loaded
        #[arg(long)]
        url: String,

        /// User-agent string of the client
        #[arg(long)]
        user_agent: String,
    },
    /// Clear the prompt flags and print the page to return to
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &args.config {
        Some(path) => GateConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => GateConfig::default(),
    };
    let mut store = FileStore::open(&args.store)
        .with_context(|| format!("failed to open store {}", args.store.display()))?;

    match args.command {
        Command::Check {
            profile,
            url,
            user_agent,
        } => {
            let host = EnvironmentProfile::from_file(&profile)
                .with_context(|| format!("failed to load profile {}", profile.display()))?;
            let gate = BrowserGate::new(&config).context("invalid gate configuration")?;
            let reporter = HttpReporter::new(&config.report_endpoint, config.request_timeout())
                .context("failed to build report client")?;
            let page = PageContext::new(url, user_agent);

            let outcome = gate
                .run(&page, &host, &mut store, &reporter, &mut LogNavigator)
                .await;
            match outcome {
                GateOutcome::Bypassed => println!("bypassed"),
                GateOutcome::Supported => println!("supported"),
                GateOutcome::Throttled { reasons } => {
                    println!("throttled");
                    for reason in reasons {
                        println!("- {reason}");
                    }
                }
                GateOutcome::Redirected {
                    target,
                    reasons,
                    delivery,
                } => {
                    println!("redirect {target}");
                    for reason in reasons {
                        println!("- {reason}");
                    }
                    match delivery {
                        Some(outcome) if outcome.is_delivered() => println!("report delivered"),
                        Some(_) => println!("report failed"),
                        None => println!("report pending"),
                    }
                }
            }
        }
        Command::Reset => {
            let back_to = PromptThrottle::new(&mut store)
                .reset()
                .context("failed to clear prompt state")?;
            println!("{back_to}");
        }
    }

    Ok(())
}
