use clap::{Parser, Subcommand};
use mailbox_otp::{ExtractError, ExtractorConfig, GmailMailbox, MailExtractor};
use serde_json::json;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "mailbox-otp",
    about = "Read OTP codes and password-reset links from a Gmail inbox",
    arg_required_else_help = true
)]
struct Cli {
    /// Override the wait for the final polling stage, in seconds
    #[arg(long, global = true)]
    wait: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the 4-digit OTP from the newest matching email
    Otp,
    /// Print the token, email and URL from the newest password-reset email
    ResetLink,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "mailbox_otp=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), ExtractError> {
    let config = ExtractorConfig::from_env()?;
    let mailbox = GmailMailbox::new(config.gmail_config())?;
    let extractor = MailExtractor::new(mailbox, config.reset_link_rules()?);

    let output = match cli.command {
        Commands::Otp => {
            let mut criteria = config.otp_criteria();
            if let Some(wait) = cli.wait {
                criteria = criteria.max_wait_secs(wait);
            }
            let otp = extractor.extract_otp(&criteria).await?;
            json!({ "otp": otp })
        }
        Commands::ResetLink => {
            let mut criteria = config.reset_criteria();
            if let Some(wait) = cli.wait {
                criteria = criteria.max_wait_secs(wait);
            }
            let link = extractor.extract_reset_link(&criteria).await?;
            serde_json::to_value(link)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
