// ============================================================================
// herald - generate outreach content, review it, publish it
// ============================================================================
// Usage:
//   herald twitter [--mode view|approve|direct] [--user-id ID]
//   herald linkedin [--mode ...] [--utm-link URL]
//   herald email [--mode ...]
//   herald login twitter                     Connect an account (PKCE)
//   herald tokens list|show|disconnect|prune-sessions
//   herald schedule                          Single-use Calendly link
//   herald payment-link <query>              Stripe link for the best price
// ============================================================================

mod modes;
mod prompt;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use herald_core::auth::{
    loopback, CredentialProvider, LinkedInCodeFlow, LinkedInOAuth, OAuth1PinFlow,
    StaticOAuth1Credentials, StoredTokenCredentials, TwitterPinAuth,
};
use herald_core::config::{load_dotenv, HeraldConfig, StoreBackend, StoreConfig};
use herald_core::executor::{
    CalendlyExecutor, EmailExecutor, LinkedInExecutor, PaymentLinkExecutor,
};
use herald_core::generator::NO_PRICE_MATCH;
use herald_core::{
    completion_provider, open_store, AuthStore, ContentGenerator, EmailDraft, HeraldError,
    LinkedInDraft, PriceCatalog, PromptKind, SessionStore, StructuredContent, TokenStore,
    TwitterExecutor, TwitterOAuth, VendorPoster,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use modes::{compose, report, run_mode, Mode};
use prompt::TerminalVerifier;

/// Outreach content generator and publisher
#[derive(Parser)]
#[command(name = "herald", version, about = "Generate, review and publish outreach content")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate or write a tweet and optionally post it
    Twitter {
        #[arg(long, value_enum)]
        mode: Option<Mode>,

        /// Post with the token stored for this connected account
        #[arg(long)]
        user_id: Option<String>,
    },

    /// Generate or write a LinkedIn post and optionally share it
    Linkedin {
        #[arg(long, value_enum)]
        mode: Option<Mode>,

        /// Tracking link appended to the post body
        #[arg(long, env = "HERALD_UTM_LINK")]
        utm_link: Option<String>,
    },

    /// Generate or write an email and optionally send it
    Email {
        #[arg(long, value_enum)]
        mode: Option<Mode>,
    },

    /// Connect an account through the browser
    Login {
        #[command(subcommand)]
        provider: LoginProvider,
    },

    /// Inspect and manage stored tokens and handshake sessions
    Tokens {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Create a single-use Calendly scheduling link
    Schedule,

    /// Pick the most relevant price for a query and create a payment link
    PaymentLink {
        query: String,
    },
}

#[derive(Subcommand)]
enum LoginProvider {
    /// Twitter OAuth 2.0 with PKCE, redirect caught on the loopback address
    Twitter,
}

#[derive(Subcommand)]
enum TokenAction {
    /// List connected accounts
    List,

    /// Show one stored token record as JSON
    Show { user_id: String },

    /// Forget a connected account
    Disconnect { user_id: String },

    /// Drop handshake sessions that were never completed
    PruneSessions {
        #[arg(long, default_value = "30")]
        older_than_mins: i64,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("herald=info,herald_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn format_timestamp(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("(invalid: {})", ts))
}

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();
    init_tracing();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    let mut config = HeraldConfig::from_env().context("Invalid configuration")?;
    // The CLI defaults to the redb backend
    config.store = StoreConfig::from_env_or(StoreBackend::Redb)?;
    let client = config.http.build_client()?;

    match command {
        Commands::Twitter { mode, user_id } => cmd_twitter(&config, client, mode, user_id).await,
        Commands::Linkedin { mode, utm_link } => cmd_linkedin(&config, client, mode, utm_link).await,
        Commands::Email { mode } => cmd_email(&config, client, mode).await,
        Commands::Login {
            provider: LoginProvider::Twitter,
        } => cmd_login_twitter(&config, client).await,
        Commands::Tokens { action } => cmd_tokens(&config, action).await,
        Commands::Schedule => cmd_schedule(&config, client).await,
        Commands::PaymentLink { query } => cmd_payment_link(&config, client, &query).await,
    }
}

fn resolve_mode(mode: Option<Mode>) -> Result<Mode> {
    match mode {
        Some(mode) => Ok(mode),
        None => Ok(prompt::choose_mode()?),
    }
}

fn generator(config: &HeraldConfig, client: reqwest::Client) -> ContentGenerator {
    ContentGenerator::new(completion_provider(client, config.llm.clone()))
}

// ============================================================================
// Publishing commands
// ============================================================================

async fn cmd_twitter(
    config: &HeraldConfig,
    client: reqwest::Client,
    mode: Option<Mode>,
    user_id: Option<String>,
) -> Result<()> {
    let mode = resolve_mode(mode)?;
    let generator = generator(config, client.clone());
    let text = compose(mode, "What should the tweet be about?", prompt::ask_query, |topic| async move {
        match generator.generate(PromptKind::Tweet, &topic).await? {
            StructuredContent::Tweet(draft) => Ok(draft.formatted()),
            other => Ok(other.preview()),
        }
    })
    .await?;

    let poster = TwitterExecutor::new(client.clone(), config.twitter.api_base.clone());
    let body = text.clone();
    let outcome = run_mode(mode, &text, |_| prompt::confirm("Post this tweet?"), move || async move {
        let store = open_store(&config.store)?;
        let provider = twitter_credentials(config, client, store, user_id.as_deref()).await?;
        let credential = provider.credential().await?;
        poster.post(&body, &credential).await
    })
    .await?;

    report(&outcome);
    Ok(())
}

/// Stored token for `--user-id`, else the configured OAuth 1.0a token, else the PIN flow
async fn twitter_credentials(
    config: &HeraldConfig,
    client: reqwest::Client,
    store: Arc<dyn AuthStore>,
    user_id: Option<&str>,
) -> herald_core::Result<Box<dyn CredentialProvider>> {
    if let Some(user_id) = user_id {
        if store.lookup(user_id).await?.is_none() {
            return Err(HeraldError::NotFound(format!(
                "No Twitter connection for user {}",
                user_id
            )));
        }
        return Ok(Box::new(StoredTokenCredentials::new(store, user_id)));
    }

    if let Some(token) = config.twitter.static_oauth1_token() {
        info!("Using configured Twitter OAuth 1.0a token");
        return Ok(Box::new(StaticOAuth1Credentials::new(token)));
    }

    let consumer = config.twitter.consumer().ok_or_else(|| {
        HeraldError::Config(
            "Set TWITTER_API_KEY and TWITTER_API_KEY_SECRET, or pass --user-id".to_string(),
        )
    })?;
    let auth = TwitterPinAuth::new(client, consumer, config.twitter.api_base.clone());
    Ok(Box::new(OAuth1PinFlow::new(auth, Box::new(TerminalVerifier))))
}

async fn cmd_linkedin(
    config: &HeraldConfig,
    client: reqwest::Client,
    mode: Option<Mode>,
    utm_link: Option<String>,
) -> Result<()> {
    let mode = resolve_mode(mode)?;
    let generator = generator(config, client.clone());
    let body = compose(mode, "What should the LinkedIn post be about?", prompt::ask_query, |topic| async move {
        match generator.generate(PromptKind::LinkedInPost, &topic).await? {
            StructuredContent::LinkedInPost(draft) => Ok(draft.body),
            other => Ok(other.preview()),
        }
    })
    .await?;
    let text = LinkedInDraft { body }.with_link(utm_link.as_deref().unwrap_or(""));

    let poster = LinkedInExecutor::new(client.clone(), config.linkedin.api_base.clone());
    let body = text.clone();
    let outcome = run_mode(mode, &text, |_| prompt::confirm("Share this post?"), move || async move {
        let oauth = LinkedInOAuth::new(config.linkedin.clone(), client);
        let credential = LinkedInCodeFlow::new(oauth, Box::new(TerminalVerifier))
            .credential()
            .await?;
        poster.post(&body, &credential).await
    })
    .await?;

    report(&outcome);
    Ok(())
}

async fn cmd_email(config: &HeraldConfig, client: reqwest::Client, mode: Option<Mode>) -> Result<()> {
    let mode = resolve_mode(mode)?;
    let draft = match mode {
        Mode::Direct => EmailDraft {
            recipient: prompt::ask_query("Recipient:")?,
            subject: prompt::ask_query("Subject:")?,
            body: prompt::ask_query("Body:")?,
        },
        Mode::View | Mode::Approve => {
            let topic = prompt::ask_query("What should the email say, and to whom?")?;
            match generator(config, client).generate(PromptKind::Email, &topic).await? {
                StructuredContent::Email(draft) => draft,
                _ => anyhow::bail!("Generator returned a non-email draft"),
            }
        }
    };
    let preview = StructuredContent::Email(draft.clone()).preview();

    let outcome = run_mode(mode, &preview, |_| prompt::confirm("Send this email?"), move || async move {
        EmailExecutor::new(&config.smtp)?.send(&draft).await
    })
    .await?;

    report(&outcome);
    Ok(())
}

// ============================================================================
// Account commands
// ============================================================================

/// Login tokens have to outlive this process
fn require_persistent_store(store: &StoreConfig) -> herald_core::Result<()> {
    match store.backend {
        StoreBackend::Redb => Ok(()),
        StoreBackend::Memory => Err(HeraldError::Config(
            "herald login needs a persistent store; unset HERALD_STORE or set it to redb".to_string(),
        )),
    }
}

async fn cmd_login_twitter(config: &HeraldConfig, client: reqwest::Client) -> Result<()> {
    require_persistent_store(&config.store)?;

    let store = open_store(&config.store)?;
    let oauth = TwitterOAuth::new(config.twitter.clone(), client, store);
    let request = oauth.begin_authorization().await?;

    println!("\nOpen this URL in your browser and authorize Herald:\n  {}\n", request.auth_url);
    println!("Waiting for the redirect on {} ...", oauth.redirect_uri());

    let redirect_uri = oauth.redirect_uri().to_string();
    let timeout = Duration::from_secs(config.http.callback_timeout_secs);
    let params = tokio::task::spawn_blocking(move || loopback::wait_for_callback(&redirect_uri, timeout))
        .await
        .context("Callback listener stopped unexpectedly")??;

    let account = oauth.handle_callback(params).await?;
    println!("Twitter account connected. User id: {}", account.user_id);
    println!("Post with: herald twitter --user-id {}", account.user_id);
    Ok(())
}

async fn cmd_tokens(config: &HeraldConfig, action: TokenAction) -> Result<()> {
    let store = open_store(&config.store)?;

    match action {
        TokenAction::List => {
            let tokens = store.list_tokens().await?;
            if tokens.is_empty() {
                println!("No connected accounts.");
                return Ok(());
            }

            println!("{:<36}  {:<22}  {:<8}  {}", "USER ID", "ISSUED AT", "EXPIRED", "SCOPE");
            println!("{}", "-".repeat(90));
            for (user_id, record) in &tokens {
                println!(
                    "{:<36}  {:<22}  {:<8}  {}",
                    user_id,
                    format_timestamp(record.issued_at),
                    if record.looks_expired() { "maybe" } else { "no" },
                    record.scope
                );
            }
            println!("\nTotal: {} accounts", tokens.len());
        }
        TokenAction::Show { user_id } => {
            let record = store
                .lookup(&user_id)
                .await?
                .ok_or_else(|| HeraldError::NotFound(format!("No tokens stored for user {}", user_id)))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        TokenAction::Disconnect { user_id } => {
            if !store.delete(&user_id).await? {
                return Err(HeraldError::NotFound(format!("No tokens stored for user {}", user_id)).into());
            }
            println!("Disconnected {}", user_id);
        }
        TokenAction::PruneSessions { older_than_mins } => {
            let pending = store.list_sessions().await?.len();
            let pruned = store.prune_sessions(older_than_mins * 60).await?;
            println!(
                "Pruned {} of {} pending sessions (older than {} minutes)",
                pruned, pending, older_than_mins
            );
        }
    }

    Ok(())
}

// ============================================================================
// Link commands
// ============================================================================

async fn cmd_schedule(config: &HeraldConfig, client: reqwest::Client) -> Result<()> {
    let link = CalendlyExecutor::new(client, &config.calendly)?
        .create_scheduling_link()
        .await?;
    println!("Scheduling link: {}", link);
    Ok(())
}

async fn cmd_payment_link(config: &HeraldConfig, client: reqwest::Client, query: &str) -> Result<()> {
    let catalog = PriceCatalog::load(&config.payment.price_mapping_path)?;
    let price_id = generator(config, client.clone())
        .select_price_id(query, &catalog)
        .await?;

    if price_id == NO_PRICE_MATCH {
        println!("{}", NO_PRICE_MATCH);
        return Ok(());
    }

    info!("Selected price {}", price_id);
    let link = PaymentLinkExecutor::new(client, &config.payment)?
        .create_payment_link(query, &price_id)
        .await?;
    println!("Payment link: {}", link);
    Ok(())
}
