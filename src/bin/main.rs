use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use notewire::{AppConfig, AppState, ProviderConfig, RedirectUri, TokenIssuer, create_router};

#[derive(Parser)]
#[command(name = "notewire")]
#[command(about = "Notes API with bearer authentication and live WebSocket fan-out")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP/WebSocket service
    Serve {
        /// Bind address, e.g. 0.0.0.0:8080
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        /// Shared secret for signing and verifying local tokens
        #[arg(long, env = "NOTEWIRE_TOKEN_SECRET")]
        token_secret: String,
        /// Allowed CORS origin; repeat for multiple (permissive when omitted)
        #[arg(long = "allowed-origin")]
        allowed_origins: Vec<String>,
        /// Identity provider API base URL
        #[arg(
            long,
            env = "NOTEWIRE_PROVIDER_API_BASE",
            default_value = notewire::DEFAULT_PROVIDER_API_BASE
        )]
        provider_api_base: Url,
        /// OAuth client id registered with the provider
        #[arg(long, env = "NOTEWIRE_PROVIDER_CLIENT_ID", default_value = "")]
        provider_client_id: String,
        /// OAuth client secret registered with the provider
        #[arg(long, env = "NOTEWIRE_PROVIDER_CLIENT_SECRET", default_value = "")]
        provider_client_secret: String,
        /// Redirect URI configured with the provider
        #[arg(long, env = "NOTEWIRE_PROVIDER_REDIRECT_URI", default_value = "")]
        provider_redirect_uri: String,
    },
    /// Mint a local token for a subject (for operators and tests)
    IssueToken {
        /// Subject to embed in the token
        #[arg(long)]
        subject: String,
        #[arg(long, env = "NOTEWIRE_TOKEN_SECRET")]
        token_secret: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("notewire=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            token_secret,
            allowed_origins,
            provider_api_base,
            provider_client_id,
            provider_client_secret,
            provider_redirect_uri,
        } => {
            let config = AppConfig {
                bind,
                token_secret,
                allowed_origins,
                provider: ProviderConfig {
                    api_base: provider_api_base,
                    client_id: provider_client_id,
                    client_secret: provider_client_secret,
                    redirect_uri: RedirectUri::new(provider_redirect_uri),
                },
            };
            config.validate()?;

            let state = AppState::from_config(&config)?;
            let app = create_router(state);

            let listener = tokio::net::TcpListener::bind(&config.bind).await?;
            info!("notewire listening on http://{}", config.bind);

            axum::serve(listener, app).await?;
        }
        Commands::IssueToken {
            subject,
            token_secret,
        } => {
            let issuer = TokenIssuer::new(&token_secret);
            let token = issuer.issue(&subject)?;
            println!("{}", token);
        }
    }

    Ok(())
}
