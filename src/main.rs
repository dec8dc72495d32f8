#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use keepsake::{
    session::{ProfileCompletion, RegisterRequest},
    AuthClient, AuthClientFactory, Navigator, Route, SessionService, SessionState, Settings,
};

#[derive(Parser)]
#[command(name = "keepsake")]
#[command(about = "Keepsake session client", long_about = None)]
#[command(version = keepsake::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and persist the session
    Login {
        #[arg(long)]
        email: String,
        /// Read from KEEPSAKE_PASSWORD when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign out and clear the persisted session
    Logout,

    /// Show the current session state
    Whoami,

    /// Show the profile, from cache when fresh
    Profile {
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Trade the current token for a new one
    Refresh,

    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        firstname: String,
        #[arg(long)]
        lastname: String,
        /// Read from KEEPSAKE_PASSWORD when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Confirm an e-mail address with the emailed code
    Verify {
        #[arg(long)]
        email: String,
        #[arg(long)]
        code: String,
    },

    /// Submit the remaining profile details after verification
    CompleteProfile {
        #[arg(long)]
        firstname: String,
        #[arg(long)]
        lastname: String,
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long, default_value = "")]
        city: String,
        #[arg(long, default_value = "")]
        state: String,
        #[arg(long, default_value = "")]
        zip: String,
        #[arg(long, default_value = "")]
        country: String,
    },

    /// List recent sign-ins
    History {
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the backend is reachable
    Health,
}

/// Prints the screen the session layer asks for
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: Route) {
        match route {
            Route::Login => eprintln!("🔑 Session ended; sign in again with `keepsake login`"),
            Route::Root => eprintln!("👋 Signed out"),
        }
    }
}

fn password_or_env(password: Option<String>) -> Result<String> {
    match password {
        Some(password) => Ok(password),
        None => std::env::var("KEEPSAKE_PASSWORD")
            .context("pass --password or set KEEPSAKE_PASSWORD"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = Settings::load().map_err(|e| anyhow!("Failed to load settings: {e}"))?;

    let client = AuthClientFactory::from_settings(&settings, Arc::new(ConsoleNavigator))?;
    client
        .refresh_auth()
        .await
        .context("Failed to read the persisted session")?;

    run(cli.command, &client).await
}

async fn run(command: Commands, client: &AuthClient) -> Result<()> {
    match command {
        Commands::Login { email, password } => {
            let password = password_or_env(password)?;
            if client.login(&email, &password).await.is_none() {
                bail!("Login failed");
            }
            if let SessionState::Authenticated { username } = client.state().await {
                println!("✅ Signed in as {}", username.unwrap_or_default());
            }
        }
        Commands::Logout => client.logout().await,
        Commands::Whoami => match client.state().await {
            SessionState::Anonymous => println!("Not signed in"),
            SessionState::Authenticated { username } => {
                println!("Signed in as {}", username.as_deref().unwrap_or("(unknown)"));
            }
        },
        Commands::Profile { json } => match client.get_profile().await? {
            Some(profile) if json => println!("{}", serde_json::to_string_pretty(&profile)?),
            Some(profile) => {
                println!("{} <{}>", profile.display_name(), profile.email);
                let items = profile.jewelry_box.as_deref().unwrap_or_default();
                println!("Jewelry box: {} item(s)", items.len());
            }
            None => bail!("No profile available"),
        },
        Commands::Refresh => match client.refresh_token().await? {
            Some(_) => println!("🔄 Token refreshed"),
            None => bail!("Token refresh was declined"),
        },
        Commands::Register {
            email,
            username,
            firstname,
            lastname,
            password,
        } => {
            let request = RegisterRequest {
                email,
                password: password_or_env(password)?,
                username,
                firstname,
                lastname,
            };
            if client.register(&request).await? {
                println!("📨 Check your inbox for a verification code");
            } else {
                bail!("Registration was not accepted");
            }
        }
        Commands::Verify { email, code } => {
            if !client.verify_email(&email, &code).await? {
                bail!("Verification failed");
            }
            println!("✅ Email verified");
        }
        Commands::CompleteProfile {
            firstname,
            lastname,
            username,
            phone,
            address,
            city,
            state,
            zip,
            country,
        } => {
            let details = ProfileCompletion {
                firstname,
                lastname,
                username,
                phone,
                address,
                city,
                state,
                zip,
                country,
            };
            if !client.complete_profile(&details).await? {
                bail!("Profile completion failed");
            }
            println!("✅ Profile completed");
        }
        Commands::History { json } => {
            let history = client.login_history().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                for record in history {
                    println!("{}  {}", record.login_time, record.ip_address);
                }
            }
        }
        Commands::Health => {
            if !client.check_server_connection().await {
                bail!("Backend is unreachable");
            }
            println!("✅ Backend is reachable");
        }
    }
    Ok(())
}
