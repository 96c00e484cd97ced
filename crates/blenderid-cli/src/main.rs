//! blender-id - log in to Blender ID from the command line.
//!
//! Stores the resulting token in the shared `profiles.json` so other tools
//! can act as the logged-in user without asking for a password again.

use std::io::{self, Write};

use anyhow::{bail, Result};
use blenderid_core::{Config, HttpAuthClient, Outcome, ProfileStore, SessionController};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Pre-fills the login username
const USERNAME_ENV: &str = "BLENDER_ID_USERNAME";

/// Skips the password prompt (for scripted logins)
const PASSWORD_ENV: &str = "BLENDER_ID_PASSWORD";

const USAGE: &str = "\
Usage: blender-id <command>

Commands:
  login [USERNAME]   Log in and make the profile active
  logout             Revoke the active token and forget the profile
  validate           Check the active token with the server
  status             Show who is logged in
  profiles           List stored profiles";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let config = Config::from_env()?;
    info!(endpoint = %config.endpoint, profiles = %config.profiles_path.display(), "Starting");

    let client = HttpAuthClient::new(&config)?;
    let store = ProfileStore::new(config.profiles_path.clone());
    let mut controller = SessionController::init(client, store)?;

    match command.as_str() {
        "login" => login(&mut controller, args.get(1).cloned()),
        "logout" => logout(&mut controller),
        "validate" => report(controller.validate()),
        "status" => status(&controller),
        "profiles" => list_profiles(&controller),
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }
}

fn login(controller: &mut SessionController<HttpAuthClient>, username: Option<String>) -> Result<()> {
    let username = match username.or_else(|| std::env::var(USERNAME_ENV).ok()) {
        Some(username) => username,
        None => prompt_username()?,
    };

    let mut password = match std::env::var(PASSWORD_ENV) {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ")?,
    };

    println!("Authenticating...");
    let outcome = controller.login(&username, &mut password)?;
    report(outcome)?;

    println!("You are logged in as {}", username);
    Ok(())
}

fn logout(controller: &mut SessionController<HttpAuthClient>) -> Result<()> {
    let Some(username) = controller.current_username().map(str::to_string) else {
        println!("You are not logged in");
        return Ok(());
    };

    controller.logout()?;
    println!("Logged out {}", username);
    Ok(())
}

fn status(controller: &SessionController<HttpAuthClient>) -> Result<()> {
    match controller.current_username() {
        Some(username) => println!(
            "You are logged in as {} (id {})",
            username,
            controller.session().unique_id
        ),
        None => println!("You are not logged in"),
    }
    Ok(())
}

fn list_profiles(controller: &SessionController<HttpAuthClient>) -> Result<()> {
    let profiles = controller.store().profiles()?;
    if profiles.is_empty() {
        println!("No stored profiles");
        return Ok(());
    }

    let active = controller.session().unique_id.as_str();
    for (user_id, profile) in profiles {
        let marker = if user_id == active { "*" } else { " " };
        println!("{} {:<12} {}", marker, user_id, profile.username);
    }
    Ok(())
}

/// Print the success message, or fail the command with the error message
fn report(outcome: Outcome) -> Result<()> {
    match outcome {
        Outcome::Success { message } => {
            if let Some(message) = message {
                println!("{}", message);
            }
            Ok(())
        }
        Outcome::Failure { error_message } => bail!(error_message),
    }
}

fn prompt_username() -> Result<String> {
    print!("Username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    Ok(username.trim().to_string())
}
