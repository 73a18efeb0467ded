//! Command-line interface for the FanZone booking service:
//! - `login` / `logout` / `whoami` / `register` - session management
//! - `catalog <kind>` - browse hotels, flights, activities, match tickets
//! - `book` - submit a booking from catalog selections
//! - `bookings` / `show <id>` / `cancel <id>` - manage existing bookings
//! - `config check` - validate configuration file

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::booking::Booking;
use crate::catalog::ItemKind;
use crate::config::Config;
use crate::error::ClientError;
use crate::AppState;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "fanzone")]
#[command(author, version, about = "Book CAN 2025 and World Cup 2030 travel from the terminal", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "fanzone.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// API URL to connect to (default: from config)
    #[arg(long, env = "FANZONE_API_URL")]
    pub api_url: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store the session tokens
    Login {
        /// Account username
        username: String,
        /// Account password (can also be set via FANZONE_PASSWORD env var)
        #[arg(long, env = "FANZONE_PASSWORD")]
        password: Option<String>,
    },

    /// Create a new account (does not sign in)
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        /// Password, at least 8 characters
        #[arg(long, env = "FANZONE_PASSWORD")]
        password: Option<String>,
        /// Repeat of the password (defaults to --password)
        #[arg(long)]
        confirm_password: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },

    /// Drop the stored session
    Logout,

    /// Show the identity decoded from the stored access token
    Whoami,

    /// List a catalog (hotels, flights, activities, match-tickets)
    Catalog {
        /// Which catalog to list
        kind: ItemKind,
    },

    /// Book a set of catalog items in one order
    Book {
        /// Hotel id to include (repeatable)
        #[arg(long = "hotel", value_name = "ID")]
        hotels: Vec<i64>,
        /// Flight id to include (repeatable)
        #[arg(long = "flight", value_name = "ID")]
        flights: Vec<i64>,
        /// Activity id to include (repeatable)
        #[arg(long = "activity", value_name = "ID")]
        activities: Vec<i64>,
        /// Match ticket id to include (repeatable)
        #[arg(long = "ticket", alias = "match-ticket", value_name = "ID")]
        tickets: Vec<i64>,
    },

    /// List your bookings
    Bookings,

    /// Show one booking in detail
    Show {
        /// Booking id
        id: i64,
    },

    /// Cancel a pending booking
    Cancel {
        /// Booking id
        id: i64,
    },

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

// ============================================================================
// CLI Command Handlers
// ============================================================================

/// Run a CLI command
pub async fn run_command(cli: Cli, mut config: Config) -> Result<()> {
    if let Some(api_url) = &cli.api_url {
        config.api.base_url = api_url.clone();
    }

    if let Commands::Config(ConfigCommands::Check) = &cli.command {
        return cmd_config_check(&cli.config, &config);
    }

    let state = AppState::new(config)?;
    state.session.restore();

    match cli.command {
        Commands::Login { username, password } => cmd_login(&state, &username, password).await,
        Commands::Register {
            username,
            email,
            password,
            confirm_password,
            phone,
            address,
        } => {
            cmd_register(
                &state,
                username,
                email,
                password,
                confirm_password,
                phone,
                address,
            )
            .await
        }
        Commands::Logout => cmd_logout(&state),
        Commands::Whoami => cmd_whoami(&state),
        Commands::Catalog { kind } => cmd_catalog(&state, kind).await,
        Commands::Book {
            hotels,
            flights,
            activities,
            tickets,
        } => cmd_book(&state, &hotels, &flights, &activities, &tickets).await,
        Commands::Bookings => cmd_bookings(&state).await,
        Commands::Show { id } => cmd_show(&state, id).await,
        Commands::Cancel { id } => cmd_cancel(&state, id).await,
        Commands::Config(ConfigCommands::Check) => unreachable!("handled above"),
    }
}

/// Sign in and persist the session
async fn cmd_login(state: &AppState, username: &str, password: Option<String>) -> Result<()> {
    let Some(password) = password else {
        bail!("Provide a password with --password or the FANZONE_PASSWORD environment variable.");
    };

    let claims = state.session.login(username, &password).await?;

    println!("[OK] Signed in as {}", claims.subject());
    if let Some(email) = &claims.email {
        println!("     Email: {}", email);
    }
    Ok(())
}

/// Create an account
async fn cmd_register(
    state: &AppState,
    username: String,
    email: String,
    password: Option<String>,
    confirm_password: Option<String>,
    phone: Option<String>,
    address: Option<String>,
) -> Result<()> {
    let Some(password) = password else {
        bail!("Provide a password with --password or the FANZONE_PASSWORD environment variable.");
    };
    if password.len() < 8 {
        bail!("Password must be at least 8 characters long.");
    }
    let confirm_password = confirm_password.unwrap_or_else(|| password.clone());
    if confirm_password != password {
        bail!("Passwords do not match.");
    }

    let registration = crate::session::Registration {
        username,
        email,
        password,
        confirm_password,
        phone_number: phone,
        address,
    };
    let profile = state.session.register(&registration).await?;

    println!("[OK] Account created");
    println!();
    println!("ID:       {}", profile.id);
    println!("Username: {}", profile.username);
    println!("Email:    {}", profile.email.as_deref().unwrap_or("-"));
    if let Some(role) = &profile.role {
        println!("Role:     {}", role);
    }
    println!();
    println!("Sign in with: fanzone login {}", profile.username);
    Ok(())
}

/// Drop the stored session
fn cmd_logout(state: &AppState) -> Result<()> {
    state.session.logout();
    println!("[OK] Signed out");
    Ok(())
}

/// Show the current identity
fn cmd_whoami(state: &AppState) -> Result<()> {
    let Some(claims) = state.session.identity() else {
        println!("Not signed in. Run 'fanzone login <username>' first.");
        return Ok(());
    };

    println!();
    println!("=== Signed in as {} ===", claims.subject());
    println!();
    if let Some(name) = &claims.name {
        println!("Name:    {}", name);
    }
    if let Some(email) = &claims.email {
        println!("Email:   {}", email);
    }
    if let Some(phone) = &claims.phone {
        println!("Phone:   {}", phone);
    }
    if let Some(address) = &claims.address {
        println!("Address: {}", address);
    }
    if let Some(user_id) = claims.user_id {
        println!("User ID: {}", user_id);
    }
    if let Some(when) = claims.exp.and_then(|exp| chrono::DateTime::from_timestamp(exp, 0)) {
        println!("Token expires: {}", when.format("%Y-%m-%d %H:%M UTC"));
    }
    println!();
    Ok(())
}

/// List one catalog
async fn cmd_catalog(state: &AppState, kind: ItemKind) -> Result<()> {
    let records = state.catalog.list(kind).await?;

    if records.is_empty() {
        println!("No {} found.", kind.plural());
        return Ok(());
    }

    println!();
    println!(
        "{:<6}  {:<44}  {:>12}  {:>9}",
        "ID", "NAME", "PRICE", "AVAILABLE"
    );
    println!("{}", "-".repeat(78));
    for record in &records {
        println!(
            "{:<6}  {:<44}  {:>12}  {:>9}",
            record.id,
            truncate(&record.display_name(), 44),
            record
                .unit_price()
                .map(format_price)
                .unwrap_or_else(|| "-".to_string()),
            record
                .available()
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }
    println!();
    println!(
        "Book with: fanzone book --{} <ID>",
        match kind {
            ItemKind::Hotel => "hotel",
            ItemKind::Flight => "flight",
            ItemKind::Activity => "activity",
            ItemKind::MatchTicket => "ticket",
        }
    );
    Ok(())
}

/// Fetch current prices for the selection, build a draft, and submit it
async fn cmd_book(
    state: &AppState,
    hotels: &[i64],
    flights: &[i64],
    activities: &[i64],
    tickets: &[i64],
) -> Result<()> {
    let mut selections: Vec<(ItemKind, i64)> = Vec::new();
    selections.extend(hotels.iter().map(|id| (ItemKind::Hotel, *id)));
    selections.extend(flights.iter().map(|id| (ItemKind::Flight, *id)));
    selections.extend(activities.iter().map(|id| (ItemKind::Activity, *id)));
    selections.extend(tickets.iter().map(|id| (ItemKind::MatchTicket, *id)));

    if selections.is_empty() {
        bail!("Nothing to book. Pass at least one of --hotel, --flight, --activity, --ticket.");
    }

    let mut items = Vec::with_capacity(selections.len());
    for (kind, id) in selections {
        let record = state
            .catalog
            .get(kind, id)
            .await
            .with_context(|| format!("Could not look up {} {}", kind.label(), id))?;
        let Some(item) = record.to_ref(kind) else {
            bail!("{} {} has no listed price.", kind.label(), id);
        };
        println!(
            "  {} {} - {}",
            record.display_name(),
            format!("(#{})", id),
            format_price(item.unit_price)
        );
        items.push(item);
    }

    let draft = crate::booking::BookingDraft::build(items)?;
    println!();
    println!("Estimated total: {}", format_price(draft.total_price()));

    let booking = state
        .aggregator
        .submit(&draft)
        .await
        .map_err(auth_hint)?;

    println!();
    println!(
        "[OK] Booking #{} created ({}) - {} - {}",
        booking.id,
        booking.status,
        booking.summary(),
        format_price(booking.total_price)
    );
    Ok(())
}

/// List the user's bookings
async fn cmd_bookings(state: &AppState) -> Result<()> {
    let bookings = state.lifecycle.list().await.map_err(auth_hint)?;

    if bookings.is_empty() {
        println!("No bookings yet. Browse catalogs with 'fanzone catalog hotels'.");
        return Ok(());
    }

    println!();
    println!(
        "{:<6}  {:<10}  {:<32}  {:>12}  {:<16}",
        "ID", "STATUS", "ITEMS", "TOTAL", "BOOKED"
    );
    println!("{}", "-".repeat(86));
    for booking in &bookings {
        println!(
            "{:<6}  {:<10}  {:<32}  {:>12}  {:<16}",
            booking.id,
            booking.status,
            truncate(&booking.summary(), 32),
            format_price(booking.total_price),
            booking.booking_date.format("%Y-%m-%d %H:%M"),
        );
    }
    println!();
    Ok(())
}

/// Show one booking in detail
async fn cmd_show(state: &AppState, id: i64) -> Result<()> {
    let booking = state.lifecycle.get(id).await.map_err(auth_hint)?;

    println!();
    println!("=== Booking #{} ===", booking.id);
    println!();
    println!("Status:  {}", booking.status);
    println!("Total:   {}", format_price(booking.total_price));
    println!("Booked:  {}", booking.booking_date.format("%Y-%m-%d %H:%M UTC"));
    if let Some(updated) = booking.updated_at {
        println!("Updated: {}", updated.format("%Y-%m-%d %H:%M UTC"));
    }
    print_booking_items(&booking);
    println!();
    if booking.status.can_cancel() {
        println!("Cancel with: fanzone cancel {}", booking.id);
    }
    Ok(())
}

/// Cancel a pending booking
async fn cmd_cancel(state: &AppState, id: i64) -> Result<()> {
    match state.lifecycle.cancel(id).await.map_err(auth_hint)? {
        Some(updated) => println!("[OK] Booking #{} cancelled ({})", id, updated.status),
        None => println!("[OK] Booking #{} cancelled and removed", id),
    }
    Ok(())
}

/// Validate and summarize the configuration
fn cmd_config_check(config_path: &std::path::Path, config: &Config) -> Result<()> {
    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!(
            "[!!] Configuration file not found: {}",
            config_path.display()
        );
        println!();
        println!("Defaults are in effect. To customize, copy fanzone.example.toml to fanzone.toml");
    } else {
        println!("[OK] Configuration file is valid!");
    }

    println!();
    println!("=== Configuration Summary ===");
    println!();
    println!("API:");
    println!("  Base URL:    {}", config.api.base_url);
    println!("  Timeout:     {}s", config.api.timeout_secs);
    println!();
    println!("Storage:");
    println!(
        "  Credentials: {}",
        config.storage.credentials_path.display()
    );
    println!(
        "  Session:     {}",
        if config.storage.credentials_path.exists() {
            "stored"
        } else {
            "none"
        }
    );
    println!();
    println!("Logging:");
    println!("  Level:       {}", config.logging.level);
    println!();

    if !config.api.base_url.starts_with("http://") && !config.api.base_url.starts_with("https://") {
        println!("[!!] Warning: api.base_url does not look like an HTTP(S) URL");
    }
    Ok(())
}

// ============================================================================
// Output Helpers
// ============================================================================

/// Replace the bare auth error with a hint about how to sign in
fn auth_hint(err: ClientError) -> anyhow::Error {
    match err {
        ClientError::AuthRequired => {
            anyhow::anyhow!("Not signed in. Run 'fanzone login <username>' first.")
        }
        other => other.into(),
    }
}

fn print_booking_items(booking: &Booking) {
    for kind in ItemKind::ALL {
        let items = booking.items(kind);
        if items.is_empty() {
            continue;
        }
        println!();
        println!("{}:", capitalize(kind.plural()));
        for item in items {
            println!(
                "  - {} ({})",
                item.display_name(),
                item.unit_price()
                    .map(format_price)
                    .unwrap_or_else(|| "-".to_string())
            );
        }
    }
}

fn format_price(price: f64) -> String {
    format!("{:.2} MAD", price)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    // Cut on a char boundary; names come from the server and are not ASCII.
    let mut cut = max_len.saturating_sub(3);
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &s[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_strings_alone() {
        assert_eq!(truncate("Atlas Palace", 20), "Atlas Palace");
        assert_eq!(truncate("a very long hotel name indeed", 10), "a very ...");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        // 12 chars, 24 bytes; a byte cut at 17 would land inside an 'é'.
        let name = "éééééééééééé";
        let cut = truncate(name, 20);
        assert_eq!(cut, "éééééééé...");

        assert_eq!(
            truncate("Hôtel Résidence Élégante de Marrakech", 20),
            "Hôtel Résidence..."
        );
    }

    #[test]
    fn price_formatting_is_two_decimals() {
        assert_eq!(format_price(2300.0), "2300.00 MAD");
        assert_eq!(format_price(60.25), "60.25 MAD");
    }
}
