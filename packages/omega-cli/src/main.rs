//! Omega CLI
//!
//! Terminal front-end for the Omega dashboard client. Each invocation runs one
//! command against the REST API; the session persists between invocations in
//! the data directory, so `omega login` followed by `omega friends` works the
//! way the dashboard does.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, WrapErr};
use omega_core::{ClientConfig, Error, OmegaClient, Route, ToastKind, UserId};

const SESSION_EXPIRED: &str = "Session expired. Please log in again.";

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "omega", version, about = "Omega dashboard client")]
struct Args {
    /// Root of the Omega REST API
    #[arg(long, global = true, env = "OMEGA_API_URL")]
    api_url: Option<String>,

    /// Directory holding the persisted session
    #[arg(long, global = true, env = "OMEGA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account (does not sign in)
    Register {
        username: String,
        #[arg(long, env = "OMEGA_PASSWORD", hide_env_values = true)]
        password: String,
        /// Display name; defaults to the username
        #[arg(long)]
        name: Option<String>,
    },
    /// Sign in and remember the session
    Login {
        username: String,
        #[arg(long, env = "OMEGA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Print the signed-in user
    Whoami,
    /// Search users
    Search { query: String },
    /// List friends
    Friends,
    /// Add a friend by user id
    AddFriend {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Resolve a dashboard path, applying route guards
    Open { path: String },
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "omega_cli=info,omega_core=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = build_config(ClientConfig::from_env(), &args);
    let client = OmegaClient::from_config(config).wrap_err("failed to start the Omega client")?;

    let result = run(&client, args.command).await;
    print_toasts(&client);
    client.shutdown();
    result
}

/// Layer command-line flags over the environment configuration.
fn build_config(mut config: ClientConfig, args: &Args) -> ClientConfig {
    if let Some(ref url) = args.api_url {
        config = config.with_api_base_url(url.clone());
    }
    if let Some(ref dir) = args.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if config.data_dir.is_none() {
        config.data_dir = dirs::data_dir().map(|dir| dir.join("omega"));
    }
    if config.data_dir.is_none() {
        tracing::warn!("No data directory available, the session will not persist");
    }
    config
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn run(client: &OmegaClient, command: Command) -> color_eyre::Result<()> {
    let notify = client.notifications();

    match command {
        Command::Register {
            username,
            password,
            name,
        } => {
            let display_name = name.as_deref().unwrap_or(&username);
            match client.session().register(&username, &password, display_name).await {
                Ok(payload) => {
                    notify.success("Account created. You can now log in.");
                    print_json(&payload)?;
                }
                Err(err) => return Err(api_failure(client, "Registration failed", err, false)),
            }
        }

        Command::Login { username, password } => {
            match client.session().login(&username, &password).await {
                Ok(user) => {
                    notify.success(format!("Welcome, {}", user.display_name()));
                    print_json(&user)?;
                }
                Err(err) => return Err(api_failure(client, "Login failed", err, false)),
            }
        }

        Command::Logout => {
            client.session().logout();
            notify.info("Logged out");
        }

        Command::Whoami => match client.session().user() {
            Some(user) => print_json(&user)?,
            None => bail!("not logged in"),
        },

        Command::Search { query } => {
            require_login(client)?;
            client.social().search_users(&query).await;
            check_social(client)?;
            print_json(&client.social().snapshot().search_results)?;
        }

        Command::Friends => {
            require_login(client)?;
            client.social().get_friends().await;
            check_social(client)?;
            print_json(&client.social().snapshot().friends)?;
        }

        Command::AddFriend { id, yes } => {
            require_login(client)?;
            let friend_id: UserId = id.parse().unwrap_or_else(|never| match never {});

            let pending = notify.show_confirm("Add friend", format!("Add user {friend_id} as a friend?"));
            let answer = yes || prompt_confirm(client)?;
            notify.handle_confirm(answer);
            if !pending.await? {
                notify.info("Cancelled");
                return Ok(());
            }

            if let Err(err) = client.social().add_friend(friend_id).await {
                return Err(api_failure(client, "Could not add friend", err, true));
            }
            notify.success("Friend added");
            print_json(&client.social().snapshot().friends)?;
        }

        Command::Open { path } => {
            let landed = client.router().navigate(&path)?;
            if Route::from_path(&path) != Some(landed) {
                notify.error(format!("Access to {path} denied"));
            }
            let def = landed.def();
            print_json(&serde_json::json!({
                "path": def.path,
                "name": def.name,
                "view": format!("{:?}", def.view),
            }))?;
        }
    }

    Ok(())
}

fn require_login(client: &OmegaClient) -> color_eyre::Result<()> {
    if !client.session().is_authenticated() {
        bail!("not logged in; run `omega login <username>` first");
    }
    Ok(())
}

/// Surface the passive error state left by a social fetch.
fn check_social(client: &OmegaClient) -> color_eyre::Result<()> {
    if !client.session().is_authenticated() {
        client.notifications().error(SESSION_EXPIRED);
        bail!("session expired");
    }
    if let Some(message) = client.social().snapshot().error {
        bail!(message);
    }
    Ok(())
}

/// Turn a store error into a report, toasting the server's message.
fn api_failure(client: &OmegaClient, context: &str, err: Error, authorized: bool) -> color_eyre::Report {
    client
        .notifications()
        .error(failure_message(context, &err, authorized));
    color_eyre::Report::new(err).wrap_err(context.to_string())
}

/// User-facing text for a failed call. On authorized calls a rejected token
/// means the session is over, whatever the server said.
fn failure_message(context: &str, err: &Error, authorized: bool) -> String {
    if authorized && err.requires_login() {
        return SESSION_EXPIRED.to_string();
    }
    let detail = err
        .payload()
        .and_then(|payload| payload.get("message"))
        .and_then(|message| message.as_str())
        .map(String::from)
        .unwrap_or_else(|| err.to_string());
    format!("{context}: {detail}")
}

fn prompt_confirm(client: &OmegaClient) -> color_eyre::Result<bool> {
    let dialog = client.notifications().confirm_state();
    let mut stderr = io::stderr().lock();
    write!(stderr, "{}: {} [y/N] ", dialog.title, dialog.message)?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> color_eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print and dismiss every queued toast.
fn print_toasts(client: &OmegaClient) {
    let notify = client.notifications();
    for toast in notify.toasts() {
        let label = match toast.kind {
            ToastKind::Info => "info",
            ToastKind::Success => "ok",
            ToastKind::Error => "error",
        };
        eprintln!("[{label}] {}", toast.message);
        notify.remove_toast(toast.id);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_add_friend() {
        let args = Args::try_parse_from(["omega", "add-friend", "42", "--yes"]).unwrap();
        match args.command {
            Command::AddFriend { id, yes } => {
                assert_eq!(id, "42");
                assert!(yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_failure_message_prefers_server_text() {
        let err = Error::Api {
            status: 409,
            payload: serde_json::json!({ "message": "Username already exists" }),
        };
        assert_eq!(
            failure_message("Registration failed", &err, false),
            "Registration failed: Username already exists"
        );
    }

    #[test]
    fn test_failure_message_on_rejected_token() {
        let err = Error::Api {
            status: 401,
            payload: serde_json::json!({ "message": "Invalid credentials" }),
        };
        assert_eq!(
            failure_message("Login failed", &err, false),
            "Login failed: Invalid credentials"
        );
        assert_eq!(failure_message("Could not add friend", &err, true), SESSION_EXPIRED);
        assert_eq!(
            failure_message("Could not add friend", &Error::SessionExpired, true),
            SESSION_EXPIRED
        );
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "omega",
            "--api-url",
            "http://api.example:9000/",
            "--data-dir",
            "/tmp/omega-test",
            "whoami",
        ])
        .unwrap();

        let config = build_config(ClientConfig::default(), &args);
        assert_eq!(config.api_base_url, "http://api.example:9000");
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/omega-test")));
    }

    #[test]
    fn test_config_kept_without_flags() {
        let args = Args::try_parse_from(["omega", "logout"]).unwrap();
        let base = ClientConfig {
            data_dir: Some(PathBuf::from("/var/lib/omega")),
            ..ClientConfig::default().with_api_base_url("http://base:1")
        };
        let config = build_config(base, &args);
        assert_eq!(config.api_base_url, "http://base:1");
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/omega")));
    }
}
