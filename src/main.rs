//! CLI entry point for enwis.

mod cli;

use clap::Parser;
use enwis_id::api::{
    IdentityClient, LoginData, PasswordChange, ProfileUpdate, RegisterData, TelegramUser, User,
};
use enwis_id::auth::{FileTokenStorage, TokenStore};
use enwis_id::build_info;
use enwis_id::config::{load_config_with_source, Config};
use enwis_id::navigation::{Destination, Navigator, TerminalNavigator};
use enwis_id::oauth::{AuthorizationRequest, ConsentScreen};
use enwis_id::phone::{PhoneLogin, OTP_LENGTH};
use enwis_id::render::Renderer;
use enwis_id::session::{Credentials, Session};
use enwis_id::telegram::{TelegramAuthChannel, TELEGRAM_BOT_USERNAME};
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::{Command, SessionsCommand};

/// Wrong codes accepted before the phone flow gives up.
const MAX_CODE_ATTEMPTS: usize = 3;

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();
    init_tracing();
    debug!(build = %build_info::metadata_line(), "starting enwis");

    let mut config = match load_config_with_source(args.config.as_deref()) {
        Ok(loaded) => {
            debug!(source = ?loaded.source, "configuration loaded");
            loaded.config
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    // Apply CLI overrides.
    if let Some(url) = &args.base_url {
        config.api.base_url = url.trim_end_matches('/').to_string();
    }
    if args.no_color {
        config.display.color = false;
    }

    let renderer = Renderer::new(config.display.color);
    if let Err(msg) = run(args.command, &config, renderer).await {
        renderer.error(&msg);
        std::process::exit(1);
    }
}

/// `ENWIS_LOG`, else `RUST_LOG`, else warnings only; always to stderr.
fn init_tracing() {
    let filter = std::env::var("ENWIS_LOG")
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Command, config: &Config, renderer: Renderer) -> Result<(), String> {
    let tokens = TokenStore::new(FileTokenStorage::new(config.storage.token_path.clone()));
    let navigator: Arc<dyn Navigator> = Arc::new(TerminalNavigator::new(renderer, true));
    let client = IdentityClient::new(&config.api, tokens, Arc::clone(&navigator));
    let session = Session::new(client.clone());

    match command {
        Command::Login { login, authorize } => {
            let pending = parse_pending(authorize.as_deref())?;
            let login = match login {
                Some(login) => login,
                None => prompt_line("login")?,
            };
            let password = prompt_secret("password")?;
            let credentials = Credentials::Password(LoginData { login, password });
            let destination = session
                .login(&credentials, pending.as_ref())
                .await
                .map_err(|err| err.user_message("Login or password is incorrect"))?;
            follow(&session, destination, renderer, false).await
        }
        Command::Register {
            full_name,
            username,
            email,
            phone,
            authorize,
        } => {
            let pending = parse_pending(authorize.as_deref())?;
            let data = RegisterData {
                full_name: value_or_prompt(full_name, "full name")?,
                username: value_or_prompt(username, "username")?,
                email: value_or_prompt(email, "email")?,
                phone: value_or_prompt(phone, "phone")?,
                password: prompt_secret("password")?,
            };
            let destination = session
                .login(&Credentials::Register(data), pending.as_ref())
                .await
                .map_err(|err| err.user_message("Registration failed"))?;
            follow(&session, destination, renderer, false).await
        }
        Command::Phone { number, authorize } => {
            let pending = parse_pending(authorize.as_deref())?;
            phone_login(&session, pending, &number, renderer).await
        }
        Command::Telegram { payload, authorize } => {
            let pending = parse_pending(authorize.as_deref())?;
            let user: TelegramUser = serde_json::from_str(&payload).map_err(|err| {
                format!("invalid @{TELEGRAM_BOT_USERNAME} widget payload: {err}")
            })?;
            let channel = TelegramAuthChannel::new();
            let mut subscription = channel.subscribe();
            channel.dispatch(user);
            let destination = subscription
                .complete_login(&session, pending.as_ref())
                .await
                .ok_or_else(|| "telegram login was cancelled".to_string())?
                .map_err(|err| err.user_message("Telegram login failed"))?;
            follow(&session, destination, renderer, false).await
        }
        Command::Whoami => {
            let user = require_user(&session).await?;
            print_user(&user);
            Ok(())
        }
        Command::Profile {
            full_name,
            bio,
            gender,
            birth_date,
        } => {
            let user = require_user(&session).await?;
            let update = ProfileUpdate {
                full_name,
                bio,
                gender,
                birth_date,
            };
            if update.is_empty() {
                print_user(&user);
                return Ok(());
            }
            client
                .update_profile(&update)
                .await
                .map_err(|err| err.user_message("Profile update failed"))?;
            let user = session
                .refresh_user()
                .await
                .map_err(|err| err.user_message("Could not reload the profile"))?;
            renderer.success("Profile updated.");
            print_user(&user);
            Ok(())
        }
        Command::Avatar { file } => {
            require_user(&session).await?;
            let bytes = std::fs::read(&file)
                .map_err(|err| format!("failed to read `{}`: {err}", file.display()))?;
            let file_name = file_name_of(&file);
            client
                .upload_avatar(&file_name, bytes)
                .await
                .map_err(|err| err.user_message("Avatar upload failed"))?;
            let user = session
                .refresh_user()
                .await
                .map_err(|err| err.user_message("Could not reload the profile"))?;
            renderer.success("Avatar updated.");
            if let Some(url) = user.profile.and_then(|profile| profile.avatar_url) {
                println!("{url}");
            }
            Ok(())
        }
        Command::Password => {
            require_user(&session).await?;
            let change = PasswordChange {
                old_password: prompt_secret("current password")?,
                new_password: prompt_secret("new password")?,
                confirm_password: prompt_secret("repeat new password")?,
            };
            client
                .change_password(&change)
                .await
                .map_err(|err| err.user_message("Password change failed"))?;
            renderer.success("Password changed.");
            Ok(())
        }
        Command::Sessions { action } => {
            require_user(&session).await?;
            match action {
                SessionsCommand::List => {
                    let sessions = client
                        .list_sessions()
                        .await
                        .map_err(|err| err.user_message("Could not load sessions"))?;
                    for active in sessions {
                        let marker = if active.is_current { "*" } else { " " };
                        println!(
                            "{marker} {}\t{}\t{}\t{}",
                            active.id, active.ip_address, active.created_at, active.user_agent
                        );
                    }
                    Ok(())
                }
                SessionsCommand::Terminate { id } => {
                    client
                        .terminate_session(&id)
                        .await
                        .map_err(|err| err.user_message("Could not terminate the session"))?;
                    renderer.success(&format!("Session {id} terminated."));
                    Ok(())
                }
            }
        }
        Command::Authorize { request, yes } => {
            let request = AuthorizationRequest::from_url(&request)
                .ok_or_else(|| "authorization request has no client_id".to_string())?;
            if require_user(&session).await.is_err() {
                return Err(format!(
                    "sign in first: enwis login --authorize '{}'",
                    request.to_query()
                ));
            }
            consent(&client, request, renderer, yes).await
        }
        Command::Logout => {
            let destination = session.logout();
            navigator.navigate(destination);
            Ok(())
        }
    }
}

/// Carry out a post-login destination; consent runs interactively.
async fn follow(
    session: &Session,
    destination: Destination,
    renderer: Renderer,
    auto_approve: bool,
) -> Result<(), String> {
    match destination {
        Destination::Consent(request) => {
            consent(session.client(), request, renderer, auto_approve).await
        }
        other => {
            session.client().navigator().navigate(other);
            Ok(())
        }
    }
}

async fn consent(
    client: &IdentityClient,
    request: AuthorizationRequest,
    renderer: Renderer,
    auto_approve: bool,
) -> Result<(), String> {
    let screen = ConsentScreen::load(client.clone(), request).await;
    renderer.section("authorization requested");
    renderer.field("application", screen.client_name());
    renderer.field("scope", &screen.request().scope);

    if !auto_approve && !confirm("Allow access to your profile?")? {
        screen.deny();
        return Ok(());
    }
    loop {
        match screen.approve().await {
            Ok(()) => return Ok(()),
            Err(err) => {
                renderer.error(&err.user_message("Something went wrong. Try again."));
                if auto_approve || !confirm("Retry?")? {
                    return Err("authorization was not completed".to_string());
                }
            }
        }
    }
}

async fn phone_login(
    session: &Session,
    pending: Option<AuthorizationRequest>,
    number: &str,
    renderer: Renderer,
) -> Result<(), String> {
    let mut flow = PhoneLogin::new(session, pending);
    flow.request_code(number)
        .await
        .map_err(|err| err.user_message("Could not send the code. Try again."))?;
    match flow.telegram_link() {
        Some(link) => renderer.field("code via telegram", link),
        None => renderer.notice("A code was sent to your phone."),
    }

    for _ in 0..MAX_CODE_ATTEMPTS {
        flow.clear_code();
        let code = prompt_line(&format!("{OTP_LENGTH}-digit code"))?;
        match flow.paste(&code).await {
            Ok(Some(destination)) => return follow(session, destination, renderer, false).await,
            Ok(None) => renderer.warn(&format!("Enter all {OTP_LENGTH} digits.")),
            Err(err) => renderer.error(&err.user_message("The code is incorrect.")),
        }
    }
    Err("too many incorrect codes".to_string())
}

fn parse_pending(authorize: Option<&str>) -> Result<Option<AuthorizationRequest>, String> {
    match authorize {
        None => Ok(None),
        Some(raw) => AuthorizationRequest::from_url(raw)
            .map(Some)
            .ok_or_else(|| "authorization request has no client_id".to_string()),
    }
}

async fn require_user(session: &Session) -> Result<User, String> {
    session
        .bootstrap()
        .await
        .user
        .ok_or_else(|| "not signed in; run `enwis login` first".to_string())
}

fn print_user(user: &User) {
    println!("id: {}", user.id);
    println!("name: {}", user.display_name());
    if let Some(profile) = &user.profile {
        if !profile.username.is_empty() {
            println!("username: {}", profile.username);
        }
        for (key, value) in [
            ("bio", &profile.bio),
            ("gender", &profile.gender),
            ("birth date", &profile.birth_date),
            ("avatar", &profile.avatar_url),
        ] {
            if let Some(value) = value.as_deref().filter(|value| !value.is_empty()) {
                println!("{key}: {value}");
            }
        }
    }
    println!("role: {}", user.global_role);
    println!("active: {}", user.is_active);
    for contact in &user.contacts {
        let mut flags = Vec::new();
        if contact.is_primary {
            flags.push("primary");
        }
        if contact.is_verified {
            flags.push("verified");
        }
        println!(
            "contact: {:?} {} [{}]",
            contact.contact_type,
            contact.value,
            flags.join(", ")
        );
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "avatar".to_string())
}

fn value_or_prompt(value: Option<String>, label: &str) -> Result<String, String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => prompt_line(label),
    }
}

/// Read one non-empty line from stdin.
fn prompt_line(label: &str) -> Result<String, String> {
    eprint!("{label}: ");
    std::io::stderr()
        .flush()
        .map_err(|err| format!("failed to write prompt: {err}"))?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|err| format!("failed to read {label}: {err}"))?;
    let value = line.trim().to_string();
    if value.is_empty() {
        return Err(format!("{label} is required"));
    }
    Ok(value)
}

fn prompt_secret(label: &str) -> Result<String, String> {
    let value = rpassword::prompt_password(format!("{label}: "))
        .map_err(|err| format!("failed to read {label}: {err}"))?;
    if value.is_empty() {
        return Err(format!("{label} is required"));
    }
    Ok(value)
}

fn confirm(question: &str) -> Result<bool, String> {
    eprint!("{question} [y/N] ");
    std::io::stderr()
        .flush()
        .map_err(|err| format!("failed to write prompt: {err}"))?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|err| format!("failed to read answer: {err}"))?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
