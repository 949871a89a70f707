//! CLI entry point for the certificate client.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cert_client_core::{
    AccountService, ApiClient, CertificateService, ClientConfig, CookieSessionStore,
    FileSessionStore, LoginRequest, MirroredSessionStore, Navigator, ProgressCallback, Role,
    SignupRequest, UploadFile,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};
use url::Url;

mod cli;

use cli::{Args, CertCommand, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let mut config = ClientConfig::from_env();
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }

    let client = build_client(&config)?;
    run_command(args.command, &client).await
}

/// Navigator for a terminal host: a login redirect becomes a re-login hint.
#[derive(Debug, Default)]
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn redirect_to_login(&self) {
        warn!("session ended; run `cert-client login` to sign in again");
    }
}

/// Builds the client with a persistent session: the live cookie jar mirrored
/// to a token file so the session survives across invocations.
fn build_client(config: &ClientConfig) -> Result<ApiClient> {
    let base_url = Url::parse(&config.base_url)
        .with_context(|| format!("invalid base URL: {}", config.base_url))?;

    let jar = Arc::new(reqwest::cookie::Jar::default());
    let cookie_store = Arc::new(CookieSessionStore::new(Arc::clone(&jar), &base_url));
    let file_store = Arc::new(FileSessionStore::new(session_file_path()));
    let store = Arc::new(MirroredSessionStore::new(cookie_store, file_store));

    let client = ApiClient::with_session(config, jar, store, Arc::new(TerminalNavigator))?;
    Ok(client)
}

/// Resolves the session token file: `CERT_CLIENT_TOKEN_FILE` override, then
/// `$HOME/.cert-client/session-token`.
fn session_file_path() -> PathBuf {
    if let Ok(path) = std::env::var("CERT_CLIENT_TOKEN_FILE") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".cert-client").join("session-token")
}

async fn run_command(command: Command, client: &ApiClient) -> Result<()> {
    match command {
        Command::Signup {
            email,
            password,
            name,
            company,
            admin,
        } => {
            let request = SignupRequest {
                email,
                password,
                name,
                company,
                role: if admin { Role::Admin } else { Role::User },
            };
            let response = AccountService::new(client).signup(&request).await?;
            info!(user_id = response.user_id, email = %response.email, "account created");
        }

        Command::Login { email, password } => {
            let request = LoginRequest { email, password };
            let response = AccountService::new(client).login(&request).await?;

            // The server set the session cookie in the jar; write it through
            // the mirrored store so the next invocation finds it.
            let store = client.session_store();
            match store.get() {
                Some(token) => store.set(&token),
                None => warn!("login succeeded but no session cookie was set"),
            }

            info!(user_id = response.user_id, role = ?response.role, "signed in");
        }

        Command::Logout => {
            AccountService::new(client).logout().await;
            info!("signed out");
        }

        Command::Me => {
            let user = AccountService::new(client).current_user().await?;
            println!("{} ({:?})", user.email, user.role);
        }

        Command::Cert(command) => run_cert_command(command, client).await?,

        Command::Upload { to, files } => upload_files(client, &to, &files).await?,
    }

    Ok(())
}

async fn run_cert_command(command: CertCommand, client: &ApiClient) -> Result<()> {
    let service = CertificateService::new(client);

    match command {
        CertCommand::Issue { file } => {
            let contents = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let request = serde_json::from_str(&contents)
                .with_context(|| format!("invalid certificate request in {}", file.display()))?;

            let certificate = service.issue(&request).await?;
            info!(
                cert_number = %certificate.cert_number,
                vin = %certificate.vin,
                "certificate issued"
            );
            println!("{}", certificate.cert_number);
        }

        CertCommand::Get { cert_number } => {
            let certificate = service.find_by_number(&cert_number).await?;
            print_certificate(&certificate);
        }

        CertCommand::Vin { vin } => {
            let certificate = service.find_by_vin(&vin).await?;
            print_certificate(&certificate);
        }

        CertCommand::Download { cert_number, out } => {
            let payload = service.download_pdf(&cert_number).await?;

            tokio::fs::create_dir_all(&out)
                .await
                .with_context(|| format!("failed to create {}", out.display()))?;
            let path = out.join(format!("{cert_number}.pdf"));
            tokio::fs::write(&path, &payload.bytes)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;

            info!(path = %path.display(), bytes = payload.bytes.len(), "certificate downloaded");
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn print_certificate(certificate: &cert_client_core::Certificate) {
    println!(
        "{}  {} {}  VIN {}  (issued {}, expires {})",
        certificate.cert_number,
        certificate.manufacturer,
        certificate.model_name,
        certificate.vin,
        certificate.issue_date,
        certificate.expire_date,
    );
}

async fn upload_files(client: &ApiClient, to: &str, paths: &[PathBuf]) -> Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = UploadFile::from_path(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        files.push(file);
    }

    let bar = ProgressBar::new(100);
    bar.set_style(ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}%")?);
    let bar_handle = bar.clone();
    let on_progress: ProgressCallback =
        Arc::new(move |percent| bar_handle.set_position(u64::from(percent)));

    let response: serde_json::Value = if files.len() == 1 {
        let file = files.swap_remove(0);
        client.upload(to, file, Some(on_progress)).await?
    } else {
        client.upload_multiple(to, files, Some(on_progress)).await?
    };
    bar.finish();

    info!(%response, "upload complete");
    Ok(())
}
