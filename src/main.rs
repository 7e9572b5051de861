use std::env;
use std::process::ExitCode;

use log::{error, info, warn};

use contactsync::config::AppConfig;
use contactsync::contacts::backend_client::BackendClient;
use contactsync::contacts::google_client::GoogleContactsClient;
use contactsync::contacts::store::{ContactQuery, ContactStore};
use contactsync::contacts::sync::{import_vcf, sync_google, SyncOutcome, SyncReport};
use contactsync::contacts::ContactSyncError;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env();
    let args: Vec<String> = env::args().collect();

    let result = match args.get(1).map(String::as_str) {
        Some("vcf") => run_vcf(&config, &args[2..]).await,
        Some("google") => run_google(&config).await,
        Some("google-auth-url") => run_google_auth_url(&config, &args[2..]),
        Some("google-exchange") => run_google_exchange(&config, &args[2..]).await,
        Some("list") => run_list(&config, &args[2..]).await,
        Some("session") => run_session(&config).await,
        _ => {
            eprintln!("usage: contactsync <command>");
            eprintln!("  vcf <file>...       import contacts from a VCF file");
            eprintln!("  google              sync Google contacts (GOOGLE_ACCESS_TOKEN)");
            eprintln!("  google-auth-url <redirect-uri>  print the consent URL");
            eprintln!("  google-exchange <code> <redirect-uri>  trade the consent code for a token");
            eprintln!("  list [page]         list stored contacts");
            eprintln!("  session             check the backend session");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(ContactSyncError::SessionExpired) => {
            error!("Session expired; sign in again");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn backend(config: &AppConfig) -> BackendClient {
    BackendClient::new(&config.backend.base_url, &config.backend.session_cookie)
}

async fn run_vcf(config: &AppConfig, files: &[String]) -> Result<(), ContactSyncError> {
    let Some(path) = files.first() else {
        return Err(ContactSyncError::InvalidData(
            "vcf: expected a file path".into(),
        ));
    };
    if files.len() > 1 {
        warn!("Multiple files given; only the first one is imported");
    }
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ContactSyncError::InvalidData(format!("Cannot read {path}: {e}")))?;

    let report = import_vcf(&backend(config), &text).await?;
    print_report(&report);
    Ok(())
}

async fn run_google(config: &AppConfig) -> Result<(), ContactSyncError> {
    let access_token = env::var("GOOGLE_ACCESS_TOKEN").map_err(|_| {
        ContactSyncError::Auth("GOOGLE_ACCESS_TOKEN is not set; run google-auth-url first".into())
    })?;
    let google = GoogleContactsClient::new(config.google.clone());
    let report = sync_google(
        &google,
        &backend(config),
        &access_token,
        &config.sync.default_region,
        &config.sync.google_options(),
    )
    .await?;
    print_report(&report);
    Ok(())
}

fn run_google_auth_url(config: &AppConfig, args: &[String]) -> Result<(), ContactSyncError> {
    let Some(redirect_uri) = args.first() else {
        return Err(ContactSyncError::InvalidData(
            "google-auth-url: expected a redirect URI".into(),
        ));
    };
    let google = GoogleContactsClient::new(config.google.clone());
    println!("{}", google.get_auth_url(redirect_uri, "cli"));
    Ok(())
}

async fn run_google_exchange(config: &AppConfig, args: &[String]) -> Result<(), ContactSyncError> {
    let (Some(code), Some(redirect_uri)) = (args.first(), args.get(1)) else {
        return Err(ContactSyncError::InvalidData(
            "google-exchange: expected <code> <redirect-uri>".into(),
        ));
    };
    let google = GoogleContactsClient::new(config.google.clone());
    let token = google.exchange_code(code, redirect_uri).await?;
    let user = google.get_user_info(&token.access_token).await?;
    info!("Authenticated as {}", user.email);
    println!("GOOGLE_ACCESS_TOKEN={}", token.access_token);
    Ok(())
}

async fn run_list(config: &AppConfig, args: &[String]) -> Result<(), ContactSyncError> {
    let store = ContactStore::new(backend(config));
    let query = ContactQuery {
        page: args
            .first()
            .and_then(|p| p.parse().ok())
            .unwrap_or(1),
        ..Default::default()
    };
    let page = store.fetch_contacts(&query).await?;
    for contact in &page.contacts {
        println!(
            "{:>6}  {:<30} {:<16} {}",
            contact.id.unwrap_or_default(),
            contact.display_name(),
            contact.phone_number,
            contact.category
        );
    }
    println!(
        "page {}/{} ({} contacts)",
        page.current_page, page.total_pages, page.total
    );
    Ok(())
}

async fn run_session(config: &AppConfig) -> Result<(), ContactSyncError> {
    let user_id = backend(config).check_session().await?;
    info!("Session valid for user {user_id}");
    println!("ok (user {user_id})");
    Ok(())
}

fn print_report(report: &SyncReport) {
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
    match &report.outcome {
        SyncOutcome::Saved { saved, skipped } => {
            println!("{saved} contacts imported, {skipped} skipped");
        }
        SyncOutcome::NoContacts => println!("no contacts found"),
    }
}
