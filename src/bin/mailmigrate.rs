#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for inspecting the source side of a mailbox migration

use clap::{Parser, Subcommand};
use mailmigrate::{
    AdminClient, Credentials, ImapConfig, MailboxInventory, MessageMap, RestClient, RestConfig,
    TokenClient, UserQuery, Verb,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailmigrate")]
#[command(about = "Query admin services, the REST mail API and IMAP mailboxes for migrations")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List domains hosted on the admin server
    Domains,

    /// List the users of a domain
    Users {
        domain: String,

        /// Key users by bare username instead of user@domain
        #[arg(long)]
        bare: bool,

        /// Extra setting to fetch per user (repeatable)
        #[arg(long = "setting")]
        settings: Vec<String>,

        /// Fail if any per-user settings lookup fails
        #[arg(long)]
        require_extra: bool,
    },

    /// Show the default settings of one mailbox
    User { address: String },

    /// Issue a REST API token
    Token {
        /// Account id (defaults to REST_ACCOUNT_ID)
        #[arg(long)]
        account_id: Option<String>,

        /// Scope name or Product/apiname (defaults to REST_SCOPE, then mail)
        #[arg(long)]
        scope: Option<String>,
    },

    /// Call a REST API resource
    Rest {
        /// Resource path relative to the API base, e.g. accounts
        path: String,

        /// Query parameter as key=value (repeatable)
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// HTTP method
        #[arg(long, default_value = "GET")]
        method: String,
    },

    /// List IMAP folders
    Folders,

    /// Read messages over IMAP, keyed by Message-ID
    Inventory {
        /// Only this mailbox (default: every selectable folder)
        #[arg(long)]
        mailbox: Option<String>,
    },
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("Invalid parameter '{s}': expected key=value"))
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            if let Some(err) = err.downcast_ref::<mailmigrate::Error>() {
                err.log_dump();
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    match &args.command {
        Command::Domains => cmd_domains(args).await,
        Command::Users {
            domain,
            bare,
            settings,
            require_extra,
        } => {
            let query = UserQuery {
                qualify_addresses: !bare,
                extra_settings: settings.clone(),
                require_extra_info: *require_extra,
            };
            cmd_users(args, domain, &query).await
        }
        Command::User { address } => cmd_user(args, address).await,
        Command::Token { account_id, scope } => {
            cmd_token(args, account_id.as_deref(), scope.as_deref()).await
        }
        Command::Rest {
            path,
            params,
            method,
        } => cmd_rest(args, path, params, method).await,
        Command::Folders => cmd_folders(args).await,
        Command::Inventory { mailbox } => cmd_inventory(args, mailbox.as_deref()).await,
    }
}

async fn cmd_domains(args: &Args) -> anyhow::Result<()> {
    let client = AdminClient::new(Credentials::from_env()?)?;
    let domains = client.list_domains().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&domains)?);
    } else {
        for domain in &domains {
            println!("{domain}");
        }
    }

    Ok(())
}

async fn cmd_users(args: &Args, domain: &str, query: &UserQuery) -> anyhow::Result<()> {
    let client = AdminClient::new(Credentials::from_env()?)?;
    let users = client.list_domain_users(domain, query).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&users)?);
    } else if users.is_empty() {
        println!("No users found.");
    } else {
        for (key, record) in &users {
            let name = record.get("fullname").unwrap_or_default();
            println!("{key:<40} {name}");
        }
        println!("\n{} user(s)", users.len());
    }

    Ok(())
}

async fn cmd_user(args: &Args, address: &str) -> anyhow::Result<()> {
    let client = AdminClient::new(Credentials::from_env()?)?;
    let settings = client.get_user(address).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        print_settings(&settings);
    }

    Ok(())
}

async fn cmd_token(
    args: &Args,
    account_id: Option<&str>,
    scope: Option<&str>,
) -> anyhow::Result<()> {
    let account_id = account_id
        .map(ToString::to_string)
        .or_else(|| env_var("REST_ACCOUNT_ID"))
        .ok_or_else(|| anyhow::anyhow!("No account id given (--account-id or REST_ACCOUNT_ID)"))?;
    let password = env_var("REST_SECRET")
        .ok_or_else(|| anyhow::anyhow!("REST_SECRET must hold the account password"))?;
    let scope = scope.map(ToString::to_string).or_else(|| env_var("REST_SCOPE"));

    let client = TokenClient::new(&RestConfig::from_env()?)?;
    let token = client.fetch_token(&account_id, &password, scope.as_deref()).await?;

    if args.json {
        println!("{}", json!({ "account_id": account_id, "token": token.as_str() }));
    } else {
        println!("{token}");
    }

    Ok(())
}

async fn cmd_rest(
    args: &Args,
    path: &str,
    params: &[(String, String)],
    method: &str,
) -> anyhow::Result<()> {
    let verb: Verb = method.parse()?;
    let secret = env_var("REST_SECRET")
        .ok_or_else(|| anyhow::anyhow!("REST_SECRET must hold a token or the account password"))?;

    let mut builder = RestClient::builder(secret).config(RestConfig::from_env()?);
    if let Some(account_id) = env_var("REST_ACCOUNT_ID") {
        builder = builder.account_id(account_id);
    }
    if let Some(scope) = env_var("REST_SCOPE") {
        builder = builder.scope(scope);
    }
    let client = builder.connect().await?;

    let pairs: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    let data = client.call(path, &pairs, verb).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("{data}");
    }

    Ok(())
}

async fn cmd_folders(args: &Args) -> anyhow::Result<()> {
    let mut inventory = MailboxInventory::new(ImapConfig::from_env()?);
    inventory.login(None, None).await?;
    let folders = inventory.list_folders().await?;
    inventory.logout().await.ok();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&folders)?);
    } else {
        for folder in &folders {
            let marker = if folder.is_selectable() { ' ' } else { '-' };
            println!("{marker} {folder}");
        }
    }

    Ok(())
}

async fn cmd_inventory(args: &Args, mailbox: Option<&str>) -> anyhow::Result<()> {
    let mut inventory = MailboxInventory::new(ImapConfig::from_env()?);
    inventory.login(None, None).await?;

    let folders = match mailbox {
        Some(name) => {
            let messages = inventory.enumerate_messages(Some(name)).await?;
            BTreeMap::from([(name.to_string(), messages)])
        }
        None => inventory.inventory_all().await?,
    };
    inventory.logout().await.ok();

    if args.json {
        let summary: BTreeMap<&String, BTreeMap<&String, serde_json::Value>> = folders
            .iter()
            .map(|(folder, messages)| {
                let entries = messages
                    .iter()
                    .map(|(id, m)| (id, json!({ "uid": m.handle, "size": m.raw.len() })))
                    .collect();
                (folder, entries)
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_inventory(&folders);
    }

    Ok(())
}

fn print_settings(settings: &BTreeMap<String, String>) {
    for (key, value) in settings {
        let shown = if key == "password" { "********" } else { value.as_str() };
        println!("{:<22} {}", format!("{key}:"), shown);
    }
}

fn print_inventory(folders: &BTreeMap<String, MessageMap>) {
    if folders.is_empty() {
        println!("No folders found.");
        return;
    }

    println!("{:<8} {:<10} {}", "UID", "Size", "Message-ID");
    println!("{}", "-".repeat(80));

    let mut total = 0;
    for (folder, messages) in folders {
        println!("[{folder}] {} message(s)", messages.len());
        for (id, message) in messages {
            println!("{:<8} {:<10} {}", message.handle, message.raw.len(), truncate(id, 60));
        }
        total += messages.len();
    }

    println!("\n{total} message(s) in {} folder(s)", folders.len());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
