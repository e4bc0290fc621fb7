use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod browser;
mod config;
mod format;
mod tui;
mod upload;

use api::ApiClient;
use config::Config;

#[derive(Parser)]
#[command(name = "locker")]
#[command(about = "Terminal client for a remote file vault", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the remote folder tree
    Browse,
    /// Authenticate and store a session token
    Login {
        /// Server base URL, remembered for later commands
        #[arg(long)]
        server: Option<String>,
    },
    /// Create the admin account
    Signup {
        /// Server base URL, remembered for later commands
        #[arg(long)]
        server: Option<String>,
    },
    /// Forget the stored session token
    Logout,
    /// Show server and session status
    Status,
    /// List a remote folder
    Ls {
        /// Remote folder path
        #[arg(default_value = "/")]
        path: String,
    },
    /// Upload a file or folder
    Upload {
        /// Local file or directory
        path: String,
        /// Virtual destination folder
        #[arg(long, default_value = "/")]
        to: String,
        /// Free-text description stored with the upload
        #[arg(long, default_value = "")]
        description: String,
        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Download a file by id
    Get {
        id: i64,
        /// Output path (defaults to the file id)
        output: Option<PathBuf>,
    },
    /// Delete a file by id
    Rm { id: i64 },
    /// Delete a folder and its contents
    RmFolder {
        /// Remote folder path
        path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;

    // The interactive screens own the terminal; start them before any
    // logging output. Without a stored token the shell routes to login.
    match &cli.command {
        None | Some(Commands::Browse) => {
            let start_at_login = !config.is_configured();
            return tui::run(config, start_at_login).await;
        }
        _ => {}
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "locker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        None | Some(Commands::Browse) => unreachable!(),
        Some(Commands::Login { server }) => login(&mut config, server).await?,
        Some(Commands::Signup { server }) => signup(&mut config, server).await?,
        Some(Commands::Logout) => logout(&mut config)?,
        Some(Commands::Status) => status(&config),
        Some(Commands::Ls { path }) => list(&config, &path).await?,
        Some(Commands::Upload {
            path,
            to,
            description,
            tags,
        }) => upload_cmd(&config, &path, &to, description, &tags).await?,
        Some(Commands::Get { id, output }) => download(&config, id, output).await?,
        Some(Commands::Rm { id }) => remove_file(&config, id).await?,
        Some(Commands::RmFolder { path }) => remove_folder(&config, &path).await?,
    }

    Ok(())
}

async fn login(config: &mut Config, server: Option<String>) -> anyhow::Result<()> {
    if let Some(server) = server {
        config.server_url = Some(server);
    }
    let api = ApiClient::from_config(config);

    let password = rpassword::prompt_password("password: ")?;
    match api.login(auth::ACCOUNT_NAME, &password).await {
        Ok(token) => {
            config.username = Some(auth::ACCOUNT_NAME.to_string());
            config.token = Some(token);
            config.save()?;
            println!("logged in");
        }
        Err(err) if err.is_unauthorized() || err.is_forbidden() => {
            println!("incorrect password");
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

async fn signup(config: &mut Config, server: Option<String>) -> anyhow::Result<()> {
    if let Some(server) = server {
        config.server_url = Some(server);
        config.save()?;
    }
    let api = ApiClient::from_config(config);

    let password = rpassword::prompt_password("password: ")?;
    let confirm = rpassword::prompt_password("password (repeat): ")?;
    if !auth::passwords_valid(&password, &confirm) {
        println!("passwords must be non-empty and match");
        return Ok(());
    }

    match api.signup(auth::ACCOUNT_NAME, &password).await {
        Ok(_) => println!("account created. run: locker login"),
        Err(err) if err.is_forbidden() => println!("signup failed"),
        Err(err) if err.is_conflict() => println!("account already exists"),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

fn logout(config: &mut Config) -> anyhow::Result<()> {
    config.clear_session();
    config.save()?;
    println!("logged out");
    Ok(())
}

fn status(config: &Config) {
    match &config.server_url {
        Some(server) => {
            println!("server: {}", server);
            println!("account: {}", config.username.as_deref().unwrap_or("-"));
            if config.token.is_some() {
                println!("session: logged in");
            } else {
                println!("session: logged out");
            }
        }
        None => {
            println!("not configured");
            println!("run: locker login --server <url>");
        }
    }
}

async fn list(config: &Config, path: &str) -> anyhow::Result<()> {
    config.require_auth()?;
    let api = ApiClient::from_config(config);

    let path = format::normalize_folder(path);
    let entries = api.list(&path).await?;

    if entries.is_empty() {
        println!("empty folder");
        return Ok(());
    }

    let now = chrono::Utc::now();
    for entry in entries {
        let name = match entry.kind {
            api::EntryKind::Folder => format!("{}/", entry.name.trim_matches('/')),
            api::EntryKind::File => entry.name.clone(),
        };
        let size = format::format_entry_size(entry.kind, entry.size);
        let age = format::time_ago(&entry.upload_date, now).unwrap_or_default();
        println!("{:>10}  {:<40}  {}", size, name, age);
    }

    Ok(())
}

async fn upload_cmd(
    config: &Config,
    path: &str,
    to: &str,
    description: String,
    tags: &str,
) -> anyhow::Result<()> {
    config.require_auth()?;
    let api = ApiClient::from_config(config);

    let local = upload::expand_tilde(path);
    let files = upload::collect_files(&local)?;
    let request = upload::UploadRequest {
        description,
        virtual_folder: format::normalize_folder(to),
        tags: upload::parse_tags(tags),
        files,
    };

    println!(
        "uploading {} file(s) to {}",
        request.files.len(),
        request.virtual_folder
    );
    match upload::run(&api, &request).await {
        Ok(()) => println!("upload complete"),
        Err(err) => println!("upload failed: {}", err),
    }
    Ok(())
}

async fn download(config: &Config, id: i64, output: Option<PathBuf>) -> anyhow::Result<()> {
    config.require_auth()?;
    let api = ApiClient::from_config(config);

    let data = api.download(id).await?;
    let path = output.unwrap_or_else(|| PathBuf::from(id.to_string()));
    std::fs::write(&path, &data)?;
    println!("saved {} ({} bytes)", path.display(), data.len());
    Ok(())
}

async fn remove_file(config: &Config, id: i64) -> anyhow::Result<()> {
    config.require_auth()?;
    let api = ApiClient::from_config(config);
    api.delete_file(id).await?;
    println!("deleted file {}", id);
    Ok(())
}

async fn remove_folder(config: &Config, path: &str) -> anyhow::Result<()> {
    config.require_auth()?;
    let api = ApiClient::from_config(config);
    let path = format::normalize_folder(path);
    api.delete_folder(&path).await?;
    println!("deleted folder {}", path);
    Ok(())
}
