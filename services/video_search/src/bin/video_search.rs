//! services/video_search/src/bin/video_search.rs
//!
//! Command-line front-end for the video library: account commands, library
//! browsing, upload, deletion, semantic search and playback URLs.

use bytes::Bytes;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use video_search_core::domain::{SearchHit, VideoId, VideoRecord};
use video_search_core::presentation::{format_similarity, format_timestamp, status_badge};
use video_search_lib::{AppState, ClientError, Config, VideoLibrary};

#[derive(Parser)]
#[command(name = "video-search")]
#[command(about = "Upload videos and search inside them with natural language")]
#[command(version)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account and sign in
    Signup {
        email: String,
        #[arg(long, env = "VIDEO_SEARCH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in with email and password
    Login {
        email: String,
        #[arg(long, env = "VIDEO_SEARCH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the stored credential
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List the videos in your library
    List,
    /// Show one video
    Show { id: String },
    /// Upload a video file
    Upload {
        path: PathBuf,
        /// Defaults to the file name
        #[arg(long)]
        title: Option<String>,
    },
    /// Delete a video
    Delete { id: String },
    /// Search across the library, or inside one video with --video
    Search {
        query: String,
        #[arg(long)]
        video: Option<String>,
        #[arg(long, default_value_t = 5)]
        limit: u32,
    },
    /// Print a playable URL for a video
    Stream { id: String },
    /// Check that the backend is up
    Health,
    /// Check that the backend accepts the stored credential
    AuthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. Using API at {}", config.api_base_url);

    // --- 2. Wire Adapters & Restore the Session ---
    let state = match AppState::from_config(config) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize: {}", e);
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    state.start().await;

    // --- 3. Run the Command ---
    let result = run(&state, cli.command, cli.json).await;
    state.shutdown().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Command failed: {:?}", e);
            eprintln!("{}", describe(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(state: &AppState, command: Command, json: bool) -> Result<(), ClientError> {
    let gateway = state.gateway.as_ref();

    match command {
        Command::Signup { email, password } => {
            state.require_session()?.sign_up(&email, &password).await?;
            println!("Account created. Signed in as {}", email);
        }
        Command::Login { email, password } => {
            state.require_session()?.sign_in(&email, &password).await?;
            println!("Signed in as {}", email);
        }
        Command::Logout => {
            match &state.session {
                Some(session) => session.sign_out().await,
                None => state.credentials.clear()?,
            }
            println!("Signed out");
        }
        Command::Whoami => {
            let session = state.require_session()?.session();
            match session.identity() {
                Some(identity) => println!(
                    "{} ({})",
                    identity.email.as_deref().unwrap_or("no email"),
                    identity.uid
                ),
                None => println!("Not signed in"),
            }
        }
        Command::List => {
            let mut library = VideoLibrary::new();
            library.refresh(gateway).await?;
            if json {
                print_json(library.videos())?;
            } else if library.videos().is_empty() {
                println!("No videos yet. Upload one with `video-search upload <file>`.");
            } else {
                library.videos().iter().for_each(print_video);
            }
        }
        Command::Show { id } => {
            let video = gateway.get_video(&VideoId::from(id)).await?;
            if json {
                print_json(&video)?;
            } else {
                print_video(&video);
                println!("  stored at {}", video.storage_path);
            }
        }
        Command::Upload { path, title } => {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| ClientError::Internal(format!("{} is not a file", path.display())))?;
            let title = title.unwrap_or_else(|| file_name.clone());
            let data = Bytes::from(tokio::fs::read(&path).await?);
            info!("Uploading {} ({} bytes)", file_name, data.len());

            let uploaded = gateway.upload_video(&file_name, data, &title).await?;
            let mut library = VideoLibrary::new();
            let entry = library.record_upload(&uploaded, &title);
            if json {
                print_json(entry)?;
            } else {
                print_video(entry);
                if let Some(message) = &uploaded.message {
                    println!("  {}", message);
                }
            }
        }
        Command::Delete { id } => {
            gateway.delete_video(&VideoId::from(id.clone())).await?;
            println!("Deleted video {}", id);
        }
        Command::Search { query, video, limit } => {
            let hits = match video {
                Some(id) => {
                    let id = VideoId::from(id);
                    let target = gateway.get_video(&id).await?;
                    if !target.indexing_status.is_searchable() {
                        warn!("Video {} is {}; search may be refused", id, target.indexing_status);
                    }
                    gateway.search_in_video(&id, &query, limit).await?
                }
                None => gateway.global_search(&query, limit).await?,
            };
            if json {
                print_json(&hits)?;
            } else if hits.is_empty() {
                println!("No matches for \"{}\"", query);
            } else {
                hits.iter().for_each(print_hit);
            }
        }
        Command::Stream { id } => {
            println!("{}", gateway.get_stream_url(&VideoId::from(id)).await?);
        }
        Command::Health => {
            let health = gateway.health().await?;
            print_json(&health)?;
        }
        Command::AuthCheck => {
            let check = gateway.verify_auth().await?;
            if json {
                print_json(&check)?;
            } else {
                println!("{} (user {})", check.message, check.user_id);
            }
        }
    }

    Ok(())
}

fn print_video(video: &VideoRecord) {
    let badge = status_badge(video.indexing_status);
    println!("{:>6}  [{:<8}]  {}  ({})", video.id, badge.label, video.title, video.created_at);
}

fn print_hit(hit: &SearchHit) {
    let title = hit.title.as_deref().unwrap_or("");
    println!(
        "{:>6}  {:>8}  {:>4}  {}",
        hit.video_id,
        format_timestamp(hit.timestamp_seconds),
        format_similarity(hit.similarity_score),
        title
    );
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), ClientError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| ClientError::Internal(format!("Failed to render JSON: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}

/// The message shown to the user for a failed command.
fn describe(e: &ClientError) -> String {
    use video_search_core::ports::PortError;

    match e {
        ClientError::Port(PortError::Unauthenticated) => {
            "Not signed in. Run `video-search login <email>` first.".to_string()
        }
        ClientError::Port(PortError::Http { status: 401, .. }) => {
            "The server rejected your credential. Sign in again.".to_string()
        }
        ClientError::Port(PortError::Http { status: 404, body }) => format!("Not found: {}", body),
        other => other.to_string(),
    }
}
