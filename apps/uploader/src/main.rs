use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    build_http_client, load_settings,
    results::{self, CardBody},
    routing::DEFAULT_PATH,
    upload::PROCESSING_MESSAGE,
    CandidateFile, ClientSettings, Credentials, FileCredentialStore, HttpIdentityProvider,
    IntakeOutcome, Navigation, SessionGuard, UploadDropZone, UploadOrchestrator, UploadState,
};
use shared::domain::ImageResult;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Submit image archives to the processing service and view per-image results")]
struct Cli {
    /// Settings file (defaults to ./uploader.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    service_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "UPLOADER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    /// Show the current identity; `--verify` asks the service to confirm it
    Whoami {
        #[arg(long)]
        verify: bool,
    },
    /// Show where navigating to PATH would land
    Route { path: String },
    Upload {
        archive: PathBuf,
        /// Write decoded feature maps into this directory
        #[arg(long)]
        save_visualizations: Option<PathBuf>,
    },
}

fn init_tracing(settings: &ClientSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(url) = cli.service_url {
        settings.service_url = url;
    }
    init_tracing(&settings);

    let store = Arc::new(FileCredentialStore::new(settings.credential_path()));
    info!(path = %store.path().display(), "using credential store");
    let mut guard = SessionGuard::hydrate(store);
    let http = build_http_client(&settings)?;

    match cli.command {
        Command::Login { username, password } => {
            let provider = HttpIdentityProvider::from_settings(http, &settings)?;
            let session = guard
                .login(&provider, &Credentials::new(username, password))
                .await?;
            match session.identity() {
                Some(identity) => println!("Logged in as {}", identity.username),
                None => println!("Logged in"),
            }
        }
        Command::Logout => {
            guard.logout()?;
            println!("Logged out");
        }
        Command::Whoami { verify } => {
            if verify {
                let provider = HttpIdentityProvider::from_settings(http, &settings)?;
                guard.verify(&provider).await?;
            }
            let session = guard.session();
            if !session.is_authenticated() {
                bail!("not logged in");
            }
            match session.identity() {
                Some(identity) => {
                    let role = identity.role.as_deref().unwrap_or("unknown role");
                    println!("{} ({role})", identity.username);
                }
                None => println!("Logged in (identity unknown; try --verify)"),
            }
            if let Some(at) = session.authenticated_at() {
                println!("Logged in since {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
        Command::Route { path } => match guard.navigate(&path) {
            Navigation::Admit(route) => println!("admit {}", route.path()),
            Navigation::Redirect(route) => println!(
                "redirect {} (resolves to {})",
                route.path(),
                guard.resolve(&path).path()
            ),
        },
        Command::Upload {
            archive,
            save_visualizations,
        } => {
            if let Navigation::Redirect(route) = guard.navigate(DEFAULT_PATH) {
                bail!(
                    "not logged in (redirected to {}); run `uploader login` first",
                    route.path()
                );
            }

            let candidate = CandidateFile::from_path(&archive)
                .await
                .with_context(|| format!("cannot open '{}'", archive.display()))?;
            let mut zone = UploadDropZone::new();
            let file = match zone.select(vec![candidate]) {
                IntakeOutcome::Accepted(file) => file,
                IntakeOutcome::Rejected(err) => bail!("{err}"),
                IntakeOutcome::Ignored => bail!("no file selected"),
            };
            println!("Selected: {} ({})", file.name, file.size_label());
            println!("{PROCESSING_MESSAGE}");

            let mut orchestrator = UploadOrchestrator::from_settings(http, &settings)?;
            let session = orchestrator.submit(&mut guard, file).await?;
            let status = session.status_message().unwrap_or_default().to_string();

            if session.state() == UploadState::Failed {
                if !guard.is_authenticated() {
                    return Err(anyhow!("{status}; run `uploader login`"));
                }
                return Err(anyhow!(status));
            }

            println!("{status}");
            if let Some(text) = results::render_text(session.visible_results()) {
                println!();
                print!("{text}");
            }
            if let Some(dir) = save_visualizations {
                save_feature_maps(&dir, session.visible_results()).await?;
            }
        }
    }

    Ok(())
}

async fn save_feature_maps(dir: &Path, images: &[ImageResult]) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("cannot create '{}'", dir.display()))?;

    for card in results::project(images) {
        let CardBody::Success {
            visualization: Some(visualization),
            ..
        } = &card.body
        else {
            continue;
        };
        let stem = Path::new(&card.filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| card.filename.clone());
        let target = dir.join(format!("{stem}_features.png"));

        match visualization.decode() {
            Ok(bytes) => {
                tokio::fs::write(&target, bytes)
                    .await
                    .with_context(|| format!("cannot write '{}'", target.display()))?;
                println!("Saved {}", target.display());
            }
            Err(err) => eprintln!("Skipping {}: {err}", card.filename),
        }
    }
    Ok(())
}
