pub mod commands;
pub mod core;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::core::archive::ArchiveFormat;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::state::AppState;

#[derive(Parser)]
#[command(name = "pickaxe")]
#[command(author, version, about = "Pickaxe - Minecraft artifact acquisition")]
struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download libraries, assets, client jar and Java for a version
    Acquire {
        /// Version id (latest release when omitted)
        version: Option<String>,
        /// Skip the Java runtime even if settings ask for it
        #[arg(long)]
        no_java: bool,
    },
    /// List versions from the manifest
    Versions {
        /// Include snapshots and old betas
        #[arg(long)]
        snapshots: bool,
    },
    /// Install the newest Java runtime for a major version
    InstallJava { major: u32 },
    /// Check a file against a SHA-1 or SHA-256 hash
    Verify { path: PathBuf, hash: String },
    /// Show or change persisted settings
    Settings {
        /// Java major version to install instead of the version's own
        #[arg(long)]
        java_major: Option<u32>,
        /// Whether acquire installs a Java runtime
        #[arg(long)]
        install_java: Option<bool>,
        /// Feature toggle for rule evaluation, as name=true|false
        #[arg(long = "feature", value_parser = parse_feature)]
        features: Vec<(String, bool)>,
    },
    /// Unpack a tar.gz or zip archive
    Extract {
        archive: PathBuf,
        dest: PathBuf,
        /// Archive format (guessed from the extension when omitted)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
}

fn parse_feature(raw: &str) -> Result<(String, bool), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=true|false, got {raw:?}"))?;
    let value = value
        .parse::<bool>()
        .map_err(|_| format!("feature {name:?} must be true or false"))?;
    Ok((name.to_string(), value))
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    TarGz,
    Zip,
}

impl From<FormatArg> for ArchiveFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::TarGz => ArchiveFormat::TarGz,
            FormatArg::Zip => ArchiveFormat::Zip,
        }
    }
}

pub fn run() -> ExitCode {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pickaxe_lib=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(dispatch(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> LauncherResult<()> {
    match cli.command {
        Command::Acquire { version, no_java } => {
            let mut state = open_state(cli.data_dir)?;
            if no_java {
                state.settings.install_java = false;
            }
            let acquired = commands::acquire(&state, version.as_deref()).await?;

            println!("version: {}", acquired.id);
            println!("main class: {}", acquired.main_class);
            if let Some(index) = &acquired.asset_index {
                println!("asset index: {}", index);
            }
            if let Some(home) = &acquired.java_home {
                println!("java home: {}", home.display());
            }
            println!("classpath:");
            for entry in &acquired.classpath {
                println!("  {}", entry.display());
            }
            println!("jvm arguments: {}", acquired.jvm_arguments.join(" "));
            println!("game arguments: {}", acquired.game_arguments.join(" "));
        }
        Command::Versions { snapshots } => {
            let state = open_state(cli.data_dir)?;
            for version in commands::list_versions(&state, snapshots).await? {
                println!(
                    "{:<24} {:<10} {}",
                    version.id, version.version_type, version.release_time
                );
            }
        }
        Command::InstallJava { major } => {
            let state = open_state(cli.data_dir)?;
            let java = commands::install_java(&state, major).await?;
            println!("{}", java.display());
        }
        Command::Settings {
            java_major,
            install_java,
            features,
        } => {
            let mut state = open_state(cli.data_dir)?;
            let changed = java_major.is_some() || install_java.is_some() || !features.is_empty();
            if let Some(major) = java_major {
                state.settings.java_major = Some(major);
            }
            if let Some(install) = install_java {
                state.settings.install_java = install;
            }
            state.settings.features.extend(features);
            if changed {
                state.save_settings()?;
            }
            let rendered = serde_json::to_string_pretty(&state.settings).map_err(|source| {
                LauncherError::Json {
                    source_name: "settings".to_string(),
                    source,
                }
            })?;
            println!("{rendered}");
        }
        Command::Verify { path, hash } => {
            let valid = commands::verify(&path, &hash)?;
            println!("{}", if valid { "valid" } else { "invalid (removed)" });
        }
        Command::Extract {
            archive,
            dest,
            format,
        } => {
            commands::extract(&archive, &dest, format.map(ArchiveFormat::from))?;
            println!("extracted into {}", dest.display());
        }
    }

    Ok(())
}

fn open_state(data_dir: Option<PathBuf>) -> LauncherResult<AppState> {
    let state = AppState::new(data_dir)?;
    tracing::info!("Pickaxe data dir: {:?}", state.data_dir);
    Ok(state)
}
