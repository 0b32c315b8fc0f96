use alidisk::{FixedAnswer, Flow, Shell};
use alidisk_client::DriveClient;
use alidisk_config::{AlidiskConfig, ConfigLoader, DriveConfig, LogFormat, LoggingConfig, ShellConfig};
use alidisk_sdk::{CheckNameMode, MemoryDrive, RemoteClient};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod completer;

/// alidisk - Interactive shell and one-shot transfers for Aliyun Drive
#[derive(Parser, Debug)]
#[command(name = "alidisk", version, about)]
struct Args {
    /// Upload SOURCE... [TARGET]; the last path is the remote target unless it exists locally
    #[arg(short, long, num_args = 1.., value_name = "PATH", conflicts_with = "download")]
    upload: Option<Vec<String>>,

    /// Download SOURCE... [LOCAL_DIR]; the last path is the local target if it exists
    #[arg(short, long, num_args = 1.., value_name = "PATH")]
    download: Option<Vec<String>>,

    /// Replace entries that already exist
    #[arg(short, long, group = "mode")]
    overwrite: bool,

    /// Rename uploads whose name is taken
    #[arg(short, long = "auto-rename", visible_alias = "rename", group = "mode")]
    auto_rename: bool,

    /// Skip uploads whose name is taken (default)
    #[arg(short, long, group = "mode")]
    refuse: bool,

    /// Use a throwaway in-memory drive instead of the remote account
    #[arg(long)]
    offline: bool,

    /// Configuration file, replacing the default search locations
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Args {
    fn mode(&self) -> Option<CheckNameMode> {
        if self.overwrite {
            Some(CheckNameMode::Overwrite)
        } else if self.auto_rename {
            Some(CheckNameMode::AutoRename)
        } else if self.refuse {
            Some(CheckNameMode::Refuse)
        } else {
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ConfigLoader::new().with_file(path).load()?,
        None => alidisk_config::load().unwrap_or_else(|e| {
            eprintln!("Warning: ignoring configuration: {e}");
            AlidiskConfig::default()
        }),
    };
    init_logging(&config.logging);

    let client: Arc<dyn RemoteClient> = if args.offline {
        Arc::new(MemoryDrive::new())
    } else {
        match connect(&config.drive).await {
            Ok(client) => client,
            Err(e) => {
                eprintln!("alidisk: could not sign in: {e}");
                std::process::exit(1);
            }
        }
    };

    let one_shot = args.upload.is_some() || args.download.is_some();
    let mut builder = Shell::builder(client).config(&config)?;
    if one_shot {
        // Nobody is there to answer; only --overwrite agrees to replace.
        builder = builder.confirm(FixedAnswer(args.overwrite));
    }
    let mut shell = builder.build();
    let mode = args.mode().or(shell.default_mode());

    if let Some(paths) = &args.upload {
        let split = shell.split_upload_args(paths);
        let ok = shell
            .upload(&split.sources, split.target.as_deref(), split.mode.or(mode))
            .await?;
        std::process::exit(i32::from(!ok));
    }
    if let Some(paths) = &args.download {
        let split = shell.split_download_args(paths);
        let ok = shell
            .download(&split.sources, split.target.as_deref())
            .await?;
        std::process::exit(i32::from(!ok));
    }

    run_repl(&mut shell, &config.shell).await
}

fn init_logging(config: &LoggingConfig) {
    let filter = if config.filter.is_empty() {
        config.level.as_str().to_string()
    } else {
        config.filter.clone()
    };

    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(filter));
    match config.format {
        LogFormat::Pretty => registry.with(layer.pretty()).init(),
        LogFormat::Compact => registry.with(layer.compact()).init(),
    }
}

async fn connect(config: &DriveConfig) -> Result<Arc<dyn RemoteClient>, alidisk_sdk::DriveError> {
    let mut builder = DriveClient::builder(&config.endpoint)
        .auth_endpoint(&config.auth_endpoint)
        .timeout(config.timeout())
        .access_token(config.access_token.as_str())
        .refresh_token(config.refresh_token.as_str())
        .drive_id(config.drive_id.as_str());
    if let Some(path) = config.token_file_path() {
        builder = builder.token_file(path);
    }
    let client = builder.build()?;
    let account = client.connect().await?;
    tracing::info!(user = %account.user_name, drive = %account.drive_id, "signed in");
    Ok(Arc::new(client))
}

async fn run_repl(
    shell: &mut Shell,
    shell_config: &ShellConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    use completer::AlidiskHelper;
    use rustyline::error::ReadlineError;
    use rustyline::{CompletionType, Config, Editor};

    let rl_config = Config::builder()
        .completion_type(CompletionType::List)
        .max_history_size(shell_config.history.max_entries)?
        .history_ignore_space(true)
        .build();

    let mut rl = Editor::with_config(rl_config)?;
    rl.set_helper(Some(AlidiskHelper::new(shell.names())));

    let user = match shell.client().account().await {
        Ok(account) => account.user_name,
        Err(e) => {
            tracing::warn!(error = %e, "could not read account");
            "alidisk".to_string()
        }
    };
    if let Err(e) = shell.refresh_names().await {
        tracing::warn!(error = %e, "could not list current folder for completion");
    }

    loop {
        let prompt = shell_config.render_prompt(&user, shell.pwd());

        match rl.readline(&prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());

                let flow = tokio::select! {
                    flow = shell.execute(&line) => flow,
                    _ = tokio::signal::ctrl_c() => {
                        println!("\ninterrupted.");
                        Flow::Continue
                    }
                };
                match flow {
                    Flow::Continue => {}
                    Flow::Quit => break,
                    Flow::Logout => std::process::exit(0),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("\nCTRL-C signal detected, exit with [q | quit | exit].");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("exit");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
