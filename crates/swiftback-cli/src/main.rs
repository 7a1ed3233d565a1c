use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use swiftback_core::{run_backup, Config, Context, DEFAULT_SEGMENT_SIZE};
use swiftback_source::ExcludeSet;
use tracing::{info, warn};

const EXIT_SUCCESS: u8 = 0;
const EXIT_CONFIG: u8 = 1;
const EXIT_AUTH: u8 = 2;
const EXIT_SYNC: u8 = 3;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Parser)]
#[command(
    name = "swiftback",
    about = "Incremental one-way backup to Swift-compatible object storage",
    disable_version_flag = true
)]
struct Cli {
    /// Account login.
    #[arg(short = 'l', long)]
    login: Option<String>,

    /// Account password.
    #[arg(short = 'p', long)]
    pwd: Option<String>,

    /// Identity provider endpoint.
    #[arg(short = 'a', long)]
    auth_url: Option<String>,

    /// Source folder.
    #[arg(short = 'i', long)]
    src: Option<PathBuf>,

    /// Optional exclude file list path.
    #[arg(short = 'x', long)]
    excludes: Option<PathBuf>,

    /// Destination container.
    #[arg(short = 'c', long, default_value = "default")]
    container: String,

    /// Destination folder.
    #[arg(short = 'o', long)]
    dst: Option<String>,

    /// Optional crypto password; when set, uploads are encrypted.
    #[arg(short = 'k', long)]
    crypt_password: Option<String>,

    /// Log level (trace, debug, info, warn, error, off).
    #[arg(long, default_value = "warn")]
    loglevel: String,

    /// Display version infos.
    #[arg(short = 'v', long)]
    version: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("swiftback {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::from(EXIT_SUCCESS);
    }

    if !LOG_LEVELS.contains(&cli.loglevel.as_str()) {
        eprintln!(
            "error: invalid log level '{}' (expected one of {})",
            cli.loglevel,
            LOG_LEVELS.join(", ")
        );
        return ExitCode::from(EXIT_CONFIG);
    }
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SWIFTBACK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.loglevel)),
        )
        .with_target(false)
        .without_time()
        .init();

    let config = match build_config(cli) {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("error: {msg}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    info!("program started, settings:");
    info!("{:15}: {}", "Login", config.login);
    info!("{:15}: {}", "Source folder", config.src_folder.display());
    for exclude in config.excludes.iter() {
        info!("{:15}: {exclude}", "Exclude");
    }
    info!("{:15}: {}", "Container", config.container);
    info!("{:15}: {}", "Destination", config.dst_folder);
    info!(
        "{:15}: {}",
        "Encrypted",
        if config.encrypting() { "yes" } else { "no" }
    );

    let credentials =
        match swiftback_remote::authenticate(&config.auth_url, &config.login, &config.password) {
            Ok(credentials) => credentials,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(EXIT_AUTH);
            }
        };

    let ctx = Context::new(config, credentials);
    install_interrupt_handler(&ctx);

    let pb = spinner("synchronizing…");
    match run_backup(ctx) {
        Ok(report) => {
            finish(&pb, &format!("✓ {report}"));
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            finish(&pb, "✗ synchronization failed");
            eprintln!("error: {e}");
            ExitCode::from(EXIT_SYNC)
        }
    }
}

fn build_config(cli: Cli) -> Result<Config, String> {
    let login = cli.login.ok_or("missing mandatory option --login")?;
    let password = cli.pwd.ok_or("missing mandatory option --pwd")?;
    let auth_url = cli.auth_url.ok_or("missing mandatory option --auth-url")?;
    let src_folder = cli.src.ok_or("missing mandatory option --src")?;
    let dst = cli.dst.ok_or("missing mandatory option --dst")?;

    let excludes = match &cli.excludes {
        Some(path) => ExcludeSet::load(path).map_err(|e| e.to_string())?,
        None => ExcludeSet::new(),
    };

    let config = Config {
        login,
        password,
        auth_url,
        src_folder,
        excludes,
        container: cli.container,
        dst_folder: dst.trim_matches('/').to_owned(),
        crypt_password: cli.crypt_password,
        segment_size: DEFAULT_SEGMENT_SIZE,
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// First interrupt requests a clean drain; a second one gives up waiting.
fn install_interrupt_handler(ctx: &std::sync::Arc<Context>) {
    let ctx = std::sync::Arc::clone(ctx);
    let result = ctrlc::set_handler(move || {
        if ctx.aborted() {
            std::process::exit(130);
        }
        warn!("interrupt received, draining…");
        ctx.abort();
    });
    if let Err(e) = result {
        warn!("cannot install interrupt handler: {e}");
    }
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn finish(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(msg.to_owned());
}
