mod audio;

use std::fmt;
use std::sync::Arc;

use dioxus::LaunchBuilder;
use dioxus::desktop::{Config as DesktopConfig, WindowBuilder};
use quest_core::model::{ThemeId, Username};
use services::{AppServices, Clock, VoiceConfig, VoiceLoopService};
use tracing::info;
use tracing_subscriber::EnvFilter;
use ui::{App, UiApp, build_app_context};

use crate::audio::CpalCaptureBackend;

const DEFAULT_THEME: &str = "1";
const DEFAULT_USER: &str = "guest";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidTheme { raw: String },
    InvalidUser { raw: String },
    InvalidApiUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidTheme { raw } => write!(f, "invalid --theme value: {raw:?}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value: {raw:?}"),
            ArgsError::InvalidApiUrl { raw } => write!(f, "invalid --api value: {raw:?}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

struct DesktopApp {
    services: AppServices,
}

impl UiApp for DesktopApp {
    fn theme_id(&self) -> ThemeId {
        self.services.theme_id().clone()
    }

    fn username(&self) -> Username {
        self.services.username().clone()
    }

    fn voice_loop(&self) -> Arc<VoiceLoopService> {
        self.services.voice_loop()
    }
}

#[derive(Debug)]
struct Args {
    theme_id: ThemeId,
    username: Username,
    api_url: Option<String>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--theme <id>] [--user <name>] [--api <url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --theme {DEFAULT_THEME}");
    eprintln!("  --user {DEFAULT_USER}");
    eprintln!("  --api http://localhost:8000");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUESTK_THEME, QUESTK_USER, QUESTK_API_URL");
    eprintln!("  QUESTK_MIN_UTTERANCE_BYTES, QUESTK_SUCCESS_MIN_SCORE");
    eprintln!("  QUESTK_CELEBRATION_MS, QUESTK_REQUEST_TIMEOUT_SECS");
    eprintln!("  RUST_LOG (default: info)");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut theme = std::env::var("QUESTK_THEME").unwrap_or_else(|_| DEFAULT_THEME.into());
        let mut user = std::env::var("QUESTK_USER").unwrap_or_else(|_| DEFAULT_USER.into());
        let mut api_url = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--theme" => theme = require_value(args, "--theme")?,
                "--user" => user = require_value(args, "--user")?,
                "--api" => {
                    let value = require_value(args, "--api")?;
                    if !value.starts_with("http://") && !value.starts_with("https://") {
                        return Err(ArgsError::InvalidApiUrl { raw: value });
                    }
                    api_url = Some(value);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let theme_id =
            ThemeId::new(theme.clone()).map_err(|_| ArgsError::InvalidTheme { raw: theme })?;
        let username =
            Username::new(user.clone()).map_err(|_| ArgsError::InvalidUser { raw: user })?;
        Ok(Self {
            theme_id,
            username,
            api_url,
        })
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();

    let mut config = VoiceConfig::from_env();
    if let Some(url) = parsed.api_url {
        config = config.with_api_base_url(url);
    }
    info!(
        api = %config.api_base_url,
        theme = %parsed.theme_id,
        user = %parsed.username,
        "starting QUEST K"
    );

    let services = AppServices::new_http(
        config,
        Arc::new(CpalCaptureBackend),
        Clock::system(),
        parsed.theme_id,
        parsed.username,
    )?;
    let app: Arc<dyn UiApp> = Arc::new(DesktopApp { services });
    let context = build_app_context(&app);

    // On macOS, Dioxus/tao can default to an always-on-top window in some dev setups.
    let desktop_cfg = DesktopConfig::new().with_window(
        WindowBuilder::new()
            .with_title("QUEST K")
            .with_always_on_top(false),
    );

    LaunchBuilder::desktop()
        .with_cfg(desktop_cfg)
        .with_context(context)
        .launch(App);
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|arg| (*arg).to_string());
        Args::parse(&mut iter)
    }

    #[test]
    fn flags_override_defaults() {
        let args = parse(&["--theme", "cafe", "--user", "mina", "--api", "http://10.0.0.2:8000"])
            .unwrap();
        assert_eq!(args.theme_id.to_string(), "cafe");
        assert_eq!(args.username.to_string(), "mina");
        assert_eq!(args.api_url.as_deref(), Some("http://10.0.0.2:8000"));
    }

    #[test]
    fn missing_value_is_reported() {
        let err = parse(&["--theme"]).unwrap_err();
        assert_eq!(err.to_string(), "--theme requires a value");
    }

    #[test]
    fn unknown_and_invalid_args_fail() {
        assert!(matches!(
            parse(&["--deck", "1"]).unwrap_err(),
            ArgsError::UnknownArg(_)
        ));
        assert!(matches!(
            parse(&["--api", "localhost:8000"]).unwrap_err(),
            ArgsError::InvalidApiUrl { .. }
        ));
        assert!(matches!(
            parse(&["--user", "   "]).unwrap_err(),
            ArgsError::InvalidUser { .. }
        ));
    }
}
