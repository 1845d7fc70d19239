//! CLI - Command Line Interface for reelplay
//!
//! Drives the media cache and playback coordination from a terminal.
//! All output is JSON-parseable.
//!
//! # Examples
//!
//! ```bash
//! # Resolve a url through the cache and wait for the local copy
//! reelplay resolve https://cdn.example.com/p/42.jpg --wait
//!
//! # Check whether a video would be cached
//! reelplay probe https://cdn.example.com/v/42.mp4
//!
//! # Simulate scrolling a feed of videos
//! reelplay feed https://x/1.mp4 https://x/2.mp4 https://x/3.mp4 --json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use reelplay::models::MediaKind;
use reelplay::playback::PlayerType;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// Media was served from the network instead of the cache
    NotCached = 4,
    /// Local player failed to start
    PlayerFailed = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// reelplay - feed media cache and playback coordinator
#[derive(Parser, Debug)]
#[command(
    name = "reelplay",
    version,
    about = "Feed media cache and playback coordinator",
    long_about = "Shadows remote feed images and videos with local cached copies \
                  and coordinates which feed item is allowed to play.",
    after_help = "EXAMPLES:\n\
                  reelplay resolve https://x/a.jpg --wait   Cache an image\n\
                  reelplay probe https://x/v.mp4            Check the video policy\n\
                  reelplay feed https://x/1.mp4 https://x/2.mp4\n\
                  reelplay clear                            Delete cached media"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }

    /// Default tracing filter for the verbosity level
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "reelplay=info",
            1 => "reelplay=debug",
            _ => "reelplay=trace",
        }
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a media url through the cache
    #[command(visible_alias = "r")]
    Resolve(ResolveCmd),

    /// Evaluate the video caching policy for a url
    #[command(visible_alias = "p")]
    Probe(ProbeCmd),

    /// Resolve several urls and wait for all of them
    #[command(visible_alias = "w")]
    Warm(WarmCmd),

    /// Simulate scrolling through a feed of videos
    #[command(visible_alias = "f")]
    Feed(FeedCmd),

    /// Resolve a video and open it in VLC or mpv
    #[command(visible_alias = "o")]
    Open(OpenCmd),

    /// Print cache locations
    Path(PathCmd),

    /// Delete all cached media
    Clear(ClearCmd),
}

/// Media kind selection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindChoice {
    /// Decide from the url extension
    #[default]
    Auto,
    /// Image (always cached)
    Image,
    /// Video (cached per policy)
    Video,
}

impl KindChoice {
    /// Resolve `Auto` by looking at the url's extension
    pub fn for_url(&self, url: &str) -> MediaKind {
        match self {
            KindChoice::Image => MediaKind::Image,
            KindChoice::Video => MediaKind::Video,
            KindChoice::Auto => {
                const VIDEO_EXTENSIONS: &[&str] =
                    &["mp4", "m4v", "mov", "webm", "mkv", "3gp", "m3u8", "mpd"];
                match reelplay::cache::policy::url_extension(url) {
                    Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => MediaKind::Video,
                    _ => MediaKind::Image,
                }
            }
        }
    }
}

// =============================================================================
// Resolve Command
// =============================================================================

/// Resolve a url to a local cached file or the original remote url
#[derive(Args, Debug)]
pub struct ResolveCmd {
    /// Remote media url
    #[arg(required = true)]
    pub url: String,

    /// Media kind
    #[arg(long, short = 'k', value_enum, default_value = "auto")]
    pub kind: KindChoice,

    /// Wait for the final source instead of printing the provisional one
    #[arg(long, short = 'w')]
    pub wait: bool,
}

// =============================================================================
// Probe Command
// =============================================================================

/// Probe a video url's size and report the caching decision
#[derive(Args, Debug)]
pub struct ProbeCmd {
    /// Remote video url
    #[arg(required = true)]
    pub url: String,
}

// =============================================================================
// Warm Command
// =============================================================================

/// Resolve a batch of urls concurrently
#[derive(Args, Debug)]
pub struct WarmCmd {
    /// Remote media urls
    #[arg(required = true, num_args = 1..)]
    pub urls: Vec<String>,

    /// Media kind for every url
    #[arg(long, short = 'k', value_enum, default_value = "auto")]
    pub kind: KindChoice,
}

// =============================================================================
// Feed Command
// =============================================================================

/// Walk a feed of video urls, one visible item per step
#[derive(Args, Debug)]
pub struct FeedCmd {
    /// Video urls in feed order
    #[arg(required = true, num_args = 1..)]
    pub urls: Vec<String>,

    /// Number of upcoming videos kept warm (overrides config)
    #[arg(long, short = 'n')]
    pub window: Option<usize>,

    /// Time each item stays visible, in milliseconds
    #[arg(long, default_value = "500")]
    pub dwell_ms: u64,

    /// Scroll back to the top after reaching the end
    #[arg(long)]
    pub bounce: bool,
}

// =============================================================================
// Open Command
// =============================================================================

/// Resolve a url and hand it to a local player
#[derive(Args, Debug)]
pub struct OpenCmd {
    /// Remote video url
    #[arg(required = true)]
    pub url: String,

    /// Player to use (overrides config)
    #[arg(long, short = 'p', value_enum)]
    pub player: Option<PlayerChoice>,

    /// Loop playback like a reel
    #[arg(long = "loop", short = 'l')]
    pub looping: bool,
}

/// Local player selection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerChoice {
    /// VLC media player
    Vlc,
    /// mpv media player
    Mpv,
}

impl From<PlayerChoice> for PlayerType {
    fn from(choice: PlayerChoice) -> Self {
        match choice {
            PlayerChoice::Vlc => PlayerType::Vlc,
            PlayerChoice::Mpv => PlayerType::Mpv,
        }
    }
}

// =============================================================================
// Path / Clear Commands
// =============================================================================

/// Print the cache directories
#[derive(Args, Debug)]
pub struct PathCmd {}

/// Delete every cached file and release preloaded players
#[derive(Args, Debug)]
pub struct ClearCmd {}

// =============================================================================
// Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// Status OK response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusOk {
    pub status: &'static str,
}

impl Default for StatusOk {
    fn default() -> Self {
        Self { status: "ok" }
    }
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// URL Validation
// =============================================================================

/// Validate that a media url is an absolute http(s) url
pub fn validate_media_url(url: &str) -> Result<&str, &'static str> {
    match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(url),
        _ => Err("Invalid media url (expected an absolute http or https url)"),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_resolve_command() {
        let cli = Cli::parse_from(["reelplay", "resolve", "https://x/a.jpg", "--wait"]);
        if let Command::Resolve(cmd) = cli.command {
            assert_eq!(cmd.url, "https://x/a.jpg");
            assert!(cmd.wait);
            assert_eq!(cmd.kind, KindChoice::Auto);
        } else {
            panic!("Expected Resolve command");
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["reelplay", "--json", "-vv", "--quiet", "path"]);
        assert!(cli.json);
        assert!(cli.quiet);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_filter(), "reelplay=trace");
    }

    #[test]
    fn test_feed_command() {
        let cli = Cli::parse_from([
            "reelplay",
            "feed",
            "https://x/1.mp4",
            "https://x/2.mp4",
            "-n",
            "2",
            "--dwell-ms",
            "100",
        ]);
        if let Command::Feed(cmd) = cli.command {
            assert_eq!(cmd.urls.len(), 2);
            assert_eq!(cmd.window, Some(2));
            assert_eq!(cmd.dwell_ms, 100);
            assert!(!cmd.bounce);
        } else {
            panic!("Expected Feed command");
        }
    }

    #[test]
    fn test_open_command() {
        let cli = Cli::parse_from(["reelplay", "open", "https://x/1.mp4", "-p", "mpv", "--loop"]);
        if let Command::Open(cmd) = cli.command {
            assert_eq!(cmd.player, Some(PlayerChoice::Mpv));
            assert!(cmd.looping);
            assert_eq!(PlayerType::from(PlayerChoice::Mpv), PlayerType::Mpv);
        } else {
            panic!("Expected Open command");
        }
    }

    #[test]
    fn test_kind_auto_detection() {
        assert_eq!(KindChoice::Auto.for_url("https://x/a.jpg"), MediaKind::Image);
        assert_eq!(KindChoice::Auto.for_url("https://x/a.MP4?s=1"), MediaKind::Video);
        assert_eq!(KindChoice::Auto.for_url("https://x/live.m3u8"), MediaKind::Video);
        assert_eq!(KindChoice::Video.for_url("https://x/a.jpg"), MediaKind::Video);
    }

    #[test]
    fn test_validate_media_url() {
        assert!(validate_media_url("https://cdn.x.com/a.jpg").is_ok());
        assert!(validate_media_url("http://x/v.mp4").is_ok());
        assert!(validate_media_url("ftp://x/v.mp4").is_err());
        assert!(validate_media_url("not a url").is_err());
        assert!(validate_media_url("/local/path.mp4").is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(i32::from(ExitCode::Error), 1);
        assert_eq!(i32::from(ExitCode::InvalidArgs), 2);
        assert_eq!(i32::from(ExitCode::NetworkError), 3);
        assert_eq!(i32::from(ExitCode::NotCached), 4);
        assert_eq!(i32::from(ExitCode::PlayerFailed), 5);
    }
}
