//! Local Player - VLC/mpv playback of resolved media
//!
//! Opens a resolved [`MediaSource`] (cached file or remote url) in an
//! external player process.

use std::process::Stdio;
use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::models::MediaSource;

/// Supported local players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerType {
    /// VLC media player (default)
    #[default]
    Vlc,
    /// mpv media player
    Mpv,
}

impl PlayerType {
    /// Get the command name for this player
    pub fn command(&self) -> &'static str {
        match self {
            PlayerType::Vlc => {
                // On macOS, VLC is an app bundle - check for it
                #[cfg(target_os = "macos")]
                if std::path::Path::new("/Applications/VLC.app").exists() {
                    return "/Applications/VLC.app/Contents/MacOS/VLC";
                }
                "vlc"
            }
            PlayerType::Mpv => "mpv",
        }
    }

    /// Get a display name for this player
    pub fn display_name(&self) -> &'static str {
        match self {
            PlayerType::Vlc => "VLC",
            PlayerType::Mpv => "mpv",
        }
    }

    /// Arguments for opening `location`, looping it if requested
    pub fn args(&self, location: &str, looping: bool) -> Vec<String> {
        let mut args = vec![location.to_string()];
        match self {
            PlayerType::Vlc => {
                if looping {
                    args.push("--loop".to_string());
                }
                args.push("--no-video-title-show".to_string());
            }
            PlayerType::Mpv => {
                if looping {
                    args.push("--loop-file=inf".to_string());
                }
                args.push("--force-window=immediate".to_string());
            }
        }
        args
    }
}

impl std::fmt::Display for PlayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Errors from local player operations
#[derive(Debug, Error)]
pub enum LocalPlayerError {
    #[error("Player '{0}' not found. Install it first.")]
    NotFound(String),
    #[error("Failed to start player: {0}")]
    StartFailed(#[from] std::io::Error),
    #[error("Cached file vanished: {0}")]
    MissingFile(String),
}

/// External player process launcher
pub struct LocalPlayer {
    player_type: PlayerType,
}

impl LocalPlayer {
    pub fn new(player_type: PlayerType) -> Self {
        Self { player_type }
    }

    /// Check if the player is available on the system
    pub async fn is_available(&self) -> bool {
        let cmd = self.player_type.command();

        if cmd.starts_with('/') {
            return std::path::Path::new(cmd).exists();
        }

        Command::new("which")
            .arg(cmd)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Open `source` in the player; reels loop.
    pub async fn play(&self, source: &MediaSource, looping: bool) -> Result<Child, LocalPlayerError> {
        if let MediaSource::Local { path } = source {
            if !path.exists() {
                return Err(LocalPlayerError::MissingFile(path.display().to_string()));
            }
        }

        let location = source.location();
        let mut cmd = Command::new(self.player_type.command());
        cmd.args(self.player_type.args(&location, looping));
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        debug!("local player: {} '{}'", self.player_type, location);

        cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LocalPlayerError::NotFound(self.player_type.command().to_string())
            } else {
                LocalPlayerError::StartFailed(e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_type_command() {
        let vlc_cmd = PlayerType::Vlc.command();
        assert!(vlc_cmd == "vlc" || vlc_cmd == "/Applications/VLC.app/Contents/MacOS/VLC");
        assert_eq!(PlayerType::Mpv.command(), "mpv");
    }

    #[test]
    fn test_player_type_display() {
        assert_eq!(PlayerType::Vlc.to_string(), "VLC");
        assert_eq!(PlayerType::Mpv.to_string(), "mpv");
    }

    #[test]
    fn test_loop_args() {
        let args = PlayerType::Mpv.args("/tmp/a", true);
        assert_eq!(args[0], "/tmp/a");
        assert!(args.contains(&"--loop-file=inf".to_string()));

        let args = PlayerType::Vlc.args("https://x/v.mp4", false);
        assert!(!args.contains(&"--loop".to_string()));
    }

    #[tokio::test]
    async fn test_missing_cached_file_is_rejected() {
        let player = LocalPlayer::new(PlayerType::Mpv);
        let source = MediaSource::Local {
            path: "/definitely/not/here/reelplay".into(),
        };
        let err = player.play(&source, false).await.unwrap_err();
        assert!(matches!(err, LocalPlayerError::MissingFile(_)));
    }
}
