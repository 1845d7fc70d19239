//! CLI Command Handlers
//!
//! Implements all CLI commands on top of the media service.
//! Each handler takes CLI args and Output, returns ExitCode.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tracing::info;

use crate::cli::{
    ClearCmd, ExitCode, FeedCmd, OpenCmd, Output, PathCmd, ProbeCmd, ResolveCmd, StatusOk,
    WarmCmd,
};
use reelplay::cache::{HttpFetcher, MountGuard, PolicyDecision, Resolution};
use reelplay::config::Config;
use reelplay::models::{CacheRecord, FeedItemId, MediaKind, MediaRef, MediaSource};
use reelplay::playback::{
    CoordinatorState, LocalPlayer, LoggingPlayer, PlayerFactory, PlayerType, SharedPlayer,
};
use reelplay::MediaService;

// =============================================================================
// Resolve Command
// =============================================================================

#[derive(Serialize)]
struct ResolveResponse {
    url: String,
    kind: MediaKind,
    settled: bool,
    source: MediaSource,
    record: CacheRecord,
}

pub async fn resolve_cmd(cmd: ResolveCmd, service: &MediaService, output: &Output) -> ExitCode {
    if let Err(e) = crate::cli::validate_media_url(&cmd.url) {
        return output.error(e, ExitCode::InvalidArgs);
    }

    let media = MediaRef::new(cmd.url.clone(), cmd.kind.for_url(&cmd.url));
    let resolution = service.resolve(&media);

    let source = if cmd.wait || resolution.is_ready() {
        resolution.settled().await
    } else {
        let provisional = resolution.current();
        let response = ResolveResponse {
            url: media.url.clone(),
            kind: media.kind,
            settled: false,
            source: provisional,
            record: service.cache(media.kind).record(&media.url),
        };
        if let Err(e) = output.print(&response) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }

        // Let the flight finish so the next run finds the file
        let settled = resolution.settled().await;
        output.info(format!("Settled: {}", settled));
        return ExitCode::Success;
    };

    let response = ResolveResponse {
        url: media.url.clone(),
        kind: media.kind,
        settled: true,
        source: source.clone(),
        record: service.cache(media.kind).record(&media.url),
    };
    if let Err(e) = output.print(&response) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }

    if source.is_local() {
        ExitCode::Success
    } else {
        ExitCode::NotCached
    }
}

// =============================================================================
// Probe Command
// =============================================================================

#[derive(Serialize)]
struct ProbeResponse {
    url: String,
    single_file_format: bool,
    min_bytes: u64,
    max_bytes: u64,
    #[serde(flatten)]
    decision: PolicyDecision,
}

pub async fn probe_cmd(cmd: ProbeCmd, config: &Config, output: &Output) -> ExitCode {
    if let Err(e) = crate::cli::validate_media_url(&cmd.url) {
        return output.error(e, ExitCode::InvalidArgs);
    }

    let policy = config.policy();
    let fetcher = HttpFetcher::new(config.http_timeout());

    output.info(format!("Probing: {}", cmd.url));
    let decision = policy.evaluate(&cmd.url, &fetcher).await;

    let response = ProbeResponse {
        url: cmd.url.clone(),
        single_file_format: policy.accepts_format(&cmd.url),
        min_bytes: policy.min_bytes,
        max_bytes: policy.max_bytes,
        decision,
    };
    if let Err(e) = output.print(&response) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }

    match decision {
        PolicyDecision::SkipUnknownSize => ExitCode::NetworkError,
        _ => ExitCode::Success,
    }
}

// =============================================================================
// Warm Command
// =============================================================================

#[derive(Serialize)]
struct WarmEntry {
    url: String,
    kind: MediaKind,
    source: MediaSource,
}

pub async fn warm_cmd(cmd: WarmCmd, service: &MediaService, output: &Output) -> ExitCode {
    for url in &cmd.urls {
        if let Err(e) = crate::cli::validate_media_url(url) {
            return output.error(format!("{}: {}", url, e), ExitCode::InvalidArgs);
        }
    }

    let media: Vec<MediaRef> = cmd
        .urls
        .iter()
        .map(|url| MediaRef::new(url.clone(), cmd.kind.for_url(url)))
        .collect();

    output.info(format!("Resolving {} urls...", media.len()));

    let resolutions: Vec<Resolution> = media.iter().map(|m| service.resolve(m)).collect();
    let sources = join_all(resolutions.into_iter().map(Resolution::settled)).await;

    let entries: Vec<WarmEntry> = media
        .into_iter()
        .zip(sources)
        .map(|(m, source)| WarmEntry {
            url: m.url,
            kind: m.kind,
            source,
        })
        .collect();

    let cached = entries.iter().filter(|e| e.source.is_local()).count();
    output.info(format!("{} of {} cached locally", cached, entries.len()));

    if let Err(e) = output.print(&entries) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

// =============================================================================
// Feed Command
// =============================================================================

#[derive(Serialize)]
struct FeedStep {
    step: usize,
    id: FeedItemId,
    url: String,
    source: MediaSource,
    coordinator: CoordinatorState,
    playing: bool,
    preloaded: usize,
    mounted: usize,
}

/// A feed item currently mounted in the simulated viewport
struct MountedItem {
    id: FeedItemId,
    handle: SharedPlayer,
    guard: MountGuard,
}

/// Items further than this from the visible one are unmounted
const MOUNT_RADIUS: usize = 1;

pub async fn feed_cmd(
    cmd: FeedCmd,
    service: &MediaService,
    config: &Config,
    output: &Output,
) -> ExitCode {
    for url in &cmd.urls {
        if let Err(e) = crate::cli::validate_media_url(url) {
            return output.error(format!("{}: {}", url, e), ExitCode::InvalidArgs);
        }
    }

    let window = cmd.window.unwrap_or_else(|| config.preload_window());
    if window == 0 {
        return output.error("Preload window must be at least 1", ExitCode::InvalidArgs);
    }

    let media: Vec<MediaRef> = cmd.urls.iter().map(MediaRef::video).collect();
    let factory: Arc<dyn PlayerFactory> = Arc::new(|m: &MediaRef| -> SharedPlayer {
        Arc::new(LoggingPlayer::new(m.url.clone(), true))
    });
    let mut preload = service.preload_window(Arc::clone(&factory), window, config.warmup());
    let coordinator = service.coordinator();
    let dwell = Duration::from_millis(cmd.dwell_ms);

    let mut order: Vec<usize> = (0..media.len()).collect();
    if cmd.bounce && media.len() > 1 {
        order.extend((0..media.len() - 1).rev());
    }

    output.info(format!(
        "Scrolling {} items, window {}, dwell {}ms",
        media.len(),
        window,
        cmd.dwell_ms
    ));

    let mut mounted: HashMap<usize, MountedItem> = HashMap::new();
    let mut steps = Vec::with_capacity(order.len());
    let mut previous: Option<usize> = None;

    for (step, &idx) in order.iter().enumerate() {
        let item = &media[idx];
        let id = FeedItemId::post(format!("post{}", idx));

        // Mount the visible item and its neighbours
        let low = idx.saturating_sub(MOUNT_RADIUS);
        let high = (idx + MOUNT_RADIUS).min(media.len() - 1);
        for n in low..=high {
            if mounted.contains_key(&n) {
                continue;
            }
            let n_id = FeedItemId::post(format!("post{}", n));
            let handle = service.acquire_player(&media[n], factory.as_ref());
            coordinator.register(n_id.clone(), Arc::clone(&handle));

            let guard = MountGuard::new();
            if let Resolution::Pending(pending) = service.resolve(&media[n]) {
                let log_id = n_id.clone();
                pending.deliver_to(guard.clone(), move |source| {
                    info!("feed: '{}' source settled: {}", log_id, source);
                });
            }
            mounted.insert(
                n,
                MountedItem {
                    id: n_id,
                    handle,
                    guard,
                },
            );
        }

        let source = service.resolve(item).current();
        coordinator.switch_video(&id);

        // Warm ahead in the scroll direction, skipping mounted items
        let forward = previous.map_or(true, |p| idx >= p);
        let ahead: Vec<usize> = if forward {
            (idx + 1..media.len()).collect()
        } else {
            (0..idx).rev().collect()
        };
        let upcoming: Vec<MediaRef> = ahead
            .into_iter()
            .filter(|n| !mounted.contains_key(n))
            .map(|n| media[n].clone())
            .collect();
        preload.advance(&upcoming).await;

        // Unmount items that scrolled out of range
        let far: Vec<usize> = mounted
            .keys()
            .copied()
            .filter(|&n| n + MOUNT_RADIUS < idx || n > idx + MOUNT_RADIUS)
            .collect();
        for n in far {
            if let Some(gone) = mounted.remove(&n) {
                gone.guard.unmount();
                coordinator.unregister(&gone.id);
                gone.handle.release();
            }
        }

        steps.push(FeedStep {
            step,
            id,
            url: item.url.clone(),
            source,
            coordinator: coordinator.state(),
            playing: coordinator.is_playing(),
            preloaded: service.registry().len(),
            mounted: mounted.len(),
        });

        previous = Some(idx);
        tokio::time::sleep(dwell).await;
    }

    coordinator.pause_active();
    for (_, item) in mounted.drain() {
        item.guard.unmount();
        coordinator.unregister(&item.id);
        item.handle.release();
    }
    preload.drain();

    if let Err(e) = output.print(&steps) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

// =============================================================================
// Open Command
// =============================================================================

#[derive(Serialize)]
struct OpenResponse {
    status: &'static str,
    player: String,
    source: MediaSource,
}

pub async fn open_cmd(
    cmd: OpenCmd,
    service: &MediaService,
    config: &Config,
    output: &Output,
) -> ExitCode {
    if let Err(e) = crate::cli::validate_media_url(&cmd.url) {
        return output.error(e, ExitCode::InvalidArgs);
    }

    let player_type: PlayerType = cmd.player.map(Into::into).unwrap_or_else(|| config.player());
    let player = LocalPlayer::new(player_type);
    if !player.is_available().await {
        return output.error(
            format!("{} not found. Install it first.", player_type.display_name()),
            ExitCode::PlayerFailed,
        );
    }

    let media = MediaRef::video(cmd.url.clone());
    output.info("Resolving through cache...");
    let source = service.resolve(&media).settled().await;
    output.info(format!("Opening {} in {}...", source, player_type.display_name()));

    match player.play(&source, cmd.looping).await {
        Ok(_child) => {
            let response = OpenResponse {
                status: "playing",
                player: player_type.display_name().to_string(),
                source,
            };
            if let Err(e) = output.print(&response) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => output.error(format!("Failed to start player: {}", e), ExitCode::PlayerFailed),
    }
}

// =============================================================================
// Path / Clear Commands
// =============================================================================

#[derive(Serialize)]
struct PathResponse {
    root: String,
    images: String,
    videos: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<String>,
}

pub async fn path_cmd(_cmd: PathCmd, service: &MediaService, output: &Output) -> ExitCode {
    let response = PathResponse {
        root: service.root().display().to_string(),
        images: service.cache(MediaKind::Image).dir().display().to_string(),
        videos: service.cache(MediaKind::Video).dir().display().to_string(),
        config: Config::path().map(|p| p.display().to_string()),
    };
    if let Err(e) = output.print(&response) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

pub async fn clear_cmd(_cmd: ClearCmd, service: &MediaService, output: &Output) -> ExitCode {
    output.info(format!("Clearing {}...", service.root().display()));
    match service.clear_all().await {
        Ok(()) => {
            if let Err(e) = output.print(StatusOk::default()) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => output.error(format!("Clear failed: {}", e), ExitCode::Error),
    }
}
