use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use tokio::sync::{mpsc, watch};

use crate::{manifest::SmoothManifest, SmoothError};

/// Source of manifest snapshots for live presentations.
///
/// Implementations must publish a new `Arc` whenever the manifest changes and must never mutate a
/// published snapshot: the chunk source detects refreshes with [Arc::ptr_eq].
pub trait ManifestFetcher: Send {
    /// Latest successfully loaded manifest.
    fn manifest(&self) -> Option<Arc<SmoothManifest>>;

    /// When [manifest](ManifestFetcher::manifest) was loaded.
    fn manifest_load_timestamp(&self) -> Instant;

    /// Asks for a fresher manifest. Returns immediately.
    fn request_refresh(&mut self);

    fn enable(&mut self);

    fn disable(&mut self);

    /// Error of the last refresh, if it failed.
    fn error(&self) -> Option<Arc<SmoothError>>;
}

#[derive(Debug, Clone)]
struct FetcherState {
    manifest: Option<Arc<SmoothManifest>>,
    loaded_at: Instant,
    error: Option<Arc<SmoothError>>,
}

/// Creates a connected [ManifestPublisher] / [WatchManifestFetcher] pair.
///
/// The publisher lives in the task that actually downloads and parses manifests, the fetcher is
/// handed to the chunk source:
///
/// ```ignore
/// let (mut publisher, fetcher) = manifest_channel(initial_manifest);
/// tokio::spawn(async move {
///     while publisher.refresh_requested().await {
///         match load_manifest(&client, &url).await {
///             Ok(manifest) => publisher.publish(Arc::new(manifest)),
///             Err(e) => publisher.publish_error(e),
///         }
///     }
/// });
/// ```
pub fn manifest_channel(
    initial: Option<Arc<SmoothManifest>>,
) -> (ManifestPublisher, WatchManifestFetcher) {
    let (state_sender, state_receiver) = watch::channel(FetcherState {
        manifest: initial,
        loaded_at: Instant::now(),
        error: None,
    });
    let (refresh_sender, refresh_receiver) = mpsc::unbounded_channel();
    let enabled = Arc::new(AtomicBool::new(false));

    (
        ManifestPublisher {
            state: state_sender,
            refresh_requests: refresh_receiver,
            enabled: enabled.clone(),
        },
        WatchManifestFetcher {
            state: state_receiver,
            refresh_requests: refresh_sender,
            enabled,
        },
    )
}

/// Producer side of [manifest_channel].
pub struct ManifestPublisher {
    state: watch::Sender<FetcherState>,
    refresh_requests: mpsc::UnboundedReceiver<()>,
    enabled: Arc<AtomicBool>,
}

impl ManifestPublisher {
    pub fn publish(&self, manifest: Arc<SmoothManifest>) {
        self.publish_with_timestamp(manifest, Instant::now());
    }

    pub fn publish_with_timestamp(&self, manifest: Arc<SmoothManifest>, loaded_at: Instant) {
        tracing::debug!(is_live = manifest.is_live, "Publishing manifest");
        self.state.send_modify(|state| {
            state.manifest = Some(manifest);
            state.loaded_at = loaded_at;
            state.error = None;
        });
    }

    /// Reports a failed refresh. The last good manifest stays published.
    pub fn publish_error(&self, error: SmoothError) {
        tracing::warn!("Failed to refresh manifest: {error}");
        self.state.send_modify(|state| state.error = Some(Arc::new(error)));
    }

    /// Waits for the next refresh request. Requests piled up in the meantime are merged into one.
    ///
    /// Returns `false` once the fetcher has been dropped.
    pub async fn refresh_requested(&mut self) -> bool {
        if self.refresh_requests.recv().await.is_none() {
            return false;
        }
        while self.refresh_requests.try_recv().is_ok() {}
        true
    }

    /// Non-blocking variant of [refresh_requested](ManifestPublisher::refresh_requested).
    pub fn try_refresh_requested(&mut self) -> bool {
        let mut requested = false;
        while self.refresh_requests.try_recv().is_ok() {
            requested = true;
        }
        requested
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

/// [ManifestFetcher] reading snapshots published by a [ManifestPublisher].
#[derive(Debug)]
pub struct WatchManifestFetcher {
    state: watch::Receiver<FetcherState>,
    refresh_requests: mpsc::UnboundedSender<()>,
    enabled: Arc<AtomicBool>,
}

impl ManifestFetcher for WatchManifestFetcher {
    fn manifest(&self) -> Option<Arc<SmoothManifest>> {
        self.state.borrow().manifest.clone()
    }

    fn manifest_load_timestamp(&self) -> Instant {
        self.state.borrow().loaded_at
    }

    fn request_refresh(&mut self) {
        if self.refresh_requests.send(()).is_err() {
            tracing::warn!("Manifest publisher is gone, refresh request dropped");
        }
    }

    fn enable(&mut self) {
        self.enabled.store(true, Ordering::Release);
    }

    fn disable(&mut self) {
        self.enabled.store(false, Ordering::Release);
    }

    fn error(&self) -> Option<Arc<SmoothError>> {
        self.state.borrow().error.clone()
    }
}
