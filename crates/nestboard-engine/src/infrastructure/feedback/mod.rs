//! Audio feedback asset cache.
//!
//! Key presses play short switch-sound clips.  Clips are decoded on first use
//! and held in a strict least-recently-used cache so a fast typist never waits
//! on disk twice for the same sample.  The cache is an accelerator, not a
//! dependency: a load that fails or overruns its timeout degrades that one
//! playback to silence and the gesture pipeline never notices.
//!
//! Changing the active [`SwitchProfile`] invalidates every cached clip, since
//! sample names are only meaningful within one profile's sample set.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

/// The simulated mechanical switch whose sample set is active.
///
/// One profile maps to one directory of samples on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchProfile {
    Alpaca,
    BlackInk,
    BlueAlps,
    BoxNavy,
    Buckling,
    Cream,
    HolyPanda,
    MxBlack,
    MxBlue,
    MxBrown,
    RedInk,
    Topre,
    Turquoise,
}

impl SwitchProfile {
    /// Parses a config identifier (e.g. `"mxbrown"`).  Unknown identifiers
    /// return `None`; callers fall back to [`Self::default`] with a warning.
    pub fn from_id(id: &str) -> Option<Self> {
        Some(match id {
            "alpaca" => Self::Alpaca,
            "blackink" => Self::BlackInk,
            "bluealps" => Self::BlueAlps,
            "boxnavy" => Self::BoxNavy,
            "buckling" => Self::Buckling,
            "cream" => Self::Cream,
            "holypanda" => Self::HolyPanda,
            "mxblack" => Self::MxBlack,
            "mxblue" => Self::MxBlue,
            "mxbrown" => Self::MxBrown,
            "redink" => Self::RedInk,
            "topre" => Self::Topre,
            "turquoise" => Self::Turquoise,
            _ => return None,
        })
    }

    /// The directory name holding this profile's samples.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Alpaca => "alpaca",
            Self::BlackInk => "blackink",
            Self::BlueAlps => "bluealps",
            Self::BoxNavy => "boxnavy",
            Self::Buckling => "buckling",
            Self::Cream => "cream",
            Self::HolyPanda => "holypanda",
            Self::MxBlack => "mxblack",
            Self::MxBlue => "mxblue",
            Self::MxBrown => "mxbrown",
            Self::RedInk => "redink",
            Self::Topre => "topre",
            Self::Turquoise => "turquoise",
        }
    }
}

impl Default for SwitchProfile {
    fn default() -> Self {
        Self::MxBrown
    }
}

/// A decoded, ready-to-play feedback clip.  Cheap to clone.
#[derive(Debug, Clone)]
pub struct FeedbackClip {
    pub bytes: Arc<[u8]>,
}

impl FeedbackClip {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Error type for asset loading.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("no sample named {name:?} in profile {profile:?}")]
    NotFound { profile: SwitchProfile, name: String },

    #[error("I/O error loading sample: {0}")]
    Io(#[from] std::io::Error),
}

/// Loads raw feedback samples for a switch profile.
///
/// The filesystem implementation reads from the asset directory; the test
/// implementation serves in-memory bytes with controllable latency.
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn load(&self, profile: SwitchProfile, name: &str) -> Result<FeedbackClip, AssetError>;
}

/// Filesystem asset source: `<root>/<profile>/<name>.wav`.
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetSource for FsAssetSource {
    async fn load(&self, profile: SwitchProfile, name: &str) -> Result<FeedbackClip, AssetError> {
        let path = self
            .root
            .join(profile.dir_name())
            .join(format!("{name}.wav"));
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(FeedbackClip {
                bytes: bytes.into(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AssetError::NotFound {
                profile,
                name: name.to_string(),
            }),
            Err(e) => Err(AssetError::Io(e)),
        }
    }
}

/// Counters reported on the maintenance interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceReport {
    pub entries: usize,
    pub resident_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub reclaimed: u64,
    pub load_failures: u64,
}

/// Cache tuning knobs, supplied by configuration.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    /// Maximum resident entries; the least recently used entry is evicted
    /// when a load would exceed it.
    pub capacity: usize,
    /// Entries untouched for this long are dropped by maintenance.
    pub max_idle: Duration,
    /// Budget for one asset load; overruns degrade to a silent miss.
    pub load_timeout: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            capacity: 64,
            max_idle: Duration::from_secs(300),
            load_timeout: Duration::from_millis(250),
        }
    }
}

struct Entry {
    clip: FeedbackClip,
    /// Monotonic use counter; lowest value is least recently used.
    last_used: u64,
    last_touch: Instant,
}

struct Inner {
    profile: SwitchProfile,
    entries: HashMap<String, Entry>,
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    reclaimed: u64,
    load_failures: u64,
}

/// Strict-LRU cache of decoded feedback clips.
pub struct FeedbackCache {
    source: Arc<dyn AssetSource>,
    policy: CachePolicy,
    inner: Mutex<Inner>,
}

impl FeedbackCache {
    pub fn new(source: Arc<dyn AssetSource>, profile: SwitchProfile, policy: CachePolicy) -> Self {
        Self {
            source,
            // A cache that can hold nothing would still insert after a load;
            // one entry is the smallest honest capacity.
            policy: CachePolicy {
                capacity: policy.capacity.max(1),
                ..policy
            },
            inner: Mutex::new(Inner {
                profile,
                entries: HashMap::new(),
                tick: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
                reclaimed: 0,
                load_failures: 0,
            }),
        }
    }

    pub async fn profile(&self) -> SwitchProfile {
        self.inner.lock().await.profile
    }

    /// Switches the active profile, invalidating every cached clip.
    pub async fn set_profile(&self, profile: SwitchProfile) {
        let mut inner = self.inner.lock().await;
        if inner.profile == profile {
            return;
        }
        let dropped = inner.entries.len();
        inner.entries.clear();
        inner.profile = profile;
        info!(?profile, dropped, "switch profile changed; cache cleared");
    }

    /// Returns the clip for `name`, loading it on a miss.
    ///
    /// A failed or overrunning load returns `None` so the caller plays
    /// silence; the failure is counted and logged, never propagated.
    pub async fn get(&self, name: &str) -> Option<FeedbackClip> {
        let profile = {
            let mut inner = self.inner.lock().await;
            inner.tick += 1;
            let tick = inner.tick;
            if let Some(entry) = inner.entries.get_mut(name) {
                entry.last_used = tick;
                entry.last_touch = Instant::now();
                let clip = entry.clip.clone();
                inner.hits += 1;
                return Some(clip);
            }
            inner.misses += 1;
            inner.profile
        };

        // Load without holding the cache lock so concurrent hits stay fast.
        let loaded = tokio::time::timeout(
            self.policy.load_timeout,
            self.source.load(profile, name),
        )
        .await;

        let clip = match loaded {
            Ok(Ok(clip)) => clip,
            Ok(Err(e)) => {
                warn!(sample = name, error = %e, "feedback sample load failed");
                self.inner.lock().await.load_failures += 1;
                return None;
            }
            Err(_) => {
                warn!(
                    sample = name,
                    timeout_ms = self.policy.load_timeout.as_millis() as u64,
                    "feedback sample load timed out"
                );
                self.inner.lock().await.load_failures += 1;
                return None;
            }
        };

        let mut inner = self.inner.lock().await;
        // The profile may have changed during the load; a stale clip must not
        // enter the new profile's cache.
        if inner.profile != profile {
            debug!(sample = name, "discarding clip loaded for a stale profile");
            return Some(clip);
        }
        inner.tick += 1;
        let tick = inner.tick;
        if inner.entries.len() >= self.policy.capacity {
            Self::evict_lru(&mut inner);
        }
        inner.entries.insert(
            name.to_string(),
            Entry {
                clip: clip.clone(),
                last_used: tick,
                last_touch: Instant::now(),
            },
        );
        Some(clip)
    }

    /// Drops entries untouched for longer than the idle limit.  Returns the
    /// number reclaimed.
    pub async fn reclaim_idle(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let max_idle = self.policy.max_idle;
        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, entry| entry.last_touch.elapsed() <= max_idle);
        let reclaimed = before - inner.entries.len();
        inner.reclaimed += reclaimed as u64;
        if reclaimed > 0 {
            debug!(reclaimed, "idle feedback clips reclaimed");
        }
        reclaimed
    }

    /// Snapshot of cache counters for the maintenance report.
    pub async fn report(&self) -> ResourceReport {
        let inner = self.inner.lock().await;
        ResourceReport {
            entries: inner.entries.len(),
            resident_bytes: inner.entries.values().map(|e| e.clip.len()).sum(),
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            reclaimed: inner.reclaimed,
            load_failures: inner.load_failures,
        }
    }

    fn evict_lru(inner: &mut Inner) {
        let victim = inner
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(name, _)| name.clone());
        if let Some(name) = victim {
            inner.entries.remove(&name);
            inner.evictions += 1;
            debug!(sample = %name, "evicted least recently used feedback clip");
        }
    }
}

/// Maintenance loop: reclaims idle clips and logs a resource report on an
/// interval.  Runs until `shutdown` flips to true or its sender is dropped.
pub async fn run_maintenance(
    cache: Arc<FeedbackCache>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; skip it so the first report covers a
    // full interval.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("feedback maintenance stopping");
                    return;
                }
                continue;
            }
        }

        cache.reclaim_idle().await;
        let report = cache.report().await;
        info!(
            entries = report.entries,
            resident_bytes = report.resident_bytes,
            hits = report.hits,
            misses = report.misses,
            evictions = report.evictions,
            reclaimed = report.reclaimed,
            load_failures = report.load_failures,
            "feedback cache report"
        );
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
