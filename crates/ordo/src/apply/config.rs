//! Data source configuration.

use std::time::Duration;

use ordo_core::ThreadPoolConfig;

/// Duration used by [`ApplyOption::animated`](super::ApplyOption::animated).
pub const DEFAULT_ANIMATION: Duration = Duration::from_millis(250);

/// Settings shared by every data source kind.
///
/// # Example
///
/// ```
/// use ordo::apply::DataSourceConfig;
/// use std::time::Duration;
///
/// let config = DataSourceConfig::default()
///     .with_default_animation(Duration::from_millis(150))
///     .with_reload_threshold(500)
///     .with_background_diffing(true);
/// assert_eq!(config.reload_threshold, Some(500));
/// ```
#[derive(Debug, Clone)]
pub struct DataSourceConfig {
    /// Animation used by `apply_snapshot`.
    pub default_animation: Duration,
    /// Diffs with more changes than this are applied as a full reload.
    pub reload_threshold: Option<usize>,
    /// Compute diffs on a background pool instead of the UI thread.
    pub background_diffing: bool,
    /// Settings for a dedicated background pool. `None` shares
    /// [`ThreadPool::global`](ordo_core::ThreadPool::global).
    pub pool: Option<ThreadPoolConfig>,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            default_animation: DEFAULT_ANIMATION,
            reload_threshold: None,
            background_diffing: false,
            pool: None,
        }
    }
}

impl DataSourceConfig {
    /// Set the animation used by `apply_snapshot`.
    pub fn with_default_animation(mut self, duration: Duration) -> Self {
        self.default_animation = duration;
        self
    }

    /// Fall back to a full reload above `changes` changes.
    pub fn with_reload_threshold(mut self, changes: usize) -> Self {
        self.reload_threshold = Some(changes);
        self
    }

    /// Enable or disable background diffing.
    pub fn with_background_diffing(mut self, enabled: bool) -> Self {
        self.background_diffing = enabled;
        self
    }

    /// Diff on a dedicated pool built from `pool`.
    pub fn with_pool(mut self, pool: ThreadPoolConfig) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Whether a diff with `changes` changes should be applied as a reload.
    pub fn exceeds_reload_threshold(&self, changes: usize) -> bool {
        self.reload_threshold.is_some_and(|limit| changes > limit)
    }
}
