#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// RAII timer that logs elapsed time on drop.
///
/// ```ignore
/// let _t = Timed::debug("kd-tree build");
/// // ... build ...
/// // logs "kd-tree build: 1.234ms" at DEBUG when _t is dropped
/// ```
///
/// `Instant` is unavailable on wasm32-unknown-unknown, so there the timer only
/// logs completion.
pub(crate) struct Timed {
    name: &'static str,
    #[cfg(not(target_arch = "wasm32"))]
    start: Instant,
    level: log::Level,
}

impl Timed {
    /// Timer that reports at DEBUG level.
    pub(crate) fn debug(name: &'static str) -> Self {
        log::trace!("{}...", name);
        Self {
            name,
            #[cfg(not(target_arch = "wasm32"))]
            start: Instant::now(),
            level: log::Level::Debug,
        }
    }
}

impl Drop for Timed {
    fn drop(&mut self) {
        #[cfg(not(target_arch = "wasm32"))]
        log::log!(self.level, "{}: {:.3?}", self.name, self.start.elapsed());
        #[cfg(target_arch = "wasm32")]
        log::log!(self.level, "{}: done", self.name);
    }
}
