//! Elapsed-time logging for engine passes (document loads, plan resolution).

use std::time::Instant;

use log::Level;

/// Times one engine pass and logs it at `level` when dropped.
///
/// The label closure only runs if the level is enabled, so resolution can time itself
/// on every preview query without formatting strings nobody reads. A pass may attach a
/// count (segments, tracks) that is appended to the log line.
pub struct PassTimer {
    pass: Option<String>,
    level: Level,
    count: Option<usize>,
    started: Instant,
}

impl PassTimer {
    pub fn start(level: Level, pass: impl FnOnce() -> String) -> Self {
        Self {
            pass: log::log_enabled!(level).then(pass),
            level,
            count: None,
            started: Instant::now(),
        }
    }

    pub fn debug(pass: impl FnOnce() -> String) -> Self {
        Self::start(Level::Debug, pass)
    }

    pub fn set_count(&mut self, count: usize) {
        self.count = Some(count);
    }
}

impl Drop for PassTimer {
    fn drop(&mut self) {
        let Some(pass) = &self.pass else {
            return;
        };
        let micros = self.started.elapsed().as_micros();
        match self.count {
            Some(count) => log::log!(self.level, "{} ({} items) took {} us", pass, count, micros),
            None => log::log!(self.level, "{} took {} us", pass, micros),
        }
    }
}

/// Runs `f` under a debug-level [`PassTimer`] named `pass`.
pub fn timed<T>(pass: &str, f: impl FnOnce() -> T) -> T {
    let _timer = PassTimer::debug(|| pass.to_string());
    f()
}
