//! Cooperative stop requests
//!
//! 会话在 tick 之间检查停止请求，之后照常关闭 sinks、结束同步并销毁 actors。

use tokio::sync::watch;

/// Sending half, owned by whoever listens for signals
#[derive(Debug)]
pub struct ShutdownTrigger(watch::Sender<bool>);

impl ShutdownTrigger {
    /// Ask every linked [`Shutdown`] to stop at the next tick boundary
    pub fn trigger(&self) {
        self.0.send_replace(true);
    }
}

/// Stop request observed by the session loops
#[derive(Debug, Clone)]
pub struct Shutdown(watch::Receiver<bool>);

impl Shutdown {
    pub fn channel() -> (ShutdownTrigger, Self) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger(tx), Self(rx))
    }

    /// Never requested
    pub fn never() -> Self {
        Self(watch::channel(false).1)
    }

    pub fn is_requested(&self) -> bool {
        *self.0.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::never()
    }
}
