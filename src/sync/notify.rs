//! User-visible notifications.
//!
//! Every message a run produces goes through one [`Notifier`]. The SiYuan
//! client shows them inside the app; delivery problems are logged and
//! otherwise ignored.

use tracing::{info, warn};

use crate::siyuan::{SiyuanApi, SiyuanClient};

/// Prefix for error notifications.
pub const ERROR_PREFIX: &str = "plugin-memos-sync: ";

/// Sink for run notifications.
pub trait Notifier: Send + Sync {
    fn info(&self, msg: &str) -> impl std::future::Future<Output = ()> + Send;

    fn error(&self, msg: &str) -> impl std::future::Future<Output = ()> + Send;
}

impl Notifier for SiyuanClient {
    async fn info(&self, msg: &str) {
        info!("{msg}");
        if let Err(e) = self.push_msg(msg).await {
            warn!(error = %e, "Failed to push notification");
        }
    }

    async fn error(&self, msg: &str) {
        warn!("{msg}");
        if let Err(e) = self.push_err_msg(&format!("{ERROR_PREFIX}{msg}")).await {
            warn!(error = %e, "Failed to push error notification");
        }
    }
}

/// Notifier that only logs, for commands that must not touch SiYuan.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn info(&self, msg: &str) {
        info!("{msg}");
    }

    async fn error(&self, msg: &str) {
        warn!("{ERROR_PREFIX}{msg}");
    }
}
