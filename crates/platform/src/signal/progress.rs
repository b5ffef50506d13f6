//! Store generation progress signal and banner.

use askama::Template;
use askama_web::WebTemplate;
use serde::Serialize;
use storeloom_core::AccountId;

use super::SignalHub;

/// Live state of a store generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationSignal {
    pub in_progress: bool,
    /// Completion, `0..=100`.
    pub percent: u8,
    pub status: String,
}

/// Publishes progress for one account's generation run.
///
/// The signal is cleared when the reporter is dropped, so an early return
/// or a failed step never leaves a stale banner behind.
#[derive(Debug)]
pub struct ProgressReporter {
    hub: SignalHub<AccountId, GenerationSignal>,
    account: AccountId,
}

impl ProgressReporter {
    /// Start reporting for `account`.
    #[must_use]
    pub const fn new(hub: SignalHub<AccountId, GenerationSignal>, account: AccountId) -> Self {
        Self { hub, account }
    }

    /// Publish a step. `percent` is clamped to 100.
    pub fn report(&self, percent: u8, status: impl Into<String>) {
        let signal = GenerationSignal {
            in_progress: true,
            percent: percent.min(100),
            status: status.into(),
        };
        tracing::debug!(
            account = %self.account,
            percent = signal.percent,
            status = %signal.status,
            "Generation progress"
        );
        self.hub.publish(&self.account, signal);
    }

    /// Clear the signal.
    pub fn finish(self) {
        drop(self);
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.hub.clear(&self.account);
    }
}

/// Banner fragment shown while a generation run is in progress.
#[derive(Debug, Template, WebTemplate)]
#[template(path = "progress_banner.html")]
pub struct ProgressBannerTemplate {
    pub percent: u8,
    pub status: String,
}

impl ProgressBannerTemplate {
    /// Banner for `signal`, or `None` when nothing is running.
    #[must_use]
    pub fn for_signal(signal: &GenerationSignal) -> Option<Self> {
        signal.in_progress.then(|| Self {
            percent: signal.percent,
            status: signal.status.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn test_reporter_publishes_and_clears_on_drop() {
        let hub = SignalHub::new();
        let account = AccountId::new("acct");
        let seen: Arc<Mutex<Vec<Option<u8>>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let _sub = hub.subscribe(account.clone(), move |signal: Option<&GenerationSignal>| {
            sink.lock().expect("lock").push(signal.map(|s| s.percent));
        });

        {
            let reporter = ProgressReporter::new(hub.clone(), account.clone());
            reporter.report(5, "Checking credits");
            reporter.report(250, "Store ready");
            assert_eq!(
                hub.current(&account).map(|s| (s.percent, s.status)),
                Some((100, "Store ready".to_string()))
            );
        }

        assert_eq!(hub.current(&account), None);
        assert_eq!(*seen.lock().expect("lock"), vec![Some(5), Some(100), None]);
    }

    #[test]
    fn test_banner_hidden_when_idle() {
        let idle = GenerationSignal {
            in_progress: false,
            percent: 0,
            status: String::new(),
        };
        assert!(ProgressBannerTemplate::for_signal(&idle).is_none());
    }

    #[test]
    fn test_banner_renders_percent_and_escaped_status() {
        let signal = GenerationSignal {
            in_progress: true,
            percent: 35,
            status: "Creating <product> images".to_string(),
        };
        let html = ProgressBannerTemplate::for_signal(&signal)
            .expect("visible")
            .render()
            .expect("render");

        assert!(html.contains("width: 35%"));
        assert!(html.contains("Creating "));
        assert!(!html.contains("<product>"));
    }
}
