//! Auto-dismissing toast notices.
//!
//! Time is passed in explicitly so that expiry is deterministic in tests.

use std::time::{Duration, Instant};

use askama::Template;
use storeloom_core::NoticeKind;

/// How long a toast stays visible unless dismissed.
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_secs(4);

/// Identifier of a toast within its queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(u64);

impl std::fmt::Display for ToastId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A visible notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub kind: NoticeKind,
    pub shown_at: Instant,
    pub duration: Duration,
}

impl Toast {
    /// Whether the toast is still within its display window at `now`.
    #[must_use]
    pub fn is_visible(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) < self.duration
    }

    /// Time left before auto-dismissal.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.duration
            .saturating_sub(now.saturating_duration_since(self.shown_at))
    }
}

/// Queue of toasts; any number may be visible at once.
#[derive(Debug, Clone)]
pub struct ToastQueue {
    toasts: Vec<Toast>,
    next_id: u64,
    duration: Duration,
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::with_duration(DEFAULT_TOAST_DURATION)
    }
}

impl ToastQueue {
    /// Queue with the default display duration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue with a custom display duration.
    #[must_use]
    pub const fn with_duration(duration: Duration) -> Self {
        Self {
            toasts: Vec::new(),
            next_id: 0,
            duration,
        }
    }

    /// Show `message` from `now` on.
    pub fn push(&mut self, message: impl Into<String>, kind: NoticeKind, now: Instant) -> ToastId {
        let id = ToastId(self.next_id);
        self.next_id += 1;
        self.toasts.push(Toast {
            id,
            message: message.into(),
            kind,
            shown_at: now,
            duration: self.duration,
        });
        id
    }

    /// Dismiss a toast early. Returns whether it was still queued.
    pub fn dismiss(&mut self, id: ToastId) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        self.toasts.len() != before
    }

    /// Drop expired toasts and return the visible ones, oldest first.
    pub fn visible(&mut self, now: Instant) -> &[Toast] {
        self.toasts.retain(|t| t.is_visible(now));
        &self.toasts
    }

    /// Render the visible toasts as an HTML fragment.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render(&mut self, now: Instant) -> askama::Result<String> {
        let toasts = self
            .visible(now)
            .iter()
            .map(|t| ToastView {
                id: t.id.0,
                message: t.message.clone(),
                kind: kind_class(t.kind),
                remaining_ms: u64::try_from(t.remaining(now).as_millis()).unwrap_or(u64::MAX),
            })
            .collect();
        ToastsTemplate { toasts }.render()
    }
}

const fn kind_class(kind: NoticeKind) -> &'static str {
    match kind {
        NoticeKind::Success => "success",
        NoticeKind::Info => "info",
        NoticeKind::Warning => "warning",
        NoticeKind::Error => "error",
    }
}

struct ToastView {
    id: u64,
    message: String,
    kind: &'static str,
    remaining_ms: u64,
}

#[derive(Template)]
#[template(path = "toasts.html")]
struct ToastsTemplate {
    toasts: Vec<ToastView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_auto_dismisses_after_duration() {
        let start = Instant::now();
        let mut queue = ToastQueue::new();
        queue.push("Saved", NoticeKind::Success, start);

        assert_eq!(queue.visible(start + Duration::from_millis(3999)).len(), 1);
        assert!(queue.visible(start + DEFAULT_TOAST_DURATION).is_empty());
    }

    #[test]
    fn test_many_toasts_visible_at_once() {
        let start = Instant::now();
        let mut queue = ToastQueue::new();
        queue.push("one", NoticeKind::Info, start);
        queue.push("two", NoticeKind::Error, start + Duration::from_secs(1));
        queue.push("three", NoticeKind::Warning, start + Duration::from_secs(2));

        let messages: Vec<_> = queue
            .visible(start + Duration::from_secs(2))
            .iter()
            .map(|t| t.message.as_str())
            .collect();
        assert_eq!(messages, vec!["one", "two", "three"]);

        let messages: Vec<_> = queue
            .visible(start + Duration::from_millis(4500))
            .iter()
            .map(|t| t.message.clone())
            .collect();
        assert_eq!(messages, vec!["two", "three"]);
    }

    #[test]
    fn test_dismiss() {
        let now = Instant::now();
        let mut queue = ToastQueue::new();
        let first = queue.push("a", NoticeKind::Info, now);
        queue.push("b", NoticeKind::Info, now);

        assert!(queue.dismiss(first));
        assert!(!queue.dismiss(first));
        assert_eq!(queue.visible(now).len(), 1);
    }

    #[test]
    fn test_render_includes_kind_and_remaining() {
        let now = Instant::now();
        let mut queue = ToastQueue::new();
        queue.push("Image generation failed", NoticeKind::Error, now);

        let html = queue
            .render(now + Duration::from_secs(1))
            .expect("render");
        assert!(html.contains("toast--error"));
        assert!(html.contains("Image generation failed"));
        assert!(html.contains("data-dismiss-after-ms=\"3000\""));
    }
}
