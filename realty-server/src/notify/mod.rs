//! Visitor notification abstractions

pub mod console;
pub mod smtp;

pub use console::ConsoleNotifier;
pub use smtp::{SmtpConfig, SmtpNotifier};

use chrono::{DateTime, Utc};

/// Details sent to a visitor once a viewing request is recorded
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationNotice {
    pub visitor_email: String,
    pub visitor_name: String,
    pub property_label: String,
    pub viewing_date: DateTime<Utc>,
    pub viewing_time: String,
    pub duration: u32,
}

/// Details sent to a visitor when an admin cancels their viewing
#[derive(Debug, Clone, PartialEq)]
pub struct CancellationNotice {
    pub visitor_email: String,
    pub visitor_name: String,
    pub property_label: String,
    pub viewing_date: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Trait for delivering visitor notifications.
///
/// `Ok(false)` means the sender declined to deliver without an error.
pub trait Notifier: Send + Sync {
    fn send_confirmation(&self, notice: &ConfirmationNotice) -> Result<bool, String>;

    fn send_cancellation(&self, notice: &CancellationNotice) -> Result<bool, String>;
}

/// Allow using Box<dyn Notifier> as a Notifier
impl Notifier for Box<dyn Notifier> {
    fn send_confirmation(&self, notice: &ConfirmationNotice) -> Result<bool, String> {
        (**self).send_confirmation(notice)
    }

    fn send_cancellation(&self, notice: &CancellationNotice) -> Result<bool, String> {
        (**self).send_cancellation(notice)
    }
}

/// Run a notification attempt whose outcome must never fail the caller.
///
/// Returns whether the notification was delivered. Failures are logged.
pub fn dispatch_best_effort<F>(kind: &'static str, send: F) -> bool
where
    F: FnOnce() -> Result<bool, String>,
{
    match send() {
        Ok(true) => true,
        Ok(false) => {
            tracing::warn!(kind, "Notification was not delivered");
            false
        }
        Err(e) => {
            tracing::warn!(kind, error = %e, "Notification failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_best_effort_outcomes() {
        assert!(dispatch_best_effort("test", || Ok(true)));
        assert!(!dispatch_best_effort("test", || Ok(false)));
        assert!(!dispatch_best_effort("test", || Err("smtp down".to_string())));
    }
}
