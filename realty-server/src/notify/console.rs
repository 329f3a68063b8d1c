//! Console-based notifier for development

use super::{CancellationNotice, ConfirmationNotice, Notifier};

/// Notifier that only logs (for development)
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for ConsoleNotifier {
    fn send_confirmation(&self, notice: &ConfirmationNotice) -> Result<bool, String> {
        tracing::info!(
            email = %notice.visitor_email,
            name = %notice.visitor_name,
            property = %notice.property_label,
            date = %notice.viewing_date.format("%Y-%m-%d"),
            time = %notice.viewing_time,
            duration = notice.duration,
            "Viewing confirmation"
        );

        Ok(true)
    }

    fn send_cancellation(&self, notice: &CancellationNotice) -> Result<bool, String> {
        tracing::info!(
            email = %notice.visitor_email,
            name = %notice.visitor_name,
            property = %notice.property_label,
            date = %notice.viewing_date.format("%Y-%m-%d"),
            reason = notice.reason.as_deref().unwrap_or("-"),
            "Viewing cancellation"
        );

        Ok(true)
    }
}
