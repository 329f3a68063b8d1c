//! Visitor notices delivered over an SMTP relay

use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use super::{CancellationNotice, ConfirmationNotice, Notifier};

const DEFAULT_SMTP_PORT: u16 = 465;

/// Relay settings, read from `SMTP_*` variables
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    /// 465 for implicit TLS
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: Option<String>,
}

impl SmtpConfig {
    /// `None` unless `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD` and
    /// `SMTP_FROM_EMAIL` are all set. `SMTP_PORT` and `SMTP_FROM_NAME` are
    /// optional.
    pub fn from_env() -> Option<Self> {
        let var = |suffix: &str| {
            std::env::var(format!("SMTP_{}", suffix))
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Some(Self {
            host: var("HOST")?,
            port: var("PORT")
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            username: var("USERNAME")?,
            password: var("PASSWORD")?,
            from_email: var("FROM_EMAIL")?,
            from_name: var("FROM_NAME"),
        })
    }
}

/// Sends plain-text visitor notices through the configured relay
pub struct SmtpNotifier {
    relay: SmtpTransport,
    sender: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: SmtpConfig) -> Result<Self, String> {
        let sender = Mailbox::new(
            config.from_name.clone(),
            config
                .from_email
                .parse()
                .map_err(|e| format!("bad sender address {}: {}", config.from_email, e))?,
        );

        let relay = SmtpTransport::relay(&config.host)
            .map_err(|e| format!("SMTP relay {} unusable: {}", config.host, e))?
            .port(config.port)
            .credentials(Credentials::new(config.username, config.password))
            .build();

        tracing::info!(host = %config.host, port = config.port, sender = %sender, "SMTP notifier ready");
        Ok(Self { relay, sender })
    }

    fn deliver(&self, recipient: &str, subject: &str, text: String) -> Result<bool, String> {
        let recipient: Mailbox = recipient
            .parse()
            .map_err(|e| format!("bad recipient address {}: {}", recipient, e))?;

        let message = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(text)
            .map_err(|e| format!("could not compose message: {}", e))?;

        let reply = self
            .relay
            .send(&message)
            .map_err(|e| format!("relay refused message: {}", e))?;
        Ok(reply.is_positive())
    }
}

fn confirmation_text(notice: &ConfirmationNotice) -> String {
    format!(
        "Hi {name},\n\n\
         Your viewing of {property} is booked for {date} at {time} ({minutes} minutes).\n\n\
         We will be in touch if anything changes.",
        name = notice.visitor_name,
        property = notice.property_label,
        date = notice.viewing_date.format("%A, %B %-d, %Y"),
        time = notice.viewing_time,
        minutes = notice.duration,
    )
}

fn cancellation_text(notice: &CancellationNotice) -> String {
    let mut text = format!(
        "Hi {name},\n\nYour viewing of {property} on {date} has been cancelled.\n",
        name = notice.visitor_name,
        property = notice.property_label,
        date = notice.viewing_date.format("%A, %B %-d, %Y"),
    );
    if let Some(reason) = notice.reason.as_deref() {
        text.push_str(&format!("\nReason: {}\n", reason));
    }
    text.push_str("\nYou are welcome to request another time.");
    text
}

impl Notifier for SmtpNotifier {
    fn send_confirmation(&self, notice: &ConfirmationNotice) -> Result<bool, String> {
        let delivered = self.deliver(
            &notice.visitor_email,
            "Your viewing is booked",
            confirmation_text(notice),
        )?;
        tracing::info!(email = %notice.visitor_email, delivered, "Viewing confirmation relayed");
        Ok(delivered)
    }

    fn send_cancellation(&self, notice: &CancellationNotice) -> Result<bool, String> {
        let delivered = self.deliver(
            &notice.visitor_email,
            "Your viewing was cancelled",
            cancellation_text(notice),
        )?;
        tracing::info!(email = %notice.visitor_email, delivered, "Viewing cancellation relayed");
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_cancellation_text_includes_reason_only_when_given() {
        let mut notice = CancellationNotice {
            visitor_email: "v@example.com".into(),
            visitor_name: "Val".into(),
            property_label: "Loft (1 Main St)".into(),
            viewing_date: Utc.with_ymd_and_hms(2030, 3, 4, 0, 0, 0).unwrap(),
            reason: None,
        };
        let text = cancellation_text(&notice);
        assert!(text.contains("Loft (1 Main St) on Monday, March 4, 2030"));
        assert!(!text.contains("Reason"));

        notice.reason = Some("Sold".into());
        assert!(cancellation_text(&notice).contains("Reason: Sold"));
    }
}
