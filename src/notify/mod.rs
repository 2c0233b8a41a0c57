use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

use crate::config::EmailSettings;
use crate::error::{Result, VaultError};

pub fn report_subject(vm: &str, succeeded: bool) -> String {
    if succeeded {
        format!("BACKUP OK {}", vm)
    } else {
        format!("BACKUP FAILED {}", vm)
    }
}

pub fn build_message(settings: &EmailSettings, subject: &str, body: &str) -> Result<Message> {
    let from: Mailbox = settings
        .from
        .parse()
        .map_err(|e| VaultError::message(format!("email from {:?}: {}", settings.from, e)))?;
    let mut builder = Message::builder().from(from).subject(subject);
    for recipient in &settings.recipients {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| VaultError::message(format!("email to {:?}: {}", recipient, e)))?;
        builder = builder.to(to);
    }
    builder
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| VaultError::message(format!("email build: {}", e)))
}

/// Submits the report over STARTTLS with the configured credentials.
pub fn send_report(settings: &EmailSettings, subject: &str, body: &str) -> Result<()> {
    let email = build_message(settings, subject, body)?;
    let creds = Credentials::new(settings.user.clone(), settings.password.clone());
    let mailer = SmtpTransport::starttls_relay(&settings.smtp_host)
        .map_err(|e| VaultError::message(format!("SMTP STARTTLS {}: {}", settings.smtp_host, e)))?
        .port(settings.smtp_port)
        .credentials(creds)
        .build();
    mailer
        .send(&email)
        .map_err(|e| VaultError::message(format!("SMTP send: {}", e)))?;
    info!("report e-mailed to {}", settings.recipients.join(", "));
    Ok(())
}
