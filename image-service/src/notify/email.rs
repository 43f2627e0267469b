use lettre::{
    message::{header, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info};

use crate::config::EmailConfig;
use shared::messaging::Notification;
use shared::{Result, ServiceError};

/// Delivers topic notifications to subscribed e-mail addresses over SMTP
pub struct EmailMailer {
    smtp_transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailMailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| ServiceError::Notification(format!("Invalid SMTP host: {}", e)))?
            .port(config.smtp_port);

        if !config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }

        let from = Self::build_from(&config.from_name, &config.from_address)?;

        Ok(Self {
            smtp_transport: builder.build(),
            from,
        })
    }

    fn build_from(name: &str, address: &str) -> Result<Mailbox> {
        format!("{} <{}>", name, address)
            .parse()
            .map_err(|e| ServiceError::Notification(format!("Invalid from address: {}", e)))
    }

    fn build_message(&self, recipient: &str, notification: &Notification) -> Result<Message> {
        let to: Mailbox = recipient.parse().map_err(|e| {
            ServiceError::InvalidInput(format!("Invalid recipient email: {}", e))
        })?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.subject.clone())
            .header(header::ContentType::TEXT_PLAIN)
            .body(notification.message.clone())
            .map_err(|e| ServiceError::Notification(format!("Failed to build email: {}", e)))
    }

    pub async fn send(&self, recipient: &str, notification: &Notification) -> Result<()> {
        let email = self.build_message(recipient, notification)?;

        match self.smtp_transport.send(email).await {
            Ok(_) => {
                info!("Email sent successfully to {}", recipient);
                Ok(())
            }
            Err(e) => {
                error!("Failed to send email to {}: {}", recipient, e);
                Err(ServiceError::Notification(format!("SMTP error: {}", e)))
            }
        }
    }
}
