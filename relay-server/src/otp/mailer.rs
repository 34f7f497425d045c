//! Delivery of verification codes by email.

use std::time::Duration;

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::SmtpSettings;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// SMTP transport with a fixed sender.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailerError> {
        let from: Mailbox = settings.from.parse()?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?;

        if let Some(port) = settings.port {
            builder = builder.port(port);
        }

        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    async fn send_code(&self, email: &str, code: &str, ttl: Duration) -> Result<(), MailerError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.parse()?)
            .subject("Your verification code")
            .header(ContentType::TEXT_PLAIN)
            .body(code_body(code, ttl))?;

        self.transport.send(message).await?;
        Ok(())
    }
}

/// Where issued codes go.
pub enum CodeMailer {
    /// Send through an SMTP relay
    Smtp(SmtpMailer),
    /// No transport configured: write the code to the operator log
    Log,
}

impl CodeMailer {
    /// Pick SMTP when settings are present, the log fallback otherwise.
    pub fn from_settings(settings: Option<&SmtpSettings>) -> Result<Self, MailerError> {
        match settings {
            Some(settings) => Ok(CodeMailer::Smtp(SmtpMailer::new(settings)?)),
            None => Ok(CodeMailer::Log),
        }
    }

    pub fn is_smtp(&self) -> bool {
        matches!(self, CodeMailer::Smtp(_))
    }

    pub async fn deliver(&self, email: &str, code: &str, ttl: Duration) -> Result<(), MailerError> {
        match self {
            CodeMailer::Smtp(mailer) => {
                mailer.send_code(email, code, ttl).await?;
                info!(email = %email, "otp_email_sent");
            }
            CodeMailer::Log => {
                warn!(
                    email = %email,
                    code = %code,
                    ttl_seconds = ttl.as_secs(),
                    "otp_dev_code_no_mail_transport"
                );
            }
        }
        Ok(())
    }
}

fn code_body(code: &str, ttl: Duration) -> String {
    let minutes = (ttl.as_secs() / 60).max(1);
    format!(
        "Your verification code is {code}.\n\n\
         It expires in {minutes} minute{plural}. If you did not request it, ignore this email.\n",
        plural = if minutes == 1 { "" } else { "s" },
    )
}
