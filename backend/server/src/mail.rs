//! # Mail
//!
//! One notification email per saved consultation, sent to the front desk inbox.
//!
//! ## Policy
//! - Best effort only, a saved consultation is a successful submission
//! - Errors are logged by the caller and dropped, never retried
//! - Without relay credentials a [`DisabledNotifier`] is installed and every send fails with
//!   [`NotificationError::NotConfigured`]
//!
//! ## Relay
//! - SMTP with implicit TLS (port 465), authenticated as `EMAIL_USER`
//! - The sender is `EMAIL_USER`, the recipient is fixed
use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    config::Config,
    models::Consultation,
    utils::{display_value, escape_html},
};

pub const NOTIFY_ADDRESS: &str = "kaiwen0151@163.com";
pub const SUBJECT: &str = "新的咨询表单提交";

const FIELDS: [(&str, &str); 6] = [
    ("姓名", "name"),
    ("邮箱", "email"),
    ("电话", "phone"),
    ("咨询类型", "consultationType"),
    ("学员年龄段", "ageGroup"),
    ("具体需求", "requirements"),
];

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP relay error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Mail relay credentials are not configured")]
    NotConfigured,
}

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify(&self, consultation: &Consultation) -> Result<(), NotificationError>;
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    pub fn new(host: &str, user: &str, pass: &str) -> Result<Self, NotificationError> {
        let from: Mailbox = user.parse()?;
        let to: Mailbox = NOTIFY_ADDRESS.parse()?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
            .credentials(Credentials::new(user.to_string(), pass.to_string()))
            .build();

        Ok(Self {
            transport,
            from,
            to,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, consultation: &Consultation) -> Result<(), NotificationError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(SUBJECT)
            .header(ContentType::TEXT_HTML)
            .body(render(consultation))?;

        let response = self.transport.send(email).await?;
        info!(
            "Notification for {} sent: {}",
            consultation.id(),
            response.code()
        );

        Ok(())
    }
}

pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, _consultation: &Consultation) -> Result<(), NotificationError> {
        Err(NotificationError::NotConfigured)
    }
}

pub fn init_notifier(config: &Config) -> Arc<dyn Notifier> {
    let Some((user, pass)) = config.mail_credentials() else {
        warn!("EMAIL_USER/EMAIL_PASS not set, notifications disabled");
        return Arc::new(DisabledNotifier);
    };

    match SmtpNotifier::new(&config.smtp_host, user, pass) {
        Ok(notifier) => {
            info!("Mail relay {} configured for {user}", config.smtp_host);
            Arc::new(notifier)
        }
        Err(e) => {
            warn!("Mail relay misconfigured, notifications disabled: {e}");
            Arc::new(DisabledNotifier)
        }
    }
}

pub fn render(consultation: &Consultation) -> String {
    let mut html = format!(
        "<h3>{SUBJECT}</h3>\n<p><strong>提交时间:</strong> {}</p>\n",
        escape_html(&display_value(consultation.field("timestamp")))
    );

    for (label, key) in FIELDS {
        let value = display_value(consultation.field(key));
        html.push_str(&format!(
            "<p><strong>{label}:</strong> {}</p>\n",
            escape_html(&value)
        ));
    }

    html
}
