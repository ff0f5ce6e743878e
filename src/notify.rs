//! Result notifications.
//!
//! When a batch of slides has been processed the submitter is told where
//! the results are, or which slides failed. [`EmailMessage::compose`] builds
//! the message; delivering it is up to a [`Notifier`]. Only
//! [`LogNotifier`] ships with the crate; mail vendors plug in through the
//! trait.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::error::NotifyError;

/// Sender address of result notifications.
pub const SENDER: &str = "brainwebsiteresults@brainii.com";

/// Where a failed submitter is sent to try again.
pub const RETRY_URL: &str = "www.pathologyreports.ai";

pub const SUCCESS_SUBJECT: &str = "Your results are ready!";
pub const FAILURE_SUBJECT: &str = "We ran into an error generating your results";

/// A stored result file, shown as a link named `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultLink {
    pub name: String,
    pub path: String,
}

impl ResultLink {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// What happened to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Results were stored at these locations
    Success { links: Vec<ResultLink> },
    /// These slides could not be processed
    Failure { slides: Vec<String> },
}

/// A notification for one submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub outcome: Outcome,

    /// Appended verbatim as a final paragraph
    pub error_log: Option<String>,

    /// Add a "Submitted by" line naming the recipient
    pub display_user: bool,
}

impl Notification {
    pub fn success(recipient: impl Into<String>, links: Vec<ResultLink>) -> Self {
        Self::new(recipient, Outcome::Success { links })
    }

    pub fn failure<S: Into<String>>(
        recipient: impl Into<String>,
        slides: impl IntoIterator<Item = S>,
    ) -> Self {
        let slides = slides.into_iter().map(Into::into).collect();
        Self::new(recipient, Outcome::Failure { slides })
    }

    fn new(recipient: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            recipient: recipient.into(),
            outcome,
            error_log: None,
            display_user: false,
        }
    }

    pub fn with_error_log(mut self, log: impl Into<String>) -> Self {
        self.error_log = Some(log.into());
        self
    }

    pub fn with_display_user(mut self, display_user: bool) -> Self {
        self.display_user = display_user;
        self
    }
}

/// A composed HTML email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

impl EmailMessage {
    pub fn compose(notification: &Notification) -> Self {
        let (subject, mut body) = match &notification.outcome {
            Outcome::Success { links } => {
                let mut body = String::from("<p>Your following files will be securely stored:</p>");
                for link in links {
                    body.push_str(&format!("<p><a href='{}'>{}</a></p>", link.path, link.name));
                }
                (SUCCESS_SUBJECT, body)
            }
            Outcome::Failure { slides } => {
                let mut body = String::from("<p>The following files ran into an error:</p>");
                for slide in slides {
                    body.push_str(&format!("<p>{}</p>", slide));
                }
                body.push_str(&format!(
                    "<p>We apologize for this inconvenience. <a href='{}'>Please try again</a></p>",
                    RETRY_URL
                ));
                (FAILURE_SUBJECT, body)
            }
        };

        if let Some(log) = &notification.error_log {
            body.push_str(&format!("<p>{}</p>", log));
        }
        if notification.display_user {
            body.push_str(&format!("<p>Submitted by: {}</p>", notification.recipient));
        }

        Self {
            from: SENDER.to_string(),
            to: notification.recipient.clone(),
            subject: subject.to_string(),
            html_body: body,
        }
    }
}

/// Delivery channel for composed messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

/// Notifier that writes messages to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "{}",
            message.html_body
        );
        Ok(())
    }
}

/// Compose `notification` and deliver it, returning the sent message.
pub async fn send_notification<N>(
    notifier: &N,
    notification: &Notification,
) -> Result<EmailMessage, NotifyError>
where
    N: Notifier + ?Sized,
{
    let message = EmailMessage::compose(notification);
    notifier.deliver(&message).await?;
    Ok(message)
}
