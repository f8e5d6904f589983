use std::{fmt, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use sendgrid::v3::{Content, Email, Personalization, Sender};
use tracing::info;

/// The identity outgoing mail is sent as.
#[derive(Clone, Debug)]
pub struct Mailbox {
    pub address: String,
    pub name: String,
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.address)
        } else {
            write!(f, "{} <{}>", self.name, self.address)
        }
    }
}

#[derive(Clone, Debug)]
pub struct Message {
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// A mail transport. Failing to hand a message off is an error.
#[async_trait]
pub trait EmailClient: Send + Sync {
    async fn send(&self, message: &Message) -> Result<()>;
}

pub type DynEmailClient = Arc<dyn EmailClient>;

/// Logs messages instead of delivering them. Meant for local development,
/// where the code has to be read from the server output.
pub struct ConsoleMailer {
    from: Mailbox,
}

impl ConsoleMailer {
    pub fn new(from: Mailbox) -> Self {
        Self { from }
    }
}

#[async_trait]
impl EmailClient for ConsoleMailer {
    async fn send(&self, message: &Message) -> Result<()> {
        info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            body = %message.text,
            "Email not delivered, no transport configured."
        );

        Ok(())
    }
}

pub struct SendgridMailer {
    from: Mailbox,
    sender: Sender,
}

impl SendgridMailer {
    pub fn new(api_key: String, from: Mailbox) -> Self {
        Self {
            from,
            sender: Sender::new(api_key),
        }
    }

    fn build(&self, message: &Message) -> sendgrid::v3::Message {
        let from = Email::new(self.from.address.clone()).set_name(self.from.name.clone());
        let body = Content::new()
            .set_content_type("text/plain")
            .set_value(message.text.clone());

        sendgrid::v3::Message::new(from)
            .set_subject(&message.subject)
            .add_content(body)
            .add_personalization(Personalization::new(Email::new(message.to.clone())))
    }
}

#[async_trait]
impl EmailClient for SendgridMailer {
    async fn send(&self, message: &Message) -> Result<()> {
        let status = self
            .sender
            .send(&self.build(message))
            .await?
            .error_for_status()?
            .status();

        info!(%status, to = %message.to, "Handed email to SendGrid.");

        Ok(())
    }
}
