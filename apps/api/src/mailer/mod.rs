//! Outbound email. Delivers over SMTP when configured, otherwise logs the
//! message so local development needs no mail server.

use anyhow::Context;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::config::MailConfig;
use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub attachment: Option<MailAttachment>,
}

#[derive(Clone)]
pub struct Mailer {
    from: Mailbox,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl Mailer {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .with_context(|| format!("MAIL_FROM '{}' is not a valid mailbox", config.from))?;

        let transport = match &config.smtp {
            Some(smtp) => {
                let builder = if smtp.secure {
                    AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
                } else {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
                }
                .with_context(|| format!("Invalid SMTP host '{}'", smtp.host))?
                .port(smtp.port);

                let builder = match (&smtp.user, &smtp.pass) {
                    (Some(user), Some(pass)) => {
                        builder.credentials(Credentials::new(user.clone(), pass.clone()))
                    }
                    _ => builder,
                };
                info!("SMTP mailer configured ({}:{})", smtp.host, smtp.port);
                Some(builder.build())
            }
            None => {
                info!("SMTP_HOST not set; outgoing mail will be logged only");
                None
            }
        };

        Ok(Self { from, transport })
    }

    pub async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
        let message = self.build_message(&mail)?;

        match &self.transport {
            Some(transport) => {
                transport
                    .send(message)
                    .await
                    .map_err(|e| AppError::Mail(format!("SMTP delivery to {} failed: {e}", mail.to)))?;
                info!("Email '{}' sent to {}", mail.subject, mail.to);
            }
            None => {
                info!(
                    "Email (not sent, no SMTP) to={} subject='{}' attachment={:?}\n{}",
                    mail.to,
                    mail.subject,
                    mail.attachment.as_ref().map(|a| &a.filename),
                    mail.text
                );
            }
        }
        Ok(())
    }

    fn build_message(&self, mail: &OutgoingMail) -> Result<Message, AppError> {
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|_| AppError::Validation(format!("Invalid recipient address '{}'", mail.to)))?;

        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.clone());

        let message = match &mail.attachment {
            Some(attachment) => {
                let content_type = ContentType::parse(&attachment.content_type)
                    .map_err(|e| AppError::Mail(format!("Bad attachment content type: {e}")))?;
                builder.multipart(
                    MultiPart::mixed()
                        .singlepart(SinglePart::plain(mail.text.clone()))
                        .singlepart(
                            Attachment::new(attachment.filename.clone())
                                .body(attachment.bytes.clone(), content_type),
                        ),
                )
            }
            None => builder.singlepart(SinglePart::plain(mail.text.clone())),
        };

        message.map_err(|e| AppError::Mail(format!("Failed to build message: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_only() -> Mailer {
        Mailer::new(&MailConfig {
            from: "HR Team <hr@talentdesk.local>".into(),
            smtp: None,
        })
        .unwrap()
    }

    fn offer_mail() -> OutgoingMail {
        OutgoingMail {
            to: "jane@example.com".into(),
            subject: "Offer of Employment".into(),
            text: "Dear Jane".into(),
            attachment: Some(MailAttachment {
                filename: "OfferLetter.pdf".into(),
                content_type: "application/pdf".into(),
                bytes: b"%PDF-1.4".to_vec(),
            }),
        }
    }

    #[test]
    fn test_message_carries_attachment() {
        let message = log_only().build_message(&offer_mail()).unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("Subject: Offer of Employment"));
        assert!(raw.contains("OfferLetter.pdf"));
        assert!(raw.contains("application/pdf"));
    }

    #[test]
    fn test_invalid_recipient_is_validation_error() {
        let mut mail = offer_mail();
        mail.to = "not-an-address".into();
        let err = log_only().build_message(&mail).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_invalid_sender_fails_startup() {
        let result = Mailer::new(&MailConfig {
            from: "nobody".into(),
            smtp: None,
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_log_only_send_succeeds() {
        assert!(log_only().send(offer_mail()).await.is_ok());
    }
}
