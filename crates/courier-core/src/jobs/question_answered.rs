//! Notification mail sent when a help order receives an answer.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{MAIL_FROM, dates};
use crate::error::HandlerError;
use crate::job::Job;
use crate::mail::{MailMessage, Mailer};
use crate::registry::JobHandler;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpOrderStudent {
    pub name: String,
    pub email: String,
}

/// The answered help order, as the answering request handler loaded it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpOrder {
    pub id: i64,
    pub question: String,
    pub answer: String,

    /// ISO-8601 moment the answer was recorded.
    pub answer_at: String,

    pub student: HelpOrderStudent,
}

/// Payload enqueued by the help-order answer endpoint.
///
/// Field names are the wire contract with the producing layer; do not
/// rename them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnsweredMail {
    #[serde(rename = "helpOrder")]
    pub help_order: HelpOrder,
}

impl Job for QuestionAnsweredMail {
    const KEY: &'static str = "QuestionAnsweredMail";
}

/// Formats the answer notification and hands it to the sender.
pub struct QuestionAnsweredMailHandler {
    mailer: Arc<dyn Mailer>,
}

impl QuestionAnsweredMailHandler {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }
}

#[async_trait]
impl JobHandler<QuestionAnsweredMail> for QuestionAnsweredMailHandler {
    async fn handle(&self, job: QuestionAnsweredMail) -> Result<(), HandlerError> {
        let order = job.help_order;
        let answered_on = dates::parse_iso_date(&order.answer_at)?;

        let message = MailMessage {
            from: MAIL_FROM.to_string(),
            to: format!("{} <{}>", order.student.name, order.student.email),
            subject: "Sua pergunta foi respondida".to_string(),
            template: "question_answered".to_string(),
            context: json!({
                "student": order.student.name,
                "question": order.question,
                "answer": order.answer,
                "answerDate": dates::long_pt_br(answered_on),
            }),
        };

        self.mailer
            .send(message)
            .await
            .map_err(|err| HandlerError::failed(err.to_string()))
    }
}
