//! Welcome mail sent after a registration is created.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{MAIL_FROM, dates};
use crate::error::HandlerError;
use crate::job::Job;
use crate::mail::{MailMessage, Mailer};
use crate::registry::JobHandler;

/// Payload written by the registration request handler after it has
/// committed the registration itself.
///
/// Field names are the wire contract with the producing layer; do not
/// rename them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationMail {
    #[serde(rename = "studentName")]
    pub student_name: String,

    #[serde(rename = "studentEmail")]
    pub student_email: String,

    #[serde(rename = "planTitle")]
    pub plan_title: String,

    /// ISO-8601 end of the registration period.
    pub end_date: String,

    /// Monthly plan price.
    #[serde(rename = "planPrice")]
    pub plan_price: f64,

    /// Price over the whole period, computed by the producer.
    #[serde(rename = "TotalPrice")]
    pub total_price: f64,
}

impl Job for RegistrationMail {
    const KEY: &'static str = "RegistrationMail";
}

/// Formats the welcome mail and hands it to the sender.
///
/// Safe to run more than once for the same payload: the worst case of a
/// redelivery is a duplicate welcome mail, which the academy accepts.
pub struct RegistrationMailHandler {
    mailer: Arc<dyn Mailer>,
}

impl RegistrationMailHandler {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }
}

#[async_trait]
impl JobHandler<RegistrationMail> for RegistrationMailHandler {
    async fn handle(&self, job: RegistrationMail) -> Result<(), HandlerError> {
        let end_date = dates::parse_iso_date(&job.end_date)?;

        let message = MailMessage {
            from: MAIL_FROM.to_string(),
            to: format!("{} <{}>", job.student_name, job.student_email),
            subject: "Matrícula efetuada - Seja bem-vindo".to_string(),
            template: "registration".to_string(),
            context: json!({
                "user": job.student_name,
                "planTitle": job.plan_title,
                "endDate": dates::long_pt_br(end_date),
                "priceMonth": job.plan_price,
                "priceTotal": job.total_price,
            }),
        };

        self.mailer
            .send(message)
            .await
            .map_err(|err| HandlerError::failed(err.to_string()))
    }
}
