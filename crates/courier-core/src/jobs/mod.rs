//! Concrete job definitions for the academy back office.

mod dates;
mod question_answered;
mod registration;

pub use question_answered::{
    HelpOrder, HelpOrderStudent, QuestionAnsweredMail, QuestionAnsweredMailHandler,
};
pub use registration::{RegistrationMail, RegistrationMailHandler};

use std::sync::Arc;

use crate::error::CourierError;
use crate::mail::Mailer;
use crate::registry::JobRegistry;

/// Sender address used by all academy mail.
pub const MAIL_FROM: &str = "Equipe Academia <noreply@academia.com.br>";

/// Build a registry with every mail job wired to `mailer`.
///
/// Worker bootstrap calls this once before spawning dispatchers; a
/// duplicate key here is a programming error and aborts start-up.
pub fn mail_registry(mailer: Arc<dyn Mailer>) -> Result<JobRegistry, CourierError> {
    let mut registry = JobRegistry::new();
    registry.register::<RegistrationMail, _>(RegistrationMailHandler::new(Arc::clone(&mailer)))?;
    registry.register::<QuestionAnsweredMail, _>(QuestionAnsweredMailHandler::new(mailer))?;
    Ok(registry)
}
