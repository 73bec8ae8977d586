//! The human-readable reminder sent to a subscriber.

use serde::{Deserialize, Serialize};

use crate::{record::Record, subscriber::Subscriber};

/// A rendered reminder, ready for any transport that speaks text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderMessage {
  /// Recipient email address.
  pub to:      String,
  pub subject: String,
  pub body:    String,
}

impl ReminderMessage {
  pub fn render(subscriber: &Subscriber, record: &Record, days_left: u32) -> Self {
    let subject = format!(
      "Reminder: {} internship deadline in {days_left} days",
      record.company()
    );

    let body = format!(
      "Dear {name},\n\n\
       This is a reminder that the application deadline for the {position} \
       position at {company} is approaching!\n\n\
       Position: {position}\n\
       Company: {company}\n\
       Deadline: {deadline} ({days_left} days left)\n\
       Description: {description}\n\n\
       Application URL: {url}\n\n\
       Good luck with your application!\n\n\
       HireME Internship Reminder",
      name = subscriber.name,
      position = record.position(),
      company = record.company(),
      deadline = record.deadline.format("%Y-%m-%d"),
      description = record.description,
      url = record.url,
    );

    Self { to: subscriber.email().to_owned(), subject, body }
  }
}
