//! Request DTOs with garde validation for the HTTP handlers.
//!
//! These structs validate client data before it reaches the database.

use garde::Validate;
use serde::Deserialize;

use crate::error::ApiError;

/// Validation constants
const MAX_ID_LENGTH: usize = 128;
const MAX_NAME_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 254;
const MAX_DESCRIPTION_LENGTH: usize = 1000;
const MAX_BODY_LENGTH: usize = 2000;
const MAX_MESSAGE_LENGTH: usize = 10000;
const MAX_TIME_LENGTH: usize = 32;

/// Custom validation for an email address
fn validate_email(value: &str, _ctx: &()) -> garde::Result {
    let Some((local, domain)) = value.split_once('@') else {
        return Err(garde::Error::new("Invalid email address"));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(garde::Error::new("Invalid email address"));
    }
    Ok(())
}

/// Custom validation for habit frequency
fn validate_frequency(value: &str, _ctx: &()) -> garde::Result {
    match value {
        "daily" | "weekly" | "monthly" => Ok(()),
        _ => Err(garde::Error::new("Invalid frequency")),
    }
}

/// Custom validation for partnership status
fn validate_partner_status(value: &str, _ctx: &()) -> garde::Result {
    match value {
        "pending" | "accepted" => Ok(()),
        _ => Err(garde::Error::new("Invalid partnership status")),
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[garde(context(()))]
pub struct CreateUserInput {
    #[garde(length(min = 1, max = MAX_NAME_LENGTH))]
    pub name: String,
    #[garde(length(max = MAX_EMAIL_LENGTH), custom(validate_email))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[garde(context(()))]
pub struct UpdateUserInput {
    #[garde(length(min = 1, max = MAX_NAME_LENGTH))]
    pub name: String,
    #[garde(length(max = MAX_EMAIL_LENGTH), custom(validate_email))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[garde(context(()))]
pub struct CreateHabitInput {
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub user_id: String,
    #[garde(length(min = 1, max = MAX_NAME_LENGTH))]
    pub name: String,
    #[garde(inner(length(max = MAX_DESCRIPTION_LENGTH)))]
    pub description: Option<String>,
    #[garde(custom(validate_frequency))]
    pub frequency: String,
    #[garde(inner(length(min = 1, max = MAX_TIME_LENGTH)))]
    pub reminder_time: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[garde(context(()))]
pub struct UpdateHabitInput {
    #[garde(length(min = 1, max = MAX_NAME_LENGTH))]
    pub name: String,
    #[garde(inner(length(max = MAX_DESCRIPTION_LENGTH)))]
    pub description: Option<String>,
    #[garde(custom(validate_frequency))]
    pub frequency: String,
    #[garde(inner(length(min = 1, max = MAX_TIME_LENGTH)))]
    pub reminder_time: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[garde(context(()))]
pub struct CreatePartnerInput {
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub user_id: String,
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub partner_id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[garde(context(()))]
pub struct UpdatePartnerInput {
    #[garde(custom(validate_partner_status))]
    pub status: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[garde(context(()))]
pub struct CreateChallengeInput {
    #[garde(length(min = 1, max = MAX_NAME_LENGTH))]
    pub title: String,
    #[garde(inner(length(max = MAX_DESCRIPTION_LENGTH)))]
    pub description: Option<String>,
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub created_by: String,
    #[garde(range(min = 0))]
    pub starts_at: i64,
    #[garde(range(min = 0))]
    pub ends_at: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[garde(context(()))]
pub struct UpdateChallengeInput {
    #[garde(length(min = 1, max = MAX_NAME_LENGTH))]
    pub title: String,
    #[garde(inner(length(max = MAX_DESCRIPTION_LENGTH)))]
    pub description: Option<String>,
    #[garde(range(min = 0))]
    pub starts_at: i64,
    #[garde(range(min = 0))]
    pub ends_at: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[garde(context(()))]
pub struct CreateCoachNoteInput {
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub user_id: String,
    #[garde(inner(length(min = 1, max = MAX_ID_LENGTH)))]
    pub habit_id: Option<String>,
    #[garde(length(min = 1, max = MAX_BODY_LENGTH))]
    pub body: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[garde(context(()))]
pub struct UpdateCoachNoteInput {
    #[garde(length(min = 1, max = MAX_BODY_LENGTH))]
    pub body: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[garde(context(()))]
pub struct CreateChatInput {
    #[garde(length(min = 2), inner(length(min = 1, max = MAX_ID_LENGTH)))]
    pub participants: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[garde(context(()))]
pub struct SendMessageInput {
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub sender_id: String,
    #[garde(length(min = 1, max = MAX_MESSAGE_LENGTH))]
    pub content: String,
}

/// Helper trait to convert garde validation errors into an HTTP 400
pub trait ValidateExt {
    fn validate_input(&self) -> Result<(), ApiError>;
}

impl<T: Validate<Context = ()>> ValidateExt for T {
    fn validate_input(&self) -> Result<(), ApiError> {
        self.validate()
            .map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_rejects_bad_email() {
        let input = CreateUserInput {
            name: "Dana".into(),
            email: "not-an-email".into(),
        };
        assert!(input.validate_input().is_err());
    }

    #[test]
    fn test_create_user_accepts_valid_input() {
        let input = CreateUserInput {
            name: "Dana".into(),
            email: "dana@example.com".into(),
        };
        assert!(input.validate_input().is_ok());
    }

    #[test]
    fn test_create_habit_rejects_unknown_frequency() {
        let input = CreateHabitInput {
            user_id: "u1".into(),
            name: "Stretch".into(),
            description: None,
            frequency: "hourly".into(),
            reminder_time: None,
        };
        assert!(input.validate_input().is_err());
    }

    #[test]
    fn test_create_chat_requires_two_participants() {
        let input = CreateChatInput {
            participants: vec!["u1".into()],
        };
        assert!(input.validate_input().is_err());
    }

    #[test]
    fn test_send_message_rejects_empty_content() {
        let input = SendMessageInput {
            sender_id: "u1".into(),
            content: String::new(),
        };
        assert!(input.validate_input().is_err());
    }

    #[test]
    fn test_update_partner_rejects_unknown_status() {
        let input = UpdatePartnerInput {
            status: "blocked".into(),
        };
        assert!(input.validate_input().is_err());
    }
}
