//! User-facing notifications built from call outcomes.

use std::fmt;

use serde::Serialize;

use crate::error::ApiError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    #[default]
    Default,
    Destructive,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
    pub description: Option<String>,
    pub variant: ToastVariant,
}

impl Toast {
    #[must_use]
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            variant: ToastVariant::Default,
        }
    }

    /// Destructive toast for a failed call. The description is the server's
    /// message when there is one, otherwise the error text.
    #[must_use]
    pub fn from_error(title: impl Into<String>, err: &ApiError) -> Self {
        let description = match err {
            ApiError::Status { message, .. } | ApiError::Unauthorized(message) if !message.is_empty() => {
                message.clone()
            }
            other => other.to_string(),
        };
        Self {
            title: title.into(),
            description: Some(description),
            variant: ToastVariant::Destructive,
        }
    }

    #[must_use]
    pub fn is_destructive(&self) -> bool {
        self.variant == ToastVariant::Destructive
    }
}

impl fmt::Display for Toast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {description}", self.title),
            None => f.write_str(&self.title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_plain() {
        let toast = Toast::success("Ticket created");
        assert!(!toast.is_destructive());
        assert_eq!(toast.to_string(), "Ticket created");
    }

    #[test]
    fn status_error_uses_server_message() {
        let err = ApiError::Status {
            status: 409,
            message: "name already taken".to_owned(),
        };
        let toast = Toast::from_error("Failed to create group", &err);
        assert!(toast.is_destructive());
        assert_eq!(toast.description.as_deref(), Some("name already taken"));
        assert_eq!(toast.to_string(), "Failed to create group: name already taken");
    }

    #[test]
    fn empty_status_message_falls_back_to_error_text() {
        let err = ApiError::Status {
            status: 500,
            message: String::new(),
        };
        let toast = Toast::from_error("Failed", &err);
        assert_eq!(
            toast.description.as_deref(),
            Some("request failed with status 500: ")
        );
    }

    #[test]
    fn demo_mode_error_reads_as_demo_message() {
        let toast = Toast::from_error("Failed to upload file", &ApiError::DemoMode);
        assert_eq!(toast.description.as_deref(), Some(crate::error::DEMO_MODE_MESSAGE));
    }

    #[test]
    fn variant_serializes_lowercase() {
        let json = serde_json::to_value(Toast::success("ok")).unwrap();
        assert_eq!(json["variant"], "default");
    }
}
