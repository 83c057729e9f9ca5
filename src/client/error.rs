use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    /// Business-rule rejection: a non-2xx status or `success: false`.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    /// The request could not be built, so nothing was sent.
    #[error("{0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Text shown verbatim in a notification.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Rejected { message, .. } if !message.trim().is_empty() => message.clone(),
            ClientError::Rejected { .. } => "Request failed".to_string(),
            ClientError::Network(_) => "Network error. Please check your connection and try again.".to_string(),
            ClientError::Timeout => "The server took too long to respond. Please try again.".to_string(),
            ClientError::Decode(_) => "Received an unexpected response from the server.".to_string(),
            ClientError::InvalidRequest(message) => message.clone(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_message_is_shown_verbatim() {
        let err = ClientError::Rejected {
            status: 409,
            message: "Plan name already exists".to_string(),
        };
        assert_eq!(err.user_message(), "Plan name already exists");
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn blank_rejection_falls_back_to_generic_text() {
        let err = ClientError::Rejected { status: 500, message: "  ".to_string() };
        assert_eq!(err.user_message(), "Request failed");
        assert_eq!(ClientError::Timeout.status(), None);
    }
}
