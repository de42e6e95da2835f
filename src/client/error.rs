use thiserror::Error;

/// Failure of a single prediction-backend call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced an HTTP response (DNS, refused, timeout).
    #[error("could not reach the prediction backend: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status.
    #[error("prediction backend returned {status}: {detail}")]
    Server { status: u16, detail: String },

    /// A 2xx response whose body did not have the expected shape.
    #[error("unexpected response from prediction backend: {0}")]
    Decode(String),
}

impl ClientError {
    /// Text suitable for showing inline next to the form.
    pub fn display_message(&self) -> String {
        match self {
            Self::Server { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

impl From<ureq::Error> for ClientError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let status_text = response.status_text().to_string();
                let body = response.into_string().unwrap_or_default();
                Self::Server {
                    status,
                    detail: error_detail(&body).unwrap_or(status_text),
                }
            }
            ureq::Error::Transport(transport) => Self::Network(transport.to_string()),
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"detail": ...}` and `{"message": ...}`; falls back to the
/// raw body when it is short plain text.
pub(crate) fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) => return Some(s.clone()),
                Some(serde_json::Value::Null) | None => {}
                Some(other) => return Some(other.to_string()),
            }
        }
        return None;
    }

    (body.len() <= 200).then(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_string_is_extracted() {
        assert_eq!(
            error_detail(r#"{"detail": "model not loaded"}"#).as_deref(),
            Some("model not loaded")
        );
    }

    #[test]
    fn message_is_used_when_detail_absent() {
        assert_eq!(
            error_detail(r#"{"message": "bad timestamp"}"#).as_deref(),
            Some("bad timestamp")
        );
    }

    #[test]
    fn structured_detail_is_rendered_as_json() {
        let detail = error_detail(r#"{"detail": [{"loc": ["body", "RH"]}]}"#).unwrap();
        assert!(detail.contains("RH"));
    }

    #[test]
    fn plain_text_body_is_kept_when_short() {
        assert_eq!(
            error_detail("Internal Server Error").as_deref(),
            Some("Internal Server Error")
        );
        assert_eq!(error_detail(&"x".repeat(500)), None);
        assert_eq!(error_detail("   "), None);
    }

    #[test]
    fn display_message_prefers_server_detail() {
        let err = ClientError::Server {
            status: 500,
            detail: "boom".to_string(),
        };
        assert_eq!(err.display_message(), "boom");
        assert!(
            ClientError::Network("refused".to_string())
                .display_message()
                .contains("could not reach")
        );
    }
}
