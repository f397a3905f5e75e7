//! Token exchange error types.

/// Errors that can occur while obtaining a bearer token.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// No token endpoint is configured, so token refresh is disabled.
    #[error("OAuth endpoint is not configured")]
    NotConfigured,

    /// The token endpoint could not be reached.
    #[error("OAuth request failed: {0}")]
    Transport(String),

    /// The token endpoint answered with a non-success status code.
    #[error("OAuth failed with status code {status}")]
    Status {
        /// HTTP status returned by the token endpoint.
        status: u16,
        /// Raw response body, kept for diagnostics.
        body: String,
    },

    /// The token endpoint answered 2xx but the body was not a token response.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    /// Returns the upstream status code, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_exposed_only_for_status_errors() {
        let err = AuthError::Status {
            status: 401,
            body: "denied".into(),
        };
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "OAuth failed with status code 401");

        assert_eq!(AuthError::NotConfigured.status(), None);
        assert_eq!(AuthError::Transport("refused".into()).status(), None);
    }
}
