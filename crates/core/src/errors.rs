use thiserror::Error;

use crate::correction::CorrectionError;
use crate::domain::quote::AmountOverflow;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid inquiry: {0}")]
    InvalidInquiry(String),
    #[error(transparent)]
    MalformedCorrection(#[from] CorrectionError),
    #[error("inquiry totals are out of range: {0}")]
    AmountOverflow(#[from] AmountOverflow),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        match self {
            Self::Domain(error) => InterfaceError::BadRequest {
                message: error.to_string(),
                correlation_id: correlation_id.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::correction::CorrectionError;
    use crate::domain::quote::AmountOverflow;
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn invalid_inquiry_maps_to_bad_request_with_correlation_id() {
        let interface =
            ApplicationError::from(DomainError::InvalidInquiry("no items".to_owned()))
                .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref message, ref correlation_id }
                if correlation_id == "req-1" && message.contains("no items")
        ));
        assert_eq!(interface.correlation_id(), "req-1");
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn malformed_correction_converts_into_domain_error() {
        let domain = DomainError::from(CorrectionError::MissingSeparator);
        assert_eq!(domain.to_string(), "correction is missing the `=` separator");
    }

    #[test]
    fn overflowing_inquiry_is_a_bad_request() {
        let interface =
            ApplicationError::from(DomainError::from(AmountOverflow)).into_interface("req-2");
        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref message, .. } if message.contains("out of range")
        ));
    }
}
