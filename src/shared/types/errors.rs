use thiserror::Error;

/// Failures of the bill calculation itself.
///
/// Neither kind is retryable: a `Configuration` error points at a defect in
/// the rate table, an `InvalidInput` error at the caller's data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    #[error("Rate table configuration: {0}")]
    Configuration(String),

    #[error("Invalid billing input: {0}")]
    InvalidInput(String),
}

impl BillingError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

/// Failures of domain operations above the calculator
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation: {0}")]
    Validation(String),

    #[error(transparent)]
    Billing(#[from] BillingError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl From<validator::ValidationErrors> for ConfigError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Invalid(errors.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        Self::Domain(DomainError::Billing(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billing_error_messages() {
        let err = BillingError::configuration("no tiers for commercial");
        assert_eq!(
            err.to_string(),
            "Rate table configuration: no tiers for commercial"
        );
        assert_eq!(err.kind(), "configuration");

        let err = BillingError::invalid_input("consumption must be >= 0");
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn billing_error_is_transparent_in_domain_error() {
        let err: DomainError = BillingError::invalid_input("tax rate 1.5").into();
        assert_eq!(err.to_string(), "Invalid billing input: tax rate 1.5");
    }

    #[test]
    fn validation_message() {
        let err = DomainError::Validation("reading R1 is already approved".into());
        assert_eq!(err.to_string(), "Validation: reading R1 is already approved");
    }

    #[test]
    fn app_error_from_billing_error() {
        let err: AppError = BillingError::configuration("gap").into();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::Billing(BillingError::Configuration(_)))
        ));
    }
}
