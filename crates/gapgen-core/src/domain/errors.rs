use std::error::Error;
use std::fmt::{Display, Formatter};

pub type GapResult<T> = Result<T, GapError>;
pub type SourceResult<T> = GapResult<T>;
pub type ValidationResult<T> = GapResult<T>;

/// Error categories with stable process exit codes.
///
/// Exit code 1 is reserved for "validation ran but the statistical checks
/// failed" and is never produced through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GapErrorCategory {
    Success,
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl GapErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
            Self::InternalError => "InternalError",
        }
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapError {
    category: GapErrorCategory,
    code: &'static str,
    message: String,
}

impl GapError {
    pub fn new(
        category: GapErrorCategory,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code,
            message: message.into(),
        }
    }

    pub fn input_validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(GapErrorCategory::InputValidationError, code, message)
    }

    pub fn io_system(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(GapErrorCategory::IoSystemError, code, message)
    }

    pub fn computation(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(GapErrorCategory::ComputationError, code, message)
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(GapErrorCategory::InternalError, code, message)
    }

    pub const fn category(&self) -> GapErrorCategory {
        self.category
    }

    pub const fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.code, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for GapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.label(),
            self.code,
            self.message
        )
    }
}

impl Error for GapError {}

#[cfg(test)]
mod tests {
    use super::{GapError, GapErrorCategory};

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (GapErrorCategory::Success, 0, "Success"),
            (GapErrorCategory::InputValidationError, 2, "InputValidationError"),
            (GapErrorCategory::IoSystemError, 3, "IoSystemError"),
            (GapErrorCategory::ComputationError, 4, "ComputationError"),
            (GapErrorCategory::InternalError, 5, "InternalError"),
        ];

        for (category, exit_code, label) in cases {
            assert_eq!(category.exit_code(), exit_code);
            assert_eq!(category.label(), label);
        }
    }

    #[test]
    fn fatal_error_renders_diagnostic_lines() {
        let error = GapError::input_validation(
            "INPUT.COCKTAIL_RATIO",
            "inverse trigger ratio must be >= 1, got 0",
        );

        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [INPUT.COCKTAIL_RATIO] inverse trigger ratio must be >= 1, got 0"
        );
        assert_eq!(error.fatal_exit_line().as_deref(), Some("FATAL EXIT CODE: 2"));
    }
}
