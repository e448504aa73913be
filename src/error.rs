use thiserror::Error;

/// Errors discovered while compiling a doc.
///
/// Doc errors carry a byte offset into the doc source. Only a few of them are
/// fatal (see [`DocError::is_fatal`]); the rest are reported and compilation
/// proceeds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocError {
    #[error("Too many dashes at offset {offset}.")]
    ExcessiveDashes { offset: usize },

    #[error("Too many equal signs at offset {offset}.")]
    ExcessiveEqualSigns { offset: usize },

    #[error("Only short options may join their value without a separator (offset {offset}).")]
    BadOptionSeparator { offset: usize },

    #[error("Missing or invalid option name at offset {offset}.")]
    InvalidOptionName { offset: usize },

    #[error("Invalid variable name at offset {offset}.")]
    InvalidVariableName { offset: usize },

    #[error("Missing ']' to close the default value at offset {offset}.")]
    MissingCloseBracketInDefault { offset: usize },

    #[error("Option specified more than once in the Options section (offset {offset}).")]
    OptionDuplicatedInOptionsSection { offset: usize },

    #[error("Variable already has a condition (offset {offset}).")]
    OneVariableMultipleConditions { offset: usize },

    #[error("Missing Usage: section.")]
    MissingUsageSection,

    #[error("More than one Usage: section.")]
    ExcessiveUsageSections,

    #[error("Malformed usage line at offset {offset}.")]
    MalformedUsage { offset: usize },
}

impl DocError {
    /// Fatal errors abort compilation without replacing prior state.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DocError::MissingUsageSection
                | DocError::ExcessiveUsageSections
                | DocError::MalformedUsage { .. }
        )
    }
}

/// Errors discovered while tokenizing an argument vector.
///
/// Argv errors never abort parsing; the tokenizer steps past the offending
/// token and the matcher carries on. `index` is the argv position, `position`
/// (where present) the character offset within that argument.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgvError {
    #[error("Unknown option (argument {index}, position {position}).")]
    UnknownOption { index: usize, position: usize },

    #[error("Option expects an argument (argument {index}).")]
    OptionHasMissingArgument { index: usize },

    #[error("Option does not expect an argument (argument {index}, position {position}).")]
    OptionUnexpectedArgument { index: usize, position: usize },

    #[error("Ambiguous prefix match (argument {index}).")]
    AmbiguousPrefixMatch { index: usize },

    #[error("Option expects a different separator (argument {index}).")]
    WrongSeparator { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality() {
        assert!(DocError::MissingUsageSection.is_fatal());
        assert!(DocError::ExcessiveUsageSections.is_fatal());
        assert!(DocError::MalformedUsage { offset: 0 }.is_fatal());
        assert!(!DocError::ExcessiveDashes { offset: 0 }.is_fatal());
        assert!(!DocError::InvalidVariableName { offset: 3 }.is_fatal());
    }

    #[test]
    fn messages_locate_the_problem() {
        let error = DocError::MissingCloseBracketInDefault { offset: 17 };
        assert_eq!(
            error.to_string(),
            "Missing ']' to close the default value at offset 17."
        );

        let error = ArgvError::UnknownOption {
            index: 2,
            position: 1,
        };
        assert_eq!(error.to_string(), "Unknown option (argument 2, position 1).");
    }
}
