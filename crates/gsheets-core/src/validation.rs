//! Data validation rules
//!
//! A [`DataValidationRule`] restricts what may be entered into a range. Rules
//! mirror the `DataValidationRule` object of the Sheets API: a condition type,
//! its operands, an optional input message and a strictness flag.
//!
//! ## Example
//!
//! ```rust
//! use gsheets_core::{ConditionType, DataValidationRule};
//!
//! let rule = DataValidationRule::one_of_list(["Yes", "No", "Maybe"])
//!     .with_input_message("Pick one")
//!     .with_strict(true);
//!
//! assert_eq!(rule.condition.condition_type, ConditionType::OneOfList);
//! assert!(rule.validate().is_ok());
//! ```

use crate::error::{Error, Result};

/// Data validation rule for a range
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DataValidationRule {
    /// Condition the data must match
    pub condition: BooleanCondition,
    /// Message shown when the cell is selected
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub input_message: Option<String>,
    /// Reject invalid data instead of only flagging it
    #[cfg_attr(feature = "serde", serde(default))]
    pub strict: bool,
    /// Show a dropdown / checkbox UI where the condition supports one
    #[cfg_attr(feature = "serde", serde(default))]
    pub show_custom_ui: bool,
}

/// A condition type with its operands
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BooleanCondition {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub condition_type: ConditionType,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Vec::is_empty")
    )]
    pub values: Vec<ConditionValue>,
}

/// One operand of a condition
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ConditionValue {
    /// Literal or formula operand, parsed as if typed into a cell
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub user_entered_value: Option<String>,
    /// Relative date operand (date conditions only)
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub relative_date: Option<RelativeDate>,
}

impl ConditionValue {
    /// A literal operand
    pub fn value(v: impl Into<String>) -> Self {
        Self {
            user_entered_value: Some(v.into()),
            relative_date: None,
        }
    }

    /// A relative date operand
    pub fn relative(date: RelativeDate) -> Self {
        Self {
            user_entered_value: None,
            relative_date: Some(date),
        }
    }
}

/// Condition types usable in data validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ConditionType {
    NumberGreater,
    NumberGreaterThanEq,
    NumberLess,
    NumberLessThanEq,
    NumberEq,
    NumberNotEq,
    NumberBetween,
    NumberNotBetween,
    TextContains,
    TextNotContains,
    TextStartsWith,
    TextEndsWith,
    TextEq,
    TextIsEmail,
    TextIsUrl,
    DateEq,
    DateBefore,
    DateAfter,
    DateOnOrBefore,
    DateOnOrAfter,
    DateBetween,
    DateNotBetween,
    DateIsValid,
    OneOfRange,
    OneOfList,
    Blank,
    NotBlank,
    CustomFormula,
    Boolean,
}

impl ConditionType {
    /// Allowed operand count as an inclusive `(min, max)` pair
    pub fn operand_count(&self) -> (usize, usize) {
        use ConditionType::*;
        match self {
            TextIsEmail | TextIsUrl | DateIsValid | Blank | NotBlank => (0, 0),
            Boolean => (0, 2),
            NumberBetween | NumberNotBetween | DateBetween | DateNotBetween => (2, 2),
            OneOfList => (1, usize::MAX),
            _ => (1, 1),
        }
    }

    /// Whether operands may be relative dates
    pub fn accepts_relative_dates(&self) -> bool {
        matches!(
            self,
            ConditionType::DateBefore
                | ConditionType::DateAfter
                | ConditionType::DateOnOrBefore
                | ConditionType::DateOnOrAfter
        )
    }
}

/// Relative dates understood by date conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum RelativeDate {
    PastYear,
    PastMonth,
    PastWeek,
    Yesterday,
    Today,
    Tomorrow,
}

impl DataValidationRule {
    /// Create a rule from a condition type and literal operands
    pub fn new<I, S>(condition_type: ConditionType, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            condition: BooleanCondition {
                condition_type,
                values: values.into_iter().map(ConditionValue::value).collect(),
            },
            input_message: None,
            strict: false,
            show_custom_ui: false,
        }
    }

    /// Dropdown restricted to a fixed list of values
    pub fn one_of_list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            show_custom_ui: true,
            ..Self::new(ConditionType::OneOfList, values)
        }
    }

    /// Dropdown restricted to the values of a range (e.g. `=Sheet2!A1:A10`)
    pub fn one_of_range(range_formula: impl Into<String>) -> Self {
        Self {
            show_custom_ui: true,
            ..Self::new(ConditionType::OneOfRange, [range_formula.into()])
        }
    }

    /// Number between two bounds (inclusive)
    pub fn number_between(low: f64, high: f64) -> Self {
        Self::new(
            ConditionType::NumberBetween,
            [low.to_string(), high.to_string()],
        )
    }

    /// Formula that must evaluate to TRUE
    pub fn custom_formula(formula: impl Into<String>) -> Self {
        Self::new(ConditionType::CustomFormula, [formula.into()])
    }

    /// Checkbox (TRUE/FALSE) cells
    pub fn checkbox() -> Self {
        Self {
            show_custom_ui: true,
            ..Self::new(ConditionType::Boolean, Vec::<String>::new())
        }
    }

    /// Date condition against a relative date
    pub fn date_relative(condition_type: ConditionType, date: RelativeDate) -> Self {
        Self {
            condition: BooleanCondition {
                condition_type,
                values: vec![ConditionValue::relative(date)],
            },
            input_message: None,
            strict: false,
            show_custom_ui: false,
        }
    }

    /// Set the input message shown when the cell is selected
    pub fn with_input_message(mut self, message: impl Into<String>) -> Self {
        self.input_message = Some(message.into());
        self
    }

    /// Reject (true) or only flag (false) invalid input
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Show the dropdown / checkbox UI
    pub fn with_custom_ui(mut self, show: bool) -> Self {
        self.show_custom_ui = show;
        self
    }

    /// Check operand shape against the condition type
    pub fn validate(&self) -> Result<()> {
        let condition_type = self.condition.condition_type;
        let values = &self.condition.values;
        let (min, max) = condition_type.operand_count();

        if values.len() < min || values.len() > max {
            return Err(Error::InvalidRule(format!(
                "{:?} takes {} operand(s), got {}",
                condition_type,
                if min == max {
                    min.to_string()
                } else if max == usize::MAX {
                    format!("at least {}", min)
                } else {
                    format!("{}..={}", min, max)
                },
                values.len()
            )));
        }

        for value in values {
            match (&value.user_entered_value, &value.relative_date) {
                (Some(_), Some(_)) | (None, None) => {
                    return Err(Error::InvalidRule(
                        "each operand needs exactly one of a value or a relative date".into(),
                    ));
                }
                (None, Some(_)) if !condition_type.accepts_relative_dates() => {
                    return Err(Error::InvalidRule(format!(
                        "{:?} does not accept relative dates",
                        condition_type
                    )));
                }
                (Some(v), None)
                    if matches!(
                        condition_type,
                        ConditionType::CustomFormula | ConditionType::OneOfRange
                    ) && !v.starts_with('=') =>
                {
                    return Err(Error::InvalidRule(format!(
                        "{:?} operand must be a formula starting with '=', got '{}'",
                        condition_type, v
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }
}
