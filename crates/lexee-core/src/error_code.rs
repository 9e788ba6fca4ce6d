//! Spreadsheet error literals
//!
//! Callers sometimes pass values copied out of a spreadsheet, so text such as
//! `#N/A` or `#DIV/0!` is recognised as an error marker by the information
//! formulas (`esterreur`, `estna`, `type_val`) and skipped by `agregat`.

use std::fmt;

/// Spreadsheet error values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// #NULL! - Incorrect range operator
    Null,
    /// #DIV/0! - Division by zero
    Div0,
    /// #VALUE! - Wrong type of argument or operand
    Value,
    /// #REF! - Invalid reference
    Ref,
    /// #NAME? - Unrecognized name
    Name,
    /// #NUM! - Invalid numeric value
    Num,
    /// #N/A - Value not available
    Na,
    /// #SPILL! - Array result cannot spill
    Spill,
    /// #CALC! - Calculation error
    Calc,
    /// #GETTING_DATA - External data is loading
    GettingData,
}

impl ErrorCode {
    /// Get the literal as it appears in a sheet
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Null => "#NULL!",
            ErrorCode::Div0 => "#DIV/0!",
            ErrorCode::Value => "#VALUE!",
            ErrorCode::Ref => "#REF!",
            ErrorCode::Name => "#NAME?",
            ErrorCode::Num => "#NUM!",
            ErrorCode::Na => "#N/A",
            ErrorCode::Spill => "#SPILL!",
            ErrorCode::Calc => "#CALC!",
            ErrorCode::GettingData => "#GETTING_DATA",
        }
    }

    /// Parse an error literal (case-insensitive, surrounding whitespace ignored)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "#NULL!" => Some(ErrorCode::Null),
            "#DIV/0!" => Some(ErrorCode::Div0),
            "#VALUE!" => Some(ErrorCode::Value),
            "#REF!" => Some(ErrorCode::Ref),
            "#NAME?" => Some(ErrorCode::Name),
            "#NUM!" => Some(ErrorCode::Num),
            "#N/A" => Some(ErrorCode::Na),
            "#SPILL!" => Some(ErrorCode::Spill),
            "#CALC!" => Some(ErrorCode::Calc),
            "#GETTING_DATA" => Some(ErrorCode::GettingData),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
