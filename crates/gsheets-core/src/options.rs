//! Request options for the values API

/// Which dimension the outer array of a value grid follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum MajorDimension {
    /// Outer array is rows (default)
    #[default]
    Rows,
    /// Outer array is columns
    Columns,
}

impl MajorDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            MajorDimension::Rows => "ROWS",
            MajorDimension::Columns => "COLUMNS",
        }
    }
}

/// How values are rendered in a values API response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ValueRenderOption {
    /// Values as displayed, always strings
    FormattedValue,
    /// Typed values: numbers, booleans and strings (default here)
    #[default]
    UnformattedValue,
    /// Formula text for formula cells, unformatted values otherwise
    Formula,
}

impl ValueRenderOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueRenderOption::FormattedValue => "FORMATTED_VALUE",
            ValueRenderOption::UnformattedValue => "UNFORMATTED_VALUE",
            ValueRenderOption::Formula => "FORMULA",
        }
    }
}

/// How dates and times are rendered when values are unformatted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum DateTimeRenderOption {
    /// Days since 1899-12-30 as a number (default)
    #[default]
    SerialNumber,
    /// Formatted according to the cell's number format
    FormattedString,
}

impl DateTimeRenderOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateTimeRenderOption::SerialNumber => "SERIAL_NUMBER",
            DateTimeRenderOption::FormattedString => "FORMATTED_STRING",
        }
    }
}

/// How written values are interpreted by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ValueInputOption {
    /// Stored as-is; strings are never parsed into numbers, dates or formulas
    Raw,
    /// Parsed as if typed into the UI (default)
    #[default]
    UserEntered,
}

impl ValueInputOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueInputOption::Raw => "RAW",
            ValueInputOption::UserEntered => "USER_ENTERED",
        }
    }
}

/// How appended rows are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum InsertDataOption {
    /// Write into empty rows after the table (default)
    #[default]
    Overwrite,
    /// Insert new rows for the data
    InsertRows,
}

impl InsertDataOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsertDataOption::Overwrite => "OVERWRITE",
            InsertDataOption::InsertRows => "INSERT_ROWS",
        }
    }
}

/// Read options accepted by the values API
///
/// Unset fields fall back to the server defaults, except that rows read
/// through a worksheet default to [`ValueRenderOption::UnformattedValue`]
/// so numbers and booleans keep their types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct GetValuesRequestOptions {
    pub major_dimension: Option<MajorDimension>,
    pub value_render_option: Option<ValueRenderOption>,
    pub date_time_render_option: Option<DateTimeRenderOption>,
}

impl GetValuesRequestOptions {
    /// Options with everything unset
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_major_dimension(mut self, dimension: MajorDimension) -> Self {
        self.major_dimension = Some(dimension);
        self
    }

    pub fn with_value_render_option(mut self, option: ValueRenderOption) -> Self {
        self.value_render_option = Some(option);
        self
    }

    pub fn with_date_time_render_option(mut self, option: DateTimeRenderOption) -> Self {
        self.date_time_render_option = Some(option);
        self
    }

    /// Fill unset fields from `defaults`
    pub fn or(self, defaults: GetValuesRequestOptions) -> Self {
        Self {
            major_dimension: self.major_dimension.or(defaults.major_dimension),
            value_render_option: self.value_render_option.or(defaults.value_render_option),
            date_time_render_option: self
                .date_time_render_option
                .or(defaults.date_time_render_option),
        }
    }

    /// Query parameters for the set fields
    pub fn to_query(&self) -> Vec<(&'static str, &'static str)> {
        let mut query = Vec::new();
        if let Some(d) = self.major_dimension {
            query.push(("majorDimension", d.as_str()));
        }
        if let Some(v) = self.value_render_option {
            query.push(("valueRenderOption", v.as_str()));
        }
        if let Some(d) = self.date_time_render_option {
            query.push(("dateTimeRenderOption", d.as_str()));
        }
        query
    }
}
