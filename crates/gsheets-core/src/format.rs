//! Cell formatting
//!
//! Mirrors the parts of the Sheets `CellFormat` object this client can edit.
//! Every field is optional; unset fields are left alone by a save.

use std::fmt;

/// RGBA color with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    /// Omitted means fully opaque
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub alpha: Option<f32>,
}

impl Color {
    /// Create an opaque color from 8-bit components
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            red: r as f32 / 255.0,
            green: g as f32 / 255.0,
            blue: b as f32 / 255.0,
            alpha: None,
        }
    }

    /// Create from a hex string (e.g., "#FF0000" or "FF0000")
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self::rgb(r, g, b))
    }

    /// Convert to 8-bit RGB components
    pub fn to_rgb(&self) -> (u8, u8, u8) {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        (c(self.red), c(self.green), c(self.blue))
    }

    /// Convert to hex string (without # prefix)
    pub fn to_hex(&self) -> String {
        let (r, g, b) = self.to_rgb();
        format!("{:02X}{:02X}{:02X}", r, g, b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

/// Number format category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum NumberFormatType {
    Text,
    Number,
    Percent,
    Currency,
    Date,
    Time,
    DateTime,
    Scientific,
}

/// Number format: a category plus an optional pattern (e.g. `0.00%`)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NumberFormat {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub format_type: NumberFormatType,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum WrapStrategy {
    OverflowCell,
    LegacyWrap,
    Clip,
    Wrap,
}

/// Text run formatting
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct TextFormat {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub foreground_color: Option<Color>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub font_family: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub font_size: Option<u32>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub bold: Option<bool>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub italic: Option<bool>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub strikethrough: Option<bool>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub underline: Option<bool>,
}

/// Editable subset of a cell's format
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct CellFormat {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub number_format: Option<NumberFormat>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub background_color: Option<Color>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub horizontal_alignment: Option<HorizontalAlign>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub vertical_alignment: Option<VerticalAlign>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub wrap_strategy: Option<WrapStrategy>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub text_format: Option<TextFormat>,
}

impl CellFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_number_format(
        mut self,
        format_type: NumberFormatType,
        pattern: Option<&str>,
    ) -> Self {
        self.number_format = Some(NumberFormat {
            format_type,
            pattern: pattern.map(str::to_string),
        });
        self
    }

    pub fn with_background_color(mut self, color: Color) -> Self {
        self.background_color = Some(color);
        self
    }

    pub fn with_horizontal_alignment(mut self, align: HorizontalAlign) -> Self {
        self.horizontal_alignment = Some(align);
        self
    }

    pub fn with_vertical_alignment(mut self, align: VerticalAlign) -> Self {
        self.vertical_alignment = Some(align);
        self
    }

    pub fn with_wrap_strategy(mut self, wrap: WrapStrategy) -> Self {
        self.wrap_strategy = Some(wrap);
        self
    }

    pub fn with_text_format(mut self, text: TextFormat) -> Self {
        self.text_format = Some(text);
        self
    }

    /// Overlay the fields set in `other` onto `self`
    pub fn merge(&mut self, other: &CellFormat) {
        if other.number_format.is_some() {
            self.number_format = other.number_format.clone();
        }
        if other.background_color.is_some() {
            self.background_color = other.background_color;
        }
        if other.horizontal_alignment.is_some() {
            self.horizontal_alignment = other.horizontal_alignment;
        }
        if other.vertical_alignment.is_some() {
            self.vertical_alignment = other.vertical_alignment;
        }
        if other.wrap_strategy.is_some() {
            self.wrap_strategy = other.wrap_strategy;
        }
        if other.text_format.is_some() {
            self.text_format = other.text_format.clone();
        }
    }

    /// API field names of the set fields, for an update field mask
    pub fn set_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.number_format.is_some() {
            fields.push("numberFormat");
        }
        if self.background_color.is_some() {
            fields.push("backgroundColor");
        }
        if self.horizontal_alignment.is_some() {
            fields.push("horizontalAlignment");
        }
        if self.vertical_alignment.is_some() {
            fields.push("verticalAlignment");
        }
        if self.wrap_strategy.is_some() {
            fields.push("wrapStrategy");
        }
        if self.text_format.is_some() {
            fields.push("textFormat");
        }
        fields
    }

    /// Check if no field is set
    pub fn is_empty(&self) -> bool {
        self.set_fields().is_empty()
    }
}
