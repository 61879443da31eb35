//! Style model: fonts, fills, borders, number formats, and the composite
//! cell style that references them by index.

/// RGB or theme-indexed color.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Color {
    #[default]
    Automatic,
    Rgb(String),
    Theme {
        theme: u32,
        tint: Option<i64>,
    },
    Indexed(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Underline {
    None,
    Single,
    Double,
    SingleAccounting,
    DoubleAccounting,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Font {
    pub name: String,
    pub size: i64, // points * 100, to stay hashable/exact
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    pub underline: Underline,
    pub color: Color,
}

impl Default for Font {
    fn default() -> Self {
        Font {
            name: "Calibri".to_string(),
            size: 1100,
            bold: false,
            italic: false,
            strike: false,
            underline: Underline::None,
            color: Color::Theme { theme: 1, tint: None },
        }
    }
}

impl Font {
    pub fn size_points(&self) -> f64 {
        self.size as f64 / 100.0
    }

    pub fn with_size_points(mut self, pt: f64) -> Self {
        self.size = (pt * 100.0).round() as i64;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternType {
    None,
    Solid,
    Other(String),
}

/// A cell fill. `None` (index 0) and the mandatory `gray125` hatch
/// (index 1, ECMA-376 §18.8.21) are always present at those fixed slots
/// before any user-defined fill.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fill {
    pub pattern: PatternType,
    pub fg_color: Option<Color>,
    pub bg_color: Option<Color>,
}

impl Fill {
    pub fn none() -> Self {
        Fill { pattern: PatternType::None, fg_color: None, bg_color: None }
    }

    pub fn gray125() -> Self {
        Fill { pattern: PatternType::Other("gray125".to_string()), fg_color: None, bg_color: None }
    }

    pub fn solid(rgb: impl Into<String>) -> Self {
        Fill {
            pattern: PatternType::Solid,
            fg_color: Some(Color::Rgb(rgb.into())),
            bg_color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BorderStyle {
    None,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
    Hair,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BorderSide {
    pub style: Option<BorderStyle>,
    pub color: Option<Color>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Border {
    pub left: BorderSide,
    pub right: BorderSide,
    pub top: BorderSide,
    pub bottom: BorderSide,
    pub diagonal: BorderSide,
    pub diagonal_up: bool,
    pub diagonal_down: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HorizontalAlign {
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterContinuous,
    Distributed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
    Justify,
    Distributed,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Alignment {
    pub horizontal: Option<HorizontalAlign>,
    pub vertical: Option<VerticalAlign>,
    pub wrap_text: bool,
    pub text_rotation: u32,
    pub indent: u32,
    pub shrink_to_fit: bool,
}

/// A number format. Built-in ids (`0..=163`) never carry a `code`; custom
/// formats always do and are assigned an id starting at 164 on registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumFmt {
    pub id: u32,
    pub code: Option<String>,
}

pub const BUILTIN_NUM_FMT_GENERAL: NumFmt = NumFmt { id: 0, code: None };
pub const CUSTOM_NUM_FMT_BASE_ID: u32 = 164;

impl NumFmt {
    pub fn general() -> Self {
        BUILTIN_NUM_FMT_GENERAL
    }

    pub fn custom(code: impl Into<String>) -> Self {
        // id is reassigned by the StyleRegistry/styles codec on registration;
        // 164 here is just a placeholder satisfying "custom formats carry a code".
        NumFmt { id: CUSTOM_NUM_FMT_BASE_ID, code: Some(code.into()) }
    }

    pub fn is_builtin(&self) -> bool {
        self.code.is_none()
    }
}

/// ECMA-376 §18.8.30's predefined `numFmtId` table, ids 0-22 and 37-44 plus
/// the text passthrough id 49. A style referencing any other id with no
/// matching `<numFmt>` declaration is simply General (id 0).
pub fn builtin_num_fmt_code(id: u32) -> Option<&'static str> {
    Some(match id {
        0 => "General",
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        5 => "$#,##0;-$#,##0",
        6 => "$#,##0;[Red]-$#,##0",
        7 => "$#,##0.00;-$#,##0.00",
        8 => "$#,##0.00;[Red]-$#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0;-#,##0",
        38 => "#,##0;[Red]-#,##0",
        39 => "#,##0.00;-#,##0.00",
        40 => "#,##0.00;[Red]-#,##0.00",
        41 => r#"_(* #,##0_);_(* \(#,##0\);_(* "-"_);_(@_)"#,
        42 => r#"_($* #,##0_);_($* \(#,##0\);_($* "-"_);_(@_)"#,
        43 => r#"_(* #,##0.00_);_(* \(#,##0.00\);_(* "-"??_);_(@_)"#,
        44 => r#"_($* #,##0.00_);_($* \(#,##0.00\);_($* "-"??_);_(@_)"#,
        49 => "@",
        _ => return None,
    })
}

/// A complete, immutable cell style.
///
/// `num_fmt_id`, when set, is the raw numFmtId a style was read with. It is
/// preserved across structural copies (`{ ..base }` style updates) but
/// cleared whenever [`CellStyle::with_num_fmt`] or
/// [`CellStyle::with_num_fmt_custom`] is used explicitly, and it is excluded
/// from [`CellStyle::canonical_key`] so two styles differing only in a
/// preserved raw id still dedupe to the same registry slot.
#[derive(Debug, Clone, PartialEq)]
pub struct CellStyle {
    pub font: Font,
    pub fill: Fill,
    pub border: Border,
    pub alignment: Alignment,
    pub num_fmt: NumFmt,
    pub num_fmt_id: Option<u32>,
    pub locked: bool,
    pub hidden: bool,
}

impl Default for CellStyle {
    fn default() -> Self {
        CellStyle {
            font: Font::default(),
            fill: Fill::none(),
            border: Border::default(),
            alignment: Alignment::default(),
            num_fmt: NumFmt::general(),
            num_fmt_id: None,
            locked: true,
            hidden: false,
        }
    }
}

impl CellStyle {
    pub fn with_num_fmt(mut self, fmt: NumFmt) -> Self {
        self.num_fmt = fmt;
        self.num_fmt_id = None;
        self
    }

    pub fn with_num_fmt_custom(self, code: impl Into<String>) -> Self {
        self.with_num_fmt(NumFmt::custom(code))
    }

    pub fn with_font(mut self, font: Font) -> Self {
        self.font = font;
        self
    }

    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_border(mut self, border: Border) -> Self {
        self.border = border;
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// A key that identifies a style for dedup purposes. Deliberately
    /// excludes `num_fmt_id` (the preserved raw id): two styles that are
    /// otherwise identical and differ only in that field must collapse to
    /// one registry entry, since `num_fmt_id` is provenance, not content.
    pub fn canonical_key(&self) -> CellStyleKey {
        CellStyleKey {
            font: self.font.clone(),
            fill: self.fill.clone(),
            border: self.border.clone(),
            alignment: self.alignment.clone(),
            num_fmt_id: self.num_fmt.id,
            num_fmt_code: self.num_fmt.code.clone(),
            locked: self.locked,
            hidden: self.hidden,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellStyleKey {
    font: Font,
    fill: Fill,
    border: Border,
    alignment: Alignment,
    num_fmt_id: u32,
    num_fmt_code: Option<String>,
    locked: bool,
    hidden: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_num_fmt_table_covers_percentages_and_dates() {
        assert_eq!(builtin_num_fmt_code(9), Some("0%"));
        assert_eq!(builtin_num_fmt_code(14), Some("mm-dd-yy"));
        assert_eq!(builtin_num_fmt_code(22), Some("m/d/yy h:mm"));
        assert_eq!(builtin_num_fmt_code(49), Some("@"));
        assert_eq!(builtin_num_fmt_code(163), None);
    }

    #[test]
    fn canonical_key_ignores_preserved_num_fmt_id() {
        let base = CellStyle::default();
        let a = CellStyle { num_fmt_id: Some(5), ..base.clone() };
        let b = CellStyle { num_fmt_id: Some(9), ..base.clone() };
        assert_eq!(a.canonical_key(), b.canonical_key());
    }

    #[test]
    fn canonical_key_distinguishes_different_fonts() {
        let base = CellStyle::default();
        let bold = base.clone().with_font(Font { bold: true, ..Font::default() });
        assert_ne!(base.canonical_key(), bold.canonical_key());
    }

    #[test]
    fn explicit_num_fmt_setter_clears_preserved_id() {
        let styled = CellStyle::default();
        let with_id = CellStyle { num_fmt_id: Some(42), ..styled };
        let changed = with_id.with_num_fmt_custom("0.00%");
        assert_eq!(changed.num_fmt_id, None);
    }

    #[test]
    fn custom_num_fmt_carries_a_code_builtin_does_not() {
        assert!(NumFmt::general().is_builtin());
        assert!(!NumFmt::custom("0.00").is_builtin());
    }
}
