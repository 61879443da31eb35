//! `xl/styles.xml` <-> [`StyleRegistry`] conversion.
//!
//! Decoding returns both the populated registry and a `Vec<StyleId>` mapping
//! each original `cellXfs` position to its (possibly deduplicated) canonical
//! [`StyleId`], since cells reference styles by that original positional
//! index (`c/@s`) and two distinct `xf` entries may canonicalize to the same
//! style once the preserved `numFmtId` is excluded from the dedup key.

use sheetforge_xml::styles as xml;

use crate::error::Result;
use crate::style::{
    Alignment, Border, BorderSide, BorderStyle, CellStyle, Color, Fill, Font, HorizontalAlign,
    NumFmt, PatternType, Underline, VerticalAlign,
};
use crate::style_registry::{StyleId, StyleRegistry};

pub fn encode(registry: &StyleRegistry) -> xml::StyleSheet {
    let num_fmts: Vec<xml::NumFmt> = registry
        .custom_num_fmts()
        .into_iter()
        .map(|f| xml::NumFmt { num_fmt_id: f.id, format_code: f.code.unwrap_or_default() })
        .collect();

    let fonts: Vec<xml::Font> = registry.fonts().map(encode_font).collect();
    let fills: Vec<xml::Fill> = registry.fills().map(encode_fill).collect();
    let borders: Vec<xml::Border> = registry.borders().map(encode_border).collect();

    let xfs: Vec<xml::Xf> = registry
        .styles()
        .iter()
        .map(|style| xml::Xf {
            num_fmt_id: Some(registry.num_fmt_id_for(style)),
            font_id: registry.font_id(&style.font),
            fill_id: registry.fill_id(&style.fill),
            border_id: registry.border_id(&style.border),
            xf_id: Some(0),
            apply_number_format: Some(!style.num_fmt.is_builtin() || style.num_fmt.id != 0),
            apply_font: Some(true),
            apply_fill: Some(true),
            apply_border: Some(true),
            apply_alignment: Some(is_non_default_alignment(&style.alignment)),
            alignment: encode_alignment(&style.alignment),
            protection: Some(xml::Protection { locked: Some(style.locked), hidden: Some(style.hidden) }),
        })
        .collect();

    xml::StyleSheet {
        xmlns: sheetforge_xml::namespaces::SPREADSHEET_ML.to_string(),
        num_fmts: (!num_fmts.is_empty()).then(|| xml::NumFmts {
            count: Some(num_fmts.len() as u32),
            num_fmts,
        }),
        fonts: xml::Fonts { count: Some(fonts.len() as u32), fonts },
        fills: xml::Fills { count: Some(fills.len() as u32), fills },
        borders: xml::Borders { count: Some(borders.len() as u32), borders },
        cell_style_xfs: Some(xml::CellStyleXfs {
            count: Some(1),
            xfs: vec![xml::Xf {
                num_fmt_id: Some(0),
                font_id: Some(0),
                fill_id: Some(0),
                border_id: Some(0),
                xf_id: None,
                apply_number_format: None,
                apply_font: None,
                apply_fill: None,
                apply_border: None,
                apply_alignment: None,
                alignment: None,
                protection: None,
            }],
        }),
        cell_xfs: xml::CellXfs { count: Some(xfs.len() as u32), xfs },
        cell_styles: Some(xml::CellStyles {
            count: Some(1),
            cell_styles: vec![xml::CellStyle { name: "Normal".to_string(), xf_id: 0, builtin_id: Some(0) }],
        }),
        dxfs: None,
        table_styles: None,
    }
}

pub fn decode(sheet: &xml::StyleSheet) -> Result<(StyleRegistry, Vec<StyleId>)> {
    let num_fmts: std::collections::HashMap<u32, String> = sheet
        .num_fmts
        .as_ref()
        .map(|n| n.num_fmts.iter().map(|f| (f.num_fmt_id, f.format_code.clone())).collect())
        .unwrap_or_default();

    let fonts: Vec<Font> = sheet.fonts.fonts.iter().map(decode_font).collect();
    let fills: Vec<Fill> = sheet.fills.fills.iter().map(decode_fill).collect();
    let borders: Vec<Border> = sheet.borders.borders.iter().map(decode_border).collect();

    let mut registry = StyleRegistry::new();
    let mut mapping = Vec::with_capacity(sheet.cell_xfs.xfs.len());

    for xf in &sheet.cell_xfs.xfs {
        let num_fmt_id = xf.num_fmt_id.unwrap_or(0);
        let num_fmt = if let Some(code) = num_fmts.get(&num_fmt_id) {
            // An explicit <numFmt> declaration always wins, even if it reuses
            // an id ECMA-376 reserves for a builtin format.
            NumFmt { id: num_fmt_id, code: Some(code.clone()) }
        } else if crate::style::builtin_num_fmt_code(num_fmt_id).is_some() {
            NumFmt { id: num_fmt_id, code: None }
        } else {
            // Neither declared nor a recognized builtin: falls back to
            // General rather than silently carrying an unresolvable id.
            NumFmt::general()
        };
        let style = CellStyle {
            font: xf.font_id.and_then(|i| fonts.get(i as usize).cloned()).unwrap_or_default(),
            fill: xf.fill_id.and_then(|i| fills.get(i as usize).cloned()).unwrap_or_else(Fill::none),
            border: xf.border_id.and_then(|i| borders.get(i as usize).cloned()).unwrap_or_default(),
            alignment: xf.alignment.as_ref().map(decode_alignment).unwrap_or_default(),
            num_fmt,
            num_fmt_id: Some(num_fmt_id),
            locked: xf.protection.as_ref().and_then(|p| p.locked).unwrap_or(true),
            hidden: xf.protection.as_ref().and_then(|p| p.hidden).unwrap_or(false),
        };
        mapping.push(registry.register(style)?);
    }

    Ok((registry, mapping))
}

fn is_non_default_alignment(a: &Alignment) -> bool {
    a != &Alignment::default()
}

fn encode_font(font: &Font) -> xml::Font {
    xml::Font {
        b: font.bold.then_some(xml::BoolVal { val: Some(true) }),
        i: font.italic.then_some(xml::BoolVal { val: Some(true) }),
        strike: font.strike.then_some(xml::BoolVal { val: Some(true) }),
        u: encode_underline(&font.underline),
        sz: Some(xml::FontSize { val: font.size_points() }),
        color: Some(encode_color(&font.color)),
        name: Some(xml::FontName { val: font.name.clone() }),
        family: None,
        scheme: None,
    }
}

fn decode_font(font: &xml::Font) -> Font {
    Font {
        name: font.name.as_ref().map(|n| n.val.clone()).unwrap_or_else(|| "Calibri".to_string()),
        size: font.sz.as_ref().map(|s| (s.val * 100.0).round() as i64).unwrap_or(1100),
        bold: font.b.as_ref().and_then(|b| b.val).unwrap_or(false),
        italic: font.i.as_ref().and_then(|i| i.val).unwrap_or(false),
        strike: font.strike.as_ref().and_then(|s| s.val).unwrap_or(false),
        underline: decode_underline(font.u.as_ref()),
        color: font.color.as_ref().map(decode_color).unwrap_or_default(),
    }
}

fn encode_underline(u: &Underline) -> Option<xml::Underline> {
    let val = match u {
        Underline::None => return None,
        Underline::Single => "single",
        Underline::Double => "double",
        Underline::SingleAccounting => "singleAccounting",
        Underline::DoubleAccounting => "doubleAccounting",
    };
    Some(xml::Underline { val: Some(val.to_string()) })
}

fn decode_underline(u: Option<&xml::Underline>) -> Underline {
    match u.and_then(|u| u.val.as_deref()) {
        None => Underline::None,
        Some("single") => Underline::Single,
        Some("double") => Underline::Double,
        Some("singleAccounting") => Underline::SingleAccounting,
        Some("doubleAccounting") => Underline::DoubleAccounting,
        Some(_) => Underline::Single,
    }
}

fn encode_color(c: &Color) -> xml::Color {
    match c {
        Color::Automatic => xml::Color { auto: Some(true), indexed: None, rgb: None, theme: None, tint: None },
        Color::Rgb(rgb) => {
            xml::Color { auto: None, indexed: None, rgb: Some(rgb.clone()), theme: None, tint: None }
        }
        Color::Theme { theme, tint } => xml::Color {
            auto: None,
            indexed: None,
            rgb: None,
            theme: Some(*theme),
            tint: tint.map(|t| t as f64 / 100_000.0),
        },
        Color::Indexed(i) => {
            xml::Color { auto: None, indexed: Some(*i), rgb: None, theme: None, tint: None }
        }
    }
}

fn decode_color(c: &xml::Color) -> Color {
    if let Some(rgb) = &c.rgb {
        Color::Rgb(rgb.clone())
    } else if let Some(theme) = c.theme {
        Color::Theme { theme, tint: c.tint.map(|t| (t * 100_000.0).round() as i64) }
    } else if let Some(i) = c.indexed {
        Color::Indexed(i)
    } else {
        Color::Automatic
    }
}

fn encode_fill(fill: &Fill) -> xml::Fill {
    let pattern_type = match &fill.pattern {
        PatternType::None => "none",
        PatternType::Solid => "solid",
        PatternType::Other(s) => s.as_str(),
    };
    xml::Fill {
        pattern_fill: Some(xml::PatternFill {
            pattern_type: Some(pattern_type.to_string()),
            fg_color: fill.fg_color.as_ref().map(encode_color),
            bg_color: fill.bg_color.as_ref().map(encode_color),
        }),
        gradient_fill: None,
    }
}

fn decode_fill(fill: &xml::Fill) -> Fill {
    let Some(pf) = &fill.pattern_fill else {
        return Fill::none();
    };
    let pattern = match pf.pattern_type.as_deref() {
        None | Some("none") => PatternType::None,
        Some("solid") => PatternType::Solid,
        Some(other) => PatternType::Other(other.to_string()),
    };
    Fill {
        pattern,
        fg_color: pf.fg_color.as_ref().map(decode_color),
        bg_color: pf.bg_color.as_ref().map(decode_color),
    }
}

fn encode_border_style(s: &BorderStyle) -> Option<String> {
    let v = match s {
        BorderStyle::None => return None,
        BorderStyle::Thin => "thin",
        BorderStyle::Medium => "medium",
        BorderStyle::Thick => "thick",
        BorderStyle::Dashed => "dashed",
        BorderStyle::Dotted => "dotted",
        BorderStyle::Double => "double",
        BorderStyle::Hair => "hair",
        BorderStyle::Other(s) => s.as_str(),
    };
    Some(v.to_string())
}

fn decode_border_style(s: Option<&str>) -> Option<BorderStyle> {
    Some(match s? {
        "thin" => BorderStyle::Thin,
        "medium" => BorderStyle::Medium,
        "thick" => BorderStyle::Thick,
        "dashed" => BorderStyle::Dashed,
        "dotted" => BorderStyle::Dotted,
        "double" => BorderStyle::Double,
        "hair" => BorderStyle::Hair,
        other => BorderStyle::Other(other.to_string()),
    })
}

fn encode_border_side(side: &BorderSide) -> Option<xml::BorderSide> {
    if side.style.is_none() {
        return None;
    }
    Some(xml::BorderSide {
        style: side.style.as_ref().and_then(encode_border_style),
        color: side.color.as_ref().map(encode_color),
    })
}

fn decode_border_side(side: Option<&xml::BorderSide>) -> BorderSide {
    match side {
        None => BorderSide::default(),
        Some(s) => BorderSide {
            style: decode_border_style(s.style.as_deref()),
            color: s.color.as_ref().map(decode_color),
        },
    }
}

fn encode_border(border: &Border) -> xml::Border {
    xml::Border {
        diagonal_up: border.diagonal_up.then_some(true),
        diagonal_down: border.diagonal_down.then_some(true),
        left: encode_border_side(&border.left),
        right: encode_border_side(&border.right),
        top: encode_border_side(&border.top),
        bottom: encode_border_side(&border.bottom),
        diagonal: encode_border_side(&border.diagonal),
    }
}

fn decode_border(border: &xml::Border) -> Border {
    Border {
        left: decode_border_side(border.left.as_ref()),
        right: decode_border_side(border.right.as_ref()),
        top: decode_border_side(border.top.as_ref()),
        bottom: decode_border_side(border.bottom.as_ref()),
        diagonal: decode_border_side(border.diagonal.as_ref()),
        diagonal_up: border.diagonal_up.unwrap_or(false),
        diagonal_down: border.diagonal_down.unwrap_or(false),
    }
}

fn encode_alignment(a: &Alignment) -> Option<xml::Alignment> {
    if !is_non_default_alignment(a) {
        return None;
    }
    Some(xml::Alignment {
        horizontal: a.horizontal.map(|h| {
            match h {
                HorizontalAlign::General => "general",
                HorizontalAlign::Left => "left",
                HorizontalAlign::Center => "center",
                HorizontalAlign::Right => "right",
                HorizontalAlign::Fill => "fill",
                HorizontalAlign::Justify => "justify",
                HorizontalAlign::CenterContinuous => "centerContinuous",
                HorizontalAlign::Distributed => "distributed",
            }
            .to_string()
        }),
        vertical: a.vertical.map(|v| {
            match v {
                VerticalAlign::Top => "top",
                VerticalAlign::Center => "center",
                VerticalAlign::Bottom => "bottom",
                VerticalAlign::Justify => "justify",
                VerticalAlign::Distributed => "distributed",
            }
            .to_string()
        }),
        wrap_text: a.wrap_text.then_some(true),
        text_rotation: (a.text_rotation != 0).then_some(a.text_rotation),
        indent: (a.indent != 0).then_some(a.indent),
        shrink_to_fit: a.shrink_to_fit.then_some(true),
    })
}

fn decode_alignment(a: &xml::Alignment) -> Alignment {
    Alignment {
        horizontal: a.horizontal.as_deref().map(|h| match h {
            "left" => HorizontalAlign::Left,
            "center" => HorizontalAlign::Center,
            "right" => HorizontalAlign::Right,
            "fill" => HorizontalAlign::Fill,
            "justify" => HorizontalAlign::Justify,
            "centerContinuous" => HorizontalAlign::CenterContinuous,
            "distributed" => HorizontalAlign::Distributed,
            _ => HorizontalAlign::General,
        }),
        vertical: a.vertical.as_deref().map(|v| match v {
            "top" => VerticalAlign::Top,
            "center" => VerticalAlign::Center,
            "justify" => VerticalAlign::Justify,
            "distributed" => VerticalAlign::Distributed,
            _ => VerticalAlign::Bottom,
        }),
        wrap_text: a.wrap_text.unwrap_or(false),
        text_rotation: a.text_rotation.unwrap_or(0),
        indent: a.indent.unwrap_or(0),
        shrink_to_fit: a.shrink_to_fit.unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Font;

    #[test]
    fn roundtrips_a_bold_font_through_xml() {
        let mut reg = StyleRegistry::new();
        reg.register(CellStyle::default().with_font(Font { bold: true, ..Font::default() })).unwrap();
        let xml = encode(&reg);
        let (decoded, _) = decode(&xml).unwrap();
        assert!(decoded.fonts().any(|f| f.bold));
    }

    #[test]
    fn decode_maps_original_xf_positions_even_after_dedup() {
        let mut reg = StyleRegistry::new();
        let base = CellStyle::default();
        let a = CellStyle { num_fmt_id: Some(5), ..base.clone() };
        let b = CellStyle { num_fmt_id: Some(9), ..base };
        reg.register(a).unwrap();
        reg.register(b).unwrap();
        let xml = encode(&reg);
        let (_, mapping) = decode(&xml).unwrap();
        // xf[1] and xf[2] differ only in numFmtId and canonicalize together.
        assert_eq!(mapping[1], mapping[2]);
    }

    #[test]
    fn custom_number_format_code_survives_a_roundtrip() {
        let mut reg = StyleRegistry::new();
        reg.register(CellStyle::default().with_num_fmt_custom("0.00%")).unwrap();
        let xml = encode(&reg);
        let (decoded, mapping) = decode(&xml).unwrap();
        let style = decoded.get(mapping[1]).unwrap();
        assert_eq!(style.num_fmt.code.as_deref(), Some("0.00%"));
    }

    #[test]
    fn an_undeclared_builtin_percent_id_decodes_without_a_numfmts_entry() {
        let xf = xml::Xf {
            num_fmt_id: Some(9),
            font_id: Some(0),
            fill_id: Some(0),
            border_id: Some(0),
            xf_id: Some(0),
            apply_number_format: Some(true),
            apply_font: None,
            apply_fill: None,
            apply_border: None,
            apply_alignment: None,
            alignment: None,
            protection: None,
        };
        let sheet = xml::StyleSheet {
            xmlns: sheetforge_xml::namespaces::SPREADSHEET_ML.to_string(),
            num_fmts: None,
            fonts: xml::Fonts { count: Some(1), fonts: vec![xml::Font { b: None, i: None, strike: None, u: None, sz: None, color: None, name: None, family: None, scheme: None }] },
            fills: xml::Fills { count: Some(1), fills: vec![] },
            borders: xml::Borders { count: Some(1), borders: vec![] },
            cell_style_xfs: None,
            cell_xfs: xml::CellXfs { count: Some(1), xfs: vec![xf] },
            cell_styles: None,
            dxfs: None,
            table_styles: None,
        };
        let (decoded, mapping) = decode(&sheet).unwrap();
        let style = decoded.get(mapping[0]).unwrap();
        assert_eq!(style.num_fmt.id, 9);
        assert!(style.num_fmt.is_builtin());
    }

    #[test]
    fn an_unrecognized_undeclared_id_falls_back_to_general() {
        let xf = xml::Xf {
            num_fmt_id: Some(200),
            font_id: Some(0),
            fill_id: Some(0),
            border_id: Some(0),
            xf_id: Some(0),
            apply_number_format: Some(true),
            apply_font: None,
            apply_fill: None,
            apply_border: None,
            apply_alignment: None,
            alignment: None,
            protection: None,
        };
        let sheet = xml::StyleSheet {
            xmlns: sheetforge_xml::namespaces::SPREADSHEET_ML.to_string(),
            num_fmts: None,
            fonts: xml::Fonts { count: Some(1), fonts: vec![xml::Font { b: None, i: None, strike: None, u: None, sz: None, color: None, name: None, family: None, scheme: None }] },
            fills: xml::Fills { count: Some(1), fills: vec![] },
            borders: xml::Borders { count: Some(1), borders: vec![] },
            cell_style_xfs: None,
            cell_xfs: xml::CellXfs { count: Some(1), xfs: vec![xf] },
            cell_styles: None,
            dxfs: None,
            table_styles: None,
        };
        let (decoded, mapping) = decode(&sheet).unwrap();
        let style = decoded.get(mapping[0]).unwrap();
        assert_eq!(style.num_fmt.id, 0);
    }

    #[test]
    fn a_custom_num_fmt_keeps_its_source_id_across_a_roundtrip() {
        // Some producers assign custom numFmtIds well above 164 (e.g. after
        // a prior editor already used up the low custom ids). The writer
        // must not renumber them to its own sequential counter, or the
        // emitted `<numFmts>` declaration and the `<xf numFmtId=..>` that
        // references it would disagree.
        let xf = xml::Xf {
            num_fmt_id: Some(200),
            font_id: Some(0),
            fill_id: Some(0),
            border_id: Some(0),
            xf_id: Some(0),
            apply_number_format: Some(true),
            apply_font: None,
            apply_fill: None,
            apply_border: None,
            apply_alignment: None,
            alignment: None,
            protection: None,
        };
        let sheet = xml::StyleSheet {
            xmlns: sheetforge_xml::namespaces::SPREADSHEET_ML.to_string(),
            num_fmts: Some(xml::NumFmts {
                count: Some(1),
                num_fmts: vec![xml::NumFmt { num_fmt_id: 200, format_code: "0.000".to_string() }],
            }),
            fonts: xml::Fonts { count: Some(1), fonts: vec![xml::Font { b: None, i: None, strike: None, u: None, sz: None, color: None, name: None, family: None, scheme: None }] },
            fills: xml::Fills { count: Some(1), fills: vec![] },
            borders: xml::Borders { count: Some(1), borders: vec![] },
            cell_style_xfs: None,
            cell_xfs: xml::CellXfs { count: Some(1), xfs: vec![xf] },
            cell_styles: None,
            dxfs: None,
            table_styles: None,
        };
        let (decoded, mapping) = decode(&sheet).unwrap();
        let style = decoded.get(mapping[0]).unwrap();
        assert_eq!(style.num_fmt.code.as_deref(), Some("0.000"));
        assert_eq!(decoded.num_fmt_id_for(style), 200);

        let re_encoded = encode(&decoded);
        assert_eq!(re_encoded.cell_xfs.xfs[0].num_fmt_id, Some(200));
        assert_eq!(re_encoded.num_fmts.as_ref().unwrap().num_fmts[0].num_fmt_id, 200);
    }

    #[test]
    fn gray125_and_none_fill_slots_are_always_present() {
        let reg = StyleRegistry::new();
        let xml = encode(&reg);
        assert_eq!(xml.fills.fills.len(), 2);
    }
}
