//! `xl/sharedStrings.xml` <-> [`SharedStringTable`] conversion.

use sheetforge_xml::shared_strings as xml;

use crate::sst::{SharedString, SharedStringTable};
use crate::value::TextRun;

pub fn encode(table: &SharedStringTable) -> xml::Sst {
    let items = table
        .entries()
        .iter()
        .map(|entry| match entry {
            SharedString::Plain(text) => xml::Si { t: Some(encode_t(text)), r: Vec::new() },
            SharedString::Rich(runs) => xml::Si { t: None, r: runs.iter().map(encode_run).collect() },
        })
        .collect();

    xml::Sst {
        xmlns: sheetforge_xml::namespaces::SPREADSHEET_ML.to_string(),
        count: Some(table.total_count()),
        unique_count: Some(table.unique_count()),
        items,
    }
}

pub fn decode(sst: &xml::Sst) -> Vec<SharedString> {
    sst.items
        .iter()
        .map(|si| {
            if !si.r.is_empty() {
                SharedString::Rich(si.r.iter().map(decode_run).collect())
            } else {
                SharedString::Plain(si.t.as_ref().map(|t| t.value.clone()).unwrap_or_default())
            }
        })
        .collect()
}

fn encode_t(text: &str) -> xml::T {
    xml::T { xml_space: crate::codec::xml_space_preserve(text), value: text.to_string() }
}

fn encode_run(run: &TextRun) -> xml::R {
    let has_props = run.bold
        || run.italic
        || run.font_name.is_some()
        || run.size.is_some()
        || run.color_rgb.is_some();
    xml::R {
        r_pr: has_props.then(|| xml::RPr {
            b: run.bold.then_some(xml::BoolVal { val: Some(true) }),
            i: run.italic.then_some(xml::BoolVal { val: Some(true) }),
            sz: run.size.map(|v| xml::FontSize { val: v }),
            color: run.color_rgb.as_ref().map(|rgb| xml::Color {
                rgb: Some(rgb.clone()),
                theme: None,
                tint: None,
            }),
            r_font: run.font_name.as_ref().map(|n| xml::FontName { val: n.clone() }),
            family: None,
            scheme: None,
        }),
        t: encode_t(&run.text),
    }
}

fn decode_run(r: &xml::R) -> TextRun {
    let props = r.r_pr.as_ref();
    TextRun {
        text: r.t.value.clone(),
        bold: props.and_then(|p| p.b.as_ref()).and_then(|b| b.val).unwrap_or(false),
        italic: props.and_then(|p| p.i.as_ref()).and_then(|i| i.val).unwrap_or(false),
        font_name: props.and_then(|p| p.r_font.as_ref()).map(|f| f.val.clone()),
        size: props.and_then(|p| p.sz.as_ref()).map(|s| s.val),
        color_rgb: props.and_then(|p| p.color.as_ref()).and_then(|c| c.rgb.clone()),
    }
}
