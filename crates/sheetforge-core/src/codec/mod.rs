//! Encode/decode between the in-memory model and OOXML part XML.

pub mod sst_codec;
pub mod styles_codec;
pub mod worksheet_codec;
pub mod worksheet_stream;

/// Whether a `<t>`/`<is>` string value needs `xml:space="preserve"`: leading
/// or trailing whitespace, a tab/newline, or an internal run of two or more
/// spaces, any of which XML whitespace-collapsing would otherwise eat.
pub(crate) fn xml_space_preserve(text: &str) -> Option<String> {
    let preserve = text.starts_with(' ')
        || text.ends_with(' ')
        || text.contains('\n')
        || text.contains('\t')
        || text.contains("  ");
    preserve.then(|| "preserve".to_string())
}
