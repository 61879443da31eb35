//! Comments XML schema structures.
//!
//! Represents `xl/comments{N}.xml` in the OOXML package. Each comment-bearing
//! worksheet gets its own part, referenced from the worksheet's own
//! relationships file (`xl/worksheets/_rels/sheet{N}.xml.rels`) via a
//! `comments` relationship, not from the workbook-level rels.

use serde::{Deserialize, Serialize};

use crate::namespaces;
use crate::shared_strings::{R, T};

/// Comments root element (`xl/comments{N}.xml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "comments")]
pub struct CommentsXml {
    #[serde(rename = "@xmlns")]
    pub xmlns: String,

    pub authors: Authors,

    #[serde(rename = "commentList")]
    pub comment_list: CommentList,
}

/// The distinct set of comment authors, indexed by position (a comment's
/// `@authorId` is an index into this list).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authors {
    #[serde(rename = "author", default)]
    pub authors: Vec<String>,
}

/// The comment list container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentList {
    #[serde(rename = "comment", default)]
    pub comments: Vec<Comment>,
}

/// A single cell comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "@ref")]
    pub reference: String,

    #[serde(rename = "@authorId")]
    pub author_id: u32,

    pub text: CommentText,
}

/// A comment's text body: plain or rich-run, same shape as a shared-string
/// item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentText {
    #[serde(rename = "t", skip_serializing_if = "Option::is_none")]
    pub t: Option<T>,

    #[serde(rename = "r", default)]
    pub r: Vec<R>,
}

impl CommentsXml {
    /// Resolves a comment's `@authorId` to its name in the `<authors>` list.
    pub fn author(&self, id: u32) -> crate::error::Result<&str> {
        self.authors.authors.get(id as usize).map(String::as_str).ok_or(crate::error::Error::UnknownAuthor(id))
    }
}

impl Default for CommentsXml {
    fn default() -> Self {
        CommentsXml {
            xmlns: namespaces::SPREADSHEET_ML.to_string(),
            authors: Authors { authors: Vec::new() },
            comment_list: CommentList { comments: Vec::new() },
        }
    }
}

/// Like [`crate::worksheet::restore_whitespace`], but for a comments part:
/// restores the leading/trailing whitespace `quick_xml::de::from_str`'s
/// `StartTrimmer` strips from each comment's `<t>` text.
pub fn restore_whitespace(comments: &mut CommentsXml, xml: &str) {
    let Ok(raw) = crate::shared_strings::raw_t_texts(xml) else { return };
    let mut raw = raw.into_iter();
    for comment in &mut comments.comment_list.comments {
        if let Some(t) = &mut comment.text.t {
            if let Some(text) = raw.next() {
                t.value = text;
            }
        }
        for r in &mut comment.text.r {
            if let Some(text) = raw.next() {
                r.t.value = text;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_default() {
        let c = CommentsXml::default();
        assert_eq!(c.xmlns, namespaces::SPREADSHEET_ML);
        assert!(c.authors.authors.is_empty());
        assert!(c.comment_list.comments.is_empty());
    }

    #[test]
    fn test_comments_roundtrip() {
        let c = CommentsXml {
            xmlns: namespaces::SPREADSHEET_ML.to_string(),
            authors: Authors { authors: vec!["Jane".to_string()] },
            comment_list: CommentList {
                comments: vec![Comment {
                    reference: "A1".to_string(),
                    author_id: 0,
                    text: CommentText { t: Some(T { xml_space: None, value: "Hi".to_string() }), r: vec![] },
                }],
            },
        };
        let xml = quick_xml::se::to_string(&c).unwrap();
        let parsed: CommentsXml = quick_xml::de::from_str(&xml).unwrap();
        assert_eq!(parsed.authors.authors, vec!["Jane".to_string()]);
        assert_eq!(parsed.comment_list.comments.len(), 1);
        assert_eq!(parsed.comment_list.comments[0].reference, "A1");
        assert_eq!(parsed.comment_list.comments[0].text.t.as_ref().unwrap().value, "Hi");
    }

    #[test]
    fn test_parse_real_excel_comments() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <authors>
    <author>Jane Doe</author>
  </authors>
  <commentList>
    <comment ref="B2" authorId="0">
      <text><t>Needs review</t></text>
    </comment>
  </commentList>
</comments>"#;
        let parsed: CommentsXml = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(parsed.authors.authors, vec!["Jane Doe".to_string()]);
        assert_eq!(parsed.comment_list.comments[0].reference, "B2");
        assert_eq!(parsed.comment_list.comments[0].author_id, 0);
        assert_eq!(parsed.comment_list.comments[0].text.t.as_ref().unwrap().value, "Needs review");
    }

    #[test]
    fn author_resolves_in_range_ids_and_rejects_out_of_range() {
        let c = CommentsXml {
            authors: Authors { authors: vec!["Jane".to_string()] },
            ..CommentsXml::default()
        };
        assert_eq!(c.author(0).unwrap(), "Jane");
        assert!(c.author(1).is_err());
    }

    #[test]
    fn restore_whitespace_recovers_a_padded_comment() {
        let xml = r#"<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><authors><author>A</author></authors><commentList><comment ref="A1" authorId="0"><text><t xml:space="preserve">  pad  </t></text></comment></commentList></comments>"#;
        let mut comments: CommentsXml = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(comments.comment_list.comments[0].text.t.as_ref().unwrap().value, "pad");
        restore_whitespace(&mut comments, xml);
        assert_eq!(comments.comment_list.comments[0].text.t.as_ref().unwrap().value, "  pad  ");
    }
}
