//! The plaintext payload which gets encrypted and uploaded.

use crate::Attachment;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_derive::{Deserialize, Serialize};

/// Everything the note viewer needs to render a shared note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub attachments: Vec<EmbeddedFile>,
}

/// An image attachment, inlined as base64.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedFile {
    pub reference: String,
    pub data: String,
}

impl Envelope {
    /// Prepare a note for sharing.
    ///
    /// Frontmatter only holds local metadata and is dropped. Attachments
    /// which aren't images are skipped.
    pub fn build(
        body: &str,
        title: Option<&str>,
        attachments: &[Attachment],
    ) -> Self {
        let attachments = attachments
            .iter()
            .filter(|attachment| {
                let keep = attachment.is_image();
                if !keep {
                    log::debug!(
                        "Skipping {} because it isn't an image",
                        attachment.file_name
                    );
                }
                keep
            })
            .map(|attachment| EmbeddedFile {
                reference: attachment.reference.clone(),
                data: STANDARD.encode(&attachment.data),
            })
            .collect();

        Envelope {
            body: strip_frontmatter(body).to_string(),
            title: title.map(String::from),
            attachments,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Remove any leading frontmatter blocks (a line which is exactly `---`,
/// followed by a closing `---` line) from a note.
pub fn strip_frontmatter(text: &str) -> &str {
    let mut text = text.trim();

    while let Some(rest) = after_frontmatter(text) {
        text = rest.trim();
    }

    text
}

fn after_frontmatter(text: &str) -> Option<&str> {
    let mut lines = text.split_inclusive('\n');

    let opening = lines.next()?;
    if !opening.ends_with('\n') || !is_delimiter(opening) {
        return None;
    }

    let mut offset = opening.len();
    for line in lines {
        offset += line.len();
        if is_delimiter(line) {
            return Some(&text[offset..]);
        }
    }

    // unterminated, so it's just a horizontal rule
    None
}

/// Only the line ending may follow the dashes.
fn is_delimiter(line: &str) -> bool {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    line == "---"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_simple_frontmatter() {
        let src = "---\ntitle: x\n---\nHello";

        let got = strip_frontmatter(src);

        assert_eq!(got, "Hello");
    }

    #[test]
    fn strip_frontmatter_with_crlf_and_padding() {
        let src = "\n\n---\r\nurl: \"https://x/n/1\"\r\ndatetime: now\r\n---\r\n\r\n# Title\r\nBody";

        let got = strip_frontmatter(src);

        assert_eq!(got, "# Title\r\nBody");
    }

    #[test]
    fn empty_frontmatter_is_stripped() {
        assert_eq!(strip_frontmatter("---\n---\nHello"), "Hello");
    }

    #[test]
    fn notes_without_frontmatter_are_only_trimmed() {
        let inputs = vec![
            ("Hello", "Hello"),
            ("  Hello\n", "Hello"),
            ("Hello\n---\nWorld\n---\n", "Hello\n---\nWorld\n---"),
            ("---\nnever closed", "---\nnever closed"),
            ("--- \nnot quite\n---x\n", "--- \nnot quite\n---x"),
            ("", ""),
        ];

        for (src, should_be) in inputs {
            assert_eq!(strip_frontmatter(src), should_be, "{:?}", src);
        }
    }

    #[test]
    fn padded_dashes_are_not_delimiters() {
        let inputs = vec![
            ("---   \ntitle: x\n---\nHello", "---   \ntitle: x\n---\nHello"),
            ("---\ntitle: x\n---\t\nHello", "---\ntitle: x\n---\t\nHello"),
            ("---\ntitle: x\n  ---\nHello", "---\ntitle: x\n  ---\nHello"),
            ("---\na: 1\n--- \nb: 2\n---\nHello", "Hello"),
        ];

        for (src, should_be) in inputs {
            assert_eq!(strip_frontmatter(src), should_be, "{:?}", src);
        }
    }

    #[test]
    fn stripping_is_idempotent() {
        let inputs = vec![
            "---\ntitle: x\n---\nHello",
            "---\na: 1\n---\n---\nb: 2\n---\nText",
            "Plain text",
            "---\nunterminated",
            "---\nkey: value\n---",
        ];

        for src in inputs {
            let once = strip_frontmatter(src);
            let twice = strip_frontmatter(once);

            assert_eq!(once, twice, "{:?}", src);
        }
    }

    #[test]
    fn only_images_are_embedded() {
        let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0xFF];
        let attachments = vec![
            Attachment::new("![[paper.pdf]]", "paper.pdf", vec![1, 2, 3]),
            Attachment::new("![[cat.png]]", "cat.png", png.clone()),
        ];

        let got = Envelope::build("Hello", None, &attachments);

        assert_eq!(got.attachments.len(), 1);
        assert_eq!(got.attachments[0].reference, "![[cat.png]]");
        assert_eq!(STANDARD.decode(&got.attachments[0].data).unwrap(), png);
    }

    #[test]
    fn serialized_envelope_omits_missing_title() {
        let envelope = Envelope::build("---\nurl: old\n---\nHello", None, &[]);

        let got: serde_json::Value =
            serde_json::from_slice(&envelope.to_bytes().unwrap()).unwrap();

        assert_eq!(
            got,
            serde_json::json!({ "body": "Hello", "attachments": [] })
        );
    }

    #[test]
    fn serialized_envelope_keeps_the_title() {
        let envelope = Envelope::build("Hello", Some("My Note"), &[]);

        let got: serde_json::Value =
            serde_json::from_slice(&envelope.to_bytes().unwrap()).unwrap();

        assert_eq!(got["title"], "My Note");
    }
}
