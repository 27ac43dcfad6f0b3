use std::{
    fmt::{self, Debug, Formatter},
    path::Path,
};

/// File extensions the note viewer knows how to render inline.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "svg", "bmp", "gif"];

/// A file embedded in a note.
#[derive(Clone, PartialEq)]
pub struct Attachment {
    /// The embed exactly as it appears in the note (e.g. `![[cat.png]]`).
    pub reference: String,
    /// The name of the file the embed resolved to.
    pub file_name: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new<R, F, D>(reference: R, file_name: F, data: D) -> Self
    where
        R: Into<String>,
        F: Into<String>,
        D: Into<Vec<u8>>,
    {
        Attachment {
            reference: reference.into(),
            file_name: file_name.into(),
            data: data.into(),
        }
    }

    /// Can this attachment be shared alongside the note?
    pub fn is_image(&self) -> bool { is_image(&self.file_name) }
}

impl Debug for Attachment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("reference", &self.reference)
            .field("file_name", &self.file_name)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Check whether a file name has one of the image extensions we embed.
pub fn is_image(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}
