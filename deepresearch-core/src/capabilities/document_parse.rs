//! ABOUTME: `document_parse` adapter - extracts text from local files
//! ABOUTME: PDF/DOCX are left unimplemented per the source (design note §9)

use crate::capability::{Capability, CapabilityKind, Outcome};
use crate::value_bag::ValueBag;
use async_trait::async_trait;
use std::path::Path;

/// Unlike the other adapters, `document_parse` operates on local files and
/// has no backend HTTP call — it needs no [`crate::transport::Transport`].
#[derive(Default)]
pub struct DocumentParseCapability;

impl DocumentParseCapability {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Capability for DocumentParseCapability {
    fn name(&self) -> &str {
        "document_parse"
    }

    fn description(&self) -> &str {
        "Extract text from a local document (plain text formats only)"
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Parsing
    }

    async fn invoke(&self, params: ValueBag) -> Outcome {
        let file_path = params.get_string("file_path", "");
        if file_path.is_empty() {
            return Outcome::failure("validation_failed: file_path is required");
        }

        let ext = Path::new(&file_path)
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .unwrap_or("")
            .to_lowercase();
        if matches!(ext.as_str(), "pdf" | "docx" | "doc") {
            return Outcome::failure(format!("not_implemented: .{ext} parsing is out of scope"));
        }

        let preserve_formatting = params.get_bool("preserve_formatting", false);
        match tokio::fs::read_to_string(&file_path).await {
            Ok(raw) => {
                let extracted_text = if preserve_formatting {
                    raw
                } else {
                    raw.split_whitespace().collect::<Vec<_>>().join(" ")
                };
                let mut data = ValueBag::new();
                data.set("extracted_text", extracted_text.clone());
                data.set("text_length", extracted_text.chars().count() as i64);
                data.set(
                    "word_count",
                    extracted_text.split_whitespace().count() as i64,
                );
                Outcome::success(data)
            }
            Err(e) => Outcome::failure(format!("internal: {e}")),
        }
    }
}
