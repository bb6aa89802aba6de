//! Source document loading.
//!
//! Loads markdown/text and PDF files from the source directory, merges
//! same-basename `.json` sidecar metadata, and stamps every document with
//! its source filename. Unreadable files and bad sidecars are skipped, not
//! fatal — the build continues with what it can read.

use folio_core::knowledge::ChunkMetadata;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A loaded source document, ready for splitting.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// The extensions that participate in indexing (and freshness checks).
pub const SOURCE_EXTENSIONS: [&str; 4] = ["md", "txt", "pdf", "json"];

/// Load every supported document under `source_dir`.
///
/// Falls back to the built-in sample document when the directory is absent,
/// empty, or yields nothing loadable, so the index is never left empty.
pub fn load_documents(source_dir: &Path) -> Vec<SourceDocument> {
    let mut files = Vec::new();
    collect_files(source_dir, &mut files);

    if files.is_empty() {
        info!("No source documents found, loading the built-in sample");
        return vec![sample_document()];
    }

    info!(count = files.len(), "Loading documents and merging sidecar metadata");

    let mut docs = Vec::new();
    for path in &files {
        let ext = extension_of(path);
        let content = match ext.as_str() {
            "md" | "txt" => match std::fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                    continue;
                }
            },
            "pdf" => match extract_pdf_text(path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable PDF");
                    continue;
                }
            },
            // Sidecars are metadata, not documents
            _ => continue,
        };

        let mut metadata = ChunkMetadata::for_file(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        merge_sidecar(path, &mut metadata);

        docs.push(SourceDocument { content, metadata });
    }

    if docs.is_empty() {
        warn!("No documents could be loaded, falling back to the built-in sample");
        return vec![sample_document()];
    }

    docs
}

/// The built-in sample document used when no sources exist.
pub fn sample_document() -> SourceDocument {
    let mut metadata = ChunkMetadata::for_file("sample.md");
    metadata
        .extra
        .insert("document_type".into(), serde_json::json!("resume"));
    metadata
        .extra
        .insert("language".into(), serde_json::json!("en"));

    SourceDocument {
        content: "Experienced **Software Engineer** (M.Sc.) specializing in **C++ and Python** \
                  in the fields of **Embedded Systems, Real-Time Applications, Computer Vision**, \
                  **Deep Learning** and **Sensor Fusion**. Profound knowledge in developing \
                  complex software components for the defense and automotive industries."
            .into(),
        metadata,
    }
}

/// Merge a same-basename `.json` sidecar into the document's metadata.
/// A sidecar that fails to parse is logged and skipped.
fn merge_sidecar(doc_path: &Path, metadata: &mut ChunkMetadata) {
    let sidecar = doc_path.with_extension("json");
    if !sidecar.exists() || extension_of(doc_path) == "json" {
        return;
    }

    let raw = match std::fs::read_to_string(&sidecar) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %sidecar.display(), error = %e, "Skipping unreadable sidecar");
            return;
        }
    };

    match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&raw) {
        Ok(values) => {
            info!(path = %sidecar.display(), "Merging sidecar metadata");
            merge_sidecar_metadata(metadata, values);
        }
        Err(e) => {
            warn!(path = %sidecar.display(), error = %e, "Invalid JSON in sidecar, skipping");
        }
    }
}

/// Merge parsed sidecar key/values into document metadata.
/// Sidecar values win over existing keys.
pub fn merge_sidecar_metadata(
    metadata: &mut ChunkMetadata,
    values: serde_json::Map<String, serde_json::Value>,
) {
    for (k, v) in values {
        metadata.extra.insert(k, v);
    }
}

/// Extract page-ordered text from a PDF.
fn extract_pdf_text(path: &Path) -> Result<String, String> {
    let doc = lopdf::Document::load(path).map_err(|e| format!("Failed to load PDF: {e}"))?;

    let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    page_numbers.sort();

    let mut pages = Vec::new();
    for page_num in page_numbers {
        if let Ok(text) = doc.extract_text(&[page_num]) {
            let trimmed = text.trim().to_string();
            if !trimmed.is_empty() {
                pages.push(trimmed);
            }
        }
    }

    if pages.is_empty() {
        return Err("No text content found in PDF".into());
    }

    Ok(pages.join("\n\n"))
}

/// Recursively collect supported files under `dir`, in sorted order.
pub(crate) fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            collect_files(&path, out);
        } else if SOURCE_EXTENSIONS.contains(&extension_of(&path).as_str()) {
            out.push(path);
        }
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn absent_directory_falls_back_to_sample() {
        let docs = load_documents(Path::new("/nonexistent/source"));
        assert_eq!(docs.len(), 1);
        assert!(docs[0].content.contains("Software Engineer"));
        assert_eq!(docs[0].metadata.extra["document_type"], "resume");
    }

    #[test]
    fn empty_directory_falls_back_to_sample() {
        let dir = tempfile::tempdir().unwrap();
        let docs = load_documents(dir.path());
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata.source_filename, "sample.md");
    }

    #[test]
    fn loads_markdown_and_text() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("resume.md"), "# About\nEngineer.").unwrap();
        fs::write(dir.path().join("notes.txt"), "Plain notes.").unwrap();

        let docs = load_documents(dir.path());
        assert_eq!(docs.len(), 2);
        let names: Vec<&str> = docs
            .iter()
            .map(|d| d.metadata.source_filename.as_str())
            .collect();
        assert!(names.contains(&"resume.md"));
        assert!(names.contains(&"notes.txt"));
    }

    #[test]
    fn loads_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("projects")).unwrap();
        fs::write(dir.path().join("projects/alpha.md"), "# Alpha").unwrap();

        let docs = load_documents(dir.path());
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata.source_filename, "alpha.md");
    }

    #[test]
    fn sidecar_metadata_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("resume.md"), "# About").unwrap();
        fs::write(
            dir.path().join("resume.json"),
            r#"{"document_type": "resume", "language": "de"}"#,
        )
        .unwrap();

        let docs = load_documents(dir.path());
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata.extra["document_type"], "resume");
        assert_eq!(docs[0].metadata.extra["language"], "de");
        assert_eq!(docs[0].metadata.source_filename, "resume.md");
    }

    #[test]
    fn invalid_sidecar_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("resume.md"), "# About").unwrap();
        fs::write(dir.path().join("resume.json"), "{not valid json").unwrap();

        let docs = load_documents(dir.path());
        assert_eq!(docs.len(), 1);
        assert!(docs[0].metadata.extra.is_empty());
    }

    #[test]
    fn sidecars_are_not_documents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("only.json"), r#"{"a": 1}"#).unwrap();

        // A directory with only sidecars has nothing to index
        let docs = load_documents(dir.path());
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata.source_filename, "sample.md");
    }

    #[test]
    fn sidecar_values_win_over_existing_keys() {
        let mut metadata = ChunkMetadata::for_file("resume.md");
        metadata.extra.insert("language".into(), serde_json::json!("en"));

        let sidecar = serde_json::json!({"language": "de", "document_type": "resume"});
        let serde_json::Value::Object(values) = sidecar else {
            unreachable!()
        };
        merge_sidecar_metadata(&mut metadata, values);

        assert_eq!(metadata.extra["language"], "de");
        assert_eq!(metadata.extra["document_type"], "resume");
        assert_eq!(metadata.source_filename, "resume.md");
    }

    #[test]
    fn unsupported_extensions_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("resume.md"), "# About").unwrap();
        fs::write(dir.path().join("photo.png"), [0u8; 4]).unwrap();

        let docs = load_documents(dir.path());
        assert_eq!(docs.len(), 1);
    }
}
