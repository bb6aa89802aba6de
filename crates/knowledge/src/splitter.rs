//! Document splitting.
//!
//! Markdown and plain-text documents split on heading boundaries (levels
//! 1–3), which preserves semantic units for résumé-like content; everything
//! else falls back to a fixed-size sliding window. Both splitters are pure
//! functions over a document value — no filesystem involved.

use crate::loader::SourceDocument;
use folio_core::knowledge::KnowledgeChunk;
use uuid::Uuid;

/// Window size for unstructured documents, in characters.
pub const WINDOW_SIZE: usize = 1000;

/// Overlap between consecutive windows, in characters.
pub const WINDOW_OVERLAP: usize = 200;

/// Split a batch of documents into chunks.
///
/// Markdown/text documents (by `source_filename` extension) are split on
/// headings; all others by sliding window. Parent metadata is propagated to
/// every resulting chunk.
pub fn split_documents(docs: &[SourceDocument]) -> Vec<KnowledgeChunk> {
    let mut chunks = Vec::new();
    for doc in docs {
        let name = doc.metadata.source_filename.to_lowercase();
        if name.ends_with(".md") || name.ends_with(".txt") {
            chunks.extend(split_on_headings(doc));
        } else {
            chunks.extend(split_by_window(doc, WINDOW_SIZE, WINDOW_OVERLAP));
        }
    }
    chunks
}

/// Split a document on markdown heading boundaries (levels 1–3).
///
/// Headings stay in the chunk text. Each chunk's metadata carries the
/// heading path that was active where the chunk starts; deeper levels reset
/// when a shallower heading appears. Headings inside fenced code blocks are
/// treated as content.
pub fn split_on_headings(doc: &SourceDocument) -> Vec<KnowledgeChunk> {
    let mut chunks = Vec::new();
    let mut headers: [Option<String>; 3] = [None, None, None];
    let mut block = String::new();
    let mut block_headers: Vec<String> = Vec::new();
    let mut in_fence = false;

    for line in doc.content.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }

        match (!in_fence).then(|| parse_heading(line)).flatten() {
            Some((level, text)) => {
                push_block(&mut chunks, doc, &block, &block_headers);
                block.clear();

                headers[level - 1] = Some(text);
                for deeper in headers.iter_mut().skip(level) {
                    *deeper = None;
                }
                block_headers = headers.iter().flatten().cloned().collect();

                block.push_str(line);
                block.push('\n');
            }
            None => {
                block.push_str(line);
                block.push('\n');
            }
        }
    }

    push_block(&mut chunks, doc, &block, &block_headers);
    chunks
}

/// Split a document by a fixed-size sliding window with overlap.
///
/// Operates on character boundaries. Metadata is carried through unchanged.
pub fn split_by_window(doc: &SourceDocument, size: usize, overlap: usize) -> Vec<KnowledgeChunk> {
    assert!(overlap < size, "window overlap must be smaller than the window");

    let chars: Vec<char> = doc.content.chars().collect();
    let mut chunks = Vec::new();
    let step = size - overlap;
    let mut start = 0;

    while start < chars.len() {
        let end = (start + size).min(chars.len());
        let text: String = chars[start..end].iter().collect();
        if !text.trim().is_empty() {
            chunks.push(make_chunk(doc, text, Vec::new()));
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// Parse a markdown heading line of level 1–3. Deeper levels count as content.
fn parse_heading(line: &str) -> Option<(usize, String)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 3 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.starts_with(' ') && !rest.is_empty() {
        return None;
    }
    Some((level, rest.trim().to_string()))
}

fn push_block(
    chunks: &mut Vec<KnowledgeChunk>,
    doc: &SourceDocument,
    block: &str,
    headers: &[String],
) {
    if block.trim().is_empty() {
        return;
    }
    chunks.push(make_chunk(doc, block.trim_end().to_string(), headers.to_vec()));
}

fn make_chunk(doc: &SourceDocument, content: String, headers: Vec<String>) -> KnowledgeChunk {
    let mut metadata = doc.metadata.clone();
    metadata.headers = headers;
    KnowledgeChunk {
        id: Uuid::new_v4().to_string(),
        content,
        metadata,
        score: 0.0,
        embedding: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::knowledge::ChunkMetadata;

    fn doc(name: &str, content: &str) -> SourceDocument {
        SourceDocument {
            content: content.into(),
            metadata: ChunkMetadata::for_file(name),
        }
    }

    #[test]
    fn headings_start_new_chunks() {
        let d = doc(
            "resume.md",
            "# About\nSoftware engineer.\n## Skills\nC++ and Rust.\n## Education\nM.Sc.\n",
        );
        let chunks = split_on_headings(&d);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].content.starts_with("# About"));
        assert!(chunks[1].content.starts_with("## Skills"));
        assert_eq!(chunks[1].metadata.headers, vec!["About", "Skills"]);
        assert_eq!(chunks[2].metadata.headers, vec!["About", "Education"]);
    }

    #[test]
    fn heading_text_retained_in_content() {
        let d = doc("resume.md", "## Experience\nDefense and automotive.\n");
        let chunks = split_on_headings(&d);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("## Experience"));
        assert!(chunks[0].content.contains("Defense and automotive."));
    }

    #[test]
    fn preamble_before_first_heading_kept() {
        let d = doc("notes.md", "Intro text.\n# First\nBody.\n");
        let chunks = split_on_headings(&d);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "Intro text.");
        assert!(chunks[0].metadata.headers.is_empty());
    }

    #[test]
    fn shallower_heading_resets_deeper_levels() {
        let d = doc(
            "r.md",
            "# A\n## B\n### C\ndeep\n# D\nnew top\n",
        );
        let chunks = split_on_headings(&d);
        let last = chunks.last().unwrap();
        assert_eq!(last.metadata.headers, vec!["D"]);
    }

    #[test]
    fn level_four_headings_are_content() {
        let d = doc("r.md", "# A\n#### not a split point\nbody\n");
        let chunks = split_on_headings(&d);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("#### not a split point"));
    }

    #[test]
    fn fenced_headings_are_content() {
        let d = doc("r.md", "# A\n```\n# inside fence\n```\nafter\n");
        let chunks = split_on_headings(&d);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("# inside fence"));
    }

    #[test]
    fn metadata_propagates_to_all_chunks() {
        let mut meta = ChunkMetadata::for_file("resume.md");
        meta.extra.insert("language".into(), serde_json::json!("en"));
        let d = SourceDocument {
            content: "# A\none\n# B\ntwo\n".into(),
            metadata: meta,
        };
        let chunks = split_on_headings(&d);
        assert_eq!(chunks.len(), 2);
        for c in &chunks {
            assert_eq!(c.metadata.source_filename, "resume.md");
            assert_eq!(c.metadata.extra["language"], "en");
        }
    }

    #[test]
    fn window_split_produces_overlapping_chunks() {
        let text: String = "abcdefghij".repeat(30); // 300 chars
        let d = doc("scan.pdf", &text);
        let chunks = split_by_window(&d, 100, 20);
        assert_eq!(chunks.len(), 4); // starts at 0, 80, 160, 240
        assert_eq!(chunks[0].content.len(), 100);
        // Overlap: the last 20 chars of one chunk open the next
        assert_eq!(chunks[0].content[80..], chunks[1].content[..20]);
    }

    #[test]
    fn window_split_short_document_is_one_chunk() {
        let d = doc("scan.pdf", "short text");
        let chunks = split_by_window(&d, WINDOW_SIZE, WINDOW_OVERLAP);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "short text");
    }

    #[test]
    fn window_split_handles_multibyte_boundaries() {
        let text: String = "é".repeat(250);
        let d = doc("scan.pdf", &text);
        let chunks = split_by_window(&d, 100, 20);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.content.chars().count() <= 100);
        }
    }

    #[test]
    fn dispatch_by_extension() {
        let docs = vec![
            doc("resume.md", "# A\nstructured\n"),
            doc("scan.pdf", "unstructured body"),
        ];
        let chunks = split_documents(&docs);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.headers, vec!["A"]);
        assert!(chunks[1].metadata.headers.is_empty());
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        let d = doc("empty.md", "   \n");
        assert!(split_on_headings(&d).is_empty());
        let d = doc("empty.pdf", "");
        assert!(split_by_window(&d, 100, 20).is_empty());
    }
}
