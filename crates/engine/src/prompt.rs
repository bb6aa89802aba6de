//! System instruction loading.

use std::path::Path;
use tracing::error;

/// Built-in instruction used when the prompt file cannot be read.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are the assistant on Michael Schlosser's \
portfolio website. You answer visitor questions about Michael's background, skills, and \
career, and you help visitors get in touch with him. Be friendly and concise.";

/// Load the system instruction from `path`.
///
/// A missing or unreadable file is reported and replaced by the built-in
/// default so the assistant can still serve.
pub fn load_system_instruction(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            error!(path = %path.display(), error = %e, "System prompt file not found, using fallback");
            DEFAULT_SYSTEM_INSTRUCTION.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_file_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system_prompt.md");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "Custom instruction.").unwrap();

        let loaded = load_system_instruction(&path);
        assert!(loaded.contains("Custom instruction."));
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let loaded = load_system_instruction(Path::new("/nonexistent/prompt.md"));
        assert_eq!(loaded, DEFAULT_SYSTEM_INSTRUCTION);
    }
}
