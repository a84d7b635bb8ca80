//! Descriptor list loading

use std::path::Path;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::decoder::decode;
use crate::models::EndpointDescriptor;

/// Maximum number of characters of a rejected line echoed into the log
const LOG_PREVIEW_CHARS: usize = 50;

/// The descriptor source could not be read at all
#[derive(Debug, Error)]
#[error("descriptor source {path} unavailable: {source}")]
pub struct SourceUnavailable {
    pub path: String,
    #[source]
    pub source: std::io::Error,
}

/// Outcome of parsing a descriptor list
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Successfully decoded descriptors, in source order
    pub descriptors: Vec<EndpointDescriptor>,
    /// Number of non-blank, non-comment lines that failed to decode
    pub rejected: usize,
}

/// Parse descriptor text, one URI per line
///
/// Blank lines and lines starting with `#` are skipped. A line that fails to
/// decode is logged and counted, never aborting the rest of the batch.
pub fn parse_descriptors(text: &str) -> LoadReport {
    let mut report = LoadReport::default();

    for (number, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match decode(trimmed) {
            Ok(descriptor) => report.descriptors.push(descriptor),
            Err(failure) => {
                report.rejected += 1;
                warn!(
                    line = number + 1,
                    preview = %preview(trimmed),
                    "Skipping descriptor: {}",
                    failure
                );
            }
        }
    }

    report
}

/// Read and parse the descriptor file at `path`
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub async fn load(path: impl AsRef<Path>) -> Result<Vec<EndpointDescriptor>, SourceUnavailable> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SourceUnavailable {
            path: path.display().to_string(),
            source,
        })?;

    let report = parse_descriptors(&text);
    debug!(
        "Loaded {} descriptors ({} rejected)",
        report.descriptors.len(),
        report.rejected
    );

    Ok(report.descriptors)
}

fn preview(line: &str) -> String {
    let mut chars = line.chars();
    let head: String = chars.by_ref().take(LOG_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Scheme;

    const SS: &str = "ss://YWVzLTI1Ni1nY206cEBzc0AxOTguNTEuMTAwLjc6ODM4OA==#NodeA";
    const TROJAN: &str = "trojan://pw@t.example.org:443#T";
    const VLESS: &str = "vless://uuid@v.example.org:8443#V";

    #[test]
    fn test_skips_blank_and_comment_lines() {
        let text = format!("\n   \n# comment\n  # indented comment\n{}\n\n", SS);
        let report = parse_descriptors(&text);
        assert_eq!(report.descriptors.len(), 1);
        assert_eq!(report.rejected, 0);
        assert_eq!(report.descriptors[0].scheme(), Scheme::Ss);
    }

    #[test]
    fn test_bad_lines_are_isolated() {
        let bad = ["not-a-uri", "vmess://@@@", "ss://", "trojan://pw@host:notaport"];
        let good = [SS, TROJAN, VLESS];

        // every interleaving order yields the good lines, in order
        let layouts: [&[&str]; 3] = [
            &[bad[0], good[0], bad[1], good[1], bad[2], good[2], bad[3]],
            &[good[0], good[1], good[2], bad[0], bad[1], bad[2], bad[3]],
            &[bad[3], bad[2], bad[1], bad[0], good[0], good[1], good[2]],
        ];

        for layout in layouts {
            let report = parse_descriptors(&layout.join("\n"));
            assert_eq!(report.descriptors.len(), good.len());
            assert_eq!(report.rejected, bad.len());
            let raws: Vec<&str> = report.descriptors.iter().map(|d| d.raw_uri()).collect();
            assert_eq!(raws, good);
        }
    }

    #[test]
    fn test_handles_crlf_line_endings() {
        let text = format!("{}\r\n{}\r\n", SS, TROJAN);
        let report = parse_descriptors(&text);
        assert_eq!(report.descriptors.len(), 2);
        assert_eq!(report.descriptors[1].raw_uri(), TROJAN);
    }

    #[test]
    fn test_preview_truncates_long_lines() {
        let long = "x".repeat(80);
        assert_eq!(preview(&long), format!("{}...", "x".repeat(50)));
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn test_load_missing_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path().join("absent.txt")).await.unwrap_err();
        assert_eq!(err.source.kind(), std::io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_load_empty_file_is_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.txt");
        tokio::fs::write(&path, "").await.unwrap();

        let descriptors = load(&path).await.unwrap();
        assert!(descriptors.is_empty());
    }

    #[tokio::test]
    async fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.txt");
        tokio::fs::write(&path, format!("{}\nbogus\n{}", SS, VLESS))
            .await
            .unwrap();

        let descriptors = load(&path).await.unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[1].host(), "v.example.org");
    }
}
