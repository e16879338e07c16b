//! Artifact: an ingested input binary, immutable after ingestion.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::address::Address;
use crate::core::section::Section;

/// Detected container format of the input bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactFormat {
    LoadModule,
    ProgramObject,
    Unknown,
}

impl std::fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArtifactFormat::LoadModule => "load-module",
            ArtifactFormat::ProgramObject => "program-object",
            ArtifactFormat::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// A single analysis unit: one input binary plus everything recovered by
/// ingestion. Immutable once constructed — nothing downstream mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Filename stem (no directory, no extension).
    pub id: String,
    /// SHA-256 of the raw input bytes, hex-encoded. Reporting metadata only
    /// — never consulted by any analysis decision, so it cannot affect
    /// determinism of the result tree.
    pub content_hash: String,
    pub format: ArtifactFormat,
    pub sections: Vec<Section>,
    pub entry_points: Vec<Address>,
}

impl Artifact {
    /// Ingest raw bytes into an `Artifact`. Format detection is best-effort
    /// by leading-byte heuristics; on failure the entire input becomes one
    /// `unknown`-format section based at address 0.
    pub fn ingest(bytes: &[u8], filename: &str) -> Self {
        let id = stem(filename);
        let content_hash = hex::encode(Sha256::digest(bytes));

        let (format, entry_points) = detect_format(bytes);

        let sections = if bytes.is_empty() {
            Vec::new()
        } else {
            vec![Section::new("", Address::ZERO, bytes.to_vec())]
        };

        Artifact {
            id,
            content_hash,
            format,
            sections,
            entry_points,
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.sections.iter().map(|s| s.len() as u64).sum()
    }

    /// Find the section (if any) containing `addr`, in section order.
    pub fn section_containing(&self, addr: Address) -> Option<&Section> {
        self.sections.iter().find(|s| s.contains(addr))
    }
}

fn stem(filename: &str) -> String {
    let base = filename.rsplit('/').next().unwrap_or(filename);
    match base.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
        _ => base.to_string(),
    }
}

/// Best-effort container format detection. Real z/OS load modules and
/// program objects carry IEW-family headers (IEWBIND/binder "PMAR" record
/// for program objects, ESD/RLD/TXT/END card-image records for classic load
/// modules); without the external mainframe-side extraction step those
/// headers are not reliably present in a bare byte stream, so detection here
/// is conservative and falls back to `Unknown` whenever the leading bytes
/// don't match a recognized signature.
fn detect_format(bytes: &[u8]) -> (ArtifactFormat, Vec<Address>) {
    if bytes.len() >= 4 && &bytes[0..4] == b"PGMO" {
        (ArtifactFormat::ProgramObject, Vec::new())
    } else if bytes.len() >= 4 && &bytes[0..4] == b"LMOD" {
        (ArtifactFormat::LoadModule, Vec::new())
    } else {
        (ArtifactFormat::Unknown, Vec::new())
    }
}
