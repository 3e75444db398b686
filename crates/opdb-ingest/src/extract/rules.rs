//! Per-record identifier rules
//!
//! Single-record statement of what each extraction pass produces. The passes
//! themselves run as set-based SQL over the whole table; these functions are
//! the same rules applied to one record, used to predict and check what the
//! database derives.

use crate::catalog::IdentifierType;
use crate::error::{IngestError, Result};
use regex::Regex;

/// One parenthesised group, non-greedy up to the first closing parenthesis.
pub const PAREN_GROUP_PATTERN: &str = r"\(([^)]+)\)";

/// The protein fields the extraction passes read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProteinFields {
    pub entry: String,
    pub gene_names_primary: String,
    pub gene_names_synonym: String,
    pub protein_names: String,
}

pub struct NameRules {
    paren_group: Regex,
}

impl NameRules {
    pub fn new() -> Result<Self> {
        let paren_group = Regex::new(PAREN_GROUP_PATTERN)
            .map_err(|e| IngestError::Config(format!("invalid name pattern: {}", e)))?;
        Ok(Self { paren_group })
    }

    /// Substring before the first `(`, or the whole field, trimmed.
    pub fn protein_primary_name<'f>(&self, field: &'f str) -> Option<&'f str> {
        let head = field.split('(').next().unwrap_or("").trim();
        (!head.is_empty()).then_some(head)
    }

    /// Every parenthesised group, trimmed, empty groups dropped.
    pub fn protein_alternative_names<'f>(&self, field: &'f str) -> Vec<&'f str> {
        self.paren_group
            .captures_iter(field)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// All derived identifiers of one record, in pass order.
    pub fn derive(&self, protein: &ProteinFields) -> Vec<(IdentifierType, String)> {
        let mut out = Vec::new();

        let entry = protein.entry.trim();
        if !entry.is_empty() {
            out.push((IdentifierType::UniprotAccession, entry.to_string()));
        }

        let primary = protein.gene_names_primary.trim();
        if !primary.is_empty() {
            out.push((IdentifierType::GenePrimary, primary.to_string()));
        }

        out.extend(
            gene_synonyms(&protein.gene_names_synonym)
                .into_iter()
                .map(|s| (IdentifierType::GeneSynonym, s.to_string())),
        );

        if let Some(name) = self.protein_primary_name(&protein.protein_names) {
            out.push((IdentifierType::ProteinPrimary, name.to_string()));
        }

        out.extend(
            self.protein_alternative_names(&protein.protein_names)
                .into_iter()
                .map(|s| (IdentifierType::ProteinAlternative, s.to_string())),
        );

        out
    }
}

/// Whitespace-separated tokens; runs of whitespace never yield empty tokens.
pub fn gene_synonyms(field: &str) -> Vec<&str> {
    field.split_whitespace().collect()
}
