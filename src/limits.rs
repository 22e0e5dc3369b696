//! nofile limits reconciliation for the security limits file.
//!
//! The profile carries up to six `LIMIT_n` lines, one per identity
//! (domain, soft|hard). Reconciliation guarantees at most one nofile line
//! per identity in the target file: stale lines for a configured identity
//! are dropped and the configured line appended. Identities the profile
//! does not mention are left untouched, and nothing is ever snapshotted
//! for this class; limits.conf edits stay in place across a revert.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::Sysconfig;
use crate::core::{Result, TuneError};

pub const DEFAULT_LIMITS_PATH: &str = "/etc/security/limits.conf";

/// Group domains carrying SAP processes.
pub const LIMIT_DOMAINS: [&str; 3] = ["@sapsys", "@sdba", "@dba"];
pub const LIMIT_TYPES: [&str; 2] = ["soft", "hard"];

/// One `<domain> <soft|hard> <item> <value>` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UlimitRule {
    pub domain: String,
    pub kind: String,
    pub item: String,
    pub value: String,
}

impl UlimitRule {
    /// Parse a limits-file line; anything but exactly four fields is not a
    /// rule (comments, blanks, continuation junk).
    pub fn parse(line: &str) -> Option<UlimitRule> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() != 4 {
            return None;
        }
        Some(UlimitRule {
            domain: fields[0].to_string(),
            kind: fields[1].to_string(),
            item: fields[2].to_string(),
            value: fields[3].to_string(),
        })
    }

    fn matches_identity(&self, domain: &str, kind: &str) -> bool {
        self.domain == domain && self.kind == kind && self.item == "nofile"
    }

    fn render(&self) -> String {
        format!("{} {} {} {}", self.domain, self.kind, self.item, self.value)
    }
}

/// The nofile rules the profile configures, from `LIMIT_1`..`LIMIT_6`.
pub fn configured_rules(config: &Sysconfig) -> Vec<UlimitRule> {
    (1..=6)
        .filter_map(|i| config.get_str(&format!("LIMIT_{}", i)))
        .filter_map(UlimitRule::parse)
        .filter(|r| r.item == "nofile")
        .collect()
}

/// Merge `rules` into the limits file at `path`, atomically rewriting it
/// when anything changed.
pub fn reconcile(path: &Path, rules: &[UlimitRule], dry_run: bool) -> Result<()> {
    let raw = fs::read_to_string(path)
        .map_err(|e| TuneError::IoError(format!("cannot read '{}': {}", path.display(), e)))?;
    let updated = reconcile_content(&raw, rules);
    if updated == raw {
        info!("limits file {} already reconciled", path.display());
        return Ok(());
    }
    if dry_run {
        info!("limits file {} needs updating (dry run)", path.display());
        return Ok(());
    }

    let dir = path.parent().ok_or_else(|| {
        TuneError::IoError(format!("limits path '{}' has no parent", path.display()))
    })?;
    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| TuneError::IoError(format!("cannot create temp file in '{}': {}", dir.display(), e)))?;
    tmp.write_all(updated.as_bytes())
        .map_err(|e| TuneError::IoError(format!("cannot write '{}': {}", path.display(), e)))?;
    tmp.persist(path)
        .map_err(|e| TuneError::IoError(format!("cannot replace '{}': {}", path.display(), e)))?;

    info!("limits file {} reconciled ({} rules)", path.display(), rules.len());
    Ok(())
}

/// Pure reconciliation over file text, one pass per identity.
pub fn reconcile_content(raw: &str, rules: &[UlimitRule]) -> String {
    let mut lines: Vec<String> = raw.lines().map(String::from).collect();

    for domain in LIMIT_DOMAINS {
        for kind in LIMIT_TYPES {
            let Some(configured) = rules.iter().find(|r| r.matches_identity(domain, kind)) else {
                // Nothing configured for this identity, leave the file alone.
                debug!("no configured nofile limit for {} {}", domain, kind);
                continue;
            };
            lines.retain(|line| {
                UlimitRule::parse(line)
                    .map(|r| !r.matches_identity(domain, kind))
                    .unwrap_or(true)
            });
            lines.push(configured.render());
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
