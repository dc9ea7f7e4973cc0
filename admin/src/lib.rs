//! Offline tooling for issuing promo codes and answering support questions.
//!
//! Everything here runs on an operator's machine, never in the shipped app.
//! Plaintext codes only exist in this tool's output.

use anyhow::{bail, ensure, Context, Result};
use promogate_crypto::{set_contains, CodeDigest, CodeGenerator, SecureRandom};
use promogate_redeem::{
    Collaborators, Grant, HashRegistry, MemoryEntitlements, RedeemError, RedemptionConfig,
    RedemptionEvent, RedemptionService, Rejection,
};
use promogate_types::{CanonicalCode, CodeType};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

const MAX_ISSUE_ROUNDS: usize = 4;

/// Newly minted codes and the registry that includes them.
#[derive(Debug)]
pub struct Issued {
    pub code_type: CodeType,
    pub codes: Vec<CanonicalCode>,
    pub registry: HashRegistry,
}

/// A code's canonical form and digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashedCode {
    pub canonical: CanonicalCode,
    pub code_type: Option<CodeType>,
    pub digest: String,
}

/// What a redemption would do against a given registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DryRunOutcome {
    Granted { grant: Grant },
    Rejected { reason: Rejection, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DryRunReport {
    #[serde(flatten)]
    pub outcome: DryRunOutcome,
    pub events: Vec<RedemptionEvent>,
}

/// Loads a registry file, or the built-in registry when `path` is `None`.
///
/// A path that does not exist yet yields an empty registry so the first
/// issuance can create it.
pub fn load_registry(path: Option<&Path>) -> Result<HashRegistry> {
    let Some(path) = path else {
        debug!("Using built-in registry");
        return Ok(HashRegistry::builtin());
    };
    if !path.exists() {
        info!("No registry at {:?}, starting empty", path);
        return Ok(HashRegistry::default());
    }
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read registry {}", path.display()))?;
    HashRegistry::from_json(&json)
        .with_context(|| format!("Failed to parse registry {}", path.display()))
}

/// Writes a registry as pretty-printed JSON.
pub fn save_registry(registry: &HashRegistry, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&registry.to_file())?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote registry to {:?}", path);
    Ok(())
}

/// Mints `count` codes of `code_type` and appends their digests to a copy
/// of `shipped`.
///
/// Codes whose digest is already registered anywhere are redrawn. The
/// result is checked to still contain every shipped digest.
pub fn issue_codes<R: SecureRandom>(
    generator: &CodeGenerator<R>,
    shipped: &HashRegistry,
    code_type: CodeType,
    count: usize,
) -> Result<Issued> {
    ensure!(count > 0, "count must be at least 1");

    let mut codes: Vec<CanonicalCode> = Vec::with_capacity(count);
    let mut drawn = BTreeSet::new();

    for round in 1..=MAX_ISSUE_ROUNDS {
        let batch = generator.generate_batch(code_type, count - codes.len(), &drawn)?;
        for code in batch {
            drawn.insert(code.clone());
            if is_registered(shipped, &CodeDigest::of(&code)) {
                warn!(round, "Generated code collides with a registered digest, redrawing");
                continue;
            }
            codes.push(code);
        }
        if codes.len() == count {
            break;
        }
    }
    if codes.len() < count {
        bail!(
            "only {} of {count} unregistered codes after {MAX_ISSUE_ROUNDS} rounds",
            codes.len()
        );
    }

    let mut registry = shipped.clone();
    registry.append(code_type, codes.iter().map(CodeDigest::of));
    ensure!(
        registry.is_superset_of(shipped),
        "new registry dropped a shipped digest"
    );

    info!(code_type = %code_type, count, "Issued codes");
    Ok(Issued {
        code_type,
        codes,
        registry,
    })
}

/// Normalizes and hashes a code.
pub fn hash_code(raw: &str) -> Result<HashedCode> {
    let canonical = CanonicalCode::normalize(raw);
    if canonical.is_empty() {
        bail!("code is empty after normalization");
    }
    Ok(HashedCode {
        code_type: CodeType::classify(&canonical),
        digest: CodeDigest::of(&canonical).to_hex(),
        canonical,
    })
}

/// Redeems `raw` against `registry` with in-memory state and reports what
/// happened. Nothing is persisted.
pub fn dry_run(registry: HashRegistry, config: RedemptionConfig, raw: &str) -> Result<DryRunReport> {
    let entitlements = Arc::new(MemoryEntitlements::new());
    let service = RedemptionService::new(registry, config, Collaborators::in_memory(entitlements))?;
    let mut receiver = service.subscribe();

    let outcome = match service.redeem(raw) {
        Ok(grant) => DryRunOutcome::Granted { grant },
        Err(RedeemError::Rejected(reason)) => DryRunOutcome::Rejected {
            reason,
            message: reason.to_string(),
        },
        Err(e) => return Err(e.into()),
    };

    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    Ok(DryRunReport { outcome, events })
}

fn is_registered(registry: &HashRegistry, digest: &CodeDigest) -> bool {
    let needle = digest.as_bytes();
    let mut found = false;
    for code_type in CodeType::ALL {
        found |= set_contains(registry.digests(code_type), needle);
    }
    found | set_contains(registry.legacy_digests(), needle)
}
