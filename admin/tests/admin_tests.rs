use promogate_admin::{
    dry_run, hash_code, issue_codes, load_registry, save_registry, DryRunOutcome,
};
use promogate_crypto::{CodeDigest, CodeGenerator, OsSecureRandom};
use promogate_redeem::{HashRegistry, RedemptionConfig, RedemptionEvent, Rejection};
use promogate_types::{CanonicalCode, CodeType};
use std::collections::BTreeSet;

fn small_registry() -> HashRegistry {
    HashRegistry::from_codes(&["LTAB12CD34"], &["MOAB12CD34"], &[])
}

#[test]
fn issue_appends_new_digests() {
    let generator = CodeGenerator::new(OsSecureRandom);
    let shipped = small_registry();

    let issued = issue_codes(&generator, &shipped, CodeType::TimeLimited, 25).unwrap();

    assert_eq!(issued.codes.len(), 25);
    assert_eq!(issued.registry.len(), shipped.len() + 25);
    assert!(issued.registry.is_superset_of(&shipped));
    let distinct: BTreeSet<_> = issued.codes.iter().collect();
    assert_eq!(distinct.len(), 25);
    for code in &issued.codes {
        assert_eq!(CodeType::classify(code), Some(CodeType::TimeLimited));
        assert!(issued
            .registry
            .digests(CodeType::TimeLimited)
            .contains(&CodeDigest::of(code)));
    }
}

#[test]
fn issued_codes_redeem() {
    let generator = CodeGenerator::new(OsSecureRandom);
    let issued = issue_codes(&generator, &HashRegistry::default(), CodeType::Lifetime, 3).unwrap();

    let code = issued.codes[1].display_form();
    let report = dry_run(issued.registry, RedemptionConfig::default(), &code).unwrap();
    assert!(matches!(report.outcome, DryRunOutcome::Granted { .. }));
}

#[test]
fn zero_count_is_refused() {
    let generator = CodeGenerator::new(OsSecureRandom);
    assert!(issue_codes(&generator, &small_registry(), CodeType::Lifetime, 0).is_err());
}

#[test]
fn registry_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("registry.json");
    let registry = small_registry();

    save_registry(&registry, &path).unwrap();
    let loaded = load_registry(Some(&path)).unwrap();
    assert_eq!(loaded.to_file(), registry.to_file());

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(!text.contains("LTAB12CD34"));
}

#[test]
fn missing_registry_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = load_registry(Some(&dir.path().join("new.json"))).unwrap();
    assert!(loaded.is_empty());
}

#[test]
fn corrupt_registry_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.json");
    std::fs::write(&path, "{ nope").unwrap();
    assert!(load_registry(Some(&path)).is_err());
}

#[test]
fn no_path_means_builtin() {
    let loaded = load_registry(None).unwrap();
    assert_eq!(loaded.len(), HashRegistry::builtin().len());
}

#[test]
fn hash_normalizes_and_classifies() {
    let hashed = hash_code(" lt-ab12-cd34 ").unwrap();
    assert_eq!(hashed.canonical, CanonicalCode::normalize("LTAB12CD34"));
    assert_eq!(hashed.code_type, Some(CodeType::Lifetime));
    assert_eq!(hashed.digest, CodeDigest::of(&hashed.canonical).to_hex());

    assert_eq!(hash_code("WELCOME").unwrap().code_type, None);
    assert!(hash_code(" - ").is_err());
}

#[test]
fn dry_run_reports_rejection_and_event() {
    let report = dry_run(small_registry(), RedemptionConfig::default(), "LT-FAKE-CODE").unwrap();

    assert_eq!(
        report.outcome,
        DryRunOutcome::Rejected {
            reason: Rejection::UnrecognizedCode,
            message: "invalid code".into(),
        }
    );
    assert!(matches!(
        report.events.as_slice(),
        [RedemptionEvent::Rejected {
            reason: Rejection::UnrecognizedCode,
            ..
        }]
    ));
}

#[test]
fn dry_run_report_serializes_flat() {
    let report = dry_run(small_registry(), RedemptionConfig::default(), "mo-ab12-cd34").unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["outcome"], "granted");
    assert_eq!(json["grant"]["code_type"], "time_limited");
    assert_eq!(json["events"][0]["event"], "redeemed");
}
