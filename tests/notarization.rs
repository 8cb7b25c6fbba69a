mod fixtures;

use std::fs;

use fixtures::{FakeIssuer, TestFixtures};
use pdf_notary::config::NotaryConfig;
use pdf_notary::error::{Error, PresentationError};
use pdf_notary::hash_utils::HashAlgorithm;
use pdf_notary::issuer::HmacIssuer;
use pdf_notary::presentation::{DonationShare, PresentationSpec};
use pdf_notary::reconstructor::Reconstructor;
use pdf_notary::types::Verdict;
use pdf_notary::{Notary, ProofExtractor};

fn presentation() -> PresentationSpec {
    PresentationSpec::new("0x52908400098527886E0F7030069857D2E4169EE7")
        .with_split(vec![DonationShare::new("Author", 98), DonationShare::new("Platform", 2)])
        .with_notes("Thank you for reading.")
}

fn notary() -> Notary {
    Notary::new(NotaryConfig::default()).unwrap()
}

#[test]
fn test_round_trip_matches() {
    let notary = notary();
    let raw = notary.build_raw(&TestFixtures::multi_page(&["Hello", "World"])).unwrap();
    let notarized = notary.notarize(&raw, &FakeIssuer, "urn:publication:1", &presentation()).unwrap();
    assert_eq!(notarized.page_count(), raw.page_count() + 1);

    let result = notary.verify(notarized.bytes());
    assert_eq!(result.verdict, Verdict::Match, "{:?}", result.reason);
    assert_eq!(result.recovered_fingerprint.as_ref(), Some(raw.content_fingerprint()));
    assert_eq!(result.claimed_fingerprint, Some(raw.content_fingerprint().to_string()));

    let proof = result.proof.unwrap();
    assert_eq!(proof.as_value()["credentialSubject"]["id"], "urn:publication:1");
    assert_eq!(proof.as_value()["credentialSubject"]["pageCount"], 2);
}

#[test]
fn test_reconstruction_is_byte_identical() {
    let notary = notary();
    let raw = notary.build_raw(&TestFixtures::single_page("Hello")).unwrap();
    let notarized = notary.notarize(&raw, &FakeIssuer, "urn:publication:2", &presentation()).unwrap();
    let rebuilt = Reconstructor::new(notary.config()).reconstruct(notarized.bytes()).unwrap();
    assert_eq!(rebuilt, raw);
}

#[test]
fn test_hello_hallo_is_tampered() {
    let notary = notary();
    let raw = notary.build_raw(&TestFixtures::single_page("Hello")).unwrap();
    let notarized = notary.notarize(&raw, &FakeIssuer, "urn:publication:3", &presentation()).unwrap();

    let edited = TestFixtures::edit_first_page(notarized.bytes(), "Hello", "Hallo");
    let result = notary.verify(&edited);
    assert_eq!(result.verdict, Verdict::Tampered);
    assert_ne!(result.recovered_fingerprint.as_ref(), Some(raw.content_fingerprint()));
    assert!(result.proof.is_some());
}

#[test]
fn test_raw_document_has_no_proof() {
    let notary = notary();
    let raw = notary.build_raw(&TestFixtures::multi_page(&["a", "b"])).unwrap();
    let result = notary.verify(raw.bytes());
    assert_eq!(result.verdict, Verdict::Malformed);
    assert!(result.proof.is_none());
    assert!(result.reason.is_some());
}

#[test]
fn test_single_page_cannot_be_reconstructed() {
    let notary = notary();
    let raw = notary.build_raw(&TestFixtures::single_page("Hello")).unwrap();
    let err = Reconstructor::new(notary.config()).reconstruct(raw.bytes()).unwrap_err();
    assert!(matches!(err, Error::MalformedDocument(_)));
}

#[test]
fn test_presentation_errors_surface() {
    let notary = notary();
    let raw = notary.build_raw(&TestFixtures::single_page("Hello")).unwrap();

    let bad_address = PresentationSpec::new("");
    let err = notary.notarize(&raw, &FakeIssuer, "urn:x", &bad_address).unwrap_err();
    assert!(matches!(err, Error::PresentationError(PresentationError::InvalidAddress(_))));

    let bad_split = presentation().with_split(vec![DonationShare::new("A", 70), DonationShare::new("B", 31)]);
    let err = notary.notarize(&raw, &FakeIssuer, "urn:x", &bad_split).unwrap_err();
    assert!(matches!(err, Error::PresentationError(PresentationError::InvalidSplit(_))));

    let bad_notice = presentation().with_notice("Send to {{nobody}}");
    let err = notary.notarize(&raw, &FakeIssuer, "urn:x", &bad_notice).unwrap_err();
    assert!(matches!(err, Error::PresentationError(PresentationError::UnknownPlaceholder(_))));
}

#[test]
fn test_hmac_issuer_proof_verifies() {
    let notary = notary();
    let issuer = HmacIssuer::new("did:example:notary", b"integration-key".to_vec()).unwrap();
    let raw = notary.build_raw(&TestFixtures::single_page("Signed")).unwrap();
    let notarized = notary.notarize(&raw, &issuer, "urn:publication:4", &presentation()).unwrap();

    let result = notary.verify(notarized.bytes());
    assert_eq!(result.verdict, Verdict::Match);
    assert!(issuer.check(result.proof.as_ref().unwrap()).unwrap());

    let payload = ProofExtractor::new(notary.config()).extract_proof(notarized.bytes()).unwrap();
    assert_eq!(payload.mime_type, "application/json");
}

#[test]
fn test_sha256_configuration() {
    let mut config = NotaryConfig::default();
    config.fingerprint.algorithm = HashAlgorithm::Sha256;
    let notary = Notary::new(config).unwrap();
    let raw = notary.build_raw(&TestFixtures::single_page("Hello")).unwrap();
    let notarized = notary.notarize(&raw, &FakeIssuer, "urn:publication:5", &presentation()).unwrap();

    let result = notary.verify(notarized.bytes());
    assert_eq!(result.verdict, Verdict::Match);
    assert!(result.claimed_fingerprint.unwrap().starts_with("sha256:"));
}

#[test]
fn test_batch_keeps_input_order() {
    let notary = notary();
    let raw = notary.build_raw(&TestFixtures::single_page("Hello")).unwrap();
    let notarized = notary.notarize(&raw, &FakeIssuer, "urn:publication:6", &presentation()).unwrap();
    let tampered = TestFixtures::edit_first_page(notarized.bytes(), "Hello", "Hallo");

    let documents = vec![
        notarized.bytes().to_vec(),
        raw.bytes().to_vec(),
        tampered,
        b"garbage".to_vec(),
    ];
    let verdicts: Vec<Verdict> = notary.verify_batch(&documents).into_iter().map(|r| r.verdict).collect();
    assert_eq!(
        verdicts,
        vec![Verdict::Match, Verdict::Malformed, Verdict::Tampered, Verdict::Malformed]
    );
}

#[test]
fn test_notarize_file_moves_outputs_and_cleans_scratch() {
    let workspace = tempfile::tempdir().unwrap();
    let scratch_root = workspace.path().join("scratch");
    let out_dir = workspace.path().join("out");
    let input = workspace.path().join("upload.pdf");
    fs::write(&input, TestFixtures::single_page("Hello")).unwrap();

    let mut config = NotaryConfig::default();
    config.scratch.root = Some(scratch_root.clone());
    let notary = Notary::new(config).unwrap();

    let files = notary
        .notarize_file(&input, &out_dir, "my-book", &FakeIssuer, "urn:publication:7", &presentation())
        .unwrap();
    assert_eq!(files.raw_path, out_dir.join("my-book.raw.pdf"));
    assert_eq!(files.notarized_path, out_dir.join("my-book.pdf"));
    assert_eq!(fs::read(&files.raw_path).unwrap(), files.raw.bytes());
    assert_eq!(notary.verify(&fs::read(&files.notarized_path).unwrap()).verdict, Verdict::Match);
    assert_eq!(fs::read_dir(&scratch_root).unwrap().count(), 0);
}

#[test]
fn test_failed_notarize_file_leaves_nothing_behind() {
    let workspace = tempfile::tempdir().unwrap();
    let scratch_root = workspace.path().join("scratch");
    let out_dir = workspace.path().join("out");
    let input = workspace.path().join("broken.pdf");
    fs::write(&input, b"not a pdf").unwrap();

    let mut config = NotaryConfig::default();
    config.scratch.root = Some(scratch_root.clone());
    let notary = Notary::new(config).unwrap();

    let err = notary
        .notarize_file(&input, &out_dir, "broken", &FakeIssuer, "urn:x", &presentation())
        .unwrap_err();
    assert!(matches!(err, Error::MalformedDocument(_)));
    assert_eq!(fs::read_dir(&scratch_root).unwrap().count(), 0);
    assert!(!out_dir.exists());

    // Presentation failures happen after the raw file was staged
    let input = workspace.path().join("ok.pdf");
    fs::write(&input, TestFixtures::single_page("Hello")).unwrap();
    let err = notary
        .notarize_file(&input, &out_dir, "ok", &FakeIssuer, "urn:x", &PresentationSpec::new("bad address"))
        .unwrap_err();
    assert!(matches!(err, Error::PresentationError(_)));
    assert_eq!(fs::read_dir(&scratch_root).unwrap().count(), 0);
    assert!(!out_dir.exists());
}

#[test]
fn test_failed_second_move_removes_raw_output() {
    let workspace = tempfile::tempdir().unwrap();
    let scratch_root = workspace.path().join("scratch");
    let out_dir = workspace.path().join("out");
    let input = workspace.path().join("upload.pdf");
    fs::write(&input, TestFixtures::single_page("Hello")).unwrap();
    // A directory where the notarized file should land makes the final move fail
    fs::create_dir_all(out_dir.join("blocked.pdf")).unwrap();

    let mut config = NotaryConfig::default();
    config.scratch.root = Some(scratch_root.clone());
    let notary = Notary::new(config).unwrap();

    let result = notary.notarize_file(&input, &out_dir, "blocked", &FakeIssuer, "urn:x", &presentation());
    assert!(matches!(result, Err(Error::Io(_))));
    assert!(!out_dir.join("blocked.raw.pdf").exists());
    assert!(out_dir.join("blocked.pdf").is_dir());
    assert_eq!(fs::read_dir(&scratch_root).unwrap().count(), 0);
}

#[test]
fn test_real_media_box_round_trip_matches() {
    let notary = notary();
    let raw = notary
        .build_raw(&TestFixtures::scaled_form(0.501, 595.276, 841.89))
        .unwrap();
    let notarized = notary.notarize(&raw, &FakeIssuer, "urn:publication:a4", &presentation()).unwrap();
    let rebuilt = Reconstructor::new(notary.config()).reconstruct(notarized.bytes()).unwrap();
    assert_eq!(rebuilt, raw);

    let result = notary.verify(notarized.bytes());
    assert_eq!(result.verdict, Verdict::Match, "{:?}", result.reason);
}

#[test]
fn test_bad_slug_rejected() {
    let workspace = tempfile::tempdir().unwrap();
    let input = workspace.path().join("upload.pdf");
    fs::write(&input, TestFixtures::single_page("Hello")).unwrap();
    let err = notary()
        .notarize_file(&input, workspace.path(), "../escape", &FakeIssuer, "urn:x", &presentation())
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
