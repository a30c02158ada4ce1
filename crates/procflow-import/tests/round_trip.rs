//! Property tests: round-trip stability and tolerance of damaged documents

use pretty_assertions::assert_eq;
use procflow_import::{ImportConfig, Importer};
use procflow_test_utils::{connect, document, fixture_registry, fixture_rules, legacy_document, operator, parameter};
use proptest::prelude::*;
use std::sync::Arc;

fn importer() -> Importer {
    Importer::new(ImportConfig::default())
        .with_operators(Arc::new(fixture_registry()))
        .with_rules(Arc::new(fixture_rules()))
}

const KINDS: [&str; 3] = ["a", "b", "foo"];
const COMPATIBILITY: [Option<&str>; 4] = [None, Some("5.0.000"), Some("6.0.000"), Some("7.0.000")];

#[derive(Debug, Clone)]
struct Entry {
    kind: usize,
    compatibility: usize,
    size: Option<String>,
}

fn entry() -> impl Strategy<Value = Entry> {
    (0..KINDS.len(), 0..COMPATIBILITY.len(), proptest::option::of("[a-z0-9]{0,8}")).prop_map(
        |(kind, compatibility, size)| Entry {
            kind,
            compatibility,
            size,
        },
    )
}

fn body(specs: &[Entry]) -> String {
    let mut body = String::new();
    for (i, spec) in specs.iter().enumerate() {
        let compatibility = COMPATIBILITY[spec.compatibility]
            .map(|v| format!(r#" compatibility="{v}""#))
            .unwrap_or_default();
        let params = spec.size.as_deref().map(|s| parameter("size", s)).unwrap_or_default();
        body.push_str(&format!(
            r#"<operator name="Op{i}" class="{}"{compatibility}>{params}</operator>"#,
            KINDS[spec.kind]
        ));
    }
    for (i, pair) in specs.windows(2).enumerate() {
        let has_output = KINDS[pair[0].kind] != "b";
        let has_input = KINDS[pair[1].kind] != "a";
        if has_output && has_input {
            body.push_str(&connect(Some(&format!("Op{i}")), "out", Some(&format!("Op{}", i + 1)), "in"));
        }
    }
    body
}

proptest! {
    #[test]
    fn prop_export_import_is_stable(
        specs in proptest::collection::vec(entry(), 0..8),
        version in prop_oneof![Just("5.0.000"), Just("9.0.000")],
    ) {
        let importer = importer();
        let exporter = importer.exporter();

        let first = importer.import_str(&document(Some(version), &body(&specs))).unwrap();
        let exported = exporter.render(&first.document).unwrap();
        let second = importer.import_str(&exported).unwrap();

        prop_assert_eq!(&second.document.root, &first.document.root);
        prop_assert_eq!(exporter.render(&second.document).unwrap(), exported);
    }

    #[test]
    fn prop_damaged_documents_still_load(
        entries in proptest::collection::vec(
            (
                prop::sample::select(vec!["a", "b", "foo", "chain", "branch", "mystery", "old_foo", "process"]),
                prop::sample::select(vec!["X", "Y", "Z"]),
                prop::sample::select(vec!["true", "no", "maybe"]),
                prop::sample::select(vec!["", "4.0", "garbage", "6.0.000"]),
                any::<bool>(),
            ),
            0..10,
        ),
        links in proptest::collection::vec(
            (
                prop::sample::select(vec![None, Some("X"), Some("Y"), Some("W")]),
                prop::sample::select(vec!["in", "out", "in 1", "out 1", "bogus"]),
                prop::sample::select(vec![None, Some("X"), Some("Z"), Some("W")]),
                prop::sample::select(vec!["in", "out", "result 1", "bogus"]),
            ),
            0..8,
        ),
        legacy in any::<bool>(),
    ) {
        let mut body = String::new();
        for (class, name, activated, compatibility, nested) in &entries {
            let compatibility = if compatibility.is_empty() {
                String::new()
            } else {
                format!(r#" compatibility="{compatibility}""#)
            };
            let inner = if *nested {
                format!(
                    "{}<process>{}</process>",
                    parameter("trivial", "true"),
                    operator(name, "a", "")
                )
            } else {
                String::new()
            };
            body.push_str(&format!(
                r#"<operator name="{name}" class="{class}" activated="{activated}"{compatibility}>{inner}</operator>"#
            ));
        }
        for (from_op, from_port, to_op, to_port) in &links {
            body.push_str(&connect(*from_op, from_port, *to_op, to_port));
        }

        let text = if legacy { legacy_document("4.0.000", &body) } else { document(None, &body) };
        let importer = importer();
        let outcome = importer.import_str(&text);
        prop_assert!(outcome.is_ok(), "{:?}", outcome.as_ref().err());
        if let Ok(outcome) = outcome {
            prop_assert!(outcome.diagnostics.iter().all(|d| !d.message.is_empty()));
            prop_assert!(importer.exporter().render(&outcome.document).is_ok());
        }
    }
}

#[test]
fn minimal_document_is_written_in_current_layout() {
    let importer = importer();
    let text = importer
        .exporter()
        .render(&importer.import_str(&document(Some("9.0.000"), "")).unwrap().document)
        .unwrap();
    assert!(text.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(text.contains(r#"<process version="9.0.000">"#));
    assert!(text.contains(
        r#"<operator activated="true" class="process" compatibility="9.0.000" expanded="true" name="Process">"#
    ));
    assert!(text.contains(r#"<process expanded="true"/>"#));
    assert_eq!(text.matches("<operator ").count(), 1);
}
