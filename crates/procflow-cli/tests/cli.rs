use pretty_assertions::assert_eq;
use procflow_cli::{check, command, migrate, run, Sources};
use procflow_test_utils::{document, operator, parameter, FIXTURE_CATALOG, FIXTURE_RULES};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let workspace = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        workspace.write("catalog.yaml", FIXTURE_CATALOG);
        workspace.write("rules.yaml", FIXTURE_RULES);
        workspace
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, text: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    fn sources(&self) -> Sources {
        Sources {
            catalogs: vec![self.path("catalog.yaml")],
            rules: vec![self.path("rules.yaml")],
            config: None,
        }
    }

    fn arg(&self, name: &str) -> String {
        path_arg(&self.path(name))
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn check_reports_each_file_in_order() {
    let ws = Workspace::new();
    let good = ws.write("good.xml", &document(Some("5.0.000"), &operator("F", "foo", "")));
    let bad = ws.write("bad.xml", &document(Some("9.0.000"), "<operator name=\"X\""));
    let wrong_root = ws.write(
        "root.xml",
        r#"<process version="9.0.000"><operator name="A" class="a"/></process>"#,
    );

    let importer = ws.sources().importer().unwrap();
    let reports = check(&importer, &[good.clone(), bad, wrong_root]);

    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0].path, good);
    assert!(!reports[0].is_fatal());
    assert_eq!(reports[0].operators, 2);
    assert_eq!(reports[0].diagnostics.len(), 1);
    assert_eq!(reports[0].diagnostics[0].kind, "BehaviorChanged");
    assert!(reports[1].is_fatal());
    assert!(reports[2].is_fatal());
    assert!(reports[2].render().contains("error: outermost operator must be of type 'process'"));
}

#[test]
fn migrate_writes_current_layout() {
    let ws = Workspace::new();
    let input = ws.write(
        "old.xml",
        &document(Some("5.0.000"), &operator("F", "foo", &parameter("old_size", "3"))),
    );
    let output = ws.path("new.xml");

    let importer = ws.sources().importer().unwrap();
    let report = migrate(&importer, &input, &output).unwrap();
    assert!(report.modified);

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains(r#"<process version="9.0.000">"#));
    assert!(written.contains(r#"<parameter key="size" value="3"/>"#));
    assert!(written.contains(r#"compatibility="6.0.000""#));

    let again = check(&importer, &[output]);
    assert!(!again[0].modified);
}

#[test]
fn run_check_exit_status() {
    let ws = Workspace::new();
    ws.write("good.xml", &document(Some("9.0.000"), &operator("A", "a", "")));
    ws.write("broken.xml", "<process>");

    let args = |files: &[&str]| {
        let mut args = vec![
            "procflow".to_string(),
            "check".to_string(),
            "--catalog".to_string(),
            ws.arg("catalog.yaml"),
        ];
        args.extend(files.iter().map(|f| ws.arg(f)));
        command().try_get_matches_from(args).unwrap()
    };

    assert_eq!(run(&args(&["good.xml"])).unwrap(), 0);
    assert_eq!(run(&args(&["good.xml", "broken.xml"])).unwrap(), 1);
}

#[test]
fn run_migrate_with_config() {
    let ws = Workspace::new();
    ws.write("config.yaml", "accept_legacy_layout: false\n");
    ws.write(
        "legacy.xml",
        r#"<process version="4.0.000"><operator name="Root" class="process"><operator name="A" class="a"/></operator></process>"#,
    );

    let matches = command()
        .try_get_matches_from([
            "procflow".to_string(),
            "migrate".to_string(),
            ws.arg("legacy.xml"),
            "-o".to_string(),
            ws.arg("out.xml"),
            "--catalog".to_string(),
            ws.arg("catalog.yaml"),
            "--rules".to_string(),
            ws.arg("rules.yaml"),
            "--config".to_string(),
            ws.arg("config.yaml"),
        ])
        .unwrap();
    assert_eq!(run(&matches).unwrap(), 0);

    let written = std::fs::read_to_string(ws.path("out.xml")).unwrap();
    assert!(!written.contains(r#"name="A""#));
}

#[test]
fn invalid_catalog_is_an_error() {
    let ws = Workspace::new();
    ws.write("catalog.yaml", "operators: [ { key: 3 ");
    assert!(ws.sources().importer().is_err());
}

#[test]
fn sources_are_read_from_matches() {
    let matches = command()
        .try_get_matches_from([
            "procflow", "check", "a.xml", "--catalog", "one.yaml", "--catalog", "two.yaml", "--rules", "r.yaml",
        ])
        .unwrap();
    let sources = Sources::from_matches(&matches);
    assert_eq!(sources.catalogs, vec![PathBuf::from("one.yaml"), PathBuf::from("two.yaml")]);
    assert_eq!(sources.rules, vec![PathBuf::from("r.yaml")]);
    assert_eq!(sources.config, None);
}
