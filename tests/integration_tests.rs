use id_gen::core::{MatchWarningKind, PhotoStatus};
use id_gen::utils::error::ErrorCategory;
use id_gen::utils::validation::Validate;
use id_gen::{BatchEngine, CardConfig, CardPipeline, CliConfig, IdGenError, LocalStorage};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FRONT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="323" height="204">
  <image x="10" y="10" width="80" height="100" href="{{photo}}"/>
  <text x="100" y="40">{{name}}</text>
  <text x="100" y="70">{{id}}</text>
</svg>
"#;

const BACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="323" height="204">
  <image x="20" y="120" width="280" height="50" href="{{barcode}}"/>
</svg>
"#;

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new(roster: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("templates")).unwrap();
        fs::write(root.join("templates/front.svg"), FRONT).unwrap();
        fs::write(root.join("templates/back.svg"), BACK).unwrap();
        fs::write(root.join("students.csv"), roster).unwrap();
        fs::create_dir_all(root.join("images")).unwrap();
        fs::create_dir_all(root.join("out/tmp")).unwrap();
        Self { dir }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn photo(&self, relative: &str) {
        let path = self.path("images").join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, JPEG).unwrap();
    }

    fn config(&self) -> CliConfig {
        CliConfig {
            template: self.path("templates"),
            data: self.path("students.csv"),
            images: self.path("images"),
            out: self.path("out"),
            debug: false,
            config: None,
            create_out: false,
            log_json: false,
            card: CardConfig::default(),
        }
    }

    fn run(&self, config: CliConfig) -> id_gen::Result<id_gen::core::BatchReport> {
        config.validate()?;
        let storage = LocalStorage::new(config.out.clone()).with_create_missing(config.create_out);
        BatchEngine::new(CardPipeline::new(storage, config)).run()
    }
}

fn svg_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".svg"))
        .collect();
    names.sort();
    names
}

#[test]
fn test_two_students_one_photo() {
    let fixture = Fixture::new("name,id\nAlice,001\nBob,002\n");
    fixture.photo("alice.jpg");

    let report = fixture.run(fixture.config()).unwrap();

    assert_eq!(report.cards.len(), 2);
    assert_eq!(svg_files(&fixture.path("out")), vec!["Alice.svg", "Bob.svg"]);
    assert_eq!(
        svg_files(&fixture.path("out/tmp")),
        vec!["Alice-back.svg", "Alice-front.svg", "Bob-back.svg", "Bob-front.svg"]
    );
    assert!(fixture.path("out/manifest.json").is_file());

    let alice = fs::read_to_string(fixture.path("out/tmp/Alice-front.svg")).unwrap();
    assert!(alice.contains(r#"href="data:image/jpeg;base64,"#));
    assert!(alice.contains(">Alice</text>"));
    assert!(alice.contains(">001</text>"));

    let bob = fs::read_to_string(fixture.path("out/tmp/Bob-front.svg")).unwrap();
    assert!(bob.contains(r#"href="""#));
    assert!(bob.contains(">Bob</text>"));

    assert!(matches!(report.cards[0].photo, PhotoStatus::Embedded { .. }));
    assert_eq!(report.cards[1].photo, PhotoStatus::Missing);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].card, "Bob");
    assert!(matches!(report.warnings[0].kind, MatchWarningKind::NotFound { .. }));
}

#[test]
fn test_no_placeholder_survives_rendering() {
    let fixture = Fixture::new("name,id\nAlice,001\nBob,002\nCarol,003\n");
    fixture.photo("alice.jpg");
    fixture.photo("Carol.JPEG");

    let report = fixture.run(fixture.config()).unwrap();
    assert_eq!(report.cards.len(), 3);

    for entry in &report.cards {
        for side in [&entry.front, &entry.back] {
            let content = fs::read_to_string(fixture.path("out").join(side)).unwrap();
            assert!(!content.contains("{{"), "{} still has a placeholder", side);
        }
    }
}

#[test]
fn test_missing_output_directory_is_fatal_before_writing() {
    let fixture = Fixture::new("name,id\nAlice,001\n");
    fs::remove_dir(fixture.path("out/tmp")).unwrap();

    let err = fixture.run(fixture.config()).unwrap_err();
    assert!(matches!(err, IdGenError::OutputDirError { ref path } if path.ends_with("tmp")));
    assert_eq!(err.category(), ErrorCategory::Io);
    assert_eq!(fs::read_dir(fixture.path("out")).unwrap().count(), 0);

    let mut config = fixture.config();
    config.out = fixture.path("elsewhere");
    let err = fixture.run(config).unwrap_err();
    assert!(matches!(err, IdGenError::OutputDirError { .. }));
    assert!(!fixture.path("elsewhere").exists());
}

#[test]
fn test_create_out_builds_missing_directories() {
    let fixture = Fixture::new("name,id\nAlice,001\n");
    let mut config = fixture.config();
    config.out = fixture.path("fresh/out");
    config.create_out = true;

    let report = fixture.run(config).unwrap();
    assert_eq!(report.cards.len(), 1);
    assert!(fixture.path("fresh/out/tmp/Alice-front.svg").is_file());
}

#[test]
fn test_malformed_roster_is_rejected_before_rendering() {
    let fixture = Fixture::new("name,id\nAlice,001\nBob\n");
    fixture.photo("alice.jpg");

    let err = fixture.run(fixture.config()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Data);
    assert!(svg_files(&fixture.path("out")).is_empty());
    assert!(svg_files(&fixture.path("out/tmp")).is_empty());
}

#[test]
fn test_missing_template_is_fatal() {
    let fixture = Fixture::new("name,id\nAlice,001\n");
    fs::remove_file(fixture.path("templates/back.svg")).unwrap();

    let err = fixture.run(fixture.config()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Template);
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_missing_images_directory_is_an_argument_error() {
    let fixture = Fixture::new("name,id\nAlice,001\n");
    let mut config = fixture.config();
    config.images = fixture.path("no-such-dir");

    let err = fixture.run(config).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Argument);
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_unknown_placeholder_aborts_without_output() {
    let fixture = Fixture::new("name\nAlice\n");

    let err = fixture.run(fixture.config()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Render);
    assert!(svg_files(&fixture.path("out")).is_empty());
}

#[test]
fn test_header_only_roster_writes_only_the_manifest() {
    let fixture = Fixture::new("name,id\n");

    let report = fixture.run(fixture.config()).unwrap();
    assert!(report.cards.is_empty());
    assert!(svg_files(&fixture.path("out")).is_empty());
    assert!(fixture.path("out/manifest.json").is_file());
}

#[test]
fn test_missing_roster_file_is_a_data_error() {
    let fixture = Fixture::new("name,id\nAlice,001\n");
    fs::remove_file(fixture.path("students.csv")).unwrap();

    let err = fixture.run(fixture.config()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Data);
    assert_eq!(err.exit_code(), 1);

    let mut config = fixture.config();
    config.template = fixture.path("no-templates");
    let err = fixture.run(config).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Template);
}

#[test]
fn test_repeated_names_each_get_a_card() {
    let fixture = Fixture::new("name,id\nAlice,001\nAlice,002\n");
    fixture.photo("alice.jpg");

    let report = fixture.run(fixture.config()).unwrap();

    assert_eq!(report.cards.len(), 2);
    assert_eq!(svg_files(&fixture.path("out")), vec!["Alice-3.svg", "Alice.svg"]);
    let second = fs::read_to_string(fixture.path("out/tmp/Alice-3-front.svg")).unwrap();
    assert!(second.contains(">002</text>"));
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w.kind, MatchWarningKind::Renamed { ref file } if file == "Alice-3")));

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(fixture.path("out/manifest.json")).unwrap())
            .unwrap();
    assert_eq!(manifest["warnings"][0]["kind"], "renamed");
}

#[test]
fn test_unencodable_barcode_does_not_stop_the_batch() {
    let fixture = Fixture::new("name,id\nAlice,001\nJosé,002\n");

    let report = fixture.run(fixture.config()).unwrap();

    assert_eq!(report.cards.len(), 2);
    let back = fs::read_to_string(fixture.path("out/tmp/Jos_-back.svg")).unwrap();
    assert!(back.contains(r#"href="""#));
    assert!(report
        .warnings
        .iter()
        .any(|w| w.card == "José" && matches!(w.kind, MatchWarningKind::BarcodeUnavailable { .. })));
}

#[test]
fn test_comment_token_templates_are_filled() {
    let fixture = Fixture::new("name,id\nAlice,001\n");
    fixture.photo("alice.jpg");
    fs::write(
        fixture.path("templates/front.svg"),
        r#"<svg><text><!-- NAME --></text><text><!-- ID --></text><image href="data:image/jpeg;base64,<!-- PHOTO -->"/></svg>"#,
    )
    .unwrap();
    fs::write(fixture.path("templates/back.svg"), "<svg><!-- BARCODE --></svg>").unwrap();

    let report = fixture.run(fixture.config()).unwrap();
    assert_eq!(report.cards.len(), 1);

    let front = fs::read_to_string(fixture.path("out/tmp/Alice-front.svg")).unwrap();
    assert!(!front.contains("<!--"));
    assert!(front.contains("<text>Alice</text><text>001</text>"));
    assert!(front.contains(r#"href="data:image/jpeg;base64,/9j/"#));
}
