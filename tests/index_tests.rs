use std::fs;
use std::path::Path;

use docweave::{BuildConfig, DocBuilder, ExitStatus, JsonFileParser};
use serde_json::{json, Value};
use tempfile::TempDir;

fn site_config(root: &Path) -> BuildConfig {
    BuildConfig {
        pages_dir: root.join("site/src/pages"),
        modules_dir: root.join("site/src/pages/docs/modules"),
        index_file: root.join("site/src/data/docIndex.json"),
        library_description_file: root.join("site/src/data/libraryDescription.json"),
        parallel_jobs: Some(4),
        ..BuildConfig::default()
    }
}

fn write_library(root: &Path) {
    let button = root.join("raw/ui/Button");
    fs::create_dir_all(&button).unwrap();
    fs::write(button.join("Button.js"), "/** @module ui/Button */").unwrap();
    fs::write(
        button.join("doclets.json"),
        json!([{
            "name": "ui/Button",
            "kind": "module",
            "path": [{"name": "ui/Button", "kind": "module"}],
            "context": {"file": "ui/Button/Button.js", "loc": {"start": {"line": 1, "column": 0}}},
            "description": {"type": "root", "children": [
                {"type": "paragraph", "children": [{"type": "text", "value": "Pressable control"}]}
            ]},
            "members": {
                "static": [{
                    "name": "Button",
                    "kind": "function",
                    "memberof": "ui/Button",
                    "description": {"type": "root", "children": [{"type": "text", "value": "Styled button"}]},
                    "context": {"file": "ui/Button/Button.js", "loc": {"start": {"line": 20, "column": 0}}},
                    "errors": [{"message": "unknown tag @frobnicate", "commentLineNumber": 18}]
                }],
                "instance": []
            }
        }])
        .to_string(),
    )
    .unwrap();
    fs::write(
        root.join("raw/ui/package.json"),
        json!({"name": "@enact/ui", "version": "4.7.0", "dependencies": {"react": "^18"}}).to_string(),
    )
    .unwrap();
    fs::write(root.join("raw/ui/README.md"), "# ui\n\n> A set of reusable components\n").unwrap();
}

#[tokio::test]
async fn test_build_persists_describes_and_indexes() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_library(root);

    let pages = root.join("site/src/pages/docs/tutorials");
    fs::create_dir_all(&pages).unwrap();
    fs::write(pages.join("index.md"), "---\ntitle: Tutorials\n---\nStart here.").unwrap();
    fs::write(pages.join("setup.md"), "Install the tools.").unwrap();

    let config = site_config(root);
    let mut builder = DocBuilder::new(config.clone(), JsonFileParser::new("doclets.json")).unwrap();
    let libraries = builder.load_docs_configs(&[root.join("raw/ui")]);
    builder.ingest_libraries(&libraries).await.unwrap();
    builder.resolve(false);

    let descriptions = builder.describe(&libraries).unwrap();
    assert_eq!(descriptions["ui"].description.as_deref(), Some("A set of reusable components"));

    let report = builder.index().unwrap();
    assert_eq!((report.records, report.pages, report.failures), (1, 2, 0));

    // Unknown tags outside the allow-list are reported while saving.
    assert_eq!(builder.findings().len(), 1);
    assert_eq!(builder.status(), ExitStatus::Success);

    let persisted: Value = serde_json::from_str(
        &fs::read_to_string(config.modules_dir.join("ui/Button/index.json")).unwrap(),
    )
    .unwrap();
    assert!(persisted[0]["members"]["static"][0].get("errors").is_none());
    assert!(persisted[0]["members"]["static"][0].get("context").is_none());

    let index: Value = serde_json::from_str(&fs::read_to_string(&config.index_file).unwrap()).unwrap();
    let doc_info = &index["documentStore"]["docInfo"];
    assert!(doc_info["ui/Button|docs/modules/ui/Button"].is_object());
    assert!(doc_info["Tutorials|docs/tutorials"].is_object());
    assert!(doc_info["setup|docs/tutorials/setup"].is_object());
    assert!(index["index"]["memberDescriptions"]["root"]["b"]["u"]["t"]["t"]["o"]["n"]["docs"]
        ["ui/Button|docs/modules/ui/Button"]
        .is_object());

    let written: Value = serde_json::from_str(
        &fs::read_to_string(&config.library_description_file).unwrap(),
    )
    .unwrap();
    assert_eq!(written["ui"]["packageName"], "@enact/ui");
}

#[tokio::test]
async fn test_index_without_persisted_docs_fails() {
    let temp = TempDir::new().unwrap();
    let config = site_config(temp.path());
    let mut builder = DocBuilder::new(config, ()).unwrap();
    assert!(builder.index().is_err());
}

#[tokio::test]
async fn test_index_and_describe_need_no_parser_command() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_library(root);
    let modules = root.join("site/src/pages/docs/modules/ui/Icon");
    fs::create_dir_all(&modules).unwrap();
    fs::write(modules.join("index.json"), json!([{"name": "ui/Icon"}]).to_string()).unwrap();

    let config = BuildConfig {
        parser_command: Vec::new(),
        ..site_config(root)
    };
    let mut builder = DocBuilder::new(config.clone(), ()).unwrap();
    let libraries = builder.load_docs_configs(&[root.join("raw/ui")]);
    let descriptions = builder.describe(&libraries).unwrap();
    assert!(descriptions.contains_key("ui"));

    let report = builder.index().unwrap();
    assert_eq!(report.records, 1);
    assert!(config.index_file.exists());
    assert_eq!(builder.status(), ExitStatus::Success);
}

#[test]
fn test_indexing_is_deterministic() {
    let temp = TempDir::new().unwrap();
    let config = site_config(temp.path());
    let modules = config.modules_dir.join("ui/Icon");
    fs::create_dir_all(&modules).unwrap();
    fs::write(
        modules.join("index.json"),
        json!([{"name": "ui/Icon", "members": {"static": [{"name": "Icon"}, {"name": "IconBase"}]}}])
            .to_string(),
    )
    .unwrap();
    fs::write(config.pages_dir.join("index.md"), "---\ntitle: Home\n---\nWelcome").unwrap();

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let mut builder = DocBuilder::new(config.clone(), ()).unwrap();
        builder.index().unwrap();
        outputs.push(fs::read(&config.index_file).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);
}
