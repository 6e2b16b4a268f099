#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the `update-tengo-map` command.

mod common;

use std::path::PathBuf;

use common::Project;
use stilyagi::cli::UpdateTengoMapOpts;
use stilyagi::commands::update_tengo_map::run;
use stilyagi::config::entries::ValueCoercion;
use stilyagi::error::StilyagiError;
use stilyagi::logging::Logger;

const SCRIPT: &str = "\
// First-use acronym check.
allow := {
  \"API\": true, // keep
}

exceptions := {
  \"FOO\": 1,
}

result := text.re_match(allow, scope)
";

fn opts(project: &Project, source: &str, dest: &str, value_type: ValueCoercion) -> UpdateTengoMapOpts {
    UpdateTengoMapOpts {
        source: PathBuf::from(source),
        dest: dest.to_string(),
        value_type,
        project_root: project.root().to_path_buf(),
    }
}

fn log() -> Logger {
    Logger::new("update-tengo-map")
}

#[test]
fn presence_entries_extend_allow_map() {
    let project = Project::new();
    project.write("styles/Acronyms.tengo", SCRIPT);
    project.write(".config/acronyms", "# shared list\nAPI\nCLI # command line\n\nHTTP\n");

    let line = run(
        &opts(&project, ".config/acronyms", "styles/Acronyms.tengo", ValueCoercion::Presence),
        &log(),
    )
    .unwrap();
    assert_eq!(line, "3 entries provided, 2 updated");

    insta::assert_snapshot!(project.read("styles/Acronyms.tengo"), @r#"
    // First-use acronym check.
    allow := {
      "API": true, // keep
      "CLI": true,
      "HTTP": true,
    }

    exceptions := {
      "FOO": 1,
    }

    result := text.re_match(allow, scope)
    "#);
}

#[test]
fn numbers_override_named_map() {
    let project = Project::new();
    project.write("styles/Acronyms.tengo", SCRIPT);
    project.write("numbers.txt", "FOO=2\nBAR=3.5\nFOO=4\n");

    let line = run(
        &opts(&project, "numbers.txt", "styles/Acronyms.tengo::exceptions", ValueCoercion::Number),
        &log(),
    )
    .unwrap();
    assert_eq!(line, "3 entries provided, 2 updated");
    let script = project.read("styles/Acronyms.tengo");
    assert!(script.contains("exceptions := {\n  \"FOO\": 4,\n  \"BAR\": 3.5,\n}\n"));
    assert!(script.contains("\"API\": true, // keep\n"));
}

#[test]
fn rerun_is_idempotent() {
    let project = Project::new();
    project.write("styles/Acronyms.tengo", SCRIPT);
    project.write("words.txt", "CLI\n");
    let o = opts(&project, "words.txt", "styles/Acronyms.tengo", ValueCoercion::Presence);

    run(&o, &log()).unwrap();
    let first = project.read("styles/Acronyms.tengo");
    assert_eq!(run(&o, &log()).unwrap(), "1 entries provided, 0 updated");
    assert_eq!(project.read("styles/Acronyms.tengo"), first);
}

#[test]
fn malformed_entry_names_line() {
    let project = Project::new();
    project.write("styles/Acronyms.tengo", SCRIPT);
    project.write("flags.txt", "A=yes\nB=maybe\n");
    let err = run(
        &opts(&project, "flags.txt", "styles/Acronyms.tengo", ValueCoercion::Bool),
        &log(),
    )
    .unwrap_err();
    let typed = err.downcast_ref::<StilyagiError>().unwrap();
    assert!(matches!(typed, StilyagiError::SourceFormat(e) if e.line == 2));
    assert_eq!(project.read("styles/Acronyms.tengo"), SCRIPT);
}

#[test]
fn missing_source_is_target_not_found() {
    let project = Project::new();
    project.write("styles/Acronyms.tengo", SCRIPT);
    let err = run(
        &opts(&project, "absent.txt", "styles/Acronyms.tengo", ValueCoercion::Presence),
        &log(),
    )
    .unwrap_err();
    assert!(err.to_string().starts_with("file not found:"));
}

#[test]
fn escaping_destination_is_rejected() {
    let project = Project::new();
    project.write("words.txt", "CLI\n");
    let err = run(
        &opts(&project, "words.txt", "../elsewhere.tengo", ValueCoercion::Presence),
        &log(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("escapes the project root"));
}
