use std::fs;
use std::path::{Path, PathBuf};

fn collect_rs_files(dir: &Path, out: &mut Vec<PathBuf>) {
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_rs_files(&path, out);
            } else if path.extension().and_then(|ext| ext.to_str()) == Some("rs") {
                out.push(path);
            }
        }
    }
}

/// Source text before the unit test module.
fn non_test_source(path: &Path) -> String {
    let content = fs::read_to_string(path).unwrap_or_else(|_| String::new());
    match content.find("#[cfg(test)]") {
        Some(idx) => content[..idx].to_string(),
        None => content,
    }
}

fn src_files() -> Vec<PathBuf> {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut files = Vec::new();
    collect_rs_files(&manifest_dir.join("src"), &mut files);
    assert!(!files.is_empty());
    files
}

#[test]
fn runtime_code_does_not_unwrap() {
    let mut offenders = Vec::new();
    for file in src_files() {
        let content = non_test_source(&file);
        if content.contains(".unwrap()") || content.contains(".expect(") {
            offenders.push(file);
        }
    }
    assert!(
        offenders.is_empty(),
        "Runtime code must propagate errors. Offenders: {offenders:?}"
    );
}

#[test]
fn state_machine_does_not_read_the_clock_or_block() {
    let mut offenders = Vec::new();
    for file in src_files() {
        let in_app_core = file.ends_with("app/controller.rs") || file.ends_with("app/state.rs");
        if !in_app_core {
            continue;
        }
        let content = non_test_source(&file);
        if content.contains("Instant::now()")
            || content.contains("thread::sleep")
            || content.contains("std::process")
        {
            offenders.push(file);
        }
    }
    assert!(
        offenders.is_empty(),
        "Controller time must come from the caller. Offenders: {offenders:?}"
    );
}
