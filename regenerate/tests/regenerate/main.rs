use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

datatest_stable::harness! {
    { test = test, root = "tests/regenerate/testdata", pattern = r".*/kustomization.yaml$" },
}

fn test(path: &Path) -> datatest_stable::Result<()> {
    let dir = path.parent().unwrap();

    match regenerate::regenerate_secrets(path) {
        Ok(regenerated) => {
            let mut out = Vec::new();
            regenerate::write_stream(
                &mut out,
                Some(&regenerated.kustomization.value),
                &regenerated.resources,
            )?;
            let actual = String::from_utf8(out)?;
            snapshot(&dir.join("expected.yaml"), &actual)?;
        }
        Err(err) => {
            let expected_path = dir.join("expected.stderr");
            if !expected_path.exists() {
                return Err(format!("unexpected error for {}: {err:?}", path.display()).into());
            }

            let expected = std::fs::read_to_string(&expected_path).context("reading snapshot")?;
            let actual = format!("{err:#}");
            if !actual.contains(expected.trim()) {
                eprintln!(
                    "Error mismatch for {}:\n{}",
                    path.display(),
                    format_chunks(dissimilar::diff(expected.trim(), &actual))
                );
                return Err(format!("Error mismatch for {}", path.display()).into());
            }
        }
    }
    Ok(())
}

// Documents are compared structurally so that quoting and key order do not matter.
fn snapshot(path: &Path, actual: &str) -> datatest_stable::Result<()> {
    if !path.exists() || std::env::var("UPDATE_SNAPSHOTS").is_ok() {
        std::fs::write(path, actual).context("writing snapshot")?;
        return Ok(());
    }

    let expected = std::fs::read_to_string(path).context("reading snapshot")?;
    if documents(&expected)? == documents(actual)? {
        return Ok(());
    }

    let formatted = format_chunks(dissimilar::diff(&expected, actual));
    eprintln!("Snapshot mismatch for {}:\n{}", path.display(), formatted);

    Err(format!("Snapshot mismatch for {}", path.display()).into())
}

fn documents(s: &str) -> anyhow::Result<Vec<serde_yaml::Value>> {
    serde_yaml::Deserializer::from_str(s)
        .map(|document| serde_yaml::Value::deserialize(document).context("parsing YAML document"))
        .filter(|value| !matches!(value, Ok(serde_yaml::Value::Null)))
        .collect()
}

fn format_chunks(chunks: Vec<dissimilar::Chunk>) -> String {
    let mut buf = String::new();
    for chunk in chunks {
        let formatted = match chunk {
            dissimilar::Chunk::Equal(text) => text.into(),
            dissimilar::Chunk::Delete(text) => format!("\x1b[4m\x1b[31m{}\x1b[0m", text),
            dissimilar::Chunk::Insert(text) => format!("\x1b[4m\x1b[32m{}\x1b[0m", text),
        };
        buf.push_str(&formatted);
    }
    buf
}
