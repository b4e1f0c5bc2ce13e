//! Minimal CLI: decode JSON/NDJSON against a type model → (check | normalize)
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;
use tracing::debug;
use typed_json::{DecodeOptions, Decoder, Encoder, Ty, TypeModel, UnionPolicy};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// decode JSON documents into the records of a type model and report or re-emit them
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// decode every document and report which ones fit the root record
    Check(CheckOut),
    /// decode and re-encode, filling defaults and materializing nullable keys
    Normalize(NormalizeOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON type model declaring the records and enums
    #[arg(long, short)]
    model: PathBuf,

    /// record each document is decoded as
    #[arg(long)]
    root: String,

    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// fail when more than one union alternative accepts a value
    #[arg(long, default_value_t = false)]
    strict_unions: bool,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

#[derive(clap::Parser, Debug)]
struct NormalizeOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Debug)]
struct Document {
    source: String,  // file, or file:line for NDJSON
    value: Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_model(&self) -> Result<TypeModel> {
        let bytes = std::fs::read(&self.model)
            .with_context(|| format!("failed to read type model {}", self.model.display()))?;
        let model = TypeModel::from_json_slice(&bytes)
            .with_context(|| format!("failed to load type model {}", self.model.display()))?;
        if model.record(&self.root).is_none() {
            bail!("type model {} declares no record named `{}`", self.model.display(), self.root);
        }
        Ok(model)
    }

    fn decode_options(&self) -> DecodeOptions {
        let union_policy = if self.strict_unions { UnionPolicy::Strict } else { UnionPolicy::FirstMatch };
        DecodeOptions { union_policy }
    }

    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let mut documents = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            if self.ndjson {
                for (line_no, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let label = format!("{source_path_str}:{}", line_no + 1);
                    let value = serde_json::from_str::<Value>(line)
                        .with_context(|| format!("failed to parse JSON line ({label})"))?;
                    documents.push(self.select(label, value)?);
                }
            } else {
                let value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                documents.push(self.select(source_path_str, value)?);
            }
        }
        debug!(documents = documents.len(), "loaded input documents");
        Ok(documents)
    }

    fn select(&self, source: String, value: Value) -> Result<Document> {
        let Some(pointer) = self.json_pointer.as_deref() else {
            return Ok(Document { source, value });
        };
        match value.pointer(pointer) {
            Some(node) => Ok(Document { value: node.clone(), source }),
            None => bail!("json pointer {pointer} selects nothing in {source}"),
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Check(target) => {
                let settings = &target.input_settings;
                let model = settings.load_model()?;
                let documents = settings.load_documents()?;
                let root = Ty::record(&settings.root);
                let decoder = Decoder::new(&model).with_options(settings.decode_options());

                let outcomes = documents
                    .par_iter()
                    .map(|doc| (doc, decoder.decode(&root, &doc.value)))
                    .collect::<Vec<_>>();

                let mut failed = 0usize;
                for (doc, outcome) in &outcomes {
                    match outcome {
                        Ok(_) => println!("{} {}", "ok".green(), doc.source),
                        Err(error) => {
                            failed += 1;
                            println!("{} {}: {error}", "failed".red(), doc.source);
                        }
                    }
                }
                if failed > 0 {
                    bail!("{failed} of {} documents do not fit `{}`", outcomes.len(), settings.root);
                }
                Ok(())
            }
            Command::Normalize(target) => {
                let settings = &target.input_settings;
                let model = settings.load_model()?;
                let documents = settings.load_documents()?;
                let root = Ty::record(&settings.root);
                let decoder = Decoder::new(&model).with_options(settings.decode_options());
                let encoder = Encoder::new();

                let normalized = documents
                    .par_iter()
                    .map(|doc| {
                        let typed = decoder
                            .decode(&root, &doc.value)
                            .with_context(|| format!("failed to decode {}", doc.source))?;
                        encoder
                            .encode(&typed)
                            .with_context(|| format!("failed to encode {}", doc.source))
                    })
                    .collect::<Result<Vec<_>>>()?;

                let rendered = render(normalized, settings.ndjson)?;
                match target.out.as_ref() {
                    Some(out) => write_output(out, &rendered)?,
                    None => println!("{rendered}"),
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn render(mut documents: Vec<Value>, ndjson: bool) -> Result<String> {
    if ndjson {
        let lines = documents
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(lines.join("\n"));
    }
    let out = match documents.len() {
        1 => serde_json::to_string_pretty(&documents.remove(0))?,
        _ => serde_json::to_string_pretty(&documents)?,
    };
    Ok(out)
}

fn write_output(out: &Path, rendered: &str) -> Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(out, rendered).with_context(|| format!("failed to write {}", out.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MODEL: &str = r#"{
        "records": [
            { "name": "CountingModel", "kind": "positional", "fields": [
                { "name": "count", "type": "integer" },
                { "name": "childs", "type": { "one_of": [ { "mapping": { "record": "CountingModel" } }, "null" ] } }
            ] }
        ]
    }"#;

    fn settings(dir: &tempfile::TempDir, input: Vec<String>) -> InputSettings {
        let model = dir.path().join("model.json");
        std::fs::write(&model, MODEL).unwrap();
        InputSettings {
            model,
            root: "CountingModel".into(),
            ndjson: false,
            json_pointer: None,
            strict_unions: false,
            input,
        }
    }

    #[test]
    fn glob_patterns_expand_and_literals_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();

        let pattern = format!("{}/*.json", dir.path().display());
        let literal = dir.path().join("missing.json").display().to_string();
        let paths = resolve_file_path_patterns([pattern, literal.clone()]).unwrap();
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[2], PathBuf::from(literal));

        let empty = format!("{}/*.ndjson", dir.path().display());
        assert!(resolve_file_path_patterns([empty]).is_err());
    }

    #[test]
    fn ndjson_lines_become_labelled_documents() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.ndjson");
        std::fs::write(&input, "{\"count\": 1}\n\n{\"count\": 2}\n").unwrap();

        let mut settings = settings(&dir, vec![input.display().to_string()]);
        settings.ndjson = true;
        let documents = settings.load_documents().unwrap();
        assert_eq!(documents.len(), 2);
        assert!(documents[1].source.ends_with("in.ndjson:3"));
        assert_eq!(documents[1].value, json!({"count": 2}));
    }

    #[test]
    fn json_pointer_selects_subnode() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        std::fs::write(&input, r#"{"data": {"payload": {"count": 4}}}"#).unwrap();

        let mut settings = settings(&dir, vec![input.display().to_string()]);
        settings.json_pointer = Some("/data/payload".into());
        let documents = settings.load_documents().unwrap();
        assert_eq!(documents[0].value, json!({"count": 4}));

        settings.json_pointer = Some("/data/nothing".into());
        assert!(settings.load_documents().is_err());
    }

    #[test]
    fn model_must_declare_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(&dir, vec![]);
        assert!(settings.load_model().is_ok());
        settings.root = "Elsewhere".into();
        assert!(settings.load_model().is_err());
    }

    #[test]
    fn strict_flag_selects_strict_policy() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(&dir, vec![]);
        assert_eq!(settings.decode_options(), DecodeOptions::default());
        settings.strict_unions = true;
        assert_eq!(settings.decode_options(), DecodeOptions::strict());
    }

    #[test]
    fn render_picks_layout_by_count_and_mode() {
        let docs = vec![json!({"count": 1}), json!({"count": 2})];
        assert_eq!(render(docs.clone(), true).unwrap(), "{\"count\":1}\n{\"count\":2}");
        assert!(render(docs, false).unwrap().starts_with('['));
        assert!(render(vec![json!({"count": 1})], false).unwrap().starts_with('{'));
    }

    #[test]
    fn normalize_writes_materialized_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        std::fs::write(&input, r#"{"count": 5, "childs": {"abc": {"count": 2}}}"#).unwrap();
        let out = dir.path().join("nested/out.json");

        let cli = CommandLineInterface {
            cmd: Command::Normalize(NormalizeOut {
                input_settings: settings(&dir, vec![input.display().to_string()]),
                out: Some(out.clone()),
            }),
        };
        cli.run().unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(written, json!({"count": 5, "childs": {"abc": {"count": 2, "childs": null}}}));
    }

    #[test]
    fn check_fails_when_a_document_does_not_fit() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        std::fs::write(&good, r#"{"count": 1}"#).unwrap();
        std::fs::write(&bad, r#"{"count": "af"}"#).unwrap();

        let check = |input: Vec<String>| CommandLineInterface {
            cmd: Command::Check(CheckOut { input_settings: settings(&dir, input) }),
        };
        assert!(check(vec![good.display().to_string()]).run().is_ok());
        assert!(check(vec![good.display().to_string(), bad.display().to_string()]).run().is_err());
    }
}
