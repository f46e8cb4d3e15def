use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hybrid_core::chunk::ChunkMetadata;
use hybrid_core::config::RetrievalConfig;
use hybrid_core::language::{detect_language, Language};
use hybrid_core::splitter::{BudgetTokenizer, SplitterConfig, TextSplitter, UnicodeTokenizer};
use hybrid_core::tokenizer::{LanguageVariant, Tokenizer};
use hybrid_core::{Bm25Index, Bm25Params, DocId};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One chunk of input, also the line format of the corpus sidecar.
#[derive(Debug, Serialize, Deserialize)]
struct CorpusRecord {
    id: String,
    #[serde(alias = "body")]
    text: String,
    #[serde(default)]
    metadata: ChunkMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
struct MetaFile {
    num_docs: usize,
    num_terms: usize,
    language: String,
    created_at: String,
    version: u32,
}

#[derive(Serialize)]
struct SearchResponse {
    query: String,
    took_s: f64,
    results: Vec<SearchHit>,
}

#[derive(Serialize)]
struct SearchHit {
    doc_id: DocId,
    id: String,
    score: f64,
    text: String,
    metadata: ChunkMetadata,
}

#[derive(Serialize)]
struct SplitChunk<'a> {
    index: usize,
    tokens: usize,
    text: &'a str,
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build, query and prepare bilingual BM25 indexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from JSON/JSONL chunk files or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Index file to write; .json for text, .bin or .bincode for binary
        #[arg(long)]
        output: String,
        /// english/en, chinese/cn, mixed, or auto to detect from the corpus
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        k1: Option<f64>,
        #[arg(long)]
        b: Option<f64>,
        /// JSON retrieval config supplying defaults for the flags above
        #[arg(long)]
        config: Option<String>,
        /// Custom jieba dictionary, e.g. dict.txt.big for Traditional Chinese
        #[arg(long)]
        dictionary: Option<String>,
    },
    /// Search a saved index
    Search {
        /// Index file written by `build`
        #[arg(long)]
        index: String,
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = 5)]
        k: usize,
        /// The dictionary the index was built with, if any
        #[arg(long)]
        dictionary: Option<String>,
    },
    /// Split a text file into token-budgeted chunks, printed as JSON lines
    Split {
        #[arg(long)]
        input: String,
        #[arg(long, default_value_t = 1024)]
        max_tokens: usize,
        #[arg(long, default_value_t = 100)]
        overlap: usize,
        #[arg(long, default_value_t = 0.7)]
        min_length_ratio: f64,
        /// Hugging Face tokenizer.json measuring the budget (needs the
        /// `hf-tokenizer` feature)
        #[arg(long)]
        tokenizer_file: Option<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, language, k1, b, config, dictionary } => {
            let mut config = match config {
                Some(path) => RetrievalConfig::from_json_file(&path)?,
                None => RetrievalConfig::default(),
            };
            if let Some(language) = language {
                config.language = language;
            }
            if let Some(k1) = k1 {
                config.bm25.k1 = k1;
            }
            if let Some(b) = b {
                config.bm25.b = b;
            }
            build_index(&input, &output, &config.language, config.bm25, dictionary.as_deref())
        }
        Commands::Search { index, query, k, dictionary } => {
            search_index(&index, &query, k, dictionary.as_deref())
        }
        Commands::Split { input, max_tokens, overlap, min_length_ratio, tokenizer_file } => {
            let config = SplitterConfig { max_tokens, overlap, min_length_ratio };
            let text = fs::read_to_string(&input).with_context(|| format!("reading {input}"))?;
            match tokenizer_file {
                Some(path) => split_with_model(&text, config, &path),
                None => split(&text, UnicodeTokenizer, config),
            }
        }
    }
}

fn corpus_path(index: &Path) -> PathBuf {
    PathBuf::from(format!("{}.corpus.jsonl", index.display()))
}

fn meta_path(index: &Path) -> PathBuf {
    PathBuf::from(format!("{}.meta.json", index.display()))
}

fn build_index(
    input: &str,
    output: &str,
    language: &str,
    params: Bm25Params,
    dictionary: Option<&str>,
) -> Result<()> {
    let input_path = Path::new(input);
    let output_path = Path::new(output);

    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }

    let mut records: Vec<CorpusRecord> = Vec::new();
    for file in &files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(file, &mut records)?;
        } else {
            read_json(file, &mut records)?;
        }
    }
    if records.is_empty() {
        bail!("no chunks found under {input}");
    }
    tracing::info!(files = files.len(), num_docs = records.len(), "ingested chunks");

    let language = if language.eq_ignore_ascii_case("auto") {
        let sample: String = records.iter().take(200).map(|r| r.text.as_str()).collect::<Vec<_>>().join("\n");
        match detect_language(&sample) {
            Language::Chinese => "chinese",
            Language::English => "english",
        }
    } else {
        language
    };

    let corpus: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
    let mut tokenizer = Tokenizer::new(LanguageVariant::from_name(language)?);
    if let Some(path) = dictionary {
        tokenizer = tokenizer.with_dictionary(path)?;
    }
    let index = Bm25Index::new(corpus, tokenizer, params)?;
    index.save(output_path)?;

    let mut sidecar = BufWriter::new(File::create(corpus_path(output_path))?);
    for record in &records {
        serde_json::to_writer(&mut sidecar, record)?;
        sidecar.write_all(b"\n")?;
    }
    sidecar.flush()?;

    let meta = MetaFile {
        num_docs: index.doc_count(),
        num_terms: index.num_terms(),
        language: index.language().tag().to_string(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: hybrid_core::persist::RECORD_VERSION,
    };
    fs::write(meta_path(output_path), serde_json::to_string_pretty(&meta)?)?;

    tracing::info!(output, language = %index.language(), "index build complete");
    Ok(())
}

fn read_jsonl(file: &Path, records: &mut Vec<CorpusRecord>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: CorpusRecord = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", file.display(), n + 1))?;
        records.push(record);
    }
    Ok(())
}

fn read_json(file: &Path, records: &mut Vec<CorpusRecord>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                records.push(serde_json::from_value(v).with_context(|| file.display().to_string())?);
            }
        }
        serde_json::Value::Object(_) => {
            records.push(serde_json::from_value(json).with_context(|| file.display().to_string())?);
        }
        _ => tracing::warn!(file = %file.display(), "skipping file without chunk objects"),
    }
    Ok(())
}

fn search_index(index: &str, query: &str, k: usize, dictionary: Option<&str>) -> Result<()> {
    let start = std::time::Instant::now();
    let index_path = Path::new(index);
    let mut records = Vec::new();
    read_jsonl(&corpus_path(index_path), &mut records)
        .with_context(|| format!("reading corpus sidecar for {index}"))?;
    let corpus: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
    let mut bm25 = Bm25Index::load(index_path, corpus)?;
    if let Some(path) = dictionary {
        bm25 = bm25.with_dictionary(path)?;
    }

    let results = bm25
        .search(query, k)?
        .into_iter()
        .map(|hit| {
            let record = &records[hit.doc_id];
            SearchHit {
                doc_id: hit.doc_id,
                id: record.id.clone(),
                score: hit.score,
                text: record.text.clone(),
                metadata: record.metadata.clone(),
            }
        })
        .collect();
    let response = SearchResponse { query: query.to_string(), took_s: start.elapsed().as_secs_f64(), results };
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn split<T: BudgetTokenizer>(text: &str, tokenizer: T, config: SplitterConfig) -> Result<()> {
    let splitter = TextSplitter::new(tokenizer, config)?;
    let chunks = splitter.split_text(text)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for (index, chunk) in chunks.iter().enumerate() {
        let line = SplitChunk { index, tokens: splitter.token_len(chunk)?, text: chunk };
        serde_json::to_writer(&mut out, &line)?;
        out.write_all(b"\n")?;
    }
    tracing::info!(chunks = chunks.len(), "split complete");
    Ok(())
}

#[cfg(feature = "hf-tokenizer")]
fn split_with_model(text: &str, config: SplitterConfig, tokenizer_file: &str) -> Result<()> {
    let tokenizer = hybrid_core::splitter::HfTokenizer::from_file(tokenizer_file)?;
    split(text, tokenizer, config)
}

#[cfg(not(feature = "hf-tokenizer"))]
fn split_with_model(_text: &str, _config: SplitterConfig, tokenizer_file: &str) -> Result<()> {
    bail!("cannot load {tokenizer_file}: indexer was built without the hf-tokenizer feature")
}
