//! archivedb inspection tool
//!
//! Reads namespaces, buckets and entries of a store on disk.

use std::io::Write;
use std::path::PathBuf;

use archivedb::{Bucket, Config, Database, Document, DocumentStore, Value};
use base64::Engine as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// archivedb ctl
#[derive(Parser, Debug)]
#[command(name = "archivedb-ctl")]
#[command(about = "Inspect an archivedb store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./archivedb_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List persisted namespaces
    Namespaces,

    /// List persisted user buckets of a namespace
    Buckets {
        #[arg(long)]
        ns: String,
    },

    /// Print one entry
    Get {
        #[arg(long)]
        ns: String,

        /// User bucket (default: the object bucket)
        #[arg(long, conflicts_with = "doc")]
        bucket: Option<String>,

        /// Read from the document bucket
        #[arg(long)]
        doc: bool,

        /// Print as JSON
        #[arg(long)]
        json: bool,

        key: String,
    },

    /// Count entries of a bucket
    Count {
        #[arg(long)]
        ns: String,

        /// User bucket (default: the object bucket)
        #[arg(long)]
        bucket: Option<String>,
    },

    /// Flush and compact the store
    Compact,
}

impl Commands {
    fn mutates(&self) -> bool {
        matches!(self, Commands::Compact)
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,archivedb=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> archivedb::Result<()> {
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .read_only(!args.command.mutates())
        .build();
    let db = Database::open(config)?;

    match args.command {
        Commands::Namespaces => {
            for name in db.stored_namespaces()? {
                println!("{}", String::from_utf8_lossy(&name));
            }
        }

        Commands::Buckets { ns } => {
            let ns = db.create_namespace(ns.as_bytes())?;
            for name in ns.stored_buckets()? {
                println!("{}", String::from_utf8_lossy(&name));
            }
        }

        Commands::Get {
            ns,
            bucket,
            doc,
            json,
            key,
        } => {
            let ns = db.create_namespace(ns.as_bytes())?;

            if doc {
                let document = ns.doc_bucket().get_doc(key.as_bytes())?;
                if json {
                    println!("{}", document_to_json(&document));
                } else {
                    println!("{:#?}", document);
                }
                return db.close();
            }

            let bucket: std::sync::Arc<dyn Bucket> = match bucket {
                Some(name) => ns.create_bucket(name.as_bytes())?,
                None => ns.object_bucket(),
            };
            let (value, meta) = bucket.get(key.as_bytes())?;

            if json {
                let meta = meta.map(|m| {
                    serde_json::json!({
                        "mime": m.mime,
                        "chunk_size": m.chunk_size,
                        "total_len": m.total_len,
                        "chunks": m.chunks.len(),
                    })
                });
                let out = serde_json::json!({
                    "key": key,
                    "meta": meta,
                    "value": base64::engine::general_purpose::STANDARD.encode(&value),
                });
                println!("{}", out);
            } else {
                if let Some(meta) = meta {
                    eprintln!(
                        "mime={} total_len={} chunks={}",
                        meta.mime,
                        meta.total_len,
                        meta.chunks.len()
                    );
                }
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&value)?;
                stdout.flush()?;
            }
        }

        Commands::Count { ns, bucket } => {
            let ns = db.create_namespace(ns.as_bytes())?;
            let count = match bucket {
                Some(name) => ns.create_bucket(name.as_bytes())?.count(None, None)?,
                None => ns.object_bucket().count(None, None)?,
            };
            println!("{}", count);
        }

        Commands::Compact => {
            db.compact()?;
            println!("compacted {}", db.path().display());
        }
    }

    db.close()
}

// =============================================================================
// JSON Rendering
// =============================================================================

fn document_to_json(doc: &Document) -> serde_json::Value {
    serde_json::Value::Object(
        doc.iter()
            .map(|(k, v)| (k.clone(), value_to_json(v)))
            .collect(),
    )
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::from(*n),
        // Non-finite floats have no JSON form
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Bytes(b) => {
            serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Document(doc) => document_to_json(doc),
    }
}
