use std::env;
use std::error::Error;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use simprint::{FieldConfig, MinHashMapper, MinHashSettings};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "SIMPRINT_CONFIG";
const DEFAULT_FIELD: &str = "content";

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let field = match args.iter().position(|arg| arg == "--field") {
        Some(pos) if pos + 1 < args.len() => {
            let name = args.remove(pos + 1);
            args.remove(pos);
            Some(name)
        }
        Some(_) => return Err("--field needs a value".into()),
        None => None,
    };
    if args.is_empty() {
        eprintln!("usage: simprint [--field NAME] TEXT...");
        eprintln!("  {CONFIG_ENV}=settings.yaml selects the field configuration");
        std::process::exit(2);
    }

    let settings = match env::var(CONFIG_ENV) {
        Ok(path) => MinHashSettings::from_file(&path)?,
        Err(_) => MinHashSettings::single(DEFAULT_FIELD, FieldConfig::default()),
    };
    let field = match field {
        Some(name) => name,
        None => settings
            .fields
            .keys()
            .next()
            .cloned()
            .ok_or("settings define no fields")?,
    };

    let mapper = MinHashMapper::new(settings)?;
    let minhash = mapper.field(&field)?;
    for text in &args {
        match minhash.compute_signature(text)? {
            Some(signature) => println!("{}\t{text}", hex::encode(signature.as_bytes())),
            None => println!("-\t{text}"),
        }
    }

    let doc = mapper.index_document(args.iter().map(|text| (field.as_str(), Some(text.as_str()))))?;
    if let Some(blob) = doc.doc_value(&field) {
        println!("doc_values {field}: {}", STANDARD.encode(blob));
    }
    Ok(())
}
