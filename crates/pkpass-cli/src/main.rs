//! Command-line interface for the pkpass bundle builder.
//!
//! Builds a signed `.pkpass` archive from a `pass.json`, its assets and a
//! PKCS#12 Pass Type ID certificate.

use clap::Parser;
use pkpass::{PassBuilder, SignatureFormat};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pkpass")]
#[command(about = "Build a signed Apple Wallet pass")]
struct Cli {
    /// Pass payload (pass.json)
    json: PathBuf,

    /// Output file
    #[arg(short, long, default_value = "pass.pkpass")]
    output: PathBuf,

    /// PKCS#12 file (.p12) with the Pass Type ID certificate and key
    #[arg(short = 'p', long)]
    pkcs12: PathBuf,

    /// Password for the PKCS#12 file
    #[arg(long, default_value = "")]
    password: String,

    /// Intermediate certificate (Apple WWDR), PEM or DER
    #[arg(short = 'w', long)]
    intermediate: Option<PathBuf>,

    /// Asset file added under its base name (repeatable)
    #[arg(short = 'a', long = "asset")]
    assets: Vec<PathBuf>,

    /// Directory whose files are added under their relative paths (repeatable)
    #[arg(short = 'd', long = "asset-dir")]
    asset_dirs: Vec<PathBuf>,

    /// Directory for per-build scratch files
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// ZIP compression level (0-9, default: 6)
    #[arg(short = 'z', long, default_value = "6")]
    zip_level: u32,

    /// Obtain the signature through an S/MIME envelope instead of DER output
    #[arg(long)]
    smime: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let json = std::fs::read(&cli.json)?;

    let mut builder = PassBuilder::new()
        .certificate(&cli.pkcs12)
        .password(cli.password.as_str())
        .json(json)
        .compression_level(cli.zip_level);

    if let Some(ref intermediate) = cli.intermediate {
        builder = builder.intermediate_certificate(intermediate);
    }
    if let Some(ref temp_dir) = cli.temp_dir {
        builder = builder.temp_dir(temp_dir);
    }
    if cli.smime {
        builder = builder.signature_format(SignatureFormat::SmimeEnvelope);
    }
    for asset in &cli.assets {
        builder = builder.asset_file(asset);
    }
    for dir in &cli.asset_dirs {
        builder = builder.asset_directory(dir);
    }

    if let Some(name) = cli.output.file_name() {
        builder = builder.name(name.to_string_lossy());
    }

    let pass = builder.build()?;
    pass.write_to(&cli.output)?;

    println!("Created: {} ({} bytes)", cli.output.display(), pass.content_length());
    Ok(())
}
