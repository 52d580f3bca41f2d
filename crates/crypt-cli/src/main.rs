mod settings;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use crypt_core::{crypt, crypt_checksalt, crypt_gensalt, is_failure_token, methods, SaltCheck};
use serde::Serialize;
use std::io::BufRead;
use std::path::PathBuf;
use subtle::ConstantTimeEq;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::settings::{load_settings, CliSettings};

#[derive(Parser, Debug)]
#[command(author, version, about = "crypt(3) passphrase hashing tool", long_about = None)]
struct Cli {
    /// JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Hash a passphrase (read from stdin unless --phrase is given)
    Hash {
        /// Setting or stored hash; a fresh setting is generated if omitted
        setting: Option<String>,
        #[arg(long)]
        phrase: Option<String>,
    },
    /// Check a passphrase against a stored hash
    Verify {
        hash: String,
        #[arg(long)]
        phrase: Option<String>,
    },
    /// Generate a new setting string
    Gensalt {
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        count: Option<u64>,
    },
    /// Classify a setting or hash without hashing anything
    Checksalt {
        setting: String,
        #[arg(long)]
        json: bool,
    },
    /// List the supported methods, preferred first
    Methods {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct MethodInfo {
    prefix: &'static str,
    name: &'static str,
    strong: bool,
}

#[derive(Serialize)]
struct CheckReport<'a> {
    setting: &'a str,
    verdict: SaltCheck,
    code: i32,
}

fn init_logging(settings: &CliSettings) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.log_filter.as_str().into()),
        )
        .init();
}

/// First line of stdin without its line terminator.
fn read_phrase(arg: Option<String>) -> Result<Zeroizing<String>> {
    if let Some(p) = arg {
        return Ok(Zeroizing::new(p));
    }
    let mut line = Zeroizing::new(String::new());
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading passphrase from stdin")?;
    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(line)
}

/// Compare a fresh hash with the stored one without an early exit.
fn hashes_match(computed: &str, stored: &str) -> bool {
    computed.as_bytes().ct_eq(stored.as_bytes()).into()
}

fn gensalt(settings: &CliSettings, prefix: Option<String>, count: Option<u64>) -> Result<String> {
    let prefix = prefix.or_else(|| settings.default_prefix.clone());
    let count = count.unwrap_or(settings.default_count);
    debug!(prefix = prefix.as_deref().unwrap_or("<preferred>"), count, "generating setting");
    crypt_gensalt(prefix.as_deref(), count, None)
        .with_context(|| format!("gensalt for {}", prefix.as_deref().unwrap_or("preferred method")))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;
    init_logging(&settings);

    match cli.command {
        Commands::Hash { setting, phrase } => {
            let setting = match setting {
                Some(s) => s,
                None => gensalt(&settings, None, None)?,
            };
            let phrase = read_phrase(phrase)?;
            let hashed = crypt(phrase.as_bytes(), &setting);
            println!("{hashed}");
            if is_failure_token(hashed.as_bytes()) {
                bail!("hashing failed for setting {setting:?}");
            }
        }
        Commands::Verify { hash, phrase } => {
            let phrase = read_phrase(phrase)?;
            let hashed = crypt(phrase.as_bytes(), &hash);
            if is_failure_token(hashed.as_bytes()) {
                bail!("not a usable hash: {hash:?}");
            }
            if !hashes_match(&hashed, &hash) {
                println!("mismatch");
                bail!("passphrase does not match");
            }
            info!("verified");
            println!("ok");
        }
        Commands::Gensalt { prefix, count } => {
            println!("{}", gensalt(&settings, prefix, count)?);
        }
        Commands::Checksalt { setting, json } => {
            let verdict = crypt_checksalt(&setting);
            if json {
                let report = CheckReport {
                    setting: &setting,
                    verdict,
                    code: verdict.code(),
                };
                println!("{}", serde_json::to_string(&report)?);
            } else {
                println!("{}", serde_json::to_value(verdict)?.as_str().unwrap_or("unknown"));
            }
            if verdict == SaltCheck::Invalid {
                return Err(anyhow!("invalid setting {setting:?}"));
            }
        }
        Commands::Methods { json } => {
            let list: Vec<MethodInfo> = methods()
                .iter()
                .map(|m| MethodInfo {
                    prefix: m.prefix(),
                    name: m.name(),
                    strong: m.is_strong(),
                })
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                for m in &list {
                    let prefix = if m.prefix.is_empty() { "(none)" } else { m.prefix };
                    let class = if m.strong { "strong" } else { "legacy" };
                    println!("{prefix:<12} {:<14} {class}", m.name);
                }
            }
        }
    }
    Ok(())
}
