//! PinSeed: PIN-protected wallet seed backup
//!
//! # Usage
//!
//! ```bash
//! pinseed backup                       # generate a seed, seal it, write the backup
//! pinseed backup --mnemonic-file w.txt # seal an existing mnemonic
//! pinseed restore                      # open the stored backup
//! pinseed check                        # open the backup and look the account up
//! pinseed verify-qr PINSEED1:0100...   # compare a scanned QR with the backup
//! ```

mod commands;
mod config;
mod render;
mod store;

use anyhow::{Context, Result};
use commands::Command;
use pinseed_core::PinCode;
use pinseed_session::CancelToken;
use std::io::{BufRead, Read, Write};
use std::path::PathBuf;
use zeroize::Zeroizing;

fn main() -> Result<()> {
    // Security hardening: disable core dumps to prevent seed material leaking to disk
    pinseed_core::memory::disable_core_dumps();

    // Parse CLI args (minimal, no clap dependency needed)
    let args: Vec<String> = std::env::args().collect();

    let mut config_path = PathBuf::from("pinseed.toml");
    let mut validate_only = false;
    let mut command: Option<Command> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = PathBuf::from(&args[i]);
                } else {
                    anyhow::bail!("--config requires a path argument");
                }
            }
            "--validate" => {
                validate_only = true;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("pinseed {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            other if command.is_none() && !other.starts_with('-') => {
                let (parsed, consumed) = parse_command(other, &args[i + 1..])?;
                command = Some(parsed);
                i += consumed;
            }
            other => {
                anyhow::bail!("Unknown argument: {}", other);
            }
        }
        i += 1;
    }

    // Load config
    let mut cli_config = config::CliConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Apply env overrides
    cli_config.apply_env_overrides();

    // Validate
    cli_config
        .validate()
        .context("Configuration validation failed")?;

    // Init logger
    std::env::set_var("RUST_LOG", &cli_config.general.log_level);
    env_logger::init();

    if validate_only {
        println!("Configuration is valid.");
        println!("  Data dir:   {}", cli_config.general.data_dir.display());
        println!(
            "  KDF:        m={} KiB t={} p={}",
            cli_config.kdf.m_cost, cli_config.kdf.t_cost, cli_config.kdf.p_cost
        );
        println!("  Words:      {}", cli_config.backup.word_count);
        println!("  QR limit:   version {}", cli_config.backup.qr_max_version);
        println!("  Network:    {}", cli_config.electrum.network);
        println!("  Electrum:   {}", cli_config.electrum_url());
        return Ok(());
    }

    let Some(command) = command else {
        print_help();
        anyhow::bail!("No command given");
    };

    if !command.needs_pin() {
        let Command::VerifyQr { scanned } = command else {
            anyhow::bail!("Command without a PIN is not supported");
        };
        let scanned = match scanned {
            Some(s) => s,
            None => read_stdin_to_string().context("Failed to read scanned payload")?,
        };
        if !commands::verify_qr(&cli_config, &scanned)? {
            std::process::exit(1);
        }
        return Ok(());
    }

    let pin = read_pin()?;

    // Build tokio runtime
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;

    let outcome = rt.block_on(async {
        // Ctrl-C cancels the running operation; the session rolls itself back
        let cancel = CancelToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::info!("Received interrupt. Cancelling…");
                    cancel.cancel();
                }
            })
        };

        let result = match &command {
            Command::Backup { mnemonic_file } => {
                commands::backup(&cli_config, pin, mnemonic_file.as_deref(), &cancel)
                    .await
                    .map(|()| true)
            }
            Command::Restore { input } => {
                commands::restore(&cli_config, pin, input.as_deref(), &cancel)
                    .await
                    .map(|()| true)
            }
            Command::Check { input } => {
                commands::check(&cli_config, pin, input.as_deref(), &cancel).await
            }
            Command::VerifyQr { .. } => Ok(true),
        };

        watcher.abort();
        result
    });

    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            log::error!("{:#}", e);
            Err(e)
        }
    }
}

/// Parse a subcommand and its options. Returns the command and how many of
/// `rest` it consumed.
fn parse_command(name: &str, rest: &[String]) -> Result<(Command, usize)> {
    let flag_value = |flag: &str| -> Result<(Option<PathBuf>, usize)> {
        match rest.first().map(String::as_str) {
            Some(f) if f == flag => match rest.get(1) {
                Some(path) => Ok((Some(PathBuf::from(path)), 2)),
                None => anyhow::bail!("{} requires a path argument", flag),
            },
            _ => Ok((None, 0)),
        }
    };

    match name {
        "backup" => {
            let (mnemonic_file, used) = flag_value("--mnemonic-file")?;
            Ok((Command::Backup { mnemonic_file }, used))
        }
        "restore" => {
            let (input, used) = flag_value("--input")?;
            Ok((Command::Restore { input }, used))
        }
        "check" => {
            let (input, used) = flag_value("--input")?;
            Ok((Command::Check { input }, used))
        }
        "verify-qr" => match rest.first() {
            Some(payload) if !payload.starts_with('-') => Ok((
                Command::VerifyQr {
                    scanned: Some(payload.clone()),
                },
                1,
            )),
            _ => Ok((Command::VerifyQr { scanned: None }, 0)),
        },
        other => anyhow::bail!("Unknown command: {}", other),
    }
}

/// PIN from `PINSEED_PIN`, or a line on stdin.
fn read_pin() -> Result<PinCode> {
    let digits = match std::env::var("PINSEED_PIN") {
        Ok(v) => {
            std::env::remove_var("PINSEED_PIN");
            Zeroizing::new(v)
        }
        Err(_) => {
            eprint!("PIN: ");
            std::io::stderr().flush().ok();
            let mut line = Zeroizing::new(String::new());
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read PIN")?;
            line
        }
    };
    PinCode::new(digits.trim_end_matches(|c: char| c == '\n' || c == '\r')).context("Invalid PIN")
}

fn read_stdin_to_string() -> Result<String> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    Ok(input)
}

fn print_help() {
    println!(
        r#"PinSeed: PIN-protected wallet seed backup

USAGE:
    pinseed [OPTIONS] <COMMAND>

COMMANDS:
    backup [--mnemonic-file <PATH>]   Seal a new (or the given) seed and write the backup
    restore [--input <PATH>]          Open the backup and write the seed
    check [--input <PATH>]            Open the backup and look the account up on Electrum
    verify-qr [PAYLOAD]               Compare a scanned QR payload (or stdin) with the backup

OPTIONS:
    -c, --config <PATH>   Config file path (default: ./pinseed.toml)
    --validate            Validate configuration and exit
    -h, --help            Show this help message
    -V, --version         Show version

ENVIRONMENT VARIABLES (override config file):
    PINSEED_PIN               6-digit PIN (otherwise read from stdin)
    PINSEED_DATA_DIR          Data directory path
    PINSEED_LOG_LEVEL         Log level (error/warn/info/debug/trace)
    PINSEED_KDF_M_COST        Argon2id memory in KiB
    PINSEED_KDF_T_COST        Argon2id iterations
    PINSEED_KDF_P_COST        Argon2id parallelism
    PINSEED_WORD_COUNT        Words in generated seeds (12/15/18/21/24)
    PINSEED_QR_MAX_VERSION    Largest QR version allowed (1-40)
    PINSEED_NETWORK           Bitcoin network (bitcoin/testnet/signet/regtest)
    PINSEED_ELECTRUM_URL      Electrum server URL

EXAMPLES:
    # Back up a fresh 24-word seed
    pinseed backup

    # Render the QR payload with an external encoder
    qrencode -r pinseed-data/backup_qr.txt -o backup.png

    # Restore and check the account exists
    PINSEED_PIN=135790 pinseed check
"#
    );
}
