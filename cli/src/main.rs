mod output;
mod script;

use std::fs::File;
use std::io::{stdin, BufRead, BufReader, Read};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dialoguer::Input;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use ndef_hce::nfc::{ApduService, DeactivationReason};
use ndef_hce::reader::{Exchange, Reader};
use ndef_hce::profile::ProfileConfig;
use ndef_hce::{ndef, profile, Card, Profile};

use crate::output::Format;
use crate::script::Line;

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed profile: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid profile: {0}")]
    Profile(#[from] profile::Error),

    #[error("Invalid script: {0}")]
    Script(#[from] script::Error),

    #[error("Failed to read the tag: {0}")]
    Reader(#[from] ndef_hce::reader::Error),

    #[error("Invalid NDEF message: {0}")]
    Ndef(#[from] ndef::Error),
}

type Result<T> = std::result::Result<T, Error>;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// URI to serve from the NDEF file
    #[clap(long)]
    uri: Option<String>,

    /// JSON file describing what the tag serves
    #[clap(long)]
    profile: Option<PathBuf>,

    /// Prints exchanges as JSON lines
    #[clap(long)]
    json: bool,

    /// Logs every APDU going through the card
    #[clap(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Reads the emulated tag like a phone would, printing every exchange
    Demo,

    /// Answers hex-encoded APDUs from a script or stdin, one per line
    Emulate {
        /// Script to run instead of reading stdin
        #[clap(long)]
        input: Option<PathBuf>,
    },

    /// Prompts for APDUs interactively
    Shell,

    /// Prints the CC file and the NDEF message the tag serves
    Ndef,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(match cli.verbose {
                true => "debug",
                _ => "info",
            })
        }))
        .with_writer(std::io::stderr)
        .init();

    let profile = load_profile(&cli)?;
    info!("Serving {}", profile.uri());

    let format = Format::new(cli.json);
    let mut card = Card::new(profile);

    match cli.command {
        Command::Demo => demo(&mut card, format),
        Command::Emulate { input } => match input {
            Some(path) => emulate(&mut card, format, BufReader::new(File::open(path)?)),
            None => emulate(&mut card, format, stdin().lock()),
        },
        Command::Shell => shell(&mut card, format),
        Command::Ndef => print_ndef(card.profile()),
    }
}

fn load_profile(cli: &Cli) -> Result<Profile> {
    let config = match &cli.profile {
        Some(path) => parse_profile(BufReader::new(File::open(path)?))?,
        None => ProfileConfig::default(),
    };

    build_profile(config, cli.uri.as_deref())
}

fn parse_profile(reader: impl Read) -> Result<ProfileConfig> {
    Ok(serde_json::from_reader(reader)?)
}

/// Checks the profile once the URI from the command line has replaced the configured one.
fn build_profile(mut config: ProfileConfig, uri: Option<&str>) -> Result<Profile> {
    if let Some(uri) = uri {
        config.uri = uri.to_owned();
    }

    Ok(Profile::try_from(config)?)
}

fn demo(card: &mut Card, format: Format) -> Result<()> {
    let mut reader = Reader::new(card);
    let result = reader.read_message(());

    // Replays the transcript against a fresh card so each line shows the selection it caused.
    let transcript = reader.into_transcript();
    let mut replay = Card::new(card.profile().clone());
    for exchange in &transcript {
        replay.process((), &exchange.command);
        println!("{}", format.exchange(exchange, replay.selection()));
    }

    for record in result?.records {
        match record.to_uri() {
            Ok(uri) => info!("Read URI record: {}", uri),
            Err(e) => info!("Read a record without URI: {}", e),
        }
    }

    Ok(())
}

fn emulate(card: &mut Card, format: Format, input: impl BufRead) -> Result<()> {
    for (i, line) in input.lines().enumerate() {
        let line = line?;

        match script::parse_line(i + 1, &line)? {
            Line::Frame(command) => exchange(card, format, command),
            Line::Deactivate(reason) => deactivate(card, reason),
            Line::Empty => continue,
        }
    }

    Ok(())
}

fn shell(card: &mut Card, format: Format) -> Result<()> {
    println!("Enter APDUs in hex, `deactivate [reason]` to end the session, `exit` to quit.");

    for number in 1.. {
        let line = Input::<String>::new()
            .with_prompt("C-APDU")
            .allow_empty(true)
            .interact_text()?;

        if line.trim() == "exit" {
            break;
        }

        match script::parse_line(number, &line) {
            Ok(Line::Frame(command)) => exchange(card, format, command),
            Ok(Line::Deactivate(reason)) => deactivate(card, reason),
            Ok(Line::Empty) => continue,
            Err(e) => eprintln!("{}", e),
        }
    }

    Ok(())
}

fn exchange(card: &mut Card, format: Format, command: Vec<u8>) {
    let response = card.process((), &command);
    let exchange = Exchange { command, response };

    println!("{}", format.exchange(&exchange, card.selection()));
}

fn deactivate(card: &mut Card, reason: DeactivationReason) {
    debug!("Deactivating with code {}", i32::from(reason));

    card.deactivate((), reason);
}

fn print_ndef(profile: &Profile) -> Result<()> {
    let message = profile.ndef_message();

    println!("CC:   {}", hex::encode_upper(profile.cc_file()));
    println!("NLEN: {:04X}", message.len());
    println!("NDEF: {}", hex::encode_upper(message));

    for record in ndef::Message::parse(message)?.records {
        println!("URI:  {}", record.to_uri()?);
    }

    Ok(())
}
