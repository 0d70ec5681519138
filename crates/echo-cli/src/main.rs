//! `mtls-echo`: command-line entry point for the mutual-TLS echo service.
//!
//! Thin glue over the core crates: argument parsing, logging init, the
//! stdin/stdout surface, and exit codes. Status lines for the user go to
//! stdout; all diagnostics go to stderr.

use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use echo_client_core::{ClientEndpoint, ConnectTarget};
use echo_proto::tls::{build_client_config, build_server_config};
use echo_proto::TrustConfig;
use echo_server_core::Acceptor;

#[derive(Parser)]
#[command(name = "mtls-echo", about = "Mutual-TLS echo server and client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Accept connections and echo whatever authenticated clients send.
    Server {
        /// Port to listen on.
        #[arg(value_parser = clap::value_parser!(u16).range(1..))]
        port: u16,
        /// CA certificate (PEM) used to verify client certificates.
        ca_cert: PathBuf,
        /// Server certificate (PEM) signed by the CA.
        cert: PathBuf,
        /// Private key (PEM) matching the server certificate.
        key: PathBuf,
    },
    /// Connect, send one line of stdin, and print the echoed reply.
    Client {
        /// Server to connect to, as host:port.
        target: String,
        /// CA certificate (PEM) used to verify the server certificate.
        ca_cert: PathBuf,
        /// Client certificate (PEM) signed by the CA.
        cert: PathBuf,
        /// Private key (PEM) matching the client certificate.
        key: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Server {
            port,
            ca_cert,
            cert,
            key,
        } => run_server(port, ca_cert, cert, key),
        Command::Client {
            target,
            ca_cert,
            cert,
            key,
        } => run_client(&target, ca_cert, cert, key),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_server(
    port: u16,
    ca_cert: PathBuf,
    cert: PathBuf,
    key: PathBuf,
) -> Result<(), Box<dyn Error>> {
    let identity = TrustConfig::server(ca_cert, cert, key).load()?;
    let config = build_server_config(identity)?;
    let acceptor = Acceptor::bind(port, config)?;

    // The acceptor owns its run state; nothing sets the flag here, so the
    // process runs until an external signal ends it. Session status lines
    // go to stdout; diagnostics stay on stderr.
    let stop = AtomicBool::new(false);
    acceptor.run(&stop, |outcome| {
        println!("handshake successful with {}", outcome.peer_addr);
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(&outcome.last_payload);
        let _ = stdout.flush();
    });

    Ok(())
}

fn run_client(
    target: &str,
    ca_cert: PathBuf,
    cert: PathBuf,
    key: PathBuf,
) -> Result<(), Box<dyn Error>> {
    let target: ConnectTarget = target.parse()?;
    let identity = TrustConfig::client(ca_cert, cert, key).load()?;
    let config = build_client_config(identity)?;

    let endpoint = ClientEndpoint::new(config);
    let mut session = endpoint.connect(&target)?;
    println!("handshake successful with {target}");

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    let result = session.exchange(line.as_bytes());
    session.shutdown();

    // A soft length mismatch surfaces nothing.
    if let Some(echoed) = result? {
        let mut stdout = io::stdout().lock();
        stdout.write_all(&echoed)?;
        stdout.flush()?;
    }

    Ok(())
}
