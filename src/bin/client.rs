use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use cell_access::config;
use cell_access::network::UdpTransport;
use cell_access::packet::format_phone;
use cell_access::session::{ArqSession, DEFAULT_RETRIES, DEFAULT_TIMEOUT};
use cell_access::ProtocolError;

#[derive(Parser, Debug)]
#[command(name = "cell-access-client")]
#[command(about = "Requests cellular access permission for scripted subscribers")]
struct Args {
    /// Server hostname
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Per-attempt response timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    /// Retries after the first transmission
    #[arg(long, default_value_t = DEFAULT_RETRIES)]
    retries: u32,

    /// Request script: count line, then client id / segment / technology /
    /// subscriber number, one value per line
    input: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let args = Args::parse();

    let requests = match config::load_request_script(&args.input) {
        Ok(requests) => requests,
        Err(e) => {
            error!("cannot read request script {}: {}", args.input.display(), e);
            process::exit(1);
        }
    };
    info!("loaded {} requests from {}", requests.len(), args.input.display());

    let transport = match UdpTransport::connect((args.host.as_str(), args.port)) {
        Ok(transport) => transport,
        Err(e) => {
            error!("cannot reach {}:{}: {}", args.host, args.port, e);
            process::exit(3);
        }
    };

    let mut session = ArqSession::with_policy(
        transport,
        Duration::from_millis(args.timeout_ms),
        args.retries,
    );

    for params in &requests {
        info!(
            "sending segment {}: subscriber {} on {}",
            params.segment_no,
            format_phone(params.subscriber_number),
            params.technology
        );

        match session.exchange(params) {
            // A resolved exchange has already passed validation, so the kind
            // tag is always in range here.
            Ok(response) => {
                if let Some(kind) = response.kind() {
                    info!("server responded 0x{:04X}: {}", response.packet_type, kind);
                }
            }
            Err(ProtocolError::RetriesExhausted(sent)) => {
                warn!("server does not respond ({sent} transmissions)");
            }
            Err(e) => {
                error!("exchange failed: {e}");
                process::exit(2);
            }
        }
    }
}
