use std::net::UdpSocket;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info, warn};

use cell_access::config;
use cell_access::directory::Directory;
use cell_access::responder::Responder;

#[derive(Parser, Debug)]
#[command(name = "cell-access-server")]
#[command(about = "Answers cellular access-permission requests from a verification database")]
struct Args {
    /// Listen port
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Verification database: count line, then subscriber number /
    /// technology / paid flag, one value per line
    #[arg(long, default_value = "input_files/verification_database.txt")]
    database: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let args = Args::parse();

    let records = match config::load_verification_database(&args.database) {
        Ok(records) => records,
        Err(e) => {
            error!(
                "cannot read verification database {}: {}",
                args.database.display(),
                e
            );
            process::exit(1);
        }
    };
    let directory = Directory::load(records);
    info!("verification directory ({} records):\n{}", directory.len(), directory);

    let socket = match UdpSocket::bind(("0.0.0.0", args.port)) {
        Ok(socket) => socket,
        Err(e) => {
            error!("cannot bind port {}: {}", args.port, e);
            process::exit(3);
        }
    };
    info!("listening on port {}", args.port);

    let mut responder = Responder::new(directory);
    let mut buf = [0u8; 512];

    loop {
        let (n, peer) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) => {
                error!("recv failed: {e}");
                process::exit(3);
            }
        };

        match responder.handle_datagram(&buf[..n]) {
            Ok(Some(reply)) => {
                if let Err(e) = socket.send_to(&reply, peer) {
                    error!("send to {peer} failed: {e}");
                }
            }
            Ok(None) => {}
            Err(e) => {
                // Corrupt datagrams are dropped; the server keeps serving.
                warn!("dropping datagram from {peer}: {e}");
            }
        }
    }
}
