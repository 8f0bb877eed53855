use clap::Parser;
use log::{error, info};
use seqstego_core::SERVICE_PORT;
use seqstego_link::{ClientConfig, StegoClient};
use seqstego_linux::{LinuxClock, LinuxEntropy, RawTcpTransport};
use std::net::Ipv4Addr;

#[derive(Parser)]
struct Cli {
    /// Address the handshake is sent from.
    #[arg(long)] client: Ipv4Addr,
    /// Cooperating peer watching the raw traffic.
    #[arg(long)] server: Ipv4Addr,
    #[arg(long, default_value = "hi")] message: String,
    #[arg(long, default_value_t = SERVICE_PORT)] port: u16,
    #[arg(long, default_value_t = 3)] timeout_secs: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    info!(">>> SEQSTEGO CLIENT: {} -> {}:{} <<<", cli.client, cli.server, cli.port);

    let transport = RawTcpTransport::new()?;
    let config = ClientConfig {
        service_port: cli.port,
        ..ClientConfig::default()
    }
    .with_timeout_secs(cli.timeout_secs);

    let mut client = StegoClient::new(
        Box::new(transport), Box::new(LinuxEntropy), Box::new(LinuxClock::new()),
        config,
    );

    // A failed send is reported, not fatal.
    match client.send_message(&cli.message, cli.client, cli.server) {
        Ok(report) => info!(
            "Delivered {} bits from port {} (ISN {:#010x}, peer ISN {})",
            report.bits_sent, report.local_port, report.isn, report.peer_isn
        ),
        Err(e) => error!("Send aborted: {}", e),
    }
    Ok(())
}
