use clap::Parser;
use revisions_engine::config::CliArgs;
use revisions_engine::server::RevisionsServer;
use revisions_engine::transport::NdjsonTransport;

fn main() {
    let args = CliArgs::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let transport = NdjsonTransport::new();
    let mut server = RevisionsServer::new(transport, &args);

    tracing::info!("{} ready", args.server_name);

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
