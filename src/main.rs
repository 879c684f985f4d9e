use std::env;
use std::process;

use kmeans_server::{Config, MiningServer};
use log::{error, LevelFilter};

#[tokio::main]
async fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .expect("Failed to initialize logger");

    let config = match Config::new(env::args()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("usage: kmeans_server [port] [database] [storage]");
            eprintln!("{err}");
            process::exit(1);
        }
    };

    if let Err(err) = std::fs::create_dir_all(config.storage()) {
        error!(
            "cannot prepare storage directory {:?}: {}",
            config.storage(),
            err
        );
        process::exit(1);
    }

    let server = match MiningServer::bind(&config).await {
        Ok(server) => server,
        Err(err) => {
            error!("cannot listen on port {}: {}", config.port(), err);
            process::exit(1);
        }
    };

    if let Err(err) = server.run().await {
        error!("server stopped: {}", err);
        process::exit(1);
    }
}
