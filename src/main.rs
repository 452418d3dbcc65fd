use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use plug_watch::comm::PlugWatcher;
use plug_watch::common::logging::{init_logger, LogLevel};
use plug_watch::data::DbManager;
use plug_watch::model::MonitorConfig;
use plug_watch::queue::DEFAULT_QUEUE_CAPACITY;

#[derive(Parser, Debug)]
struct Args {
    config_file: std::path::PathBuf,
    #[arg(long = "db", default_value = "plugs.db")]
    db_file: std::path::PathBuf,
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
    #[arg(long = "log-file", default_value = "")]
    log_file: String,
    #[arg(long = "api-port", default_value = "8000")]
    api_port: u16,
    #[arg(long = "queue-capacity", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    //We have to keep the worker_guard alive
    let _worker_guard = init_logger(args.log_level, &args.log_file).unwrap_or_else(|e| {
        eprintln!("Couldn't init logger: {:#}", e);
        std::process::exit(1);
    });

    let config = MonitorConfig::from_file(&args.config_file).unwrap_or_else(|e| {
        error!("{:#}", e);
        std::process::exit(1);
    });

    if let Err(err) = config.validate() {
        error!("Wrong config:\n{}", err);
        std::process::exit(1);
    }

    let db = DbManager::open_with_capacity(&args.db_file, args.queue_capacity).unwrap_or_else(|e| {
        error!("Couldn't init db: {}", e);
        std::process::exit(1);
    });
    let db = Arc::new(db);

    let mut plug_watcher = PlugWatcher::new(config.clone(), db.clone()).unwrap_or_else(|e| {
        error!("Couldn't init polling tasks: {:#}", e);
        std::process::exit(1);
    });

    plug_watcher.watch().unwrap_or_else(|e| {
        error!("Couldn't start polling tasks: {:#}", e);
        std::process::exit(1);
    });

    let _api = plug_watch::api::serve_api(db.clone(), args.api_port)
        .await
        .unwrap_or_else(|e| {
            error!("Couldn't start api: {:#}", e);
            std::process::exit(1);
        });

    let _aggregations =
        plug_watch::aggregations::start_aggregation_building(db, config.aggregation_periods());

    info!("Monitoring started!");

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Couldn't listen for ctrl-c: {}", err);
    }

    info!("monitoring interrupted by user, stopping process");

    plug_watcher.stop();
}
