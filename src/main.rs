use clap::{Arg, Command};
use contact_relay::config::Config;
use contact_relay::contact::ContactMailer;
use contact_relay::mailer::{build_mail_transport, select_transport};
use contact_relay::server::{self, AppState};
use log::LevelFilter;
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let matches = Command::new("contact-relay")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Forwards website contact-form submissions as email")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/contact-relay.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Load configuration, report the selected transport, and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = match load_config(config_path) {
        Ok(config) => config.overlay_env(),
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    let strategy = select_transport(&config);

    if matches.get_flag("test-config") {
        println!("Configuration file: {config_path}");
        println!(
            "Listening port: {} (fallback {})",
            config.listen_port, config.fallback_port
        );
        println!("Destination address: {}", config.to_email);
        println!("Selected transport: {strategy}");
        return;
    }

    log::info!("starting contact relay with transport: {strategy}");

    let transport = match build_mail_transport(&strategy) {
        Ok(transport) => transport,
        Err(e) => {
            log::error!("failed to initialize mail transport: {e}");
            process::exit(1);
        }
    };

    let mailer = ContactMailer::new(transport, config.to_email.clone(), config.from_email.clone());
    let state = Arc::new(AppState { mailer });

    if let Err(e) = server::serve(&config, state).await {
        log::error!("server error: {e}");
        process::exit(1);
    }
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file(path)
    } else {
        log::warn!("Configuration file '{path}' not found, using default configuration");
        Ok(Config::default())
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}
