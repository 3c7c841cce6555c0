//! Invoice relay entry point
//!
//! ```text
//! ┌──────────┐    ┌───────────┐    ┌───────────┐    ┌──────────┐
//! │  Client  │───▶│  Gateway  │───▶│  Import   │───▶│  Pushes  │
//! │ (WS/PUT) │    │ (axum)    │    │ (FSM+CAS) │    │ (WS out) │
//! └──────────┘    └───────────┘    └───────────┘    └──────────┘
//! ```
//!
//! The gateway owns the HTTP surface; everything after an upload lands
//! runs on background workers fed by table change feeds.

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

fn main() {
    let env = get_env();
    let mut app_config = invoice_relay::config::AppConfig::load(&env);
    let _log_guard = invoice_relay::logging::init_logging(&app_config);

    // Allow --port override of the YAML value
    if let Some(port) = get_port_override() {
        app_config.gateway.port = port;
    }

    tracing::info!("Starting invoice relay in {} mode", env);

    println!("=== Invoice Relay: import gateway ===");
    println!(
        "Gateway will listen on {}:{}",
        app_config.gateway.host, app_config.gateway.port
    );
    println!("Upload slot TTL: {}s", app_config.import.slot_ttl_secs);
    println!("Sweep interval: {}ms", app_config.import.sweep_interval_ms);

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    rt.block_on(async {
        let state = invoice_relay::gateway::bootstrap(&app_config);
        if let Err(e) = invoice_relay::gateway::run_server(&app_config, state).await {
            eprintln!("❌ FATAL: {e:#}");
            std::process::exit(1);
        }
    });
}
