use relay_meter_server::core::CoreApp;

#[tokio::main]
async fn main() {
    if let Err(e) = CoreApp::run_collector().await {
        eprintln!("\nError: {}\n", e);
        std::process::exit(1);
    }
}
