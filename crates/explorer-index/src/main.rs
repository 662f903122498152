#[tokio::main]
async fn main() {
    let code = explorer_index_cli::run_cli(std::env::args().collect()).await;
    std::process::exit(code);
}
