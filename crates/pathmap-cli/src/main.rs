//! Binary entrypoint for `pathmap`.

#[tokio::main]
async fn main() {
    std::process::exit(pathmap_cli::run().await);
}
