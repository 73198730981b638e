//! Binary entry point for the Anchor relay server.

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lib_anchor_server::init().await
}
