// src/main.rs
#[tokio::main]
async fn main() {
    catalog_admin::start::run().await;
}
