#[tokio::main]
async fn main() -> anyhow::Result<()> {
    coffee_lib::main().await
}
