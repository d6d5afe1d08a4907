use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    card_drop_bot::run_bot().await
}
