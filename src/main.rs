use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    adminterm::run().await
}
