#[tokio::main]
async fn main() -> anyhow::Result<()> {
    riskpilot_lib::run().await
}
