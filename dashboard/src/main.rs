#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dashboard::run_cli().await
}
