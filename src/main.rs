#[tokio::main]
async fn main() -> anyhow::Result<()> {
    exchange_accounts::cli::run_with_sys_args().await
}
