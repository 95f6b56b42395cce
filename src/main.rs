use clap::Parser;
use k3_query::utils::error::report_failure;
use k3_query::utils::{logger, validation::Validate};
use k3_query::{CliConfig, K3CloudClient, QueryEngine, QueryError, TomlConfig};

#[tokio::main]
async fn main() {
    // 缺少必要參數時以退出碼 1 結束
    let config = match CliConfig::try_parse() {
        Ok(config) => config,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    // 初始化日誌（stderr）
    logger::init_cli_logger(config.verbose, config.log_json);

    tracing::debug!("CLI config: {:?}", config);

    let engine = match build_engine(&config) {
        Ok(engine) => engine,
        Err(e) => std::process::exit(report_failure(&e, &mut std::io::stderr())),
    };

    // 只有成功時才輸出 JSON，避免呼叫端讀到不完整結果
    let code = engine
        .run_to_writer(
            &config.report(),
            config.pretty,
            &mut std::io::stdout(),
            &mut std::io::stderr(),
        )
        .await;
    std::process::exit(code);
}

fn build_engine(config: &CliConfig) -> Result<QueryEngine<K3CloudClient>, QueryError> {
    config.validate()?;

    tracing::info!("📁 Loading connection config from: {}", config.config);
    let file = TomlConfig::from_file(&config.config)?;
    file.validate()?;

    let client = K3CloudClient::new(&file)?;
    tracing::debug!("ExecuteBillQuery endpoint: {}", client.endpoint());

    Ok(QueryEngine::with_overrides(
        client,
        config.policy_overrides(&file),
    ))
}
