use clap::Parser;
use xray_ddx::shell::{self, render, AppState};
use xray_ddx::utils::{logger, validation::validate_image_extension, validation::Validate};
use xray_ddx::{
    AnalysisReport, AppConfig, CliConfig, Command, ConfigProvider, DdxError, DiagnosisRequest,
    DiagnosisRequester, OpenAiVisionClient,
};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting xray-ddx");

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    tracing::info!(
        endpoint = %config.api_endpoint(),
        model = %config.model_name(),
        relevance_gate = config.relevance_gate(),
        output_mode = ?config.output_mode(),
        "✅ Configuration loaded and validated"
    );

    let client = OpenAiVisionClient::from_config(&config);
    let model_name = client.model().to_string();
    let requester = DiagnosisRequester::from_config(client, &config);

    match &cli.command {
        Command::Serve { .. } => {
            let state = AppState::new(requester, model_name);
            shell::serve(shell::router(state), &config.server.listen_addr).await?;
        }
        Command::Analyze { image, json } => {
            if let Err(e) = run_analyze(&requester, &model_name, image, *json).await {
                tracing::error!("❌ Analysis failed: {}", e);
                tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
                eprintln!("❌ {}", e.user_friendly_message());
                eprintln!("{}", e);
                std::process::exit(if e.is_config_error() { 1 } else { 2 });
            }
        }
    }

    Ok(())
}

fn load_config(cli: &CliConfig) -> xray_ddx::Result<AppConfig> {
    let mut config = AppConfig::load(&cli.config)?;
    cli.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

async fn run_analyze(
    requester: &DiagnosisRequester<OpenAiVisionClient>,
    model_name: &str,
    image: &std::path::Path,
    json: bool,
) -> Result<(), DdxError> {
    validate_image_extension("image", &image.to_string_lossy(), &IMAGE_EXTENSIONS).map_err(
        |e| DdxError::ValidationError {
            message: e.to_string(),
        },
    )?;

    let bytes = tokio::fs::read(image).await?;
    tracing::info!("📁 Read {} bytes from {}", bytes.len(), image.display());

    let outcome = requester.run(&DiagnosisRequest::new(bytes)).await?;

    if json {
        let report = AnalysisReport::new(model_name, outcome);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render::render_text(&outcome));
    }
    Ok(())
}
