use anyhow::{Context, Result};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use nutrisnap::pipeline::PipelineLogger;
use nutrisnap::prompt::NUTRITION_INSTRUCTION;
use nutrisnap::providers::{ProviderOverrides, create_provider_with_overrides};
use nutrisnap::{AppConfig, EstimatorClient, ModelId, NutritionPipeline, PipelineOverrides, server, ui};

mod args;
use args::{Command, EstimateArgs, USAGE};

#[tokio::main]
async fn main() -> ExitCode {
    let command = match Command::parse() {
        Ok(command) => command,
        Err(e) => {
            ui::error(e.to_string());
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    let result = match command {
        Command::Help => {
            println!("{USAGE}");
            Ok(())
        }
        Command::Serve { port } => serve(port).await,
        Command::Estimate(args) => estimate(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::error(format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn serve(port: Option<u16>) -> Result<()> {
    ui::init_logging(log::LevelFilter::Info);

    let mut config = AppConfig::load()?;
    if let Some(port) = port {
        config.server.port = port;
    }
    server::start_server(config).await
}

async fn estimate(args: EstimateArgs) -> Result<()> {
    ui::init_logging(log::LevelFilter::Warn);

    let image = std::fs::read(&args.image)
        .with_context(|| format!("reading {}", args.image.display()))?;

    let config = AppConfig::load()?;
    let mut pipeline_config = config.pipeline.to_pipeline_config();
    if let Some(secs) = args.timeout_secs {
        pipeline_config.per_call_timeout = Some(Duration::from_secs(secs)).filter(|d| !d.is_zero());
    }

    let provider = create_provider_with_overrides(ProviderOverrides {
        model: args.model.map(ModelId::new),
    })
    .await?;
    provider.validate_config()?;

    let provider_name = provider.name().to_string();
    let model = provider.model().to_string();

    let mut estimator = EstimatorClient::new(Arc::from(provider));
    if let Some(temperature) = config.pipeline.temperature {
        estimator = estimator.with_temperature(temperature);
    }

    let mut pipeline = NutritionPipeline::new(estimator, pipeline_config)?;
    if let Some(dir) = &config.pipeline.event_log_dir {
        pipeline = pipeline.with_logger(PipelineLogger::new(Path::new(dir))?);
    }

    let overrides = PipelineOverrides {
        fan_out_count: args.samples,
        min_quorum: args.quorum,
    };

    if !args.json_output {
        let samples = args.samples.unwrap_or(pipeline.config().fan_out_count);
        ui::header(&provider_name, &model, samples);
    }

    let result = pipeline
        .run_pipeline(&image, NUTRITION_INSTRUCTION, &overrides)
        .await?;

    if args.json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        ui::aggregate(&result);
    }
    Ok(())
}
