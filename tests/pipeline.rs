mod common;

use std::time::Duration;

use common::{JPEG, Reply, estimator, reply_with_calories, scripted};
use nutrisnap::pipeline::PipelineLogger;
use nutrisnap::prompt::NUTRITION_INSTRUCTION;
use nutrisnap::{NutritionPipeline, PipelineConfig, PipelineError, PipelineOverrides};
use tempfile::TempDir;

fn config(fan_out_count: usize, min_quorum: usize) -> PipelineConfig {
    PipelineConfig {
        fan_out_count,
        min_quorum,
        ..Default::default()
    }
}

#[tokio::test]
async fn averages_over_successes_only() {
    let provider = scripted(vec![
        Reply::Text(reply_with_calories(100)),
        Reply::Fail("boom"),
        Reply::Text(reply_with_calories(150)),
        Reply::Text("```json\nnot json\n```"),
        Reply::Text(reply_with_calories(201)),
    ]);
    let pipeline = NutritionPipeline::new(estimator(&provider), config(5, 1)).unwrap();

    let result = pipeline
        .run_pipeline(JPEG, NUTRITION_INSTRUCTION, &PipelineOverrides::default())
        .await
        .unwrap();

    assert_eq!(result.samples_used(), 3);
    assert_eq!(result.samples_requested(), 5);
    assert_eq!(result.calories(), 150.3);
    assert_eq!(result.protein_g(), 20.0);
    assert_eq!(result.satiety_index(), 1.5);
}

#[tokio::test]
async fn all_failures_is_insufficient_samples() {
    let provider = scripted(vec![Reply::Fail("quota exceeded")]);
    let pipeline = NutritionPipeline::new(estimator(&provider), config(4, 1)).unwrap();

    let err = pipeline
        .run_pipeline(JPEG, NUTRITION_INSTRUCTION, &PipelineOverrides::default())
        .await
        .unwrap_err();

    match err {
        PipelineError::InsufficientSamples(starved) => {
            assert_eq!(starved.succeeded, 0);
            assert_eq!(starved.required, 1);
            assert_eq!(starved.requested, 4);
        }
        other => panic!("expected InsufficientSamples, got {other:?}"),
    }
    assert_eq!(provider.calls(), 4);
}

#[tokio::test]
async fn quorum_above_successes_fails() {
    let provider = scripted(vec![
        Reply::Text(reply_with_calories(500)),
        Reply::Fail("boom"),
        Reply::Fail("boom"),
    ]);
    let pipeline = NutritionPipeline::new(estimator(&provider), config(3, 2)).unwrap();

    let err = pipeline
        .run_pipeline(JPEG, NUTRITION_INSTRUCTION, &PipelineOverrides::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::InsufficientSamples(ref s) if s.succeeded == 1 && s.required == 2
    ));
}

#[tokio::test]
async fn empty_image_is_rejected_before_any_call() {
    let provider = scripted(vec![Reply::Text(reply_with_calories(1))]);
    let pipeline = NutritionPipeline::new(estimator(&provider), config(3, 1)).unwrap();

    let err = pipeline
        .run_pipeline(&[], NUTRITION_INSTRUCTION, &PipelineOverrides::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::EmptyImage));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn overrides_change_sample_count() {
    let provider = scripted(vec![Reply::Text(reply_with_calories(320))]);
    let pipeline = NutritionPipeline::new(estimator(&provider), config(5, 1)).unwrap();

    let overrides = PipelineOverrides {
        fan_out_count: Some(2),
        min_quorum: Some(2),
    };
    let result = pipeline
        .run_pipeline(JPEG, NUTRITION_INSTRUCTION, &overrides)
        .await
        .unwrap();

    assert_eq!(result.samples_requested(), 2);
    assert_eq!(result.samples_used(), 2);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn invalid_overrides_are_rejected() {
    let provider = scripted(vec![Reply::Text(reply_with_calories(320))]);
    let pipeline = NutritionPipeline::new(estimator(&provider), config(5, 1)).unwrap();

    let overrides = PipelineOverrides {
        fan_out_count: Some(2),
        min_quorum: Some(3),
    };
    let err = pipeline
        .run_pipeline(JPEG, NUTRITION_INSTRUCTION, &overrides)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidConfig(_)));
    assert_eq!(provider.calls(), 0);
}

#[test]
fn construction_validates_config() {
    let provider = scripted(vec![Reply::Text(reply_with_calories(1))]);
    assert!(NutritionPipeline::new(estimator(&provider), config(0, 1)).is_err());
    assert!(NutritionPipeline::new(estimator(&provider), config(3, 4)).is_err());
}

#[tokio::test]
async fn timed_out_samples_count_as_failures() {
    let provider = scripted(vec![
        Reply::Text(reply_with_calories(200)),
        Reply::Slow(Duration::from_secs(5), reply_with_calories(9000)),
    ]);
    let pipeline = NutritionPipeline::new(
        estimator(&provider),
        PipelineConfig {
            fan_out_count: 2,
            min_quorum: 1,
            per_call_timeout: Some(Duration::from_millis(100)),
            ..Default::default()
        },
    )
    .unwrap();

    let result = pipeline
        .run_pipeline(JPEG, NUTRITION_INSTRUCTION, &PipelineOverrides::default())
        .await
        .unwrap();

    assert_eq!(result.samples_used(), 1);
    assert_eq!(result.calories(), 200.0);
}

#[tokio::test]
async fn event_log_records_every_stage_and_attempt() {
    let dir = TempDir::new().unwrap();
    let logger = PipelineLogger::new(dir.path()).unwrap();
    let log_path = logger.path().to_path_buf();

    let provider = scripted(vec![
        Reply::Text(reply_with_calories(100)),
        Reply::Fail("boom"),
    ]);
    let pipeline = NutritionPipeline::new(estimator(&provider), config(2, 1))
        .unwrap()
        .with_logger(logger);

    pipeline
        .run_pipeline(JPEG, NUTRITION_INSTRUCTION, &PipelineOverrides::default())
        .await
        .unwrap();

    let content = std::fs::read_to_string(log_path).unwrap();
    let events: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let steps: Vec<&str> = events.iter().map(|e| e["step"].as_str().unwrap()).collect();

    assert_eq!(
        steps,
        vec![
            "started",
            "fanning_out",
            "attempt",
            "attempt",
            "aggregating",
            "completed"
        ]
    );
    let run_id = events[0]["run_id"].as_str().unwrap();
    assert!(events.iter().all(|e| e["run_id"] == run_id));
}

#[tokio::test]
async fn failed_run_ends_with_failed_event() {
    let dir = TempDir::new().unwrap();
    let logger = PipelineLogger::new(dir.path()).unwrap();
    let log_path = logger.path().to_path_buf();

    let provider = scripted(vec![Reply::Fail("boom")]);
    let pipeline = NutritionPipeline::new(estimator(&provider), config(1, 1))
        .unwrap()
        .with_logger(logger);

    assert!(
        pipeline
            .run_pipeline(JPEG, NUTRITION_INSTRUCTION, &PipelineOverrides::default())
            .await
            .is_err()
    );

    let content = std::fs::read_to_string(log_path).unwrap();
    let last: serde_json::Value = serde_json::from_str(content.lines().last().unwrap()).unwrap();
    assert_eq!(last["step"], "failed");
    assert!(last["data"]["error"].is_string());
}

#[tokio::test]
async fn oversized_fan_out_is_rejected_before_any_call() {
    let provider = scripted(vec![Reply::Text(reply_with_calories(320))]);
    let pipeline = NutritionPipeline::new(estimator(&provider), config(5, 1)).unwrap();

    let overrides = PipelineOverrides {
        fan_out_count: Some(5000),
        min_quorum: None,
    };
    let err = pipeline
        .run_pipeline(JPEG, NUTRITION_INSTRUCTION, &overrides)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidConfig(_)));
    assert_eq!(provider.calls(), 0);
}
