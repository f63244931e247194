#[macro_use]
extern crate log;

use anyhow::{Context, Result};
use futures::StreamExt;
use plan_audio::{
    batch,
    composer::{BgmReport, Composer, SpeechSegment},
    config::{self, Config, Variants, DEFAULT_CONFIG_PATH},
    mixer::MixSpec,
    naming,
    plan::PlanDayResolver,
    sources::{bgm::BgmDir, chapters::ChapterDir, BgmPool},
    wav,
};
use serde::Serialize;
use std::{path::PathBuf, pin::pin, sync::Arc};

/// Sidecar written next to every output file
#[derive(Serialize)]
struct Manifest<'a> {
    plan_id: &'a str,
    day: u32,
    reading: String,
    speed_ratio: f64,
    segments: &'a [SpeechSegment],
    bgm: Option<&'a BgmReport>,
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = Arc::new(config::load(&config_path).await?);

    tokio::fs::create_dir_all(&config.paths.output_dir)
        .await
        .with_context(|| format!("Could not create {:?}", config.paths.output_dir))?;

    let bgm_pool: Arc<dyn BgmPool> = if config.plan.variants == Variants::Plain {
        Arc::new(BgmDir::default())
    } else {
        let dir = config.paths.bgm_dir.clone();
        Arc::new(tokio::task::spawn_blocking(move || BgmDir::load(&dir)).await??)
    };

    let composer = Arc::new(
        Composer::new(
            Arc::new(ChapterDir::new(&config.paths.chapters_dir)),
            bgm_pool,
        )
        .with_target_dbfs(config.mix.normalize_target_dbfs)
        .with_chapter_gap_ms(config.mix.chapter_gap_ms),
    );

    let jobs = config
        .plan
        .days
        .iter()
        .flat_map(|entry| {
            config
                .plan
                .variants
                .bgm_flags()
                .into_iter()
                .map(move |bgm_enabled| (entry.day, bgm_enabled))
        })
        .map(|(day, bgm_enabled)| {
            let composer = composer.clone();
            let config = config.clone();
            move || render_day(&composer, &config, day, bgm_enabled)
        })
        .collect::<Vec<_>>();

    let workers = batch::default_workers();
    info!("Composing {} file(s), {workers} at a time", jobs.len());

    let mut written = 0;
    let mut failed = 0;
    let mut results = pin!(batch::run_blocking(jobs, workers));
    while let Some(result) = results.next().await {
        match result {
            Ok(Ok(path)) => {
                written += 1;
                info!("Saved: {path:?}");
            }
            Ok(Err(e)) => {
                failed += 1;
                error!("{e:#}");
            }
            Err(e) => {
                failed += 1;
                error!("Composition task failed: {e}");
            }
        }
    }

    info!(
        "Done. {written} file(s) written, {failed} failed. Output: {:?}",
        config.paths.output_dir
    );

    Ok(())
}

/// Composes one variant of one day and writes it with its manifest
fn render_day(composer: &Composer, config: &Config, day: u32, bgm_enabled: bool) -> Result<PathBuf> {
    let plan_id = &config.plan.plan_id;
    let speech_plan = config.plan.resolve(plan_id, day)?;
    let reading = speech_plan.describe();

    info!("Day {day}: {reading}");

    let spec = MixSpec {
        bgm_enabled,
        ..config.mix.mix.clone()
    };

    let composition = composer
        .compose(&speech_plan, config.mix.speed_ratio, &spec)
        .with_context(|| format!("Plan {plan_id} day {day} ({reading}) failed"))?;

    let stem = naming::day_file_stem(
        plan_id,
        day,
        config.plan.plan_start_date,
        composition.suffix,
    );
    let wav_path = config.paths.output_dir.join(format!("{stem}.wav"));
    wav::write_wav(&wav_path, &composition.buffer)?;

    let manifest = Manifest {
        plan_id,
        day,
        reading,
        speed_ratio: config.mix.speed_ratio,
        segments: &composition.segments,
        bgm: composition.bgm.as_ref(),
    };
    let manifest_path = config.paths.output_dir.join(format!("{stem}.json"));
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)
        .with_context(|| format!("Could not write {manifest_path:?}"))?;

    Ok(wav_path)
}
