use crate::{
    constants::{
        DEFAULT_CHAPTER_GAP_MS, DEFAULT_SPEED_RATIO, DEFAULT_TARGET_DBFS, MAX_MIX_DURATION_MS,
    },
    mixer::MixSpec,
    plan::{PlanDayResolver, SpeechPlan},
};
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::read_to_string;
use toml::value::Datetime;

pub const DEFAULT_CONFIG_PATH: &str = "Config.toml";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PathsConfig {
    pub chapters_dir: PathBuf,
    pub bgm_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Which variants to render for every day
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Variants {
    #[default]
    Plain,
    Bgm,
    Both,
}

impl Variants {
    /// `bgm_enabled` values to compose, plain first
    pub fn bgm_flags(&self) -> Vec<bool> {
        match self {
            Variants::Plain => vec![false],
            Variants::Bgm => vec![true],
            Variants::Both => vec![false, true],
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DayConfig {
    pub day: u32,
    /// Comma separated `book:chapter` list
    pub chapters: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PlanConfig {
    pub plan_id: String,

    /// Either a bare TOML date (`2026-02-17`) or a quoted string
    #[serde(deserialize_with = "deserialize_date")]
    pub plan_start_date: NaiveDate,

    #[serde(default)]
    pub variants: Variants,

    #[serde(default)]
    pub days: Vec<DayConfig>,
}

fn deserialize_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    // Flattened sections hand TOML dates over as toml's datetime map, not a string
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DateValue {
        Toml(Datetime),
        Text(String),
    }

    match DateValue::deserialize(deserializer)? {
        DateValue::Toml(datetime) => {
            let date = datetime
                .date
                .filter(|_| datetime.time.is_none())
                .ok_or_else(|| D::Error::custom(format!("expected a date, got {datetime}")))?;

            NaiveDate::from_ymd_opt(date.year.into(), date.month.into(), date.day.into())
                .ok_or_else(|| D::Error::custom(format!("invalid date {datetime}")))
        }
        DateValue::Text(text) => text.trim().parse().map_err(D::Error::custom),
    }
}

impl PlanDayResolver for PlanConfig {
    fn resolve(&self, plan_id: &str, day: u32) -> Result<SpeechPlan> {
        if plan_id != self.plan_id {
            return Err(anyhow!("Unknown plan {plan_id}"));
        }

        let entry = self
            .days
            .iter()
            .find(|entry| entry.day == day)
            .with_context(|| format!("Plan {plan_id} has no day {day}"))?;

        SpeechPlan::parse(&entry.chapters)
            .with_context(|| format!("Invalid chapter list for {plan_id} day {day}"))
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ComposeConfig {
    pub speed_ratio: f64,
    pub normalize_target_dbfs: f64,
    pub chapter_gap_ms: u64,

    #[serde(flatten)]
    pub mix: MixSpec,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        ComposeConfig {
            speed_ratio: DEFAULT_SPEED_RATIO,
            normalize_target_dbfs: DEFAULT_TARGET_DBFS,
            chapter_gap_ms: DEFAULT_CHAPTER_GAP_MS,
            mix: MixSpec::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(flatten)]
    pub paths: PathsConfig,

    #[serde(flatten)]
    pub plan: PlanConfig,

    #[serde(default)]
    pub mix: ComposeConfig,
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Config> {
        let config: Config = toml::from_str(text)?;

        if !config.mix.speed_ratio.is_finite() || config.mix.speed_ratio <= 0.0 {
            return Err(anyhow!(
                "speed_ratio must be positive, got {}",
                config.mix.speed_ratio
            ));
        }

        let mix = &config.mix.mix;
        let durations = [
            ("bgm_intro_ms", mix.bgm_intro_ms),
            ("bgm_tail_ms", mix.bgm_tail_ms),
            ("bgm_fade_in_ms", mix.bgm_fade_in_ms),
            ("bgm_fade_out_ms", mix.bgm_fade_out_ms),
            ("chapter_gap_ms", config.mix.chapter_gap_ms),
        ];
        if let Some((name, ms)) = durations
            .iter()
            .find(|(_, ms)| *ms > MAX_MIX_DURATION_MS)
        {
            return Err(anyhow!(
                "{name} must be at most {MAX_MIX_DURATION_MS} ms, got {ms}"
            ));
        }

        Ok(config)
    }
}

pub async fn load(path: &Path) -> Result<Config> {
    let config = read_to_string(path)
        .await
        .with_context(|| format!("Could not read {path:?}"))?;

    Config::from_toml(&config).with_context(|| format!("Invalid config in {path:?}"))
}
