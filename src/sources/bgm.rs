use crate::{
    constants::AUDIO_EXTENSIONS,
    loudness::BgmTrack,
    sources::{symphonia::load_file, BgmPool},
};
use anyhow::{Context, Result};
use std::path::Path;

/// Background tracks decoded once from a directory. Track ids are file names.
#[derive(Clone, Debug, Default)]
pub struct BgmDir {
    tracks: Vec<BgmTrack>,
}

impl BgmDir {
    /// Decodes every audio file in `dir`, sorted by file name.
    ///
    /// A missing directory gives an empty pool; undecodable files are logged and skipped.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            warn!("BGM directory not found: {dir:?}");
            return Ok(Self::default());
        }

        let mut paths = std::fs::read_dir(dir)
            .with_context(|| format!("Could not read BGM directory {dir:?}"))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file() && is_audio_file(path))
            .collect::<Vec<_>>();
        paths.sort();

        let mut tracks = Vec::with_capacity(paths.len());
        for path in paths {
            let id = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            match load_file(&path) {
                Ok(buffer) => tracks.push(BgmTrack::new(id, buffer)),
                Err(e) => error!("Skipping BGM track: {e}"),
            }
        }

        info!("Loaded {} BGM track(s) from {dir:?}", tracks.len());
        Ok(Self { tracks })
    }
}

impl BgmPool for BgmDir {
    fn list_tracks(&self) -> Vec<BgmTrack> {
        self.tracks.clone()
    }
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            AUDIO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
