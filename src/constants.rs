// Output format shared by every buffer the composer joins
pub const SAMPLE_RATE: u32 = 44100; // 44.1 kHz sample rate
pub const BIT_DEPTH: u16 = 16; // 16 bits per sample
pub const CHANNELS: u16 = 2; // Stereo channel

// Loudness
pub const DEFAULT_TARGET_DBFS: f64 = -18.0;
pub const MAX_NORMALIZE_GAIN_DB: f64 = 24.0;
/// RMS level below which a buffer is treated as near-silence
pub const SILENCE_FLOOR_DBFS: f64 = -90.0;

// Mix defaults
pub const DEFAULT_SPEED_RATIO: f64 = 1.0;
pub const DEFAULT_SPEECH_GAIN_DB: f64 = 0.0;
pub const DEFAULT_BGM_GAIN_DB: f64 = -20.0;
pub const DEFAULT_BGM_INTRO_MS: u64 = 4000;
pub const DEFAULT_BGM_TAIL_MS: u64 = 3000;
pub const DEFAULT_BGM_FADE_IN_MS: u64 = 2000;
pub const DEFAULT_BGM_FADE_OUT_MS: u64 = 3000;
pub const DEFAULT_CHAPTER_GAP_MS: u64 = 0;
/// Upper bound for any configured intro, tail, fade or gap
pub const MAX_MIX_DURATION_MS: u64 = 10 * 60 * 1000;

/// File extensions accepted for chapter and background audio, in lookup preference order
pub const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "wav", "m4a", "flac"];
