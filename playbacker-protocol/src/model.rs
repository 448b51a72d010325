use std::{fmt, time::Duration};

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TimeSignature {
    #[serde(rename = "4/4")]
    FourFour,
    #[serde(rename = "6/8")]
    SixEight,
    #[serde(rename = "12/4")]
    TwelveFour,
}

impl TimeSignature {
    pub fn beats_per_bar(self) -> u32 {
        match self {
            Self::FourFour => 4,
            Self::SixEight => 6,
            Self::TwelveFour => 12,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FourFour => "4/4",
            Self::SixEight => "6/8",
            Self::TwelveFour => "12/4",
        }
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Note value of a single metronome click.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum NoteDuration {
    #[serde(rename = "1/4")]
    Quarter,
    #[serde(rename = "1/8")]
    Eighth,
    #[serde(rename = "1/16")]
    Sixteenth,
}

impl NoteDuration {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quarter => "1/4",
            Self::Eighth => "1/8",
            Self::Sixteenth => "1/16",
        }
    }
}

impl fmt::Display for NoteDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tempo {
    pub bpm: f64,
    pub time_signature: TimeSignature,
    pub duration: NoteDuration,
}

impl Tempo {
    /// Interval between two sixteenth-note ticks, `None` unless the tempo is a
    /// positive, finite number.
    pub fn lag(&self) -> Option<Duration> {
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return None;
        }
        Duration::try_from_secs_f64(60.0 / self.bpm / 4.0).ok()
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.time_signature.beats_per_bar()
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `f64` already prints integral values without the fractional part.
        write!(
            f,
            "{} bpm, {}, {}",
            self.bpm, self.time_signature, self.duration
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub artist: String,
    pub tempo: Tempo,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Named, ordered collection of songs.  Songs are identified by name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Setlist {
    pub name: String,
    pub songs: Vec<Song>,
}

impl Setlist {
    pub fn position(&self, name: &str) -> Option<usize> {
        self.songs.iter().position(|song| song.name == name)
    }

    pub fn find(&self, name: &str) -> Option<&Song> {
        self.songs.iter().find(|song| song.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }
}

/// Authoritative playback flags, as reported by the server.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub playing: bool,
    pub guide_enabled: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            playing: false,
            guide_enabled: true,
        }
    }
}
