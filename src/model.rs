use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Account {
    pub id: u64,
    pub name: String,
    pub email: String,
    // Stored verbatim. A production deployment would store a salted hash
    // and compare with that instead.
    pub password: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug)]
pub struct Movie {
    pub id: u32,
    pub title: &'static str,
    pub year: u16,
    pub genre: &'static str,
    pub rating: f32,
    pub description: &'static str,
    pub poster: &'static str,
}

impl Movie {
    pub fn poster_colors(&self) -> &'static str {
        match self.poster {
            "action" => "#ff6b6b, #ee5a24",
            "sci-fi" => "#4834d4, #686de0",
            "romance" => "#00d2d3, #54a0ff",
            "comedy" => "#feca57, #ff9ff3",
            "horror" => "#57606f, #2f3542",
            "drama" => "#00b894, #00cec9",
            _ => "#333, #555",
        }
    }

    pub fn poster_emoji(&self) -> &'static str {
        match self.poster {
            "action" => "💥",
            "sci-fi" => "🚀",
            "romance" => "💕",
            "comedy" => "😂",
            "horror" => "👻",
            "drama" => "🎭",
            _ => "🎬",
        }
    }
}
