//! Supported exercise types.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of exercises an analyzer exists for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    Plank,
    BicepCurl,
    Squat,
    Lunge,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 4] = [
        ExerciseKind::Plank,
        ExerciseKind::BicepCurl,
        ExerciseKind::Squat,
        ExerciseKind::Lunge,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Plank => "plank",
            Self::BicepCurl => "bicep_curl",
            Self::Squat => "squat",
            Self::Lunge => "lunge",
        }
    }

    /// Whether the exercise counts repetitions.
    pub fn counts_reps(self) -> bool {
        !matches!(self, Self::Plank)
    }
}

impl std::fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown exercise '{0}' (expected plank, bicep_curl, squat or lunge)")]
pub struct UnknownExercise(pub String);

impl FromStr for ExerciseKind {
    type Err = UnknownExercise;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "plank" => Ok(Self::Plank),
            "bicep_curl" | "bicep" | "curl" => Ok(Self::BicepCurl),
            "squat" => Ok(Self::Squat),
            "lunge" => Ok(Self::Lunge),
            _ => Err(UnknownExercise(s.to_string())),
        }
    }
}
