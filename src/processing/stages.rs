//! Stage tables for the two processing pipelines

use std::time::Duration;

/// Number of equal progress increments per stage
pub const SUBSTEPS_PER_STAGE: u32 = 20;

/// Sub-step interval for compute-heavy generation stages
pub const HEAVY_SUBSTEP: Duration = Duration::from_millis(250);

/// Sub-step interval for all other generation stages
pub const LIGHT_SUBSTEP: Duration = Duration::from_millis(150);

/// Generation stages paced with [`HEAVY_SUBSTEP`]
pub const HEAVY_STAGES: &[&str] = &["composing", "synthesizing"];

/// How long a stage takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePacing {
    /// Fixed nominal duration spread over the sub-steps
    Nominal(Duration),
    /// Equal-share slot; heavy slots use a longer sub-step
    EqualShare { heavy: bool },
}

/// One named phase of the processing pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub key: String,
    pub label: String,
    pub pacing: StagePacing,
}

impl Stage {
    pub fn nominal(key: impl Into<String>, label: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            pacing: StagePacing::Nominal(Duration::from_millis(duration_ms)),
        }
    }

    /// Equal-share stage; heaviness is decided by the stage key
    pub fn equal_share(key: impl Into<String>, label: impl Into<String>) -> Self {
        let key = key.into();
        let heavy = HEAVY_STAGES.contains(&key.as_str());
        Self {
            key,
            label: label.into(),
            pacing: StagePacing::EqualShare { heavy },
        }
    }

    /// Delay between two progress increments
    pub fn substep_interval(&self) -> Duration {
        match self.pacing {
            StagePacing::Nominal(duration) => duration / SUBSTEPS_PER_STAGE,
            StagePacing::EqualShare { heavy: true } => HEAVY_SUBSTEP,
            StagePacing::EqualShare { heavy: false } => LIGHT_SUBSTEP,
        }
    }

    /// Wall-clock time the stage occupies
    pub fn total_duration(&self) -> Duration {
        self.substep_interval() * SUBSTEPS_PER_STAGE
    }
}

/// Stages for turning an uploaded song into a cover
pub fn cover_stages() -> Vec<Stage> {
    vec![
        Stage::nominal("analyzing", "Analyzing voice characteristics", 3000),
        Stage::nominal("separating", "Separating vocals from instrumental", 4000),
        Stage::nominal("synthesizing", "Generating AI vocals with your voice", 5000),
        Stage::nominal("mixing", "Mixing vocals with instrumental", 3000),
        Stage::nominal("mastering", "Mastering final track", 2000),
    ]
}

/// Stages for composing an original song from lyrics
pub fn generation_stages() -> Vec<Stage> {
    vec![
        Stage::equal_share("analyzing", "Analyzing voice characteristics"),
        Stage::equal_share("composing", "Composing music from lyrics"),
        Stage::equal_share("synthesizing", "Synthesizing vocals with your voice"),
        Stage::equal_share("mixing", "Mixing vocals with instrumental"),
        Stage::equal_share("mastering", "Mastering final track"),
    ]
}

/// Total run time of a stage list
pub fn total_duration(stages: &[Stage]) -> Duration {
    stages.iter().map(Stage::total_duration).sum()
}

/// Global progress after `substep` (1-based) of stage `index` out of `count`
pub fn progress_at(index: usize, substep: u32, count: usize) -> f64 {
    if count == 0 {
        return 100.0;
    }
    let per_stage = 100.0 / count as f64;
    let within = substep.min(SUBSTEPS_PER_STAGE) as f64 / SUBSTEPS_PER_STAGE as f64;
    index as f64 * per_stage + within * per_stage
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_intervals_follow_durations() {
        let stages = cover_stages();
        assert_eq!(stages[0].substep_interval(), Duration::from_millis(150));
        assert_eq!(stages[2].substep_interval(), Duration::from_millis(250));
        assert_eq!(total_duration(&stages), Duration::from_millis(17_000));
    }

    #[test]
    fn test_generation_heavy_stages() {
        let stages = generation_stages();
        let heavy: Vec<_> = stages
            .iter()
            .filter(|s| s.pacing == StagePacing::EqualShare { heavy: true })
            .map(|s| s.key.as_str())
            .collect();
        assert_eq!(heavy, vec!["composing", "synthesizing"]);
        assert_eq!(stages[0].substep_interval(), LIGHT_SUBSTEP);
        assert_eq!(stages[1].substep_interval(), HEAVY_SUBSTEP);
        // 3 light stages * 3s + 2 heavy stages * 5s
        assert_eq!(total_duration(&stages), Duration::from_millis(19_000));
    }

    #[test]
    fn test_progress_interpolation() {
        assert_eq!(progress_at(0, 0, 5), 0.0);
        assert_eq!(progress_at(0, 20, 5), 20.0);
        assert_eq!(progress_at(1, 10, 5), 30.0);
        assert!((progress_at(4, 20, 5) - 100.0).abs() < 1e-9);
        assert_eq!(progress_at(0, 20, 1), 100.0);
    }

    #[test]
    fn test_progress_is_monotonic_across_stage_boundaries() {
        let count = 3;
        let mut last = 0.0;
        for index in 0..count {
            for substep in 1..=SUBSTEPS_PER_STAGE {
                let p = progress_at(index, substep, count);
                assert!(p >= last, "{} < {}", p, last);
                last = p;
            }
        }
    }
}
