use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// Points awarded per destroyed target in click phases
pub const HIT_SCORE: i64 = 100;
pub const HISTORY_CAPACITY: usize = 50;
// Coaching thresholds
pub const PRECISION_TIP_BELOW_ACCURACY: u32 = 85;
pub const SPEED_TIP_ABOVE_REACTION_MS: u32 = 300;

// --- Scoring Logic ---

/// Continuous-sampling accuracy model for tracking phases.
///
/// Every tick on a tracking phase is one fractional "shot" of
/// `sample_per_tick`; ticks spent on target also count as a fractional hit
/// and earn `score_per_tick`. Totals therefore scale with the tick rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingScoring {
    pub score_per_tick: i64,
    pub sample_per_tick: f64,
}

impl Default for TrackingScoring {
    fn default() -> Self {
        Self {
            score_per_tick: 2,
            sample_per_tick: 0.02,
        }
    }
}

// Per-session counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTracker {
    pub score: i64,
    pub clicks: f64,
    pub hits: f64,
    pub reaction_times_ms: Vec<f64>,
}

impl ScoreTracker {
    pub fn record_click(&mut self) {
        self.clicks += 1.0;
    }

    pub fn record_hit(&mut self, reaction_ms: f64) {
        self.hits += 1.0;
        self.score += HIT_SCORE;
        self.reaction_times_ms.push(reaction_ms);
    }

    pub fn record_tracking_sample(&mut self, on_target: bool, scoring: &TrackingScoring) {
        if on_target {
            self.score += scoring.score_per_tick;
            self.hits += scoring.sample_per_tick;
        }
        self.clicks += scoring.sample_per_tick;
    }

    /// Rounded hit percentage in [0, 100]; 0 before any shot.
    pub fn accuracy(&self) -> u32 {
        if self.clicks <= 0.0 {
            return 0;
        }
        (self.hits / self.clicks * 100.0).round().clamp(0.0, 100.0) as u32
    }

    // The live HUD reads 100% until the first shot
    pub fn hud_accuracy(&self) -> u32 {
        if self.clicks <= 0.0 {
            100
        } else {
            self.accuracy()
        }
    }

    pub fn average_reaction_ms(&self) -> u32 {
        if self.reaction_times_ms.is_empty() {
            return 0;
        }
        let total: f64 = self.reaction_times_ms.iter().sum();
        (total / self.reaction_times_ms.len() as f64).round().max(0.0) as u32
    }

    pub fn to_record(&self, created_at: DateTime<Utc>) -> StatsRecord {
        StatsRecord {
            score: self.score,
            accuracy: self.accuracy(),
            reaction_ms: self.average_reaction_ms(),
            created_at,
        }
    }
}

// --- History ---

/// One finished session as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    pub score: i64,
    pub accuracy: u32,
    #[serde(rename = "reaction")]
    pub reaction_ms: u32,
    #[serde(rename = "date", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Insertion-ordered session history, oldest evicted past capacity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog {
    records: VecDeque<StatsRecord>,
}

impl HistoryLog {
    pub fn push(&mut self, record: StatsRecord) {
        self.records.push_back(record);
        while self.records.len() > HISTORY_CAPACITY {
            self.records.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&StatsRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatsRecord> {
        self.records.iter()
    }

    // Re-applies the cap to logs that were stored by something more lenient
    pub fn enforce_capacity(&mut self) {
        while self.records.len() > HISTORY_CAPACITY {
            self.records.pop_front();
        }
    }
}

// --- Session Analysis ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoachingTip {
    FirstSession,
    Precision,
    Speed,
    KeepPushing,
}

impl fmt::Display for CoachingTip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CoachingTip::FirstSession => "Focus on precision rather than speed to start with.",
            CoachingTip::Precision => {
                "Your accuracy is low. Slow your movements down and make sure every shot is confirmed."
            }
            CoachingTip::Speed => {
                "Your reflexes are a little slow. Try to shorten the time you spend settling on each target."
            }
            CoachingTip::KeepPushing => {
                "Excellent session! To keep improving, try to speed up your transitions slightly."
            }
        };
        f.write_str(text)
    }
}

/// Comparison of a finished session against the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAnalysis {
    pub score_diff: Option<i64>,
    pub accuracy_diff: Option<i64>,
    pub message: String,
    pub tip: CoachingTip,
}

pub fn analyze(current: &StatsRecord, previous: Option<&StatsRecord>) -> SessionAnalysis {
    let Some(previous) = previous else {
        return SessionAnalysis {
            score_diff: None,
            accuracy_diff: None,
            message: "This is your first session! Set a baseline before comparing.".to_string(),
            tip: CoachingTip::FirstSession,
        };
    };

    let score_diff = current.score - previous.score;
    let accuracy_diff = i64::from(current.accuracy) - i64::from(previous.accuracy);

    let mut message = if score_diff > 0 {
        format!("Up {score_diff} points on last time! ")
    } else {
        format!("Score slightly lower ({score_diff}). ")
    };
    if accuracy_diff > 0 {
        message.push_str(&format!("Your accuracy is improving (+{accuracy_diff}%)."));
    } else if accuracy_diff < 0 {
        message.push_str(&format!("Watch your accuracy ({accuracy_diff}%)."));
    }

    let tip = if current.accuracy < PRECISION_TIP_BELOW_ACCURACY {
        CoachingTip::Precision
    } else if current.reaction_ms > SPEED_TIP_ABOVE_REACTION_MS {
        CoachingTip::Speed
    } else {
        CoachingTip::KeepPushing
    };

    SessionAnalysis {
        score_diff: Some(score_diff),
        accuracy_diff: Some(accuracy_diff),
        message: message.trim_end().to_string(),
        tip,
    }
}

/// End-of-session result handed to the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub record: StatsRecord,
    pub analysis: SessionAnalysis,
}

/// Builds the record, compares it with the latest entry, then appends it.
pub fn finalize_session(score: &ScoreTracker, history: &mut HistoryLog, created_at: DateTime<Utc>) -> SessionSummary {
    let record = score.to_record(created_at);
    let analysis = analyze(&record, history.latest());
    history.push(record.clone());
    SessionSummary { record, analysis }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn record(score: i64, accuracy: u32, reaction_ms: u32) -> StatsRecord {
        StatsRecord { score, accuracy, reaction_ms, created_at: at(1_700_000_000_000) }
    }

    #[test]
    fn accuracy_is_zero_without_clicks() {
        let score = ScoreTracker::default();
        assert_eq!(score.accuracy(), 0);
        assert_eq!(score.hud_accuracy(), 100);
        assert_eq!(score.average_reaction_ms(), 0);
    }

    #[test]
    fn accuracy_rounds_to_integer_percent() {
        let score = ScoreTracker { hits: 2.0, clicks: 3.0, ..Default::default() };
        assert_eq!(score.accuracy(), 67);
        let half = ScoreTracker { hits: 1.0, clicks: 8.0, ..Default::default() };
        assert_eq!(half.accuracy(), 13);
    }

    #[test]
    fn accuracy_stays_in_range_for_fractional_counters() {
        let scoring = TrackingScoring::default();
        let mut score = ScoreTracker::default();
        for tick in 0..5_000 {
            score.record_tracking_sample(tick % 3 != 0, &scoring);
            assert!(score.accuracy() <= 100);
        }
        let mut always_on = ScoreTracker::default();
        for _ in 0..5_000 {
            always_on.record_tracking_sample(true, &scoring);
        }
        assert_eq!(always_on.accuracy(), 100);
    }

    #[test]
    fn average_reaction_rounds() {
        let score = ScoreTracker { reaction_times_ms: vec![250.0, 251.0], ..Default::default() };
        assert_eq!(score.average_reaction_ms(), 251);
    }

    #[test]
    fn history_evicts_oldest_past_capacity() {
        let mut history = HistoryLog::default();
        for i in 0..51 {
            history.push(record(i, 90, 200));
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        let scores: Vec<i64> = history.iter().map(|r| r.score).collect();
        assert_eq!(scores, (1..51).collect::<Vec<_>>());
        assert_eq!(history.latest().unwrap().score, 50);
    }

    #[test]
    fn first_session_gets_baseline_message() {
        let analysis = analyze(&record(1_000, 50, 500), None);
        assert_eq!(analysis.score_diff, None);
        assert_eq!(analysis.tip, CoachingTip::FirstSession);
        assert!(analysis.message.contains("first session"));
    }

    #[test]
    fn progress_and_regression_framing() {
        let better = analyze(&record(1_500, 92, 250), Some(&record(1_000, 88, 260)));
        assert_eq!(better.score_diff, Some(500));
        assert_eq!(better.accuracy_diff, Some(4));
        assert!(better.message.starts_with("Up 500 points"));
        assert!(better.message.contains("+4%"));
        assert_eq!(better.tip, CoachingTip::KeepPushing);

        let worse = analyze(&record(900, 80, 250), Some(&record(1_000, 88, 260)));
        assert!(worse.message.starts_with("Score slightly lower (-100)"));
        assert!(worse.message.contains("(-8%)"));

        let flat = analyze(&record(1_000, 88, 250), Some(&record(1_000, 88, 260)));
        assert_eq!(flat.message, "Score slightly lower (0).");
    }

    #[test]
    fn tips_follow_thresholds() {
        let previous = record(0, 0, 0);
        assert_eq!(analyze(&record(0, 84, 100), Some(&previous)).tip, CoachingTip::Precision);
        assert_eq!(analyze(&record(0, 85, 301), Some(&previous)).tip, CoachingTip::Speed);
        assert_eq!(analyze(&record(0, 85, 300), Some(&previous)).tip, CoachingTip::KeepPushing);
    }

    #[test]
    fn finalize_compares_before_appending() {
        let mut history = HistoryLog::default();
        history.push(record(200, 90, 200));
        let score = ScoreTracker {
            score: 300,
            clicks: 4.0,
            hits: 3.0,
            reaction_times_ms: vec![200.0, 300.0, 400.0],
        };
        let summary = finalize_session(&score, &mut history, at(5));
        assert_eq!(summary.record.accuracy, 75);
        assert_eq!(summary.record.reaction_ms, 300);
        assert_eq!(summary.analysis.score_diff, Some(100));
        assert_eq!(history.len(), 2);
        assert_eq!(history.latest(), Some(&summary.record));
    }

    #[test]
    fn records_serialize_with_millisecond_dates() {
        let json = serde_json::to_value(record(10, 50, 120)).unwrap();
        assert_eq!(json["reaction"], 120);
        assert_eq!(json["date"], 1_700_000_000_000_i64);
        let log: HistoryLog = serde_json::from_str(&format!("[{json}]")).unwrap();
        assert_eq!(log.len(), 1);
    }
}
