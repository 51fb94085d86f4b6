//! crates/video_search_core/src/presentation.rs
//!
//! Derived display values. Nothing here changes state; the client only
//! reflects what the server reported.

use crate::domain::IndexingStatus;

/// Visual weight of a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeVariant {
    Default,
    Secondary,
    Outline,
    Destructive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBadge {
    pub icon: &'static str,
    pub label: &'static str,
    pub variant: BadgeVariant,
}

/// Maps an indexing status to the badge shown next to a video.
pub fn status_badge(status: IndexingStatus) -> StatusBadge {
    match status {
        IndexingStatus::Pending => StatusBadge {
            icon: "clock",
            label: "Pending",
            variant: BadgeVariant::Secondary,
        },
        IndexingStatus::Indexing => StatusBadge {
            icon: "loader",
            label: "Indexing",
            variant: BadgeVariant::Outline,
        },
        IndexingStatus::Completed => StatusBadge {
            icon: "check-circle",
            label: "Ready",
            variant: BadgeVariant::Default,
        },
        IndexingStatus::Failed => StatusBadge {
            icon: "x-circle",
            label: "Failed",
            variant: BadgeVariant::Destructive,
        },
    }
}

/// Formats a search-hit offset as `m:ss`, or `h:mm:ss` past the hour.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 { seconds.floor() as u64 } else { 0 };
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Formats a similarity in [0, 1] as a whole percentage.
pub fn format_similarity(score: f64) -> String {
    format!("{:.0}%", score.clamp(0.0, 1.0) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_status_has_a_distinct_badge() {
        let all = [
            IndexingStatus::Pending,
            IndexingStatus::Indexing,
            IndexingStatus::Completed,
            IndexingStatus::Failed,
        ];
        let labels: Vec<_> = all.iter().map(|s| status_badge(*s).label).collect();
        for (i, label) in labels.iter().enumerate() {
            assert!(!labels[i + 1..].contains(label), "duplicate label {}", label);
        }
        assert_eq!(status_badge(IndexingStatus::Failed).variant, BadgeVariant::Destructive);
    }

    #[test]
    fn timestamps() {
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(65.9), "1:05");
        assert_eq!(format_timestamp(3725.0), "1:02:05");
        assert_eq!(format_timestamp(-3.0), "0:00");
        assert_eq!(format_timestamp(f64::NAN), "0:00");
    }

    #[test]
    fn similarity_percentages() {
        assert_eq!(format_similarity(0.873), "87%");
        assert_eq!(format_similarity(1.4), "100%");
    }
}
