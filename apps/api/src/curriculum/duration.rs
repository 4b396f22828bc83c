//! Duration policy: maps a free-form duration to a phase count.
//!
//! Exact alias-table lookup on the normalized input. Unknown input falls back
//! to the default instead of failing.

/// Canonical reading of a user-supplied duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationSpec {
    /// Half-length track: one phase, fewer courses.
    pub is_short_track: bool,
    pub phase_count: &'static str,
}

const SHORT_TRACK: DurationSpec = DurationSpec {
    is_short_track: true,
    phase_count: "1",
};

const HALF_YEAR: DurationSpec = DurationSpec {
    is_short_track: false,
    phase_count: "2",
};

const FULL_YEAR: DurationSpec = DurationSpec {
    is_short_track: false,
    phase_count: "4",
};

const DEFAULT: DurationSpec = HALF_YEAR;

const ALIASES: &[(&[&str], DurationSpec)] = &[
    (&["3 months", "3 month", "3", "0.5", "half"], SHORT_TRACK),
    (&["6 months", "6 month", "6"], HALF_YEAR),
    (
        &["1 year", "1 yr", "1", "12 months", "12", "2 semesters"],
        FULL_YEAR,
    ),
];

impl DurationSpec {
    pub fn from_input(input: &str) -> Self {
        let normalized = input.trim().to_lowercase();
        ALIASES
            .iter()
            .find(|(aliases, _)| aliases.contains(&normalized.as_str()))
            .map(|(_, spec)| *spec)
            .unwrap_or(DEFAULT)
    }

    /// Phase count as a number.
    pub fn phases(&self) -> u32 {
        self.phase_count.parse().unwrap_or(2)
    }
}
