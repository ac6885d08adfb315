// Domain rules - Business logic and policies

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::*;
use crate::domain::model::*;

/// Business rules for segment time ranges
pub struct TimeRangeRule;

impl TimeRangeRule {
    /// Validate `0 <= start < end`, clamping `end` to the source duration when known.
    ///
    /// Returns the possibly clamped range.
    pub fn validate(
        start_time: f64,
        end_time: f64,
        source_duration: Option<f64>,
    ) -> Result<(f64, f64), DomainError> {
        if !start_time.is_finite() || !end_time.is_finite() {
            return Err(DomainError::InvalidTimeRange(
                "segment times must be finite numbers".to_string(),
            ));
        }
        if start_time < 0.0 {
            return Err(DomainError::InvalidTimeRange(format!(
                "start time {:.3}s is negative",
                start_time
            )));
        }

        let end_time = match source_duration {
            Some(duration) if duration > 0.0 && end_time > duration => duration,
            _ => end_time,
        };

        if end_time <= start_time {
            return Err(DomainError::InvalidTimeRange(format!(
                "end time {:.3}s must be greater than start time {:.3}s",
                end_time, start_time
            )));
        }

        Ok((start_time, end_time))
    }

    /// Validate an already-built segment without clamping
    pub fn check_segment(segment: &Segment) -> Result<(), DomainError> {
        Self::validate(segment.start_time, segment.end_time, None)
            .map(|_| ())
            .map_err(|e| match e {
                DomainError::InvalidTimeRange(msg) => DomainError::InvalidTimeRange(format!(
                    "segment '{}': {}",
                    segment.output_name, msg
                )),
                other => other,
            })
    }
}

/// Rules for naming segments and their output files
pub struct SegmentNaming;

impl SegmentNaming {
    /// Name given to a segment created without one
    pub fn auto_name(existing_count: usize) -> String {
        format!("Segment_{}", existing_count + 1)
    }

    /// Strip characters that are not valid in file names
    pub fn sanitize(name: &str) -> String {
        let replaced: String = name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();

        replaced
            .trim()
            .trim_matches('.')
            .trim()
            .to_string()
    }

    /// Container extension without surrounding whitespace or leading dots
    pub fn extension(container: &str) -> String {
        container.trim().trim_start_matches('.').trim().to_string()
    }

    /// File stem for a job, falling back to `segment_<n>` for empty names
    pub fn file_stem(output_name: &str, index: usize) -> String {
        let sanitized = Self::sanitize(output_name);
        if sanitized.is_empty() {
            format!("segment_{}", index + 1)
        } else {
            sanitized
        }
    }
}

/// How duplicate output file names are handled at planning time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Later duplicates get `_<short segment id>` appended
    #[default]
    Suffix,
    /// Duplicates are rejected
    Error,
}

impl CollisionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollisionPolicy::Suffix => "suffix",
            CollisionPolicy::Error => "error",
        }
    }
}

impl FromStr for CollisionPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "suffix" => Ok(CollisionPolicy::Suffix),
            "error" => Ok(CollisionPolicy::Error),
            other => Err(DomainError::BadArgs(format!(
                "Invalid collision policy: {}. Valid policies: suffix, error",
                other
            ))),
        }
    }
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves output file stems so that no two jobs share one
pub struct CollisionResolver {
    policy: CollisionPolicy,
    taken: HashSet<String>,
}

impl CollisionResolver {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            taken: HashSet::new(),
        }
    }

    /// Claim a unique stem for the segment at `index`
    pub fn claim(&mut self, segment: &Segment, index: usize) -> Result<String, DomainError> {
        let stem = SegmentNaming::file_stem(&segment.output_name, index);
        if self.taken.insert(stem.to_lowercase()) {
            return Ok(stem);
        }

        match self.policy {
            CollisionPolicy::Error => Err(DomainError::OutputCollision(format!(
                "'{}' (segment {}) resolves to an output name already in use",
                segment.output_name,
                index + 1
            ))),
            CollisionPolicy::Suffix => {
                let base = format!("{}_{}", stem, segment.id.short());
                let mut candidate = base.clone();
                let mut counter = 2;
                while !self.taken.insert(candidate.to_lowercase()) {
                    candidate = format!("{}_{}", base, counter);
                    counter += 1;
                }
                Ok(candidate)
            }
        }
    }
}

#[cfg(test)]
mod tests;
