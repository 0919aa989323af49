use crate::state::{FileId, PositionState};
use std::fmt;

/// Why a run resumes where it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeReason {
    FirstRun,
    Continuation,
    Truncated,
    Rotated,
}

impl fmt::Display for ResumeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResumeReason::FirstRun => "first run",
            ResumeReason::Continuation => "normal continuation",
            ResumeReason::Truncated => "truncation",
            ResumeReason::Rotated => "rotation",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resume {
    pub offset: u64,
    pub reason: ResumeReason,
}

/// Decide where to resume reading, given the stored position and the file
/// currently behind the path. Pure: no I/O, deterministic in its inputs.
///
/// Same identity but a shorter file means the file was truncated in place
/// (`> file` style rotation). The recovery is to re-read from the start; if
/// leading content was rewritten identically, those lines are counted twice.
/// That imprecision is accepted: telling truncate+append apart from
/// truncate-only would require content hashing.
///
/// A different identity means the file was replaced. The new file is read
/// from its start, it is assumed to be fresh rather than a copy of the old
/// stream.
pub fn decide(previous: Option<&PositionState>, current: FileId, current_len: u64) -> Resume {
    match previous {
        None => Resume {
            offset: 0,
            reason: ResumeReason::FirstRun,
        },
        Some(prev) if prev.identity != current => Resume {
            offset: 0,
            reason: ResumeReason::Rotated,
        },
        Some(prev) if current_len < prev.offset => Resume {
            offset: 0,
            reason: ResumeReason::Truncated,
        },
        Some(prev) => Resume {
            offset: prev.offset,
            reason: ResumeReason::Continuation,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn state(dev: u64, ino: u64, offset: u64) -> PositionState {
        PositionState {
            identity: FileId::new(dev, ino),
            offset,
            saved_at: Utc::now(),
        }
    }

    #[test]
    fn test_first_run() {
        let resume = decide(None, FileId::new(1, 100), 5000);
        assert_eq!(resume.offset, 0);
        assert_eq!(resume.reason, ResumeReason::FirstRun);
    }

    #[test]
    fn test_continuation_when_file_grew() {
        let prev = state(1, 100, 500);
        let resume = decide(Some(&prev), FileId::new(1, 100), 900);
        assert_eq!(resume.offset, 500);
        assert_eq!(resume.reason, ResumeReason::Continuation);
    }

    #[test]
    fn test_continuation_when_size_unchanged() {
        // Equal size is not a truncation; there is just nothing new.
        let prev = state(1, 100, 500);
        let resume = decide(Some(&prev), FileId::new(1, 100), 500);
        assert_eq!(resume.offset, 500);
        assert_eq!(resume.reason, ResumeReason::Continuation);
    }

    #[test]
    fn test_truncation_same_identity_smaller_file() {
        let prev = state(1, 100, 500);
        let resume = decide(Some(&prev), FileId::new(1, 100), 100);
        assert_eq!(resume.offset, 0);
        assert_eq!(resume.reason, ResumeReason::Truncated);
    }

    #[test]
    fn test_rotation_new_identity_any_size() {
        let prev = state(1, 100, 500);

        let smaller = decide(Some(&prev), FileId::new(1, 101), 100);
        assert_eq!(smaller.offset, 0);
        assert_eq!(smaller.reason, ResumeReason::Rotated);

        let larger = decide(Some(&prev), FileId::new(1, 101), 9000);
        assert_eq!(larger.offset, 0);
        assert_eq!(larger.reason, ResumeReason::Rotated);
    }

    #[test]
    fn test_rotation_wins_over_truncation() {
        // Different identity with a smaller size is a rotation, not a
        // truncation of the old file.
        let prev = state(1, 100, 500);
        let resume = decide(Some(&prev), FileId::new(2, 100), 10);
        assert_eq!(resume.reason, ResumeReason::Rotated);
    }
}
