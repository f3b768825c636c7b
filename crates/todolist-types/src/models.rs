use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Goal lifecycle. Stored as an integer code so that ordering by status
/// follows the declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    ToDo,
    InProgress,
    Done,
    Archived,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::ToDo, Status::InProgress, Status::Done, Status::Archived];

    pub fn code(self) -> i64 {
        match self {
            Status::ToDo => 1,
            Status::InProgress => 2,
            Status::Done => 3,
            Status::Archived => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::ToDo => "to_do",
            Status::InProgress => "in_progress",
            Status::Done => "done",
            Status::Archived => "archived",
        }
    }
}

impl FromStr for Status {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|v| v.as_str() == s).ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Low, Priority::Medium, Priority::High, Priority::Critical];

    pub fn code(self) -> i64 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Critical => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl FromStr for Priority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|v| v.as_str() == s).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_declaration_order() {
        assert!(Status::ToDo.code() < Status::Archived.code());
        assert!(Priority::Low.code() < Priority::Critical.code());
        assert_eq!(Status::from_code(4), Some(Status::Archived));
        assert_eq!(Priority::from_code(0), None);
    }

    #[test]
    fn wire_names_are_snake_case() {
        assert_eq!(serde_json::to_string(&Status::InProgress).unwrap(), "\"in_progress\"");
        assert_eq!("critical".parse::<Priority>(), Ok(Priority::Critical));
        assert!("Critical".parse::<Priority>().is_err());
    }

    #[test]
    fn defaults_match_new_goal() {
        assert_eq!(Status::default(), Status::ToDo);
        assert_eq!(Priority::default(), Priority::Medium);
    }
}
