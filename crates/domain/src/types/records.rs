//! Per-feature user records
//!
//! Each feature is stored as its own collection under
//! `user:<username>:<feature>`. Records are typed so a malformed collection
//! fails at deserialization instead of deep inside a caller.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_domain_status_conversions;

/// Feature collections a user owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Notes,
    Grades,
    Attendance,
    VaultDocs,
    Journal,
    Assignments,
    CampusNodes,
}

impl_domain_status_conversions!(Feature {
    Notes => "notes",
    Grades => "grades",
    Attendance => "attendance",
    VaultDocs => "vault_docs",
    Journal => "journal",
    Assignments => "assignments",
    CampusNodes => "campus_nodes",
});

impl Feature {
    pub const ALL: [Feature; 7] = [
        Feature::Notes,
        Feature::Grades,
        Feature::Attendance,
        Feature::VaultDocs,
        Feature::Journal,
        Feature::Assignments,
        Feature::CampusNodes,
    ];
}

/// A record stored in one feature collection.
pub trait FeatureRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const FEATURE: Feature;

    fn id(&self) -> Uuid;

    fn created_at(&self) -> DateTime<Utc>;

    fn set_created_at(&mut self, at: DateTime<Utc>);

    /// Set both timestamps; used when the record is first stored.
    fn mark_created(&mut self, at: DateTime<Utc>);

    fn touch(&mut self, at: DateTime<Utc>);
}

macro_rules! impl_feature_record {
    ($($record:ty => $feature:expr),+ $(,)?) => {
        $(
            impl FeatureRecord for $record {
                const FEATURE: Feature = $feature;

                fn id(&self) -> Uuid {
                    self.id
                }

                fn created_at(&self) -> DateTime<Utc> {
                    self.created_at
                }

                fn set_created_at(&mut self, at: DateTime<Utc>) {
                    self.created_at = at;
                }

                fn mark_created(&mut self, at: DateTime<Utc>) {
                    self.created_at = at;
                    self.updated_at = at;
                }

                fn touch(&mut self, at: DateTime<Utc>) {
                    self.updated_at = at;
                }
            }
        )+
    };
}

/// Stored shape of a feature key: `{ "items": [...] }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: FeatureRecord")]
pub struct FeatureCollection<T: FeatureRecord> {
    #[serde(default)]
    pub items: Vec<T>,
}

impl<T: FeatureRecord> Default for FeatureCollection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: FeatureRecord> FeatureCollection<T> {
    pub fn find(&self, id: Uuid) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
            pinned: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub id: Uuid,
    pub course: String,
    pub assessment: String,
    pub score: f64,
    pub max_score: f64,
    /// Share of the final course grade, 0.0..=1.0
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub semester: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GradeRecord {
    pub fn new(
        course: impl Into<String>,
        assessment: impl Into<String>,
        score: f64,
        max_score: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            course: course.into(),
            assessment: assessment.into(),
            score,
            max_score,
            weight: 0.0,
            semester: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Score as a percentage; `None` when `max_score` is not positive.
    pub fn percentage(&self) -> Option<f64> {
        (self.max_score > 0.0).then(|| self.score / self.max_score * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub course: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn new(course: impl Into<String>, date: NaiveDate, status: AttendanceStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            course: course.into(),
            date,
            status,
            note: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// File kept in the vault. `content` is the encoded payload as supplied by
/// the client; `size_bytes` is what counts against the quota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultDocument {
    pub id: Uuid,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VaultDocument {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: u64,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes,
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub mood: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            title: title.into(),
            body: body.into(),
            mood: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub title: String,
    pub course: String,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: AssignmentPriority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(title: impl Into<String>, course: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            title: title.into(),
            course: course.into(),
            due_at: None,
            completed: false,
            priority: AssignmentPriority::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_at.is_some_and(|due| due < now)
    }
}

/// Saved campus location (building, room, study spot)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampusNode {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CampusNode {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            kind: kind.into(),
            latitude,
            longitude,
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl_feature_record!(
    Note => Feature::Notes,
    GradeRecord => Feature::Grades,
    AttendanceRecord => Feature::Attendance,
    VaultDocument => Feature::VaultDocs,
    JournalEntry => Feature::Journal,
    Assignment => Feature::Assignments,
    CampusNode => Feature::CampusNodes,
);

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn feature_codes_are_snake_case() {
        assert_eq!(Feature::VaultDocs.as_str(), "vault_docs");
        assert_eq!("campus_nodes".parse::<Feature>().unwrap(), Feature::CampusNodes);
    }

    #[test]
    fn collection_rejects_mismatched_shape() {
        let result: Result<FeatureCollection<Note>, _> =
            serde_json::from_str(r#"{"items": [{"title": 42}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn empty_object_is_an_empty_collection() {
        let collection: FeatureCollection<JournalEntry> = serde_json::from_str("{}").unwrap();
        assert!(collection.items.is_empty());
    }

    #[test]
    fn grade_percentage() {
        let grade = GradeRecord::new("MATH101", "Midterm", 42.0, 50.0);
        assert_eq!(grade.percentage(), Some(84.0));
        assert_eq!(GradeRecord::new("MATH101", "Quiz", 1.0, 0.0).percentage(), None);
    }

    #[test]
    fn assignment_overdue_only_when_open() {
        let now = Utc::now();
        let mut assignment = Assignment::new("Essay", "HIST200");
        assignment.due_at = Some(now - Duration::hours(1));
        assert!(assignment.is_overdue(now));
        assignment.completed = true;
        assert!(!assignment.is_overdue(now));
    }

    #[test]
    fn mark_created_sets_both_timestamps() {
        let mut note = Note::new("t", "c");
        let at = Utc::now() + Duration::days(1);
        note.mark_created(at);
        assert_eq!(note.created_at, at);
        assert_eq!(note.updated_at, at);
    }
}
