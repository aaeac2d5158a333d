use serde::{Deserialize, Serialize};

/// Subject id carrying laboratory equipment.
pub const LAB_SUBJECT: &str = "SCI";
/// Subject id carrying sports equipment.
pub const SPORTS_SUBJECT: &str = "PE";

/// Year group used when a student record has none.
pub const DEFAULT_YEAR_GROUP: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    None,
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Unknown or empty stored values read as `None`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearanceStatus {
    #[serde(rename = "not-started")]
    NotStarted,
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "approved")]
    Approved,
}

impl ClearanceStatus {
    pub fn from_percentage(percentage: u8) -> Self {
        if percentage >= 100 {
            Self::Approved
        } else if percentage > 0 {
            Self::Pending
        } else {
            Self::NotStarted
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearanceResult {
    pub percentage: u8,
    pub status: ClearanceStatus,
}

impl ClearanceResult {
    pub fn from_percentage(percentage: u8) -> Self {
        Self {
            percentage,
            status: ClearanceStatus::from_percentage(percentage),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Finance,
    Hall,
    Lab,
    Coach,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Finance => "finance",
            Self::Hall => "hall",
            Self::Lab => "lab",
            Self::Coach => "coach",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "teacher" => Some(Self::Teacher),
            "finance" => Some(Self::Finance),
            "hall" => Some(Self::Hall),
            "lab" => Some(Self::Lab),
            "coach" => Some(Self::Coach),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Book,
    Material,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Material => "material",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "book" => Some(Self::Book),
            "material" => Some(Self::Material),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub year_group: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_uid: Option<String>,
}

impl Student {
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }

    pub fn uses_approval_workflow(&self) -> bool {
        self.year_group == 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: String,
    pub auth_uid: Option<String>,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub hall_name: Option<String>,
    pub specialization: Option<String>,
}

/// Photo-proof workflow fields shared by books and materials.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    #[serde(rename = "approvalStatus")]
    pub status: ApprovalStatus,
    pub image_proof_url: Option<String>,
    pub submitted_at: Option<String>,
    pub rejection_reason: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub student_id: String,
    pub subject_id: String,
    pub title: String,
    pub returned: bool,
    #[serde(flatten)]
    pub approval: Approval,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: String,
    pub student_id: String,
    pub subject_id: String,
    pub name: String,
    pub returned: bool,
    #[serde(flatten)]
    pub approval: Approval,
}

/// Either kind of returnable item, as seen by the approval workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemRecord {
    Book(Book),
    Material(Material),
}

impl ItemRecord {
    pub fn student_id(&self) -> &str {
        match self {
            Self::Book(b) => &b.student_id,
            Self::Material(m) => &m.student_id,
        }
    }

    pub fn subject_id(&self) -> &str {
        match self {
            Self::Book(b) => &b.subject_id,
            Self::Material(m) => &m.subject_id,
        }
    }

    pub fn returned(&self) -> bool {
        match self {
            Self::Book(b) => b.returned,
            Self::Material(m) => m.returned,
        }
    }

    pub fn approval(&self) -> &Approval {
        match self {
            Self::Book(b) => &b.approval,
            Self::Material(m) => &m.approval,
        }
    }
}

/// One enrollment row joined through its class to the subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub class_id: String,
    pub class_name: String,
    pub subject_id: String,
    pub subject_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialOverview {
    pub student_id: String,
    pub tuition_due: f64,
    pub amount_paid: f64,
    pub balance: f64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub hall_id: String,
    pub student_id: Option<String>,
    pub room_status: String,
    pub hall_clearance_status: String,
}
