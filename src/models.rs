use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub(crate) fn to_utc(dt: Option<NaiveDateTime>) -> DateTime<Utc> {
    dt.map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
        .unwrap_or_else(Utc::now)
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Testimonial {
    pub id: String,
    pub user_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub message: String,
    pub rating: i64,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbTestimonial {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub message: Option<String>,
    pub rating: Option<i64>,
    pub approved: Option<bool>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<DbTestimonial> for Testimonial {
    fn from(db: DbTestimonial) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            user_id: db.user_id.unwrap_or_default(),
            customer_name: db.customer_name.unwrap_or_default(),
            customer_email: db.customer_email.unwrap_or_default(),
            message: db.message.unwrap_or_default(),
            rating: db.rating.unwrap_or_default(),
            approved: db.approved.unwrap_or_default(),
            created_at: to_utc(db.created_at),
        }
    }
}

/// The subset of a testimonial the public widget is allowed to see.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WidgetTestimonial {
    pub id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub message: String,
    pub rating: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Testimonial> for WidgetTestimonial {
    fn from(t: Testimonial) -> Self {
        Self {
            id: t.id,
            customer_name: t.customer_name,
            customer_email: t.customer_email,
            message: t.message,
            rating: t.rating,
            created_at: t.created_at,
        }
    }
}

/// Rating/approval/creation triple the aggregator works on.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct TestimonialStat {
    pub rating: i64,
    pub approved: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    Unread,
    Read,
    Replied,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::Unread => "unread",
            ContactStatus::Read => "read",
            ContactStatus::Replied => "replied",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, AppError> {
        match s {
            "unread" => Ok(ContactStatus::Unread),
            "read" => Ok(ContactStatus::Read),
            "replied" => Ok(ContactStatus::Replied),
            _ => Err(AppError::Validation("Invalid status".to_string())),
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContactMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbContactMessage {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbContactMessage> for ContactMessage {
    fn from(db: DbContactMessage) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            name: db.name.unwrap_or_default(),
            email: db.email.unwrap_or_default(),
            subject: db.subject.unwrap_or_default(),
            message: db.message.unwrap_or_default(),
            // The column is CHECK-constrained, unknown values cannot be stored.
            status: db
                .status
                .as_deref()
                .and_then(|s| ContactStatus::from_str(s).ok())
                .unwrap_or(ContactStatus::Unread),
            created_at: to_utc(db.created_at),
            updated_at: to_utc(db.updated_at),
        }
    }
}
