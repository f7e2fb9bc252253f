//! Support tickets and platform announcements (plain CRUD).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row, postgres::PgRow};
use utoipa::ToSchema;

use crate::core_types::MemberId;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SupportTicket {
    pub id: i64,
    pub member_id: MemberId,
    pub subject: String,
    pub message: String,
    pub priority: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

fn ticket_from_row(row: &PgRow) -> SupportTicket {
    SupportTicket {
        id: row.get("id"),
        member_id: row.get("member_id"),
        subject: row.get("subject"),
        message: row.get("message"),
        priority: row.get("priority"),
        status: row.get("status"),
        created_at: row.get("created_at"),
    }
}

pub struct TicketRepository;

impl TicketRepository {
    pub async fn create(
        pool: &PgPool,
        member: MemberId,
        subject: &str,
        message: &str,
        priority: &str,
    ) -> Result<SupportTicket, sqlx::Error> {
        let row = sqlx::query(
            r#"INSERT INTO support_tickets (member_id, subject, message, priority, status)
               VALUES ($1, $2, $3, $4, 'open')
               RETURNING id, member_id, subject, message, priority, status, created_at"#,
        )
        .bind(member)
        .bind(subject)
        .bind(message)
        .bind(priority)
        .fetch_one(pool)
        .await?;

        Ok(ticket_from_row(&row))
    }

    pub async fn list_by_member(
        pool: &PgPool,
        member: MemberId,
    ) -> Result<Vec<SupportTicket>, sqlx::Error> {
        let rows = sqlx::query(
            r#"SELECT id, member_id, subject, message, priority, status, created_at
               FROM support_tickets WHERE member_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(member)
        .fetch_all(pool)
        .await?;

        Ok(rows.iter().map(ticket_from_row).collect())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

pub struct AnnouncementRepository;

impl AnnouncementRepository {
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Announcement>, sqlx::Error> {
        let rows = sqlx::query(
            r#"SELECT id, title, content, kind, created_at
               FROM announcements WHERE is_active ORDER BY created_at DESC LIMIT 50"#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| Announcement {
                id: r.get("id"),
                title: r.get("title"),
                content: r.get("content"),
                kind: r.get("kind"),
                created_at: r.get("created_at"),
            })
            .collect())
    }
}
