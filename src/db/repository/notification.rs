use std::str::FromStr;

use rusqlite::{params, Connection, Row};

use crate::db::DatabaseError;
use crate::models::{Notification, NotificationType};

use super::column_parse_error;

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, notification_type, title, body, is_read, created_at, read_at";

/// Category filter for a user's notification list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationFilter {
    All,
    Unread,
    Appointments,
    Updates,
    Reminders,
}

impl NotificationFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "unread" => Some(Self::Unread),
            "appointments" => Some(Self::Appointments),
            "updates" => Some(Self::Updates),
            "reminders" => Some(Self::Reminders),
            _ => None,
        }
    }

    fn where_clause(self) -> &'static str {
        match self {
            Self::All => "1 = 1",
            Self::Unread => "is_read = 0",
            Self::Appointments => "notification_type = 'appointment_created'",
            Self::Updates => {
                "notification_type IN ('appointment_confirmed', 'appointment_cancelled', 'general')"
            }
            Self::Reminders => "notification_type = 'appointment_reminder'",
        }
    }
}

fn notification_from_row(row: &Row) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        notification_type: NotificationType::from_str(&row.get::<_, String>(2)?)
            .map_err(|e| column_parse_error(2, e))?,
        title: row.get(3)?,
        body: row.get(4)?,
        is_read: row.get(5)?,
        created_at: row.get(6)?,
        read_at: row.get(7)?,
    })
}

/// Insert a notification. Also usable inside a transaction since
/// `Transaction` derefs to `Connection`.
pub fn insert_notification(conn: &Connection, notification: &Notification) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO notifications ({NOTIFICATION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        params![
            notification.id,
            notification.user_id,
            notification.notification_type.as_str(),
            notification.title,
            notification.body,
            notification.is_read,
            notification.created_at,
            notification.read_at,
        ],
    )?;
    Ok(())
}

pub fn get_notification(conn: &Connection, id: &str) -> Result<Option<Notification>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"))?;
    match stmt.query_row(params![id], notification_from_row) {
        Ok(notification) => Ok(Some(notification)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_notifications(
    conn: &Connection,
    user_id: &str,
    filter: NotificationFilter,
) -> Result<Vec<Notification>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications
         WHERE user_id = ?1 AND {} ORDER BY created_at DESC",
        filter.where_clause()
    ))?;
    let rows = stmt.query_map(params![user_id], notification_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Mark one notification read, recording when.
pub fn mark_notification_read(conn: &Connection, id: &str) -> Result<(), DatabaseError> {
    let now = chrono::Local::now().naive_local();
    let changed = conn.execute(
        "UPDATE notifications SET is_read = 1, read_at = ?1 WHERE id = ?2 AND is_read = 0",
        params![now, id],
    )?;
    if changed == 0 && get_notification(conn, id)?.is_none() {
        return Err(DatabaseError::NotFound { entity_type: "Notification".into(), id: id.into() });
    }
    Ok(())
}

pub fn mark_all_notifications_read(conn: &Connection, user_id: &str) -> Result<usize, DatabaseError> {
    let now = chrono::Local::now().naive_local();
    let changed = conn.execute(
        "UPDATE notifications SET is_read = 1, read_at = ?1 WHERE user_id = ?2 AND is_read = 0",
        params![now, user_id],
    )?;
    Ok(changed)
}

pub fn delete_notification(conn: &Connection, id: &str) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM notifications WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(DatabaseError::NotFound { entity_type: "Notification".into(), id: id.into() });
    }
    Ok(())
}

pub fn unread_notification_count(conn: &Connection, user_id: &str) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}
