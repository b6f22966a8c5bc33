use std::str::FromStr;

use rusqlite::{params, Connection, Row};

use crate::db::DatabaseError;
use crate::models::{Role, User};

use super::column_parse_error;

const USER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, phone, role, is_approved, is_active, date_joined";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        phone: row.get(5)?,
        role: Role::from_str(&row.get::<_, String>(6)?).map_err(|e| column_parse_error(6, e))?,
        is_approved: row.get(7)?,
        is_active: row.get(8)?,
        date_joined: row.get(9)?,
    })
}

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
        params![
            user.id,
            user.email,
            user.password_hash,
            user.first_name,
            user.last_name,
            user.phone,
            user.role.as_str(),
            user.is_approved,
            user.is_active,
            user.date_joined,
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> Result<Option<User>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
    match stmt.query_row(params![id], user_from_row) {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))?;
    match stmt.query_row(params![email], user_from_row) {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn email_taken(conn: &Connection, email: &str, exclude_id: Option<&str>) -> Result<bool, DatabaseError> {
    let count: i64 = match exclude_id {
        Some(id) => conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1 AND id != ?2",
            params![email, id],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?,
    };
    Ok(count > 0)
}

/// Update the mutable profile fields of a user.
pub fn update_user_profile(
    conn: &Connection,
    id: &str,
    first_name: &str,
    last_name: &str,
    email: &str,
    phone: Option<&str>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET first_name = ?1, last_name = ?2, email = ?3, phone = ?4 WHERE id = ?5",
        params![first_name, last_name, email, phone, id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound { entity_type: "User".into(), id: id.into() });
    }
    Ok(())
}

/// Admin approval action: flips a doctor account to approved + active.
pub fn approve_doctor_user(conn: &Connection, user_id: &str) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET is_approved = 1, is_active = 1 WHERE id = ?1 AND role = 'doctor'",
        params![user_id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound { entity_type: "Doctor".into(), id: user_id.into() });
    }
    Ok(())
}

/// Doctor accounts waiting for admin approval, oldest first.
pub fn list_unapproved_doctors(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE role = 'doctor' AND is_approved = 0 ORDER BY date_joined"
    ))?;
    let rows = stmt.query_map([], user_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn count_users_by_role(conn: &Connection, role: Role) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE role = ?1",
        params![role.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}
