//! Account registration, credential checks and the login gates around them.
//!
//! Patients are usable immediately. Doctor accounts start unapproved and
//! inactive; an admin must approve them before they can sign in or appear
//! in the directory.

use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::models::{Doctor, Role, User};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("this account is awaiting admin approval")]
    PendingApproval,
    #[error("this account has been deactivated")]
    Deactivated,
    #[error("{0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DoctorProfileInput {
    pub specialization: String,
    pub license_number: String,
    pub consultation_fee: f64,
    pub bio: Option<String>,
    pub years_of_experience: u32,
}

/// Hash a password with a random salt. Stored as `salt$digest`, both
/// URL-safe base64.
pub fn hash_password(password: &str) -> String {
    let salt: [u8; 16] = rand::random();
    encode_password(&salt, password)
}

/// Constant-format check of a password against a stored `salt$digest`.
pub fn verify_password(password: &str, stored: &str) -> bool {
    use base64::Engine;
    let Some((salt_b64, _)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(salt_b64) else {
        return false;
    };
    encode_password(&salt, password) == stored
}

fn encode_password(salt: &[u8], password: &str) -> String {
    use base64::Engine;
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    format!("{}${}", engine.encode(salt), engine.encode(digest))
}

fn validate_registration(reg: &Registration) -> Result<(), AccountError> {
    if reg.email.trim().is_empty() || !reg.email.contains('@') {
        return Err(AccountError::InvalidRequest("a valid email is required".into()));
    }
    if reg.password.len() < 8 {
        return Err(AccountError::InvalidRequest(
            "password must be at least 8 characters".into(),
        ));
    }
    if reg.first_name.trim().is_empty() || reg.last_name.trim().is_empty() {
        return Err(AccountError::InvalidRequest("first and last name are required".into()));
    }
    Ok(())
}

fn build_user(reg: &Registration, role: Role, approved: bool) -> User {
    User {
        id: Uuid::new_v4().to_string(),
        email: reg.email.trim().to_lowercase(),
        password_hash: hash_password(&reg.password),
        first_name: reg.first_name.trim().to_string(),
        last_name: reg.last_name.trim().to_string(),
        phone: reg.phone.clone(),
        role,
        is_approved: approved,
        is_active: approved,
        date_joined: chrono::Local::now().naive_local(),
    }
}

/// Register a patient account. Active immediately.
pub fn register_patient(conn: &Connection, reg: &Registration) -> Result<User, AccountError> {
    validate_registration(reg)?;
    let user = build_user(reg, Role::Patient, true);
    match repository::insert_user(conn, &user) {
        Ok(()) => Ok(user),
        Err(e) if e.is_unique_violation() => Err(AccountError::EmailTaken),
        Err(e) => Err(e.into()),
    }
}

/// Register a doctor account with its professional profile. The account
/// stays unapproved until an admin approves it.
pub fn register_doctor(
    conn: &mut Connection,
    reg: &Registration,
    profile: &DoctorProfileInput,
) -> Result<User, AccountError> {
    insert_doctor_account(conn, reg, profile, false)
}

/// Admin-created doctor account. Approved and active immediately.
pub fn create_doctor_account(
    conn: &mut Connection,
    reg: &Registration,
    profile: &DoctorProfileInput,
) -> Result<User, AccountError> {
    insert_doctor_account(conn, reg, profile, true)
}

fn insert_doctor_account(
    conn: &mut Connection,
    reg: &Registration,
    profile: &DoctorProfileInput,
    approved: bool,
) -> Result<User, AccountError> {
    validate_registration(reg)?;
    if profile.specialization.trim().is_empty() || profile.license_number.trim().is_empty() {
        return Err(AccountError::InvalidRequest(
            "specialization and license number are required".into(),
        ));
    }

    let user = build_user(reg, Role::Doctor, approved);
    let now = chrono::Local::now().naive_local();
    let doctor = Doctor {
        user_id: user.id.clone(),
        specialization: profile.specialization.trim().to_string(),
        license_number: profile.license_number.trim().to_string(),
        consultation_fee: profile.consultation_fee,
        bio: profile.bio.clone(),
        years_of_experience: profile.years_of_experience,
        is_available: true,
        created_at: now,
        updated_at: now,
    };

    let tx = conn.transaction().map_err(DatabaseError::from)?;
    match repository::insert_user(&tx, &user) {
        Ok(()) => {}
        Err(e) if e.is_unique_violation() => return Err(AccountError::EmailTaken),
        Err(e) => return Err(e.into()),
    }
    repository::insert_doctor(&tx, &doctor)?;
    tx.commit().map_err(DatabaseError::from)?;

    if approved {
        tracing::info!(user_id = %user.id, "doctor account created by admin");
    } else {
        tracing::info!(user_id = %user.id, "doctor registered, awaiting approval");
    }
    Ok(user)
}

#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Update the caller's own profile fields. The email must stay unique
/// across all accounts; the check excludes the caller so keeping the same
/// address is fine.
pub fn update_profile(
    conn: &Connection,
    user: &User,
    update: &ProfileUpdate,
) -> Result<User, AccountError> {
    if update.email.trim().is_empty() || !update.email.contains('@') {
        return Err(AccountError::InvalidRequest("a valid email is required".into()));
    }
    if update.first_name.trim().is_empty() || update.last_name.trim().is_empty() {
        return Err(AccountError::InvalidRequest("first and last name are required".into()));
    }

    let email = update.email.trim().to_lowercase();
    if repository::email_taken(conn, &email, Some(&user.id))? {
        return Err(AccountError::EmailTaken);
    }
    repository::update_user_profile(
        conn,
        &user.id,
        update.first_name.trim(),
        update.last_name.trim(),
        &email,
        update.phone.as_deref(),
    )?;
    repository::get_user(conn, &user.id)?.ok_or_else(|| {
        AccountError::Database(DatabaseError::NotFound {
            entity_type: "User".into(),
            id: user.id.clone(),
        })
    })
}

/// Check credentials and login gates. Wrong email and wrong password are
/// indistinguishable to the caller.
pub fn authenticate(conn: &Connection, email: &str, password: &str) -> Result<User, AccountError> {
    let user = repository::find_user_by_email(conn, &email.trim().to_lowercase())?
        .ok_or(AccountError::InvalidCredentials)?;
    if !verify_password(password, &user.password_hash) {
        return Err(AccountError::InvalidCredentials);
    }
    if user.role == Role::Doctor && !user.is_approved {
        return Err(AccountError::PendingApproval);
    }
    if !user.is_active {
        return Err(AccountError::Deactivated);
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn registration(email: &str) -> Registration {
        Registration {
            email: email.into(),
            password: "correct horse".into(),
            first_name: "Ada".into(),
            last_name: "Reyes".into(),
            phone: Some("555-0101".into()),
        }
    }

    fn doctor_profile() -> DoctorProfileInput {
        DoctorProfileInput {
            specialization: "Dermatology".into(),
            license_number: "LIC-9".into(),
            consultation_fee: 600.0,
            bio: None,
            years_of_experience: 5,
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let stored = hash_password("secret-pass");
        assert!(verify_password("secret-pass", &stored));
        assert!(!verify_password("wrong-pass", &stored));
        assert!(!verify_password("secret-pass", "garbage"));
    }

    #[test]
    fn same_password_different_salt() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn patient_registers_and_logs_in() {
        let conn = open_memory_database().unwrap();
        let user = register_patient(&conn, &registration("ada@example.com")).unwrap();
        assert!(user.is_approved);
        assert!(user.is_active);

        let logged_in = authenticate(&conn, "ada@example.com", "correct horse").unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[test]
    fn email_is_normalized() {
        let conn = open_memory_database().unwrap();
        register_patient(&conn, &registration("  Ada@Example.COM ")).unwrap();
        assert!(authenticate(&conn, "ada@example.com", "correct horse").is_ok());
    }

    #[test]
    fn duplicate_email_rejected() {
        let conn = open_memory_database().unwrap();
        register_patient(&conn, &registration("dup@example.com")).unwrap();
        let err = register_patient(&conn, &registration("dup@example.com")).unwrap_err();
        assert!(matches!(err, AccountError::EmailTaken));
    }

    #[test]
    fn weak_password_rejected() {
        let conn = open_memory_database().unwrap();
        let mut reg = registration("ada@example.com");
        reg.password = "short".into();
        assert!(matches!(
            register_patient(&conn, &reg),
            Err(AccountError::InvalidRequest(_))
        ));
    }

    #[test]
    fn wrong_password_is_invalid_credentials() {
        let conn = open_memory_database().unwrap();
        register_patient(&conn, &registration("ada@example.com")).unwrap();
        assert!(matches!(
            authenticate(&conn, "ada@example.com", "nope nope nope"),
            Err(AccountError::InvalidCredentials)
        ));
        assert!(matches!(
            authenticate(&conn, "ghost@example.com", "correct horse"),
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[test]
    fn new_doctor_cannot_log_in_until_approved() {
        let mut conn = open_memory_database().unwrap();
        let user =
            register_doctor(&mut conn, &registration("doc@example.com"), &doctor_profile()).unwrap();
        assert!(!user.is_approved);

        assert!(matches!(
            authenticate(&conn, "doc@example.com", "correct horse"),
            Err(AccountError::PendingApproval)
        ));

        repository::approve_doctor_user(&conn, &user.id).unwrap();
        assert!(authenticate(&conn, "doc@example.com", "correct horse").is_ok());
    }

    #[test]
    fn admin_created_doctor_logs_in_immediately() {
        let mut conn = open_memory_database().unwrap();
        let user = create_doctor_account(&mut conn, &registration("doc@example.com"), &doctor_profile())
            .unwrap();
        assert!(user.is_approved);
        assert!(user.is_active);
        assert!(authenticate(&conn, "doc@example.com", "correct horse").is_ok());
    }

    #[test]
    fn doctor_registration_writes_profile() {
        let mut conn = open_memory_database().unwrap();
        let user =
            register_doctor(&mut conn, &registration("doc@example.com"), &doctor_profile()).unwrap();
        let doctor = repository::get_doctor(&conn, &user.id).unwrap().unwrap();
        assert_eq!(doctor.specialization, "Dermatology");
        assert!(doctor.is_available);
    }

    #[test]
    fn profile_update_keeps_email_unique() {
        let conn = open_memory_database().unwrap();
        let ada = register_patient(&conn, &registration("ada@example.com")).unwrap();
        register_patient(&conn, &registration("eve@example.com")).unwrap();

        let err = update_profile(
            &conn,
            &ada,
            &ProfileUpdate {
                first_name: "Ada".into(),
                last_name: "Reyes".into(),
                email: "eve@example.com".into(),
                phone: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, AccountError::EmailTaken));

        // Keeping your own email is not a collision
        let updated = update_profile(
            &conn,
            &ada,
            &ProfileUpdate {
                first_name: "Adelaide".into(),
                last_name: "Reyes".into(),
                email: "Ada@Example.com".into(),
                phone: Some("555-0102".into()),
            },
        )
        .unwrap();
        assert_eq!(updated.first_name, "Adelaide");
        assert_eq!(updated.email, "ada@example.com");
        assert_eq!(updated.phone.as_deref(), Some("555-0102"));
    }

    #[test]
    fn profile_update_changes_login_email() {
        let conn = open_memory_database().unwrap();
        let ada = register_patient(&conn, &registration("ada@example.com")).unwrap();

        update_profile(
            &conn,
            &ada,
            &ProfileUpdate {
                first_name: "Ada".into(),
                last_name: "Reyes".into(),
                email: "new@example.com".into(),
                phone: None,
            },
        )
        .unwrap();

        assert!(authenticate(&conn, "new@example.com", "correct horse").is_ok());
        assert!(matches!(
            authenticate(&conn, "ada@example.com", "correct horse"),
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[test]
    fn deactivated_account_blocked() {
        let conn = open_memory_database().unwrap();
        let user = register_patient(&conn, &registration("ada@example.com")).unwrap();
        conn.execute("UPDATE users SET is_active = 0 WHERE id = ?1", [&user.id]).unwrap();
        assert!(matches!(
            authenticate(&conn, "ada@example.com", "correct horse"),
            Err(AccountError::Deactivated)
        ));
    }
}
