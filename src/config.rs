use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "MedLynk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bind address for the HTTP API.
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Get the application data directory (~/MedLynk/ on all platforms)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("MedLynk")
}

/// Database path: MEDLYNK_DB override, else ~/MedLynk/medlynk.db
pub fn database_path() -> PathBuf {
    match std::env::var("MEDLYNK_DB") {
        Ok(path) => PathBuf::from(path),
        Err(_) => app_data_dir().join("medlynk.db"),
    }
}

/// Bind address: MEDLYNK_ADDR override, else the default.
pub fn bind_addr() -> SocketAddr {
    std::env::var("MEDLYNK_ADDR")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| DEFAULT_ADDR.parse().expect("default addr parses"))
}

/// Default log filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    "info,medlynk=debug".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("MedLynk"));
    }

    #[test]
    fn default_addr_parses() {
        let addr: SocketAddr = DEFAULT_ADDR.parse().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
