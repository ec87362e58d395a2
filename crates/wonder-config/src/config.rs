use std::{path::PathBuf, time::Duration};

pub const DATA_DIR_VAR: &str = "WONDER_DATA_DIR";
pub const SCAN_SECS_VAR: &str = "WONDER_SCAN_SECS";

const DEFAULT_SCAN_SECS: u64 = 3;
const DATA_DIR_NAME: &str = "wonder-data";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Where the player list and the remembered button are stored.
    pub data_dir: PathBuf,
    /// How long to listen for advertising buttons before offering them to the user.
    pub scan_duration: Duration,
}

impl Config {
    pub fn load() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = var(DATA_DIR_VAR)
            .map(|dir| dir.trim().to_owned())
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let scan_secs = match var(SCAN_SECS_VAR) {
            Some(secs) => secs.trim().parse().unwrap_or_else(|e| {
                tracing::warn!(%e, %secs, "Invalid {SCAN_SECS_VAR}, using the default");
                DEFAULT_SCAN_SECS
            }),
            None => DEFAULT_SCAN_SECS,
        };

        Self {
            data_dir,
            scan_duration: Duration::from_secs(scan_secs.max(1)),
        }
    }
}

fn default_data_dir() -> PathBuf {
    if let Ok(mut exe_path) = std::env::current_exe() {
        exe_path.pop();
        exe_path.push(DATA_DIR_NAME);
        return exe_path;
    }

    DATA_DIR_NAME.into()
}
