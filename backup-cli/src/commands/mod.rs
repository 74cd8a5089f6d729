mod backup;
mod seed;
mod settings;
mod status;

// Status commands
pub use status::{run_status, show_client_version};

// Settings commands
pub use settings::{SettingsPatch, show_settings, update_settings};

// Backup commands
pub use backup::{run_backup, run_serve};

// Demo data
pub use seed::run_seed_demo;
