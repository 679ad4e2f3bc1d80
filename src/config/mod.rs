pub mod error;
pub mod load;
pub mod paths;
pub mod settings;
pub use error::ConfigError;
pub use load::load_settings;
pub use paths::{
    default_global_config_path, default_slot_root, default_state_root, DEFAULT_SLOT_ROOT_DIR,
    GLOBAL_SETTINGS_FILE_NAME, GLOBAL_STATE_DIR,
};
pub use settings::{BarrierConfig, Settings, WorkerConfig, DEFAULT_LOCK_NAME};
