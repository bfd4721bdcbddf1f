use dotenv::dotenv;
use rustyline::EditMode;
use std::env;
use std::path::PathBuf;

use crate::shell::executor::job_manager::MAX_BACKGROUND_JOBS;

pub const DEFAULT_NAME: &str = "forksh";

pub struct Config {
    /// shell 自己的程序名，用于拒绝在 shell 里再启动 shell
    pub name: String,
    pub theme: String,
    pub history_file: PathBuf,
    pub editor_mode: String,
    pub logger_level: String,
    pub logger_dir: PathBuf,
    pub max_jobs: usize,
}

impl Config {
    fn get_config_dir() -> PathBuf {
        if let Ok(home) = env::var("HOME") {
            PathBuf::from(home).join(".config").join(DEFAULT_NAME)
        } else {
            env::temp_dir().join(DEFAULT_NAME)
        }
    }

    fn defaults() -> Self {
        let config_dir = Self::get_config_dir();
        Config {
            name: DEFAULT_NAME.to_string(),
            theme: String::from("default"),
            history_file: config_dir.join(".forksh_history"),
            editor_mode: String::from("emacs"),
            logger_level: String::from("info"),
            logger_dir: config_dir.join("logs"),
            max_jobs: MAX_BACKGROUND_JOBS,
        }
    }

    pub fn new() -> Self {
        // 优先加载环境变量
        if cfg!(debug_assertions) {
            dotenv::from_filename(".env.development").ok();
        } else {
            dotenv().ok();
        }

        // 默认配置
        let mut config = Config::defaults();

        // 从环境变量加载配置
        if let Ok(theme) = env::var("FORKSH_THEME") {
            config.theme = theme;
        }

        if let Ok(editor) = env::var("FORKSH_EDITOR") {
            config.editor_mode = editor;
        }

        if let Ok(history) = env::var("FORKSH_HISTORY") {
            config.history_file = PathBuf::from(history);
        }

        if let Ok(level) = env::var("FORKSH_LOG_LEVEL") {
            config.logger_level = level;
        }

        if let Ok(dir) = env::var("FORKSH_LOG_DIR") {
            config.logger_dir = PathBuf::from(dir);
        }

        if let Ok(max_jobs) = env::var("FORKSH_MAX_JOBS") {
            // 非法值保持默认
            if let Ok(max_jobs) = max_jobs.parse() {
                config.max_jobs = max_jobs;
            }
        }

        config
    }

    pub fn get_edit_mode(&self) -> EditMode {
        match self.editor_mode.to_lowercase().as_str() {
            "vi" => EditMode::Vi,
            _ => EditMode::Emacs,
        }
    }
}
