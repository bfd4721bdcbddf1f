use colored::Colorize;
use std::collections::HashMap;

type Style = Box<dyn Fn(String) -> String>;

pub struct Theme {
    messages: HashMap<&'static str, String>,
    pub prompt_style: Style,
    pub error_style: Style,
    pub warning_style: Style,
    pub success_style: Style,
}

impl Theme {
    fn default_messages() -> HashMap<&'static str, String> {
        HashMap::from([
            ("prompt", "forksh> ".to_string()),
            ("welcome", "哼～又来找人家跑命令了吗？".to_string()),
            ("exit", "哼！这就走了吗？".to_string()),
            ("eof_signal", "读到 EOF 了，再见～".to_string()),
            ("interrupt_signal", "按 Ctrl-C 也没用哦～".to_string()),
            ("error", "出错了".to_string()),
            ("syntax_error", "语法错误".to_string()),
            ("exec_error", "执行失败".to_string()),
            ("non_zero_exit", "检测到非零退出码".to_string()),
            ("killed_by_signal", "子进程被信号终止".to_string()),
        ])
    }

    pub fn load_theme(theme_name: &str) -> Theme {
        match theme_name {
            "dark" => Theme {
                messages: Self::default_messages(),
                prompt_style: Box::new(|s| s.bright_purple().to_string()),
                error_style: Box::new(|s| s.red().to_string()),
                warning_style: Box::new(|s| s.yellow().to_string()),
                success_style: Box::new(|s| s.magenta().to_string()),
            },
            _ => Theme {
                messages: Self::default_messages(),
                prompt_style: Box::new(|s| s.bright_cyan().to_string()),
                error_style: Box::new(|s| s.bright_red().to_string()),
                warning_style: Box::new(|s| s.bright_yellow().to_string()),
                success_style: Box::new(|s| s.bright_magenta().to_string()),
            },
        }
    }

    pub fn get_message(&self, key: &str) -> String {
        self.messages.get(key).cloned().unwrap_or_default()
    }
}
