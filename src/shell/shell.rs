use log::{debug, error, info, warn};
use nix::sys::signal::Signal;
use std::error::Error;
use std::io::Write;
use std::process;

use crate::shell::executor::{Executor, LineStatus};
use crate::shell::parser::{parse, ParseError};
use crate::shell::readline::{ReadlineError, ReadlineManager};
use crate::shell::signals;
use crate::utils::config::Config;
use crate::utils::theme::Theme;

/// 语法错误对这一行是致命的：处理这一行的进程异常退出
pub const SYNTAX_EXIT_CODE: i32 = 255;

pub struct Shell<'a> {
    theme: &'a Theme,
    readline: ReadlineManager<'a>,
    executor: Executor,
}

impl<'a> Shell<'a> {
    pub fn new(config: &'a Config, theme: &'a Theme) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            theme,
            readline: ReadlineManager::new(config)?,
            executor: Executor::new(config.name.as_str(), config.max_jobs),
        })
    }

    pub fn run(&mut self) -> Result<(), Box<dyn Error>> {
        debug!("初始化 forksh...");
        signals::install()?;
        self.readline.load_history();

        println!(
            "{}",
            (self.theme.success_style)(self.theme.get_message("welcome"))
        );
        debug!("forksh 准备就绪...");

        self.run_loop()?;
        self.readline.save_history();

        debug!("退出 forksh");
        Ok(())
    }

    fn run_loop(&mut self) -> Result<(), Box<dyn Error>> {
        loop {
            // 执行当前行期间按了 Ctrl-C 且没有前台进程：补上和读行时一样的提示，
            // 接着由 readline 重新画出提示符
            if let Some(notice) = interrupt_notice(self.theme) {
                println!("{}", notice);
            }
            std::io::stdout().flush()?;
            let prompt = (self.theme.prompt_style)(self.theme.get_message("prompt"));

            match self.readline.readline(&prompt) {
                Ok(line) => self.handle_input(&line)?,
                Err(ReadlineError::Eof) => {
                    info!("接收到 EOF，退出 forksh...");
                    println!(
                        "\n{}",
                        (self.theme.warning_style)(self.theme.get_message("eof_signal"))
                    );
                    break;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", interrupt_message(self.theme));
                }
                Err(err) => {
                    error!("读取输入失败: {}", err);
                    eprintln!(
                        "{}: {}",
                        (self.theme.error_style)(self.theme.get_message("error")),
                        err
                    );
                }
            }
        }
        Ok(())
    }

    fn handle_input(&mut self, line: &str) -> Result<(), Box<dyn Error>> {
        // 空行交给读行循环自己跳过
        if line.trim().is_empty() {
            return Ok(());
        }
        self.readline.add_history(line)?;
        debug!("执行命令: {}", line);

        let node = match parse(line) {
            Ok(node) => node,
            Err(ParseError::Exit) => {
                println!(
                    "{}",
                    (self.theme.success_style)(self.theme.get_message("exit"))
                );
                self.readline.save_history();
                process::exit(0);
            }
            Err(e) => {
                error!("语法错误: {}: {}", line, e);
                eprintln!(
                    "{}: {}",
                    (self.theme.error_style)(self.theme.get_message("syntax_error")),
                    e
                );
                self.readline.save_history();
                process::exit(SYNTAX_EXIT_CODE);
            }
        };

        match self.executor.execute_line(&node) {
            Ok(status) => self.report(status),
            Err(e) => {
                error!("执行失败: {}: {}", node, e);
                eprintln!(
                    "{}: {}",
                    (self.theme.error_style)(self.theme.get_message("exec_error")),
                    e
                );
            }
        }
        Ok(())
    }

    fn report(&self, status: LineStatus) {
        match status {
            // Ctrl-C 已经由信号桥确认过了
            LineStatus::Signaled(Signal::SIGINT) => {}
            LineStatus::Signaled(sig) => {
                warn!("子进程被信号终止: {}", sig);
                eprintln!(
                    "{}",
                    (self.theme.error_style)(format!(
                        "{}: {} ({})",
                        self.theme.get_message("killed_by_signal"),
                        sig as i32,
                        sig
                    ))
                );
            }
            LineStatus::Exited(code) if code != 0 => {
                debug!("非零退出码: {}", code);
                eprintln!(
                    "{}",
                    (self.theme.warning_style)(format!(
                        "{} ({})",
                        self.theme.get_message("non_zero_exit"),
                        code
                    ))
                );
            }
            LineStatus::Exited(_) | LineStatus::Detached => {}
        }
    }
}

fn interrupt_message(theme: &Theme) -> String {
    (theme.warning_style)(theme.get_message("interrupt_signal"))
}

/// 取走信号桥留下的重绘请求，有的话返回要显示的提示
fn interrupt_notice(theme: &Theme) -> Option<String> {
    signals::take_prompt_request().then(|| interrupt_message(theme))
}
