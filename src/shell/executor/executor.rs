use std::ffi::CString;
use std::os::fd::{AsRawFd, RawFd};
use std::process;

use log::{debug, error, warn};
use nix::errno::Errno;
use nix::fcntl::open;
use nix::sys::signal::Signal;
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{close, dup2, execvp, fork, pipe, ForkResult, Pid};

use super::error::ExecError;
use super::job_manager::JobManager;
use crate::shell::parser::ast::{Command, Node, Redirection};
use crate::shell::signals::{self, ForegroundGuard};
use crate::utils::path::basename;

/// 重定向新建文件时的权限位
const CREATE_MODE: libc::mode_t = 0o644;

/// 一行命令执行完之后交给调用方的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Exited(i32),
    Signaled(Signal),
    /// 根节点是 `Background`/`Sequence`，在当前进程里执行，没有单一的退出状态
    Detached,
}

pub struct Executor {
    shell_name: String,
    jobs: JobManager,
}

impl Executor {
    pub fn new(shell_name: impl Into<String>, max_jobs: usize) -> Self {
        Self {
            shell_name: shell_name.into(),
            jobs: JobManager::with_capacity(max_jobs),
        }
    }

    pub fn jobs(&self) -> &JobManager {
        &self.jobs
    }

    pub fn reap_jobs(&mut self) {
        self.jobs.reap_completed();
    }

    /// 顶层分派：执行一棵刚解析好的命令树
    pub fn execute_line(&mut self, node: &Node) -> Result<LineStatus, ExecError> {
        let status = if node.runs_in_place() {
            self.execute(node)?;
            LineStatus::Detached
        } else {
            let child = self.fork_child(node, || Ok(()))?;
            debug!("前台进程 {}: {}", child, node);
            let waited = {
                let _foreground = ForegroundGuard::new(child);
                wait_child(child)
            };
            if let Some(e) = signals::take_forward_failure() {
                warn!("转发中断信号失败: {}", e);
            }
            line_status(waited?)
        };

        self.jobs.reap_completed();
        Ok(status)
    }

    /// 在当前进程里执行节点；`Exec` 成功时不会返回
    pub fn execute(&mut self, node: &Node) -> Result<(), ExecError> {
        match node {
            Node::Exec(cmd) => self.execute_command(cmd),
            Node::Redirect(redir) => self.execute_redirect(redir),
            Node::Pipe(left, right) => self.execute_pipe(left, right),
            Node::Sequence(left, right) => self.execute_sequence(left, right),
            Node::Background(cmd) => self.execute_background(cmd),
        }
    }

    /// 检查参数列表非空，且不是在启动 shell 自己
    pub fn check_program<'c>(&self, argv: &'c [String]) -> Result<&'c str, ExecError> {
        let program = argv.first().ok_or(ExecError::EmptyCommand)?;
        if basename(program) == self.shell_name.as_str() {
            return Err(ExecError::SelfInvocation(self.shell_name.clone()));
        }
        Ok(program.as_str())
    }

    fn execute_command(&self, cmd: &Command) -> Result<(), ExecError> {
        let program = self.check_program(&cmd.argv)?;
        let args = cmd
            .argv
            .iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ExecError::Launch {
                program: program.to_string(),
                source: Errno::EINVAL,
            })?;

        debug!("exec {:?}", cmd.argv);
        match execvp(&args[0], &args) {
            Ok(never) => match never {},
            Err(errno) => Err(ExecError::from_exec(program, errno)),
        }
    }

    fn execute_redirect(&mut self, redir: &Redirection) -> Result<(), ExecError> {
        let fd = open(
            redir.file.as_str(),
            redir.mode.oflag(),
            Mode::from_bits_truncate(CREATE_MODE),
        )
        .map_err(|source| ExecError::Open {
            path: redir.file.clone(),
            source,
        })?;
        move_fd(fd, redir.fd)?;
        self.execute(&redir.cmd)
    }

    fn execute_pipe(&mut self, left: &Node, right: &Node) -> Result<(), ExecError> {
        let (reader, writer) = pipe().map_err(ExecError::Pipe)?;
        let (read_fd, write_fd) = (reader.as_raw_fd(), writer.as_raw_fd());

        let left_pid = self.fork_child(left, || {
            let _ = close(read_fd);
            move_fd(write_fd, libc::STDOUT_FILENO)
        })?;

        let right_pid = match self.fork_child(right, || {
            let _ = close(write_fd);
            move_fd(read_fd, libc::STDIN_FILENO)
        }) {
            Ok(pid) => pid,
            Err(e) => {
                drop((reader, writer));
                let _ = wait_child(left_pid);
                return Err(e);
            }
        };

        // 父进程必须关掉两端，否则右侧永远读不到 EOF
        drop((reader, writer));

        for pid in [left_pid, right_pid] {
            match wait_child(pid) {
                Ok(status) => debug!("管道子进程 {}: {:?}", pid, status),
                Err(e) => warn!("{}", e),
            }
        }
        Ok(())
    }

    fn execute_sequence(&mut self, left: &Node, right: &Node) -> Result<(), ExecError> {
        for side in [left, right] {
            if side.runs_in_place() {
                self.execute(side)?;
                continue;
            }

            let pid = self.fork_child(side, || Ok(()))?;
            let status = wait_child(pid)?;
            debug!("顺序执行 {} 结束: {:?}", side, status);
            self.jobs.reap_completed();
        }
        Ok(())
    }

    fn execute_background(&mut self, cmd: &Node) -> Result<(), ExecError> {
        // 后台任务和 shell 同属一个进程组，终端的 Ctrl-C 只该落到前台进程上
        let pid = self.fork_child(cmd, || {
            signals::ignore_interrupts();
            Ok(())
        })?;
        self.jobs.register(pid, cmd.to_string());
        Ok(())
    }

    /// fork 一个子进程：子进程先跑 `setup`，再执行 `node`，然后退出，永不返回
    fn fork_child<F>(&mut self, node: &Node, setup: F) -> Result<Pid, ExecError>
    where
        F: FnOnce() -> Result<(), ExecError>,
    {
        // 子进程只做描述符调整、exec 或递归分派，最后直接 exit
        match unsafe { fork() } {
            Ok(ForkResult::Parent { child }) => Ok(child),
            Ok(ForkResult::Child) => {
                signals::reset_to_default();
                let result = setup().and_then(|()| self.execute(node));
                self.exit_child(result)
            }
            Err(e) => Err(ExecError::Fork(e)),
        }
    }

    fn exit_child(&self, result: Result<(), ExecError>) -> ! {
        match result {
            Ok(()) => process::exit(0),
            Err(e) => {
                error!("子进程 {} 失败: {}", process::id(), e);
                eprintln!("{}: {}", self.shell_name, e);
                process::exit(e.exit_code())
            }
        }
    }
}

/// 把 `from` 挪到标准描述符 `to` 上并关掉原来的
fn move_fd(from: RawFd, to: RawFd) -> Result<(), ExecError> {
    if from == to {
        return Ok(());
    }
    syscall(|| dup2(from, to)).map_err(ExecError::Dup)?;
    let _ = close(from);
    Ok(())
}

fn wait_child(pid: Pid) -> Result<WaitStatus, ExecError> {
    syscall(|| waitpid(pid, None)).map_err(ExecError::Wait)
}

/// 系统调用被信号打断时重试
fn syscall<F, T>(f: F) -> nix::Result<T>
where
    F: Fn() -> nix::Result<T>,
{
    loop {
        match f() {
            Err(Errno::EINTR) => (),
            result => return result,
        }
    }
}

fn line_status(status: WaitStatus) -> LineStatus {
    match status {
        WaitStatus::Exited(_, code) => LineStatus::Exited(code),
        WaitStatus::Signaled(_, sig, _) => LineStatus::Signaled(sig),
        other => {
            // 没有传 WUNTRACED/WCONTINUED，正常不会走到这里
            warn!("意外的等待状态: {:?}", other);
            LineStatus::Exited(1)
        }
    }
}
