//! SIGINT 桥接：把 Ctrl-C 转发给当前的前台进程。
//!
//! 前台进程号放在进程级的原子变量里，只在顶层分派等待子进程期间有效，
//! 由 [`ForegroundGuard`] 负责设置与清除。信号处理函数里只做原子读写、
//! `kill` 和 `write(2)`，提示符重绘之类的事交给主循环通过
//! [`take_prompt_request`] 轮询。

use std::mem::MaybeUninit;
use std::os::fd::BorrowedFd;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use nix::errno::Errno;
use nix::sys::signal::{self, kill, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::{write, Pid};

const NO_FOREGROUND: i32 = 0;

static FOREGROUND_PID: AtomicI32 = AtomicI32::new(NO_FOREGROUND);
static PROMPT_REQUESTED: AtomicBool = AtomicBool::new(false);
static FORWARD_FAILURE: AtomicI32 = AtomicI32::new(0);

const FORWARDED_MSG: &str = "\n\n";
const NO_FOREGROUND_MSG: &str = "\n\nCtrl-C: 当前没有正在运行的前台进程\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptOutcome {
    Forwarded(Pid),
    ForwardFailed(Pid, Errno),
    NoForeground,
}

/// 安装 SIGINT 处理函数，只应在交互 shell 进程里调用一次
pub fn install() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(handle_sigint),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe { signal::sigaction(Signal::SIGINT, &action) }?;
    Ok(())
}

/// fork 出来的子进程恢复默认的 SIGINT 行为；已经被忽略的保持忽略，
/// 这样后台任务再 fork 出来的子孙进程也不会被终端的 Ctrl-C 带走
pub fn reset_to_default() {
    if interrupts_ignored() {
        return;
    }
    let _ = unsafe { signal::signal(Signal::SIGINT, SigHandler::SigDfl) };
}

/// 后台任务忽略 SIGINT；忽略状态在 `execvp` 之后依然有效
pub fn ignore_interrupts() {
    let _ = unsafe { signal::signal(Signal::SIGINT, SigHandler::SigIgn) };
}

/// 只查询不修改当前的 SIGINT 处理方式
pub fn interrupts_ignored() -> bool {
    let mut current = MaybeUninit::<libc::sigaction>::uninit();
    let res = unsafe { libc::sigaction(libc::SIGINT, ptr::null(), current.as_mut_ptr()) };
    if Errno::result(res).is_err() {
        return false;
    }
    let current = unsafe { current.assume_init() };
    current.sa_sigaction == libc::SIG_IGN
}

extern "C" fn handle_sigint(_signum: libc::c_int) {
    let saved = errno::errno();
    deliver_interrupt();
    errno::set_errno(saved);
}

/// 处理一次中断：有前台进程就转发，没有就提示并请求重绘提示符
pub fn deliver_interrupt() -> InterruptOutcome {
    match foreground() {
        Some(pid) => match kill(pid, Signal::SIGINT) {
            Ok(()) => {
                emit(FORWARDED_MSG);
                InterruptOutcome::Forwarded(pid)
            }
            Err(e) => {
                FORWARD_FAILURE.store(e as i32, Ordering::SeqCst);
                InterruptOutcome::ForwardFailed(pid, e)
            }
        },
        None => {
            emit(NO_FOREGROUND_MSG);
            PROMPT_REQUESTED.store(true, Ordering::SeqCst);
            InterruptOutcome::NoForeground
        }
    }
}

fn emit(msg: &str) {
    // 信号上下文里不能碰 std 的 stdout 锁
    let stdout = unsafe { BorrowedFd::borrow_raw(libc::STDOUT_FILENO) };
    let _ = write(stdout, msg.as_bytes());
}

pub fn foreground() -> Option<Pid> {
    match FOREGROUND_PID.load(Ordering::SeqCst) {
        NO_FOREGROUND => None,
        pid => Some(Pid::from_raw(pid)),
    }
}

/// 主循环调用：上次中断是否要求重新显示提示符
pub fn take_prompt_request() -> bool {
    PROMPT_REQUESTED.swap(false, Ordering::SeqCst)
}

/// 取出并清除最近一次转发失败的 errno
pub fn take_forward_failure() -> Option<Errno> {
    match FORWARD_FAILURE.swap(0, Ordering::SeqCst) {
        0 => None,
        raw => Some(Errno::from_raw(raw)),
    }
}

/// 在作用域内把某个进程标记为前台进程，离开作用域（包括 panic）时恢复为无
pub struct ForegroundGuard {
    _private: (),
}

impl ForegroundGuard {
    pub fn new(pid: Pid) -> Self {
        FOREGROUND_PID.store(pid.as_raw(), Ordering::SeqCst);
        Self { _private: () }
    }
}

impl Drop for ForegroundGuard {
    fn drop(&mut self) {
        FOREGROUND_PID.store(NO_FOREGROUND, Ordering::SeqCst);
    }
}

/// 前台进程号与各个标志都是进程级状态，碰它们的测试需要串行
#[cfg(test)]
pub(crate) fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}
