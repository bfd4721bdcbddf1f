#![allow(clippy::unwrap_used)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{self as nix_signal, kill, killpg, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{fork, getpgrp, setpgid, ForkResult, Pid};

use forksh::shell::executor::{ExecError, Executor, LineStatus};
use forksh::shell::parser::parse;
use forksh::shell::signals::{self, InterruptOutcome};

// 每个用例都会 fork，并且前台进程号是进程级状态，串行执行
static LOCK: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

fn executor() -> Executor {
    Executor::new("forksh", 100)
}

fn run(executor: &mut Executor, line: &str) -> LineStatus {
    let node = parse(line).unwrap();
    executor.execute_line(&node).unwrap()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_echo_into_file() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("x");

    let status = run(
        &mut executor(),
        &format!("echo hello > {}", path_str(&out)),
    );
    assert_eq!(status, LineStatus::Exited(0));
    assert_eq!(fs::read_to_string(&out).unwrap(), "hello\n");
}

#[test]
fn test_truncate_and_append() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    fs::write(&out, "some much longer old content\n").unwrap();

    let mut executor = executor();
    run(&mut executor, &format!("echo new > {}", path_str(&out)));
    assert_eq!(fs::read_to_string(&out).unwrap(), "new\n");

    run(&mut executor, &format!("echo more >> {}", path_str(&out)));
    assert_eq!(fs::read_to_string(&out).unwrap(), "new\nmore\n");
}

#[test]
fn test_input_and_output_redirection() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let out = dir.path().join("out");
    fs::write(&input, "abc\n").unwrap();

    let status = run(
        &mut executor(),
        &format!("tr a-z A-Z > {} < {}", path_str(&out), path_str(&input)),
    );
    assert_eq!(status, LineStatus::Exited(0));
    assert_eq!(fs::read_to_string(&out).unwrap(), "ABC\n");
}

#[test]
fn test_three_stage_pipeline() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    let status = run(
        &mut executor(),
        &format!("echo hello | tr h j | tr l m > {}", path_str(&out)),
    );
    assert_eq!(status, LineStatus::Exited(0));
    assert_eq!(fs::read_to_string(&out).unwrap(), "jemmo\n");
}

#[test]
fn test_sequence_runs_in_order() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let out = path_str(&out);

    let status = run(
        &mut executor(),
        &format!("echo first >> {out} ; echo second >> {out} ; echo third >> {out}"),
    );
    assert_eq!(status, LineStatus::Detached);
    assert_eq!(
        fs::read_to_string(out).unwrap(),
        "first\nsecond\nthird\n"
    );
}

#[test]
fn test_sequence_waits_for_left_side() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    let started = Instant::now();
    run(
        &mut executor(),
        &format!("sleep 0.3 ; echo done > {}", path_str(&out)),
    );
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(fs::read_to_string(&out).unwrap(), "done\n");
}

#[test]
fn test_background_is_tracked_until_reaped() {
    let _lock = serial();
    let mut executor = executor();

    let started = Instant::now();
    let status = run(&mut executor, "sleep 1 &");
    assert_eq!(status, LineStatus::Detached);
    assert!(started.elapsed() < Duration::from_millis(900));
    assert_eq!(executor.jobs().len(), 1);
    assert_eq!(executor.jobs().jobs()[0].command, "sleep 1");

    let deadline = Instant::now() + Duration::from_secs(10);
    while !executor.jobs().is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(50));
        executor.reap_jobs();
    }
    assert!(executor.jobs().is_empty());
}

#[test]
fn test_background_then_foreground() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut executor = executor();

    let started = Instant::now();
    run(
        &mut executor,
        &format!("sleep 1 & ; echo now > {}", path_str(&out)),
    );
    assert!(started.elapsed() < Duration::from_millis(900));
    assert_eq!(fs::read_to_string(&out).unwrap(), "now\n");
    assert_eq!(executor.jobs().len(), 1);
}

#[test]
fn test_launch_failures_map_to_exit_codes() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("not-executable");
    fs::write(&script, "#!/bin/sh\necho hi\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o644)).unwrap();

    let mut executor = executor();
    assert_eq!(
        run(&mut executor, "definitely-not-a-command-4711"),
        LineStatus::Exited(127)
    );
    assert_eq!(
        run(&mut executor, path_str(&script)),
        LineStatus::Exited(126)
    );
    assert_eq!(run(&mut executor, "false"), LineStatus::Exited(1));
}

#[test]
fn test_self_invocation_is_rejected() {
    let _lock = serial();
    let mut executor = executor();
    assert_eq!(run(&mut executor, "forksh -c ls"), LineStatus::Exited(1));
    assert_eq!(run(&mut executor, "./forksh"), LineStatus::Exited(1));
}

#[test]
fn test_redirect_open_failure() {
    let _lock = serial();
    let status = run(&mut executor(), "cat < /nonexistent/forksh/input");
    assert_eq!(status, LineStatus::Exited(1));
}

#[test]
fn test_in_place_self_invocation_error_stays_in_child() {
    let _lock = serial();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    // 左侧在子进程里失败，右侧照常执行
    let status = run(
        &mut executor(),
        &format!("forksh ; echo after > {}", path_str(&out)),
    );
    assert_eq!(status, LineStatus::Detached);
    assert_eq!(fs::read_to_string(&out).unwrap(), "after\n");
}

/// 等到前台进程被登记，然后对它做点什么
fn with_foreground<F>(action: F) -> thread::JoinHandle<()>
where
    F: FnOnce(Pid) + Send + 'static,
{
    thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Some(pid) = signals::foreground() {
                action(pid);
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("foreground process was never designated");
    })
}

#[test]
fn test_foreground_signal_is_reported() {
    let _lock = serial();
    let killer = with_foreground(|pid| {
        kill(pid, Signal::SIGTERM).unwrap();
    });

    let status = run(&mut executor(), "sleep 5");
    killer.join().unwrap();
    assert_eq!(status, LineStatus::Signaled(Signal::SIGTERM));
    assert_eq!(signals::foreground(), None);
}

#[test]
fn test_interrupt_is_forwarded_to_foreground() {
    let _lock = serial();
    let interrupter = with_foreground(|pid| {
        assert_eq!(signals::deliver_interrupt(), InterruptOutcome::Forwarded(pid));
    });

    let status = run(&mut executor(), "sleep 5");
    interrupter.join().unwrap();
    assert_eq!(status, LineStatus::Signaled(Signal::SIGINT));
    assert_eq!(signals::foreground(), None);
}

#[test]
fn test_interrupt_without_foreground() {
    let _lock = serial();
    signals::take_prompt_request();
    assert_eq!(signals::foreground(), None);
    assert_eq!(signals::deliver_interrupt(), InterruptOutcome::NoForeground);
    assert!(signals::take_prompt_request());
}

#[test]
fn test_empty_exec_node_fails() {
    let _lock = serial();
    let node = forksh::shell::parser::ast::Node::exec(Vec::<String>::new());
    let status = executor().execute_line(&node).unwrap();
    assert_eq!(status, LineStatus::Exited(1));
    assert_eq!(ExecError::EmptyCommand.exit_code(), 1);
}

/// 在独立进程组里装好信号桥，启动 `line` 这个后台任务，然后像终端按下
/// Ctrl-C 那样给整个进程组发 SIGINT。子进程退出码：0 表示后台任务还活着，
/// 42 表示它被 SIGINT 终止，其余值表示准备阶段出错
fn interrupt_process_group_with_background(line: &str) -> WaitStatus {
    let node = parse(line).unwrap();
    match unsafe { fork() }.unwrap() {
        ForkResult::Child => {
            let code = (|| {
                setpgid(Pid::from_raw(0), Pid::from_raw(0)).ok()?;
                signals::install().ok()?;
                let mut executor = executor();
                executor.execute_line(&node).ok()?;
                let job = executor.jobs().jobs().first()?.pid;

                // 收尾时用 SIGTERM 清理整个进程组，自己先忽略掉
                unsafe { nix_signal::signal(Signal::SIGTERM, SigHandler::SigIgn) }.ok()?;
                killpg(getpgrp(), Signal::SIGINT).ok()?;
                thread::sleep(Duration::from_millis(300));

                let status = waitpid(job, Some(WaitPidFlag::WNOHANG)).ok()?;
                let _ = killpg(getpgrp(), Signal::SIGTERM);
                Some(match status {
                    WaitStatus::StillAlive => 0,
                    WaitStatus::Signaled(_, Signal::SIGINT, _) => 42,
                    _ => 43,
                })
            })()
            .unwrap_or(44);
            unsafe { libc::_exit(code) }
        }
        ForkResult::Parent { child } => waitpid(child, None).unwrap(),
    }
}

#[test]
fn test_group_interrupt_spares_background_job() {
    let _lock = serial();
    let child = interrupt_process_group_with_background("sleep 5 &");
    assert!(
        matches!(child, WaitStatus::Exited(_, 0)),
        "background job did not survive: {:?}",
        child
    );
}

#[test]
fn test_group_interrupt_spares_background_pipeline() {
    let _lock = serial();
    // 后台子进程再 fork 出来的两端也要继承忽略
    let child = interrupt_process_group_with_background("sleep 5 | cat &");
    assert!(
        matches!(child, WaitStatus::Exited(_, 0)),
        "background pipeline did not survive: {:?}",
        child
    );
}
