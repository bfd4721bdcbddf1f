use std::fmt;

use log::{debug, error, warn};
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

/// 默认最多同时追踪的后台任务数
pub const MAX_BACKGROUND_JOBS: usize = 100;

#[derive(Debug, Clone)]
pub struct Job {
    pub pid: Pid,
    pub index: usize,
    pub command: String,
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.index, self.pid, self.command)
    }
}

/// 后台任务登记表，插入顺序即回收时的扫描顺序
pub struct JobManager {
    jobs: Vec<Job>,
    capacity: usize,
}

impl JobManager {
    pub fn new() -> Self {
        Self::with_capacity(MAX_BACKGROUND_JOBS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            jobs: Vec::new(),
            capacity,
        }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.jobs.iter().any(|job| job.pid == pid)
    }

    fn find_available_index(&self) -> usize {
        let mut index = 1;
        while self.jobs.iter().any(|job| job.index == index) {
            index += 1;
        }
        index
    }

    /// 登记一个后台进程；登记表满了只告警，进程照常运行但不再被追踪
    pub fn register(&mut self, pid: Pid, command: String) -> bool {
        if self.jobs.len() >= self.capacity {
            warn!(
                "后台任务过多 (上限 {})，进程 {} 将不被追踪: {}",
                self.capacity, pid, command
            );
            return false;
        }

        let job = Job {
            pid,
            index: self.find_available_index(),
            command,
        };
        debug!("后台任务已启动: {}", job);
        self.jobs.push(job);
        true
    }

    /// 非阻塞地扫一遍登记表，移除已经结束的任务
    pub fn reap_completed(&mut self) {
        self.jobs.retain(|job| {
            match waitpid(job.pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => true,
                Ok(WaitStatus::Exited(_, code)) => {
                    debug!("{} 已完成 (退出码 {})", job, code);
                    false
                }
                Ok(WaitStatus::Signaled(_, sig, _)) => {
                    debug!("{} 被信号 {} 终止", job, sig);
                    false
                }
                Ok(status) => {
                    debug!("{} 状态变化: {:?}", job, status);
                    true
                }
                Err(Errno::ECHILD) => {
                    // 已经不是本进程的子进程，留着也永远等不到
                    warn!("回收后台任务失败: {} 不是子进程", job);
                    false
                }
                Err(e) => {
                    error!("回收后台任务失败: {}: {}", job, e);
                    true
                }
            }
        });
    }
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new()
    }
}
