use nix::errno::Errno;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ExecError {
    #[error("空命令")]
    EmptyCommand,
    #[error("不能在 {0} 里再打开一个 {0}")]
    SelfInvocation(String),
    #[error("{0}: 找不到文件或目录")]
    NotFound(String),
    #[error("{0}: 权限不足")]
    PermissionDenied(String),
    #[error("{0}: 可执行文件格式错误")]
    BadFormat(String),
    #[error("{program}: 执行失败: {source}")]
    Launch { program: String, source: Errno },
    #[error("{path}: 打开失败: {source}")]
    Open { path: String, source: Errno },
    #[error("创建管道失败: {0}")]
    Pipe(Errno),
    #[error("fork 失败: {0}")]
    Fork(Errno),
    #[error("复制文件描述符失败: {0}")]
    Dup(Errno),
    #[error("等待子进程失败: {0}")]
    Wait(Errno),
}

impl ExecError {
    /// exec 失败时由 errno 归类
    pub fn from_exec(program: &str, errno: Errno) -> Self {
        let program = program.to_string();
        match errno {
            Errno::ENOENT => ExecError::NotFound(program),
            Errno::EACCES => ExecError::PermissionDenied(program),
            Errno::ENOEXEC => ExecError::BadFormat(program),
            source => ExecError::Launch { program, source },
        }
    }

    /// 子进程因该错误退出时使用的退出码
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecError::NotFound(_) => 127,
            ExecError::PermissionDenied(_) | ExecError::BadFormat(_) => 126,
            _ => 1,
        }
    }
}
