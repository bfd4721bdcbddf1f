use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    /// 行首遇到 `exit`：调用方应立即以成功状态结束当前进程
    #[error("exit")]
    Exit,
    #[error("语法错误: `{near}` 附近")]
    Syntax { near: String },
    #[error("重定向 `{op}` 缺少文件名")]
    MissingRedirectTarget { op: &'static str },
    #[error("参数过多 (最多 {max} 个)")]
    TooManyArgs { max: usize },
    #[error("空命令: `{near}` 附近")]
    EmptyCommand { near: String },
    #[error("无法解析的剩余内容: {rest}")]
    Leftovers { rest: String },
}
