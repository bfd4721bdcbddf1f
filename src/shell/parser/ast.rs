use std::fmt;
use std::os::fd::RawFd;

use nix::fcntl::OFlag;

use super::lexer::RedirectOp;

/// 一行命令解析后的命令树，每个内部节点独占自己的子节点
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Exec(Command),
    Redirect(Redirection),
    Pipe(Box<Node>, Box<Node>),
    Sequence(Box<Node>, Box<Node>),
    Background(Box<Node>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    /// argv[0] 为程序名
    pub argv: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Redirection {
    pub cmd: Box<Node>,
    pub file: String,
    pub mode: OpenMode,
    /// 被替换的标准描述符：0 为输入，1 为输出
    pub fd: RawFd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    WriteTruncate,
    WriteAppend,
}

impl OpenMode {
    pub fn oflag(&self) -> OFlag {
        match self {
            OpenMode::ReadOnly => OFlag::O_RDONLY,
            OpenMode::WriteTruncate => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            OpenMode::WriteAppend => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
        }
    }
}

impl From<RedirectOp> for OpenMode {
    fn from(op: RedirectOp) -> Self {
        match op {
            RedirectOp::Input => OpenMode::ReadOnly,
            RedirectOp::Output => OpenMode::WriteTruncate,
            RedirectOp::Append => OpenMode::WriteAppend,
        }
    }
}

impl Node {
    pub fn exec<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Node::Exec(Command {
            argv: argv.into_iter().map(Into::into).collect(),
        })
    }

    pub fn redirect(cmd: Node, file: impl Into<String>, op: RedirectOp) -> Self {
        let fd = match op {
            RedirectOp::Input => libc::STDIN_FILENO,
            RedirectOp::Output | RedirectOp::Append => libc::STDOUT_FILENO,
        };
        Node::Redirect(Redirection {
            cmd: Box::new(cmd),
            file: file.into(),
            mode: op.into(),
            fd,
        })
    }

    pub fn pipe(left: Node, right: Node) -> Self {
        Node::Pipe(Box::new(left), Box::new(right))
    }

    pub fn sequence(left: Node, right: Node) -> Self {
        Node::Sequence(Box::new(left), Box::new(right))
    }

    pub fn background(cmd: Node) -> Self {
        Node::Background(Box::new(cmd))
    }

    /// `Background` 和 `Sequence` 自己负责 fork，可以直接在当前进程里执行
    pub fn runs_in_place(&self) -> bool {
        matches!(self, Node::Background(_) | Node::Sequence(..))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Exec(cmd) => write!(f, "{}", cmd.argv.join(" ")),
            Node::Redirect(redir) => {
                let op = match redir.mode {
                    OpenMode::ReadOnly => "<",
                    OpenMode::WriteTruncate => ">",
                    OpenMode::WriteAppend => ">>",
                };
                write!(f, "{} {} {}", redir.cmd, op, redir.file)
            }
            Node::Pipe(left, right) => write!(f, "{} | {}", left, right),
            Node::Sequence(left, right) => write!(f, "{} ; {}", left, right),
            Node::Background(cmd) => write!(f, "{} &", cmd),
        }
    }
}
