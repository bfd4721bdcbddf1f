use std::ops::Range;

/// 空白字符：空格、制表符、回车、换行、垂直制表符
const WHITESPACE: &[u8] = b" \t\r\n\x0b";
/// 会打断单词的操作符字符
const SYMBOLS: &[u8] = b"<|>&;";

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum TokenKind {
    Word,
    Pipe,
    Redirect(RedirectOp),
    Background,
    Semi,
    EOF,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum RedirectOp {
    Input,  // <
    Output, // >
    Append, // >>
}

impl RedirectOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectOp::Input => "<",
            RedirectOp::Output => ">",
            RedirectOp::Append => ">>",
        }
    }
}

/// 一个词法单元：种类加上它在输入中的 `[start, end)` 字节区间
#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// 跳过前导空白，判断下一个字符是否属于 `toks`，不消费任何词法单元
    pub fn peek(&mut self, toks: &str) -> bool {
        self.skip_whitespace();
        match self.peek_byte() {
            Some(b) => toks.as_bytes().contains(&b),
            None => false,
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let start = self.pos;

        let kind = match self.peek_byte() {
            None => TokenKind::EOF,
            Some(b) => match b {
                b'|' => {
                    self.pos += 1;
                    TokenKind::Pipe
                }
                b';' => {
                    self.pos += 1;
                    TokenKind::Semi
                }
                b'&' => {
                    self.pos += 1;
                    TokenKind::Background
                }
                b'<' => {
                    self.pos += 1;
                    TokenKind::Redirect(RedirectOp::Input)
                }
                b'>' => {
                    self.pos += 1;
                    if self.peek_byte() == Some(b'>') {
                        self.pos += 1;
                        TokenKind::Redirect(RedirectOp::Append)
                    } else {
                        TokenKind::Redirect(RedirectOp::Output)
                    }
                }
                _ => {
                    self.read_word();
                    TokenKind::Word
                }
            },
        };
        let end = self.pos;

        // 词法单元之后的空白也一并吃掉
        self.skip_whitespace();

        Token {
            kind,
            span: start..end,
        }
    }

    /// 取出某个区间对应的原始文本
    pub fn text(&self, span: &Range<usize>) -> &'a str {
        &self.input[span.clone()]
    }

    /// 尚未消费的剩余输入
    pub fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek_byte() {
            if !WHITESPACE.contains(&b) {
                break;
            }
            self.pos += 1;
        }
    }

    fn read_word(&mut self) {
        // 分隔符都是 ASCII，因此停下的位置必然落在 UTF-8 字符边界上
        while let Some(b) = self.peek_byte() {
            if WHITESPACE.contains(&b) || SYMBOLS.contains(&b) {
                break;
            }
            self.pos += 1;
        }
    }
}
