use log::debug;

use super::ast::Node;
use super::error::ParseError;
use super::lexer::{Lexer, RedirectOp, TokenKind};

/// 单条命令允许的最大参数个数
pub const MAXARGS: usize = 10;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

/// 解析一整行输入
pub fn parse(input: &str) -> Result<Node, ParseError> {
    Parser::new(input).parse()
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser {
            lexer: Lexer::new(input),
        }
    }

    pub fn parse(mut self) -> Result<Node, ParseError> {
        let node = self.parse_line()?;

        // 去掉行尾空白后必须已经读完
        self.lexer.peek("");
        if !self.lexer.is_at_end() {
            return Err(ParseError::Leftovers {
                rest: self.lexer.rest().to_string(),
            });
        }

        debug!("解析完成: {}", node);
        Ok(node)
    }

    fn parse_line(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_pipe()?;

        while self.lexer.peek("&") {
            self.lexer.next_token();
            node = Node::background(node);
        }

        if self.lexer.peek(";") {
            self.lexer.next_token();
            let rest = self.parse_line()?;
            node = Node::sequence(node, rest);
        }

        Ok(node)
    }

    fn parse_pipe(&mut self) -> Result<Node, ParseError> {
        let node = self.parse_exec()?;

        if self.lexer.peek("|") {
            self.lexer.next_token();
            let right = self.parse_pipe()?;
            return Ok(Node::pipe(node, right));
        }

        Ok(node)
    }

    fn parse_exec(&mut self) -> Result<Node, ParseError> {
        let near = self.lexer.rest().to_string();
        let mut argv: Vec<String> = Vec::new();
        let mut redirs = self.parse_redirs()?;

        while !self.lexer.peek("|)&;") {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::EOF => break,
                TokenKind::Word => {}
                _ => {
                    return Err(ParseError::Syntax {
                        near: self.lexer.text(&token.span).to_string(),
                    })
                }
            }

            let word = self.lexer.text(&token.span);
            if argv.is_empty() && word == "exit" {
                return Err(ParseError::Exit);
            }
            if argv.len() >= MAXARGS {
                return Err(ParseError::TooManyArgs { max: MAXARGS });
            }
            argv.push(word.to_string());

            redirs.extend(self.parse_redirs()?);
        }

        if argv.is_empty() {
            return Err(ParseError::EmptyCommand { near });
        }

        // 先解析到的重定向包在最里层
        let node = redirs
            .into_iter()
            .fold(Node::exec(argv), |cmd, (op, file)| {
                Node::redirect(cmd, file, op)
            });
        Ok(node)
    }

    fn parse_redirs(&mut self) -> Result<Vec<(RedirectOp, String)>, ParseError> {
        let mut redirs = Vec::new();

        while self.lexer.peek("<>") {
            let token = self.lexer.next_token();
            let TokenKind::Redirect(op) = token.kind else {
                return Err(ParseError::Syntax {
                    near: self.lexer.text(&token.span).to_string(),
                });
            };

            let target = self.lexer.next_token();
            if target.kind != TokenKind::Word {
                return Err(ParseError::MissingRedirectTarget { op: op.as_str() });
            }
            redirs.push((op, self.lexer.text(&target.span).to_string()));
        }

        Ok(redirs)
    }
}
