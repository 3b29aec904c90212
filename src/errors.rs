//! エラー型の定義（共通フォーマット: \[CODE\] メッセージ @line:col）。
//!
//! 文の構文エラーは位置付きの `ParseError` として扱い、
//! セッションを終了させる致命的な失敗は `ReplError` にまとめる。

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::io;

use thiserror::Error;

use crate::loader::LoadError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub msg: String,
    pub line: Option<usize>,     // 入力文の先頭行を 1 とする
    pub col: Option<usize>,      // 1-origin
    pub snippet: Option<String>, // エラー行のスニペット（任意）
}

impl ErrorInfo {
    pub fn new(code: &'static str, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            line: None,
            col: None,
            snippet: None,
        }
    }
    pub fn at(code: &'static str, msg: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            code,
            msg: msg.into(),
            line: Some(line),
            col: Some(col),
            snippet: None,
        }
    }
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (self.line, self.col) {
            (Some(l), Some(c)) => write!(f, "[{}] {} @line={},col={}", self.code, self.msg, l, c)?,
            _ => write!(f, "[{}] {}", self.code, self.msg)?,
        }
        if let (Some(s), Some(c)) = (&self.snippet, self.col) {
            let caret = " ".repeat(c.saturating_sub(1)) + "^";
            write!(f, "\n{}\n{}", s, caret)?;
        }
        Ok(())
    }
}

/// 入力文（またはそれを包んだプローブユニット）の構文エラー。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub ErrorInfo);

impl ParseError {
    pub const CODE: &'static str = "PARSE001";

    pub fn new(msg: impl Into<String>) -> Self {
        Self(ErrorInfo::new(Self::CODE, msg))
    }

    /// `syn` のエラーを入力文基準の位置へ変換する。
    ///
    /// `statement_line` はプローブユニット内で入力文が始まる行（1-origin）。
    /// 入力文の外側を指すエラーは位置なしで報告する。
    pub fn from_syn(err: &syn::Error, statement: &str, statement_line: usize) -> Self {
        let start = err.span().start();
        let lines: Vec<&str> = statement.lines().collect();
        if start.line >= statement_line && start.line - statement_line < lines.len().max(1) {
            let line = start.line - statement_line + 1;
            let col = start.column + 1;
            let snippet = lines.get(line - 1).copied().unwrap_or_default();
            Self(ErrorInfo::at(Self::CODE, err.to_string(), line, col).with_snippet(snippet))
        } else {
            Self::new(err.to_string())
        }
    }

    pub fn info(&self) -> &ErrorInfo {
        &self.0
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
impl StdError for ParseError {}

/// セッションを打ち切る致命的なエラー。
#[derive(Debug, Error)]
pub enum ReplError {
    #[error("入力の読み込みに失敗しました: {0}")]
    Input(#[source] io::Error),
    #[error("一時ファイルを準備できません: {0}")]
    Workspace(#[source] io::Error),
    #[error("生成ユニットのロードに失敗しました: {0}")]
    Load(#[from] LoadError),
    #[error("出力に失敗しました: {0}")]
    Output(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::{ErrorInfo, ParseError};

    #[test]
    /// 位置とスニペットがある場合はキャレット付きで表示される。
    fn display_with_position_and_snippet() {
        let e = ErrorInfo::at("E001", "msg", 3, 5).with_snippet("abcdef");
        assert_eq!(e.to_string(), "[E001] msg @line=3,col=5\nabcdef\n    ^");
    }

    #[test]
    fn display_plain() {
        let e = ErrorInfo::new("E004", "plain");
        assert_eq!(e.to_string(), "[E004] plain");
    }

    #[test]
    /// プローブ内の位置が入力文の行・列へ写像される。
    fn parse_error_maps_probe_position_to_statement() {
        let statement = "let x = ;";
        let probe = format!("fn f() {{\n{}\n}}\n", statement);
        let err = match syn::parse_file(&probe) {
            Ok(_) => panic!("不完全な let が構文解析できてしまった"),
            Err(e) => e,
        };
        let pe = ParseError::from_syn(&err, statement, 2);
        assert_eq!(pe.info().line, Some(1));
        assert_eq!(pe.info().code, ParseError::CODE);
        assert_eq!(pe.info().snippet.as_deref(), Some(statement));
        assert!(pe.to_string().starts_with("[PARSE001]"));
    }
}
