// パス: src/repl/cmd.rs
// 役割: 入力ループとメタコマンドの解釈
// 意図: 行の読み込み・終了判定・表示をセッション処理から切り離す
// 関連ファイル: src/repl/session.rs, src/repl/printer.rs, src/bin/dynrepl.rs
//! 1 行 = 1 文。空行か EOF で終了する。
//! `:` で始まる行（`::` で始まるパスを除く）はメタコマンドとして扱う。

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;

use crate::config::ReplConfig;
use crate::errors::ReplError;
use crate::toolchain::{matches_host, probe_version, HOST_RUSTC_VERSION};

use super::printer::{render_help, write_env, write_source, BANNER, GOODBYE};
use super::session::Session;

/// 入力元から 1 行読んだ結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResult {
    /// 改行を含むことがある 1 行。最後の行は改行なしで届く。
    Line(String),
    Eof,
}

/// 行の供給元。端末以外（テストのスクリプト）からも駆動できるようにする。
pub trait ReplLineSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult>;
}

/// 標準入力から読み、プロンプトを標準出力へ書く。
#[derive(Debug, Default)]
pub struct StdinSource;

impl ReplLineSource for StdinSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadResult> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(ReadResult::Eof);
        }
        Ok(ReadResult::Line(line))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MetaCommand {
    Help,
    Env,
    Source,
    Unknown(String),
}

/// メタコマンドなら解釈結果を返す。Rust の文なら `None`。
pub(crate) fn parse_meta_command(input: &str) -> Option<MetaCommand> {
    let s = input.trim();
    if !s.starts_with(':') || s.starts_with("::") {
        return None;
    }
    Some(match s {
        ":help" | ":h" => MetaCommand::Help,
        ":env" => MetaCommand::Env,
        ":source" => MetaCommand::Source,
        other => MetaCommand::Unknown(other.to_string()),
    })
}

/// 対話セッションを開始し、終了コードを返す。
pub fn run_repl(config: &ReplConfig) -> ExitCode {
    let mut out = io::stdout();
    let mut err = io::stderr();
    let _ = writeln!(out, "{}", BANNER);
    if config.check_toolchain {
        let _ = check_toolchain(&config.rustc, &mut out);
    }
    let mut session = Session::from_config(config);
    let mut source = StdinSource;
    match run_repl_with(&mut source, &mut session, &config.prompt, &mut out, &mut err) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "session aborted");
            let _ = writeln!(err, "{}", e);
            ExitCode::FAILURE
        }
    }
}

/// PATH 上（または設定）の rustc がホストをビルドしたものと同じか確かめ、違えば警告する。
pub(crate) fn check_toolchain<W: Write>(program: &Path, out: &mut W) -> io::Result<()> {
    if HOST_RUSTC_VERSION.is_empty() {
        return Ok(());
    }
    match probe_version(program) {
        Ok(version) if matches_host(&version) => Ok(()),
        Ok(version) => {
            tracing::warn!(found = %version, host = HOST_RUSTC_VERSION, "rustc version mismatch");
            writeln!(
                out,
                "警告: {} は `{}` ですが、dynrepl は `{}` でビルドされています。ユニットをロードできない可能性があります。",
                program.display(),
                version,
                HOST_RUSTC_VERSION
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "rustc probe failed");
            writeln!(out, "警告: {}", e)
        }
    }
}

/// 入力が尽きるか空行が来るまで文を実行し続ける。
///
/// 入力の読み込み失敗と致命的なセッションエラーは `Err` で返す。
pub fn run_repl_with<S, O, E>(
    source: &mut S,
    session: &mut Session,
    prompt: &str,
    out: &mut O,
    err: &mut E,
) -> Result<(), ReplError>
where
    S: ReplLineSource,
    O: Write + Send,
    E: Write + Send,
{
    loop {
        out.flush()?;
        let line = match source.read_line(prompt).map_err(ReplError::Input)? {
            ReadResult::Line(line) => line,
            ReadResult::Eof => {
                writeln!(out)?;
                writeln!(out, "{}", GOODBYE)?;
                return Ok(());
            }
        };
        let statement = line.trim_end_matches(&['\r', '\n'][..]);
        if statement.trim().is_empty() {
            writeln!(out, "{}", GOODBYE)?;
            return Ok(());
        }

        match parse_meta_command(statement) {
            Some(MetaCommand::Help) => render_help(out)?,
            Some(MetaCommand::Env) => write_env(out, session.env())?,
            Some(MetaCommand::Source) => write_source(out, session.last_source())?,
            Some(MetaCommand::Unknown(cmd)) => {
                writeln!(out, "不明なコマンドです: {} (:help で一覧)", cmd)?
            }
            None => {
                let iteration = session.run_statement(statement, out, err)?;
                tracing::debug!(?iteration, "iteration finished");
            }
        }
        writeln!(out)?;
    }
}
