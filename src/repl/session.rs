// パス: src/repl/session.rs
// 役割: 1 つの文を 解析 → 合成 → ビルド → ロード → 実行 の順に処理する
// 意図: 反復ごとの一時ディレクトリと環境の受け渡しを一箇所で管理する
// 関連ファイル: src/analyzer/mod.rs, src/synth.rs, src/toolchain.rs, src/loader.rs

use std::fs;
use std::io::Write;

use crate::analyzer::analyze;
use crate::config::ReplConfig;
use crate::env::Environment;
use crate::errors::ReplError;
use crate::loader::{LoadedUnit, RunOutcome};
use crate::synth::synthesize;
use crate::toolchain::BuildDriver;

const SOURCE_FILE_NAME: &str = "repl_unit.rs";

/// 1 回の反復がどこまで進んだか。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Iteration {
    /// ユニットを実行した（文が失敗値を返した場合も含む）。
    Completed,
    /// 構文エラーでビルドしなかった。
    ParseFailed,
    /// ビルドに失敗した、またはコンパイラを起動できなかった。
    BuildFailed,
}

/// 反復をまたいで保持される REPL の状態。
pub struct Session {
    env: Environment,
    driver: BuildDriver,
    last_source: Option<String>,
}

impl Session {
    pub fn new(driver: BuildDriver) -> Self {
        Self {
            env: Environment::new(),
            driver,
            last_source: None,
        }
    }

    pub fn from_config(config: &ReplConfig) -> Self {
        Self::new(BuildDriver::new(&config.rustc, config.relay_prefix.clone()))
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// 直前に生成した最終ユニットのソース。
    pub fn last_source(&self) -> Option<&str> {
        self.last_source.as_deref()
    }

    /// 文を 1 つ実行する。
    ///
    /// 構文エラー・ビルド失敗・文が返した失敗値は `out` へ報告して `Ok` を返す。
    /// 一時ファイルを用意できない場合とユニットをロードできない場合だけ `Err` になる。
    /// 一時ディレクトリはどの経路でも関数を抜けるときに削除される。
    pub fn run_statement<O, E>(
        &mut self,
        statement: &str,
        out: &mut O,
        err: &mut E,
    ) -> Result<Iteration, ReplError>
    where
        O: Write + Send,
        E: Write + Send,
    {
        let analysis = match analyze(&self.env, statement) {
            Ok(analysis) => analysis,
            Err(e) => {
                writeln!(out, "{}", e)?;
                return Ok(Iteration::ParseFailed);
            }
        };
        for name in &analysis.assumed {
            writeln!(
                out,
                "注意: `{name}` は既知の名前ではないため `use std::{name};` を仮定します"
            )?;
        }

        let unit = synthesize(
            &self.env,
            &analysis.imports,
            statement,
            analysis.binding.as_deref(),
            true,
        );
        tracing::trace!(
            lines = unit.source.lines().count(),
            shape = ?unit.shape,
            "unit synthesized"
        );

        let workspace = tempfile::Builder::new()
            .prefix("dynrepl-")
            .tempdir()
            .map_err(ReplError::Workspace)?;
        let source_path = workspace.path().join(SOURCE_FILE_NAME);
        fs::write(&source_path, &unit.source).map_err(ReplError::Workspace)?;
        self.last_source = Some(unit.source);

        out.flush()?;
        let outcome = match self.driver.build_with(&source_path, out, err) {
            Ok(outcome) => outcome,
            Err(e) => {
                writeln!(out, "{}", e)?;
                return Ok(Iteration::BuildFailed);
            }
        };
        if !outcome.success() {
            writeln!(out, "ビルドに失敗しました（{}）", outcome.status)?;
            return Ok(Iteration::BuildFailed);
        }

        let loaded = LoadedUnit::open(&outcome.artifact)?;
        let RunOutcome { env, user_error } = loaded.run(std::mem::take(&mut self.env));
        self.env = env;
        if let Some(message) = user_error {
            writeln!(out, "エラー: {}", message)?;
        }
        Ok(Iteration::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::{Iteration, Session};
    use crate::errors::ReplError;
    use crate::toolchain::BuildDriver;

    fn missing_compiler() -> Session {
        Session::new(BuildDriver::new("/nonexistent/dynrepl-rustc", "#### "))
    }

    fn run(session: &mut Session, stmt: &str) -> (Result<Iteration, ReplError>, String) {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let result = session.run_statement(stmt, &mut out, &mut err);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    /// 構文エラーはビルドせずに報告され、ユニットも生成されない。
    fn parse_error_skips_build() {
        let mut session = missing_compiler();
        let (result, out) = run(&mut session, "let x = ;");
        assert_eq!(result.unwrap(), Iteration::ParseFailed);
        assert!(out.contains("[PARSE001]"));
        assert!(session.last_source().is_none());
    }

    #[test]
    /// コンパイラを起動できなくても反復は継続でき、環境は変わらない。
    fn missing_compiler_is_a_build_failure() {
        let mut session = missing_compiler();
        let (result, out) = run(&mut session, "let x = 5;");
        assert_eq!(result.unwrap(), Iteration::BuildFailed);
        assert!(out.contains("/nonexistent/dynrepl-rustc"));
        assert!(session.env().is_empty());
        let source = session.last_source().unwrap();
        assert!(source.contains("let x = 5;"));
        assert!(source.contains("__repl_put(__repl_locals, \"x\", x);"));
    }

    #[test]
    /// 既知でない名前を仮定したときは注意が表示される。
    fn assumed_imports_are_announced() {
        let mut session = missing_compiler();
        let (_, out) = run(&mut session, "undefined_fn(1);");
        assert!(out.contains("`use std::undefined_fn;`"));
        assert!(session.last_source().unwrap().contains("use std::undefined_fn;"));
    }

    #[cfg(unix)]
    #[test]
    /// ビルドが成功しても成果物をロードできなければ致命的なエラーになる。
    fn unloadable_artifact_is_fatal() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-rustc");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let mut session = Session::new(BuildDriver::new(&script, "#### "));
        let (result, _) = run(&mut session, "1;");
        assert!(matches!(result, Err(ReplError::Load(_))));
    }
}
