// パス: src/toolchain.rs
// 役割: 生成ユニットを外部の rustc で動的ライブラリへビルドする
// 意図: コンパイラの出力をプレフィックス付きで中継し、成否と成果物パスを返す
// 関連ファイル: src/relay.rs, src/repl/session.rs, build.rs

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use target_lexicon::{BinaryFormat, HOST};
use thiserror::Error;

use crate::relay::PrefixWriter;

/// ユニットのクレート名。成果物のファイル名にも使われる。
pub const UNIT_CRATE_NAME: &str = "repl_unit";

/// このバイナリをビルドした rustc の `rustc -V` 出力。
pub const HOST_RUSTC_VERSION: &str = env!("DYNREPL_HOST_RUSTC");

/// ビルドドライバのエラー。いずれもセッションを終了させない。
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("コンパイラ `{program}` を起動できません: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("コンパイラの終了を待てませんでした: {0}")]
    Wait(#[source] io::Error),
    #[error("コンパイラ出力の中継に失敗しました: {0}")]
    Relay(#[source] io::Error),
}

/// 1 回のビルドの結果。
#[derive(Debug)]
pub struct BuildOutcome {
    pub artifact: PathBuf,
    pub status: ExitStatus,
}

impl BuildOutcome {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// ホストのバイナリ形式に合わせた成果物のファイル名。
pub fn artifact_file_name() -> String {
    match HOST.binary_format {
        BinaryFormat::Macho => format!("lib{UNIT_CRATE_NAME}.dylib"),
        BinaryFormat::Coff => format!("{UNIT_CRATE_NAME}.dll"),
        _ => format!("lib{UNIT_CRATE_NAME}.so"),
    }
}

pub fn artifact_path(dir: &Path) -> PathBuf {
    dir.join(artifact_file_name())
}

#[derive(Clone, Debug)]
pub struct BuildDriver {
    program: PathBuf,
    prefix: String,
}

impl BuildDriver {
    pub fn new(program: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            prefix: prefix.into(),
        }
    }

    /// `source` を `artifact` へビルドするコマンド（標準入出力は未設定）。
    pub fn command(&self, source: &Path, artifact: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--edition")
            .arg("2021")
            .arg("--crate-type")
            .arg("cdylib")
            .arg("--crate-name")
            .arg(UNIT_CRATE_NAME)
            .arg("-C")
            .arg("opt-level=0")
            .arg("-o")
            .arg(artifact)
            .arg(source);
        cmd
    }

    /// ビルドし、コンパイラの出力をプロセスの stdout/stderr へ中継する。
    pub fn build(&self, source: &Path) -> Result<BuildOutcome, ToolchainError> {
        self.build_with(source, &mut io::stdout(), &mut io::stderr())
    }

    /// ビルドし、コンパイラの stdout/stderr をそれぞれ `out`/`err` へ中継する。
    ///
    /// 成果物は `source` と同じディレクトリに置かれる。
    /// 終了コードが非ゼロでも `Ok` を返し、成否は `BuildOutcome::success` で判定する。
    pub fn build_with<O, E>(
        &self,
        source: &Path,
        out: &mut O,
        err: &mut E,
    ) -> Result<BuildOutcome, ToolchainError>
    where
        O: Write + Send,
        E: Write + Send,
    {
        let dir = source.parent().unwrap_or_else(|| Path::new("."));
        let artifact = artifact_path(dir);
        let mut cmd = self.command(source, &artifact);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        tracing::debug!(command = ?cmd, "invoking compiler");

        let mut child = cmd.spawn().map_err(|source| ToolchainError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;
        let child_out = child.stdout.take();
        let child_err = child.stderr.take();
        let prefix = self.prefix.as_bytes();

        let (out_result, err_result) = thread::scope(|s| {
            let out_handle = s.spawn(move || relay(child_out, prefix, out));
            let err_handle = s.spawn(move || relay(child_err, prefix, err));
            (join_relay(out_handle), join_relay(err_handle))
        });
        let status = child.wait().map_err(ToolchainError::Wait)?;
        out_result.map_err(ToolchainError::Relay)?;
        err_result.map_err(ToolchainError::Relay)?;

        tracing::debug!(%status, artifact = %artifact.display(), "compiler finished");
        Ok(BuildOutcome { artifact, status })
    }
}

fn relay<R: Read, W: Write>(pipe: Option<R>, prefix: &[u8], sink: &mut W) -> io::Result<()> {
    let Some(mut pipe) = pipe else {
        return Ok(());
    };
    let mut writer = PrefixWriter::new(prefix, sink);
    io::copy(&mut pipe, &mut writer)?;
    writer.flush()
}

fn join_relay(handle: thread::ScopedJoinHandle<'_, io::Result<()>>) -> io::Result<()> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "relay thread panicked")))
}

/// `program -V` の出力（前後の空白を除く）を返す。
pub fn probe_version(program: &Path) -> Result<String, ToolchainError> {
    let output = Command::new(program)
        .arg("-V")
        .stdin(Stdio::null())
        .output()
        .map_err(|source| ToolchainError::Spawn {
            program: program.display().to_string(),
            source,
        })?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// ユニットとホストは同じ rustc でビルドされている必要がある。
pub fn matches_host(version: &str) -> bool {
    version == HOST_RUSTC_VERSION
}

#[cfg(test)]
mod tests {
    use super::{artifact_file_name, artifact_path, BuildDriver, ToolchainError, UNIT_CRATE_NAME};
    use std::path::Path;

    #[test]
    fn artifact_name_uses_unit_crate_name() {
        let name = artifact_file_name();
        assert!(name.contains(UNIT_CRATE_NAME));
        assert!(name.ends_with(".so") || name.ends_with(".dylib") || name.ends_with(".dll"));
        assert_eq!(artifact_path(Path::new("/tmp/x")), Path::new("/tmp/x").join(name));
    }

    #[test]
    fn command_builds_a_cdylib_into_the_artifact_path() {
        let driver = BuildDriver::new("rustc", "#### ");
        let cmd = driver.command(Path::new("/w/unit.rs"), Path::new("/w/out.so"));
        assert_eq!(cmd.get_program(), "rustc");
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "--edition",
                "2021",
                "--crate-type",
                "cdylib",
                "--crate-name",
                "repl_unit",
                "-C",
                "opt-level=0",
                "-o",
                "/w/out.so",
                "/w/unit.rs"
            ]
        );
    }

    #[test]
    /// コンパイラを起動できないのは致命的ではないエラーとして返る。
    fn missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("unit.rs");
        std::fs::write(&source, "").unwrap();
        let driver = BuildDriver::new("/nonexistent/dynrepl-rustc", "#### ");
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let result = driver.build_with(&source, &mut out, &mut err);
        assert!(matches!(result, Err(ToolchainError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    /// 非ゼロ終了はビルド失敗として `Ok` で返り、出力にはプレフィックスが付く。
    fn failing_program_reports_failure_and_relays_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-rustc");
        std::fs::write(&script, "#!/bin/sh\necho out-line\necho err-line >&2\nexit 1\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let source = dir.path().join("unit.rs");
        std::fs::write(&source, "").unwrap();
        let driver = BuildDriver::new(&script, "#### ");
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let outcome = driver.build_with(&source, &mut out, &mut err).unwrap();
        assert!(!outcome.success());
        assert_eq!(String::from_utf8(out).unwrap(), "#### out-line\n");
        assert_eq!(String::from_utf8(err).unwrap(), "#### err-line\n");
    }

    #[cfg(unix)]
    #[test]
    /// 成功したビルドの成果物は入力と同じディレクトリを指す。
    fn successful_build_places_artifact_next_to_source() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-rustc");
        std::fs::write(&script, "#!/bin/sh
exit 0
").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let source = dir.path().join("unit.rs");
        std::fs::write(&source, "").unwrap();
        let outcome = BuildDriver::new(&script, "#### ").build(&source).unwrap();
        assert!(outcome.success());
        assert_eq!(outcome.artifact, artifact_path(dir.path()));
    }
}
