// パス: src/config.rs
// 役割: コマンドライン引数・設定ファイル・環境変数から REPL の設定を組み立てる
// 意図: 既定値 < 設定ファイル < 環境変数 < フラグ の順で上書きする
// 関連ファイル: src/bin/dynrepl.rs, src/repl/cmd.rs

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

/// コンパイラのパスを上書きする環境変数。
pub const RUSTC_ENV: &str = "DYNREPL_RUSTC";
/// 設定ファイルのパスを指定する環境変数。
pub const CONFIG_ENV: &str = "DYNREPL_CONFIG";

/// dynrepl: 文ごとに動的ライブラリへコンパイルして実行する Rust の REPL
#[derive(Debug, Default, Parser)]
#[command(name = "dynrepl", version, about)]
pub struct Cli {
    /// JSON 形式の設定ファイル
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// ユニットのビルドに使う rustc
    #[arg(long, value_name = "PATH")]
    pub rustc: Option<PathBuf>,

    /// 入力プロンプト
    #[arg(long)]
    pub prompt: Option<String>,

    /// コンパイラ出力の各行に付けるプレフィックス
    #[arg(long, value_name = "TEXT")]
    pub relay_prefix: Option<String>,

    /// 起動時の rustc バージョン照合を行わない
    #[arg(long)]
    pub no_toolchain_check: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplConfig {
    pub rustc: PathBuf,
    pub prompt: String,
    pub relay_prefix: String,
    pub check_toolchain: bool,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            rustc: PathBuf::from("rustc"),
            prompt: "> ".to_string(),
            relay_prefix: "#### ".to_string(),
            check_toolchain: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("設定ファイル `{path}` を読み込めません: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("設定ファイル `{path}` の形式が不正です: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ReplConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// プロセスの環境変数を使って設定を解決する。
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        Self::resolve_with(cli, |key| std::env::var(key).ok())
    }

    /// 環境変数の参照先を差し替えられる `resolve`。
    pub fn resolve_with<F>(cli: &Cli, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = cli
            .config
            .clone()
            .or_else(|| env(CONFIG_ENV).map(PathBuf::from));
        let mut config = match &file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(rustc) = env(RUSTC_ENV).filter(|v| !v.is_empty()) {
            config.rustc = PathBuf::from(rustc);
        }
        if let Some(rustc) = &cli.rustc {
            config.rustc = rustc.clone();
        }
        if let Some(prompt) = &cli.prompt {
            config.prompt = prompt.clone();
        }
        if let Some(prefix) = &cli.relay_prefix {
            config.relay_prefix = prefix.clone();
        }
        if cli.no_toolchain_check {
            config.check_toolchain = false;
        }
        tracing::debug!(config = ?config, file = ?file, "configuration resolved");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, ConfigError, ReplConfig, CONFIG_ENV, RUSTC_ENV};
    use clap::Parser;
    use std::path::PathBuf;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_without_file_env_or_flags() {
        let config = ReplConfig::resolve_with(&Cli::default(), no_env).unwrap();
        assert_eq!(config, ReplConfig::default());
        assert_eq!(config.prompt, "> ");
        assert_eq!(config.relay_prefix, "#### ");
        assert!(config.check_toolchain);
    }

    #[test]
    /// 設定ファイルの欠けた項目は既定値で補われる。
    fn partial_file_is_filled_with_defaults() {
        let config = ReplConfig::from_json(r#"{ "prompt": "rs> " }"#).unwrap();
        assert_eq!(config.prompt, "rs> ");
        assert_eq!(config.rustc, PathBuf::from("rustc"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(ReplConfig::from_json(r#"{ "colour": true }"#).is_err());
    }

    #[test]
    /// 既定値 < 設定ファイル < 環境変数 < フラグ の順で上書きされる。
    fn precedence_file_env_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dynrepl.json");
        std::fs::write(
            &path,
            r#"{ "rustc": "/file/rustc", "prompt": "file> ", "check_toolchain": true }"#,
        )
        .unwrap();
        let path_str = path.display().to_string();
        let env = move |key: &str| match key {
            k if k == CONFIG_ENV => Some(path_str.clone()),
            k if k == RUSTC_ENV => Some("/env/rustc".to_string()),
            _ => None,
        };

        let cli = Cli::parse_from(["dynrepl"]);
        let config = ReplConfig::resolve_with(&cli, &env).unwrap();
        assert_eq!(config.rustc, PathBuf::from("/env/rustc"));
        assert_eq!(config.prompt, "file> ");

        let cli = Cli::parse_from([
            "dynrepl",
            "--rustc",
            "/flag/rustc",
            "--relay-prefix",
            "| ",
            "--no-toolchain-check",
        ]);
        let config = ReplConfig::resolve_with(&cli, &env).unwrap();
        assert_eq!(config.rustc, PathBuf::from("/flag/rustc"));
        assert_eq!(config.relay_prefix, "| ");
        assert!(!config.check_toolchain);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let cli = Cli::parse_from(["dynrepl", "--config", "/nonexistent/dynrepl.json"]);
        let err = ReplConfig::resolve_with(&cli, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
