// パス: src/bin/dynrepl.rs
// 役割: REPL を起動する実行ファイルのエントリポイント
// 意図: ログ初期化と設定解決を済ませてから対話ループへ入る
// 関連ファイル: src/repl/cmd.rs, src/config.rs, src/lib.rs

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

use dynrepl::config::{Cli, ReplConfig};

/// タイムスタンプを出さないタイマー。
struct NoTimestamp;

impl FormatTime for NoTimestamp {
    fn format_time(&self, _w: &mut Writer<'_>) -> std::fmt::Result {
        Ok(())
    }
}

fn main() -> ExitCode {
    // DYNREPL_LOG が設定されているときだけ stderr へログを出す
    if let Ok(filter) = EnvFilter::try_from_env("DYNREPL_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_timer(NoTimestamp)
            .with_writer(std::io::stderr)
            .init();
        tracing::debug!("tracing initialized");
    }

    let cli = Cli::parse();
    let config = match ReplConfig::resolve(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    dynrepl::repl::run_repl(&config)
}
