// パス: src/repl/mod.rs
// 役割: REPL モジュールのファサードと再公開
// 意図: 入力ループとセッション処理を必要最小限の API で公開する
// 関連ファイル: src/repl/cmd.rs, src/repl/session.rs, src/bin/dynrepl.rs
//! - `cmd`: 入力ループとメタコマンド
//! - `session`: 1 文ごとのパイプライン（解析・合成・ビルド・ロード）
//! - `printer`: ユーザー向けの表示

pub mod cmd;
mod printer;
pub mod session;

pub use cmd::{run_repl, run_repl_with, ReadResult, ReplLineSource, StdinSource};
pub use session::{Iteration, Session};
