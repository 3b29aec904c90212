// パス: src/lib.rs
// 役割: クレートルート。モジュールの配線と再公開
// 意図: REPL のパイプライン部品を個別に利用・テストできるよう公開する
// 関連ファイル: src/repl/mod.rs, src/bin/dynrepl.rs, unit_runtime/src/lib.rs
//! dynrepl ルートモジュール
//!
//! 入力された Rust の文を 1 つずつ動的ライブラリへコンパイルし、
//! 実行中のプロセスへロードして実行する REPL。
//!
//! パイプライン（依存の葉から順に）:
//! - `env`: 反復をまたいで保持する型消去済みの変数環境
//! - `synth`: 文をテンプレートへ埋め込みユニットのソースを生成
//! - `analyzer`: 新しい束縛名と必要なインポートの発見
//! - `toolchain`: rustc によるビルドと出力の中継
//! - `loader`: ユニットのロードとエントリポイントの呼び出し

pub mod analyzer;
pub mod config;
pub mod env;
pub mod errors;
pub mod loader;
pub mod relay;
pub mod repl;
pub mod synth;
pub mod toolchain;
pub mod witness;

pub use crate::analyzer::{analyze, Analysis};
pub use crate::config::{Cli, ReplConfig};
pub use crate::env::Environment;
pub use crate::errors::{ParseError, ReplError};
pub use crate::synth::{synthesize, ImportDirective, ImportSet, SynthesizedUnit};
