// パス: src/repl/printer.rs
// 役割: ヘルプ・環境一覧・生成ソースなど REPL の表示を担う
// 意図: 対話時のメッセージ書式を一箇所にまとめる
// 関連ファイル: src/repl/cmd.rs, src/env.rs

use std::any::Any;
use std::io::{self, Write};

use crate::env::Environment;

pub(crate) const BANNER: &str = "dynrepl :: Rust の文を 1 行ずつ実行します :: :help でヘルプ";
pub(crate) const GOODBYE: &str = "終了します。";

const HELP_TEXT: &str = concat!(
    "利用可能なコマンド:\n",
    "  :help              ヘルプ（本メッセージ）\n",
    "  :env               保持している変数と型の一覧\n",
    "  :source            直前に生成したユニットのソース\n",
    "  （空行 / EOF）     終了\n",
    "\n",
    "それ以外の入力は Rust の文として実行されます。\n",
    "  > let x = 5;\n",
    "  > println!(\"{}\", x * 2)        -- 10 を表示\n",
    "  > let m: HashMap<u8, u8> = HashMap::new();   -- use は自動で補われる\n",
);

/// ヘルプメッセージを任意のライターへ描画する。
pub(crate) fn render_help<W: Write>(out: &mut W) -> io::Result<()> {
    out.write_all(HELP_TEXT.as_bytes())
}

/// 環境のエントリを名前順に一覧表示する。よく使う型は値も表示する。
pub(crate) fn write_env<W: Write>(out: &mut W, env: &Environment) -> io::Result<()> {
    if env.is_empty() {
        return writeln!(out, "（環境は空です）");
    }
    for (name, entry) in env.entries() {
        match describe_value(entry.value()) {
            Some(value) => writeln!(out, "  {}: {} = {}", name, entry.witness(), value)?,
            None => writeln!(out, "  {}: {}", name, entry.witness())?,
        }
    }
    Ok(())
}

pub(crate) fn write_source<W: Write>(out: &mut W, source: Option<&str>) -> io::Result<()> {
    match source {
        Some(src) => out.write_all(src.as_bytes()),
        None => writeln!(out, "（まだユニットを生成していません）"),
    }
}

fn describe_value(value: &dyn Any) -> Option<String> {
    macro_rules! try_debug {
        ($($t:ty),*) => {
            $(
                if let Some(v) = value.downcast_ref::<$t>() {
                    return Some(format!("{:?}", v));
                }
            )*
        };
    }
    try_debug!(
        i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
        String, &'static str
    );
    None
}
