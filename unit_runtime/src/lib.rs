//! dynrepl unit runtime
//!
//! ホスト（REPL 本体）と、対話入力ごとに生成・ビルドされる動的ライブラリ
//! （ユニット）の間の受け渡し規約をまとめた crate。
//! ユニットは単独の `rustc` 呼び出しでビルドされ本 crate へリンクできないため、
//! 共有すべき定義は `prelude.rs` にテキストとして置き、ユニットの先頭へ埋め込む。
//! 同じファイルをここでもモジュールとしてコンパイルし、ホスト側の型と一致させる。

#[allow(dead_code)]
mod prelude;

pub use prelude::{
    BindingOutcome, Locals, Outcome, Slot, __repl_check, __repl_panic_message, __repl_put,
    __repl_slot, __repl_take,
};

/// ユニットの先頭へ埋め込む補助定義のソース。
pub const PRELUDE_SOURCE: &str = include_str!("prelude.rs");

/// ユニットが公開するエントリポイントのシンボル名。
pub const ENTRY_SYMBOL: &str = "repl_cmd";

/// エントリポイントの呼び出し形を示すタグ（`u32` の static）のシンボル名。
pub const SHAPE_SYMBOL: &str = "REPL_ENTRY_SHAPE";

/// 引数なし・戻り値なし。
pub type PlainFn = fn();
/// 引数なしで失敗値を返す。
pub type FallibleFn = fn() -> Outcome;
/// 変数環境を受け取り、その場で書き戻す。
pub type LocalsFn = fn(&mut Locals) -> Outcome;
/// 変数環境を受け取り、新しい名前と値の組を返す。
pub type BindingFn = fn(&mut Locals) -> BindingOutcome;

/// エントリポイントがとりうる呼び出し形。
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryShape {
    Plain = 0,
    Fallible = 1,
    Locals = 2,
    Binding = 3,
}

impl EntryShape {
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Plain),
            1 => Some(Self::Fallible),
            2 => Some(Self::Locals),
            3 => Some(Self::Binding),
            _ => None,
        }
    }

    pub fn tag(self) -> u32 {
        self as u32
    }

    /// ユニット側で `repl_cmd` を宣言するときのシグネチャ（関数名以降）。
    pub fn signature(self) -> &'static str {
        match self {
            Self::Plain => "()",
            Self::Fallible => "() -> Outcome",
            Self::Locals => "(__repl_locals: &mut Locals) -> Outcome",
            Self::Binding => "(__repl_locals: &mut Locals) -> BindingOutcome",
        }
    }

    /// 変数環境を引数に取る形かどうか。
    pub fn takes_locals(self) -> bool {
        matches!(self, Self::Locals | Self::Binding)
    }
}
