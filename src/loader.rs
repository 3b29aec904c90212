// パス: src/loader.rs
// 役割: ビルド済みユニットを開き、呼び出し形に応じてエントリポイントを実行する
// 意図: 環境を受け渡し形式で貸し出し、戻ってきた値を環境へ取り込む
// 関連ファイル: unit_runtime/src/lib.rs, src/env.rs, src/repl/session.rs
//! ユニットは Rust ABI の関数をそのまま公開しており、安定 ABI はない。
//! ホストと同じ rustc でビルドされていることが前提になる。
//!
//! 環境の値はユニット内のコード（drop やトレイトオブジェクトの vtable）を参照し続けるため、
//! ライブラリは一度開いたら閉じない。

use std::path::Path;

use libloading::{Library, Symbol};
use thiserror::Error;
use unit_runtime::{
    BindingFn, EntryShape, FallibleFn, LocalsFn, PlainFn, ENTRY_SYMBOL, SHAPE_SYMBOL,
};

use crate::env::Environment;
use crate::witness::TypeWitness;

/// ユニットを開けない、または規約どおりのシンボルを持たない。セッションは終了する。
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("ライブラリ `{path}` を開けません: {source}")]
    Open {
        path: String,
        #[source]
        source: libloading::Error,
    },
    #[error("シンボル `{symbol}` が見つかりません: {source}")]
    MissingSymbol {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },
    #[error("未知の呼び出し形タグです: {0}")]
    UnsupportedShape(u32),
}

#[derive(Clone, Copy)]
enum UnitEntry {
    Plain(PlainFn),
    Fallible(FallibleFn),
    Locals(LocalsFn),
    Binding(BindingFn),
}

/// 開いたユニット。`run` で一度だけ実行できる。
pub struct LoadedUnit {
    lib: Library,
    entry: UnitEntry,
}

/// 実行結果。`user_error` は文が返した失敗（またはパニック）のメッセージ。
#[derive(Debug)]
pub struct RunOutcome {
    pub env: Environment,
    pub user_error: Option<String>,
}

impl LoadedUnit {
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let lib = unsafe { Library::new(path) }.map_err(|source| LoadError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let tag = unsafe {
            let sym: Symbol<*const u32> =
                lib.get(SHAPE_SYMBOL.as_bytes())
                    .map_err(|source| LoadError::MissingSymbol {
                        symbol: SHAPE_SYMBOL,
                        source,
                    })?;
            **sym
        };
        let shape = EntryShape::from_tag(tag).ok_or(LoadError::UnsupportedShape(tag))?;
        let entry = unsafe {
            match shape {
                EntryShape::Plain => UnitEntry::Plain(*entry_symbol::<PlainFn>(&lib)?),
                EntryShape::Fallible => UnitEntry::Fallible(*entry_symbol::<FallibleFn>(&lib)?),
                EntryShape::Locals => UnitEntry::Locals(*entry_symbol::<LocalsFn>(&lib)?),
                EntryShape::Binding => UnitEntry::Binding(*entry_symbol::<BindingFn>(&lib)?),
            }
        };
        tracing::debug!(path = %path.display(), ?shape, "unit loaded");
        Ok(Self { lib, entry })
    }

    pub fn shape(&self) -> EntryShape {
        match self.entry {
            UnitEntry::Plain(_) => EntryShape::Plain,
            UnitEntry::Fallible(_) => EntryShape::Fallible,
            UnitEntry::Locals(_) => EntryShape::Locals,
            UnitEntry::Binding(_) => EntryShape::Binding,
        }
    }

    /// エントリポイントを実行し、更新後の環境を返す。
    ///
    /// `Plain` と `Fallible` は環境に触れない。`Locals` はユニットがその場で書き戻し、
    /// `Binding` は返された名前と値の組を環境へ追加する。
    /// パニックはユニット側で捕まえる前提で、ここでは扱わない。
    pub fn run(self, env: Environment) -> RunOutcome {
        let LoadedUnit { lib, entry } = self;
        let outcome = match entry {
            UnitEntry::Plain(f) => {
                f();
                RunOutcome {
                    env,
                    user_error: None,
                }
            }
            UnitEntry::Fallible(f) => RunOutcome {
                env,
                user_error: f().err().map(|e| e.to_string()),
            },
            UnitEntry::Locals(f) => {
                let mut locals = env.into_locals();
                let result = f(&mut locals);
                RunOutcome {
                    env: Environment::from_locals(locals),
                    user_error: result.err().map(|e| e.to_string()),
                }
            }
            UnitEntry::Binding(f) => {
                let mut locals = env.into_locals();
                let result = f(&mut locals);
                let mut env = Environment::from_locals(locals);
                let user_error = match result {
                    Ok(Some((name, (ty, value)))) => {
                        env.set(name, TypeWitness::from_type_name(ty), value);
                        None
                    }
                    Ok(None) => None,
                    Err(e) => Some(e.to_string()),
                };
                RunOutcome { env, user_error }
            }
        };
        std::mem::forget(lib);
        outcome
    }
}

unsafe fn entry_symbol<T>(lib: &Library) -> Result<Symbol<'_, T>, LoadError> {
    lib.get(ENTRY_SYMBOL.as_bytes())
        .map_err(|source| LoadError::MissingSymbol {
            symbol: ENTRY_SYMBOL,
            source,
        })
}

/// ユニットを開いて実行する。
pub fn load_and_run(path: &Path, env: Environment) -> Result<RunOutcome, LoadError> {
    Ok(LoadedUnit::open(path)?.run(env))
}

#[cfg(test)]
mod tests {
    use super::{load_and_run, LoadError};
    use crate::env::Environment;

    #[test]
    fn missing_library_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("librepl_unit.so");
        let err = load_and_run(&path, Environment::new()).unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
        assert!(err.to_string().contains("librepl_unit.so"));
    }

    #[test]
    /// 共有ライブラリでないファイルも開けない。
    fn garbage_file_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("librepl_unit.so");
        std::fs::write(&path, b"not a library").unwrap();
        assert!(matches!(
            load_and_run(&path, Environment::new()),
            Err(LoadError::Open { .. })
        ));
    }
}
