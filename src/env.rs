// パス: src/env.rs
// 役割: 反復をまたいで保持する型消去済みの変数環境
// 意図: 値と型の証拠を組で保存し、ユニットとの受け渡し形式へ相互変換する
// 関連ファイル: src/witness.rs, src/synth.rs, src/loader.rs, unit_runtime/src/prelude.rs
//! 環境は名前順に並ぶ。合成されるユニットの取り出し/書き戻し文の順序を安定させるため。
//! 上限や追い出しはない（長いセッションでは単調に増える）。

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use unit_runtime::Locals;

use crate::witness::TypeWitness;

/// 1 つの変数: 型の証拠と型消去された値。
pub struct Entry {
    witness: TypeWitness,
    value: Box<dyn Any>,
}

impl Entry {
    pub fn witness(&self) -> &TypeWitness {
        &self.witness
    }

    pub fn value(&self) -> &dyn Any {
        self.value.as_ref()
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("witness", &self.witness)
            .finish_non_exhaustive()
    }
}

/// セッション全体で共有される変数環境。
#[derive(Debug, Default)]
pub struct Environment {
    entries: BTreeMap<String, Entry>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// 値を登録する。同名のエントリがあれば型ごと上書きする。
    pub fn set(&mut self, name: impl Into<String>, witness: TypeWitness, value: Box<dyn Any>) {
        self.entries.insert(name.into(), Entry { witness, value });
    }

    /// ホスト側の値を直接登録する（型名は `type_name` から取る）。
    pub fn insert_value<T: Any>(&mut self, name: impl Into<String>, value: T) {
        let witness = TypeWitness::from_type_name(std::any::type_name::<T>());
        self.set(name, witness, Box::new(value));
    }

    pub fn downcast_ref<T: Any>(&self, name: &str) -> Option<&T> {
        self.entries.get(name)?.value.downcast_ref::<T>()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 生成ソースに書ける（型パスがある）エントリだけを返す。
    pub fn nameable_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.witness.path().map(|p| (k.as_str(), p)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// すべてのエントリをユニットへの受け渡し形式へ移す。
    pub fn into_locals(self) -> Locals {
        self.entries
            .into_iter()
            .map(|(name, entry)| (name, (entry.witness.raw().to_string(), entry.value)))
            .collect()
    }

    /// ユニットから戻ってきた受け渡し形式を取り込む。
    pub fn absorb(&mut self, locals: Locals) {
        for (name, (raw, value)) in locals {
            self.set(name, TypeWitness::from_type_name(raw), value);
        }
    }

    pub fn from_locals(locals: Locals) -> Self {
        let mut env = Self::new();
        env.absorb(locals);
        env
    }
}
