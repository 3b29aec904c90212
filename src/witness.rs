// パス: src/witness.rs
// 役割: 実行時に記録された型名を、次のユニットで書ける型パスへ正規化する
// 意図: 型消去された環境の値を、後続ユニットで元と同じ具象型として取り出せるようにする
// 関連ファイル: src/env.rs, src/synth.rs, unit_runtime/src/prelude.rs
//! `std::any::type_name` の結果は `alloc::string::String` のように非公開モジュールを
//! 含むことがあるため、既知の公開パスへ書き換えてから `syn` で検査する。
//! 書けない型（クロージャや過去のユニット内で宣言した型）は不透明として扱う。

use std::fmt::{self, Display, Formatter};

use once_cell::sync::Lazy;
use syn::visit::{self, Visit};

/// 単一セグメントで書ける組み込みの型名。
pub const PRIMITIVE_TYPES: &[&str] = &[
    "bool", "char", "str", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32",
    "u64", "u128", "usize", "f32", "f64",
];

// 非公開モジュールを含む型名 → 公開パス。長い（具体的な）ものから適用する。
static PATH_REWRITES: &[(&str, &str)] = &[
    ("std::collections::hash::map::HashMap", "std::collections::HashMap"),
    ("std::collections::hash::set::HashSet", "std::collections::HashSet"),
    ("std::collections::hash::map::RandomState", "std::collections::hash_map::RandomState"),
    ("std::hash::random::RandomState", "std::collections::hash_map::RandomState"),
    ("alloc::collections::btree::map::BTreeMap", "std::collections::BTreeMap"),
    ("alloc::collections::btree::set::BTreeSet", "std::collections::BTreeSet"),
    ("alloc::collections::vec_deque::VecDeque", "std::collections::VecDeque"),
    ("alloc::collections::binary_heap::BinaryHeap", "std::collections::BinaryHeap"),
    ("alloc::collections::linked_list::LinkedList", "std::collections::LinkedList"),
    ("std::sync::poison::mutex::Mutex", "std::sync::Mutex"),
    ("std::sync::poison::rwlock::RwLock", "std::sync::RwLock"),
    ("std::sync::mutex::Mutex", "std::sync::Mutex"),
    ("std::sync::rwlock::RwLock", "std::sync::RwLock"),
    ("std::ffi::os_str::OsString", "std::ffi::OsString"),
    ("alloc::ffi::c_str::CString", "std::ffi::CString"),
    ("core::num::nonzero::", "std::num::"),
    ("core::ops::range::", "std::ops::"),
    ("core::ops::function::", "std::ops::"),
    ("alloc::", "std::"),
    ("core::", "std::"),
];

// 書き換え後に許可するモジュールパス（最後のセグメントを除いた部分）。
static PUBLIC_MODULES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "std",
        "std::any",
        "std::borrow",
        "std::boxed",
        "std::cell",
        "std::char",
        "std::cmp",
        "std::collections",
        "std::collections::hash_map",
        "std::ffi",
        "std::fmt",
        "std::fs",
        "std::io",
        "std::marker",
        "std::net",
        "std::num",
        "std::ops",
        "std::option",
        "std::path",
        "std::process",
        "std::rc",
        "std::result",
        "std::string",
        "std::sync",
        "std::thread",
        "std::time",
        "std::vec",
    ]
});

/// 値とともに記録される型の証拠。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeWitness {
    raw: String,
    path: Option<String>,
}

impl TypeWitness {
    /// ユニットが記録した `type_name` 文字列から証拠を作る。
    pub fn from_type_name(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let path = normalize_type_name(&raw);
        Self { raw, path }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// 生成ソースにそのまま書ける型パス。不透明なら `None`。
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn is_nameable(&self) -> bool {
        self.path.is_some()
    }
}

impl Display for TypeWitness {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(p) => write!(f, "{}", p),
            None => write!(f, "<不透明: {}>", self.raw),
        }
    }
}

/// `type_name` の文字列を公開パスへ書き換え、書ける型なら返す。
pub fn normalize_type_name(raw: &str) -> Option<String> {
    if raw.contains("{{") {
        return None;
    }
    let mut rewritten = raw.to_string();
    for (from, to) in PATH_REWRITES {
        rewritten = replace_path_prefix(&rewritten, from, to);
    }
    let ty: syn::Type = syn::parse_str(&rewritten).ok()?;
    let mut check = NameableCheck { ok: true };
    check.visit_type(&ty);
    check.ok.then_some(rewritten)
}

// 識別子の途中（`myalloc::` など）にはマッチさせない置換。
fn replace_path_prefix(s: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(idx) = rest.find(from) {
        let boundary = rest[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_' || c == ':'));
        out.push_str(&rest[..idx]);
        out.push_str(if boundary { to } else { from });
        rest = &rest[idx + from.len()..];
    }
    out.push_str(rest);
    out
}

struct NameableCheck {
    ok: bool,
}

impl<'ast> Visit<'ast> for NameableCheck {
    fn visit_type_path(&mut self, node: &'ast syn::TypePath) {
        if node.qself.is_some() {
            self.ok = false;
            return;
        }
        visit::visit_type_path(self, node);
    }

    fn visit_path(&mut self, node: &'ast syn::Path) {
        let segments: Vec<String> = node.segments.iter().map(|s| s.ident.to_string()).collect();
        let allowed = match segments.as_slice() {
            [single] => PRIMITIVE_TYPES.iter().any(|p| *p == single.as_str()),
            [module @ .., _] => {
                let module = module.join("::");
                PUBLIC_MODULES.iter().any(|m| *m == module)
            }
            [] => false,
        };
        if !allowed {
            self.ok = false;
        }
        visit::visit_path(self, node);
    }

    fn visit_type_impl_trait(&mut self, _node: &'ast syn::TypeImplTrait) {
        self.ok = false;
    }

    fn visit_type_infer(&mut self, _node: &'ast syn::TypeInfer) {
        self.ok = false;
    }

    fn visit_type_macro(&mut self, _node: &'ast syn::TypeMacro) {
        self.ok = false;
    }

    fn visit_type_never(&mut self, _node: &'ast syn::TypeNever) {
        self.ok = false;
    }
}
