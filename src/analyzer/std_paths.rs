// パス: src/analyzer/std_paths.rs
// 役割: 未解決識別子をインポート指示へ写像するための既知名テーブル
// 意図: プリミティブ・プレリュードを除外し、std のモジュール/代表的な項目を完全パスへ引く
// 関連ファイル: src/analyzer/mod.rs, src/analyzer/resolver.rs, src/witness.rs

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::synth::ImportDirective;
use crate::witness::PRIMITIVE_TYPES;

/// インポート指示がどう決まったか。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportOrigin {
    /// std 直下のモジュール名（`fmt` → `std::fmt`）。
    Module,
    /// よく使う std の項目（`HashMap` → `std::collections::HashMap`）。
    Item,
    /// 既知の名前ではなく、std のモジュールと仮定したもの。
    Assumed,
}

// パスの先頭として常に解決済みとみなす名前。
const PATH_ROOTS: &[&str] = &["std", "core", "self", "Self", "super", "crate"];

static STD_MODULES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "alloc",
        "any",
        "arch",
        "array",
        "ascii",
        "backtrace",
        "borrow",
        "boxed",
        "cell",
        "char",
        "clone",
        "cmp",
        "collections",
        "convert",
        "default",
        "env",
        "error",
        "f32",
        "f64",
        "ffi",
        "fmt",
        "fs",
        "future",
        "hash",
        "hint",
        "io",
        "iter",
        "marker",
        "mem",
        "net",
        "num",
        "ops",
        "option",
        "os",
        "panic",
        "path",
        "pin",
        "prelude",
        "primitive",
        "process",
        "ptr",
        "rc",
        "result",
        "slice",
        "str",
        "string",
        "sync",
        "task",
        "thread",
        "time",
        "vec",
    ]
    .into_iter()
    .collect()
});

static STD_ITEMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("HashMap", "std::collections::HashMap"),
        ("HashSet", "std::collections::HashSet"),
        ("BTreeMap", "std::collections::BTreeMap"),
        ("BTreeSet", "std::collections::BTreeSet"),
        ("VecDeque", "std::collections::VecDeque"),
        ("BinaryHeap", "std::collections::BinaryHeap"),
        ("LinkedList", "std::collections::LinkedList"),
        ("Rc", "std::rc::Rc"),
        ("Arc", "std::sync::Arc"),
        ("Mutex", "std::sync::Mutex"),
        ("RwLock", "std::sync::RwLock"),
        ("mpsc", "std::sync::mpsc"),
        ("Cell", "std::cell::Cell"),
        ("RefCell", "std::cell::RefCell"),
        ("Duration", "std::time::Duration"),
        ("Instant", "std::time::Instant"),
        ("SystemTime", "std::time::SystemTime"),
        ("Path", "std::path::Path"),
        ("PathBuf", "std::path::PathBuf"),
        ("File", "std::fs::File"),
        ("OpenOptions", "std::fs::OpenOptions"),
        ("Ordering", "std::cmp::Ordering"),
        ("Reverse", "std::cmp::Reverse"),
        ("min", "std::cmp::min"),
        ("max", "std::cmp::max"),
        ("Cow", "std::borrow::Cow"),
        ("PhantomData", "std::marker::PhantomData"),
        ("FromStr", "std::str::FromStr"),
        ("Command", "std::process::Command"),
        ("Stdio", "std::process::Stdio"),
        ("Wrapping", "std::num::Wrapping"),
        ("ParseIntError", "std::num::ParseIntError"),
        ("ParseFloatError", "std::num::ParseFloatError"),
        ("Read", "std::io::Read"),
        ("Write", "std::io::Write"),
        ("BufRead", "std::io::BufRead"),
        ("BufReader", "std::io::BufReader"),
        ("BufWriter", "std::io::BufWriter"),
        ("Display", "std::fmt::Display"),
        ("Debug", "std::fmt::Debug"),
        ("Hash", "std::hash::Hash"),
        ("Hasher", "std::hash::Hasher"),
        ("Any", "std::any::Any"),
        ("TypeId", "std::any::TypeId"),
        ("OsString", "std::ffi::OsString"),
        ("CString", "std::ffi::CString"),
        ("Range", "std::ops::Range"),
        ("RangeInclusive", "std::ops::RangeInclusive"),
        ("Peekable", "std::iter::Peekable"),
        ("repeat", "std::iter::repeat"),
        ("once", "std::iter::once"),
        ("swap", "std::mem::swap"),
        ("replace", "std::mem::replace"),
        ("sleep", "std::thread::sleep"),
        ("spawn", "std::thread::spawn"),
    ]
    .into_iter()
    .collect()
});

// Rust 2021 のプレリュードで常に見える名前。
static PRELUDE_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "Copy",
        "Send",
        "Sized",
        "Sync",
        "Unpin",
        "Drop",
        "Fn",
        "FnMut",
        "FnOnce",
        "drop",
        "Box",
        "ToOwned",
        "Clone",
        "PartialEq",
        "PartialOrd",
        "Eq",
        "Ord",
        "AsRef",
        "AsMut",
        "Into",
        "From",
        "Default",
        "Iterator",
        "Extend",
        "IntoIterator",
        "DoubleEndedIterator",
        "ExactSizeIterator",
        "Option",
        "Some",
        "None",
        "Result",
        "Ok",
        "Err",
        "String",
        "ToString",
        "Vec",
        "TryFrom",
        "TryInto",
        "FromIterator",
    ]
    .into_iter()
    .collect()
});

/// 引数が式として書かれるマクロ。中身を解析して識別子を集める。
pub(crate) const EXPR_ARG_MACROS: &[&str] = &[
    "print",
    "println",
    "eprint",
    "eprintln",
    "format",
    "format_args",
    "write",
    "writeln",
    "panic",
    "assert",
    "assert_eq",
    "assert_ne",
    "debug_assert",
    "debug_assert_eq",
    "debug_assert_ne",
    "dbg",
    "vec",
    "todo",
    "unimplemented",
    "unreachable",
];

/// 引数が `式, パターン [if ガード]` の形で書かれるマクロ。
pub(crate) const PATTERN_ARG_MACRO: &str = "matches";

/// パスの先頭・プリミティブ・プレリュードなど、常に解決済みとみなす名前か。
pub fn is_builtin(name: &str) -> bool {
    PATH_ROOTS.iter().any(|r| *r == name)
        || PRIMITIVE_TYPES.iter().any(|p| *p == name)
        || PRELUDE_NAMES.contains(name)
}

/// 未解決識別子 1 つに対応するインポート指示を返す。
pub fn directive_for(name: &str) -> (ImportDirective, ImportOrigin) {
    if STD_MODULES.contains(name) {
        (ImportDirective::new(format!("std::{name}")), ImportOrigin::Module)
    } else if let Some(path) = STD_ITEMS.get(name) {
        (ImportDirective::new(*path), ImportOrigin::Item)
    } else {
        (ImportDirective::new(format!("std::{name}")), ImportOrigin::Assumed)
    }
}
