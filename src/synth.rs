// パス: src/synth.rs
// 役割: 入力文をテンプレートで包み、コンパイル可能なユニットのソースを生成する
// 意図: 解析用プローブと最終ビルド用ユニットを同じテンプレートから作る
// 関連ファイル: src/analyzer/mod.rs, src/env.rs, unit_runtime/src/prelude.rs
//! 生成されるユニットの構成:
//! - クレート属性とプレリュード（`unit_runtime::PRELUDE_SOURCE`）
//! - インポート指示（`use ...;`）
//! - シェイプタグ `REPL_ENTRY_SHAPE` とエントリポイント `repl_cmd`
//!
//! 環境を含める場合、入力文は `catch_unwind` で守られたクロージャの中で実行される。
//! `?` やパニックで文が途中で終わっても既存エントリの書き戻しは必ず走る。

use std::fmt::{self, Display, Formatter};

use unit_runtime::{EntryShape, ENTRY_SYMBOL, PRELUDE_SOURCE, SHAPE_SYMBOL};

use crate::env::Environment;

const UNIT_ATTRIBUTES: &str =
    "#![allow(unused, redundant_semicolons, non_snake_case, clippy::all)]";

/// 1 つのインポート指示（`use <path>;`）。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImportDirective {
    path: String,
}

impl ImportDirective {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Display for ImportDirective {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "use {};", self.path)
    }
}

/// 重複のないインポート指示の列。並び順に意味はないが、追加順を保つ。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImportSet {
    directives: Vec<ImportDirective>,
}

impl ImportSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加できた（未登録だった）場合に `true`。
    pub fn insert(&mut self, directive: ImportDirective) -> bool {
        if self.directives.contains(&directive) {
            return false;
        }
        self.directives.push(directive);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImportDirective> {
        self.directives.iter()
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

impl FromIterator<ImportDirective> for ImportSet {
    fn from_iter<I: IntoIterator<Item = ImportDirective>>(iter: I) -> Self {
        let mut set = Self::new();
        for d in iter {
            set.insert(d);
        }
        set
    }
}

/// 生成済みユニット。
#[derive(Clone, Debug)]
pub struct SynthesizedUnit {
    pub source: String,
    pub shape: EntryShape,
    /// 入力文が始まる行（1-origin）。構文エラー位置の変換に使う。
    pub statement_line: usize,
}

/// 行数を数えながらソースを組み立てる。
struct UnitWriter {
    buf: String,
    lines: usize,
}

impl UnitWriter {
    fn new() -> Self {
        Self {
            buf: String::new(),
            lines: 0,
        }
    }

    fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        self.buf.push_str(text);
        self.buf.push('\n');
        self.lines += text.matches('\n').count() + 1;
    }

    fn next_line(&self) -> usize {
        self.lines + 1
    }
}

/// 入力文をテンプレートへ埋め込んだユニットを生成する。
///
/// `include_environment` が偽のときは環境の取り込み・書き戻しを一切含まない
/// 最小のプローブ（`Plain` シェイプ）を返し、`new_binding` は無視される。
/// 真のときは書ける型を持つエントリごとに取り出し文と書き戻し文を生成し、
/// `new_binding` があればその書き戻しを最後に加える（`Locals` シェイプ）。
pub fn synthesize(
    env: &Environment,
    imports: &ImportSet,
    statement: &str,
    new_binding: Option<&str>,
    include_environment: bool,
) -> SynthesizedUnit {
    let shape = if include_environment {
        EntryShape::Locals
    } else {
        EntryShape::Plain
    };
    let mut w = UnitWriter::new();
    w.line(UNIT_ATTRIBUTES);
    w.line("");
    w.line(PRELUDE_SOURCE.trim_end());
    w.line("");
    w.line("// imports");
    for directive in imports.iter() {
        w.line(directive.to_string());
    }
    w.line("");
    w.line("#[no_mangle]");
    w.line(format!("pub static {}: u32 = {};", SHAPE_SYMBOL, shape.tag()));
    w.line("");
    w.line("#[no_mangle]");
    w.line(format!("pub fn {}{} {{", ENTRY_SYMBOL, shape.signature()));

    let statement_line = if include_environment {
        write_locals_body(&mut w, env, statement, new_binding)
    } else {
        let at = w.next_line();
        w.line(statement);
        w.line(";");
        at
    };
    w.line("}");

    SynthesizedUnit {
        source: w.buf,
        shape,
        statement_line,
    }
}

fn write_locals_body(
    w: &mut UnitWriter,
    env: &Environment,
    statement: &str,
    new_binding: Option<&str>,
) -> usize {
    let entries: Vec<(&str, &str)> = env.nameable_entries().collect();

    // 取り出しは全エントリの型確認が済んでから。途中で失敗すると取り出し済みの値が戻らない。
    w.line("    // check locals");
    for (name, ty) in &entries {
        w.line(format!("    __repl_check::<{ty}>(__repl_locals, {name:?})?;"));
    }
    w.line("    // include locals");
    for (name, ty) in &entries {
        w.line(format!(
            "    let mut {name}: {ty} = __repl_take::<{ty}>(__repl_locals, {name:?})?;"
        ));
    }

    w.line("    // command");
    w.line("    let __repl_status = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(");
    w.line("        || -> ::std::result::Result<_, ::std::boxed::Box<dyn ::std::error::Error>> {");
    let at = w.next_line();
    w.line(statement);
    w.line(";");
    match new_binding {
        Some(name) => w.line(format!("            ::std::result::Result::Ok({name})")),
        None => w.line("            ::std::result::Result::Ok(())"),
    }
    w.line("        },");
    w.line("    ))");
    w.line("    .unwrap_or_else(|payload| {");
    w.line("        ::std::result::Result::Err(::std::convert::From::from(__repl_panic_message(payload)))");
    w.line("    });");

    w.line("    // export new and modified locals");
    for (name, _) in &entries {
        w.line(format!("    __repl_put(__repl_locals, {name:?}, {name});"));
    }
    w.line("    let _ = ::std::io::Write::flush(&mut ::std::io::stdout());");
    match new_binding {
        Some(name) => {
            w.line(format!("    let {name} = __repl_status?;"));
            w.line(format!("    __repl_put(__repl_locals, {name:?}, {name});"));
        }
        None => w.line("    __repl_status?;"),
    }
    w.line("    ::std::result::Result::Ok(())");
    at
}
