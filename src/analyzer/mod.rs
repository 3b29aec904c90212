// パス: src/analyzer/mod.rs
// 役割: 入力文から新しい束縛名と必要なインポートを発見する
// 意図: 文をプローブユニットへ包んで syn で構文解析し、ビルド前に情報を集める
// 関連ファイル: src/analyzer/resolver.rs, src/analyzer/std_paths.rs, src/synth.rs
//! 解析は 2 段階で行う。
//! 1. 環境を含まないプローブを解析し、文が単一の名前を束縛する `let` かを調べる。
//! 2. 環境と束縛の書き戻しまで含めたプローブ全体を解析し、どこでも束縛されていない
//!    識別子を集めて `use` 指示へ写像する。
//!
//! どちらのプローブもインポートを含まない。

pub mod resolver;
pub mod std_paths;

use syn::{Block, Item, Pat, Stmt};
use unit_runtime::ENTRY_SYMBOL;

use crate::env::Environment;
use crate::errors::ParseError;
use crate::synth::{synthesize, ImportSet, SynthesizedUnit};

use self::std_paths::{directive_for, ImportOrigin};

/// 1 つの入力文に対する解析結果。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Analysis {
    /// 文が導入する新しい変数名。
    pub binding: Option<String>,
    /// 未解決だった識別子（発見順・重複なし）。
    pub unresolved: Vec<String>,
    /// 最終ユニットに含めるインポート指示。
    pub imports: ImportSet,
    /// 既知の名前ではなく `std::<名前>` と仮定したもの。
    pub assumed: Vec<String>,
}

/// 入力文を解析する。構文エラーは入力文基準の位置付きで返す。
pub fn analyze(env: &Environment, statement: &str) -> Result<Analysis, ParseError> {
    let binding = discover_binding(env, statement)?;
    let unresolved = discover_unresolved(env, statement, binding.as_deref())?;

    let mut imports = ImportSet::new();
    let mut assumed = Vec::new();
    for name in &unresolved {
        let (directive, origin) = directive_for(name);
        if origin == ImportOrigin::Assumed {
            assumed.push(name.clone());
        }
        imports.insert(directive);
    }
    tracing::debug!(
        binding = ?binding,
        unresolved = ?unresolved,
        imports = imports.len(),
        "analyzed statement"
    );
    Ok(Analysis {
        binding,
        unresolved,
        imports,
        assumed,
    })
}

/// 文が「初期化子付きで単一の識別子を束縛する `let`」なら、その名前を返す。
///
/// タプルや構造体の分解、`ref` 束縛、初期化子のない `let` は新しいエントリを作らない。
pub fn discover_binding(env: &Environment, statement: &str) -> Result<Option<String>, ParseError> {
    let probe = synthesize(env, &ImportSet::new(), statement, None, false);
    let file = parse_probe(&probe, statement)?;
    Ok(entry_body(&file)
        .and_then(|body| body.stmts.first())
        .and_then(binding_of))
}

/// 環境込みのプローブ全体で、どこでも束縛されていない識別子を集める。
pub fn discover_unresolved(
    env: &Environment,
    statement: &str,
    binding: Option<&str>,
) -> Result<Vec<String>, ParseError> {
    let probe = synthesize(env, &ImportSet::new(), statement, binding, true);
    let file = parse_probe(&probe, statement)?;
    Ok(resolver::unresolved_names(&file))
}

fn parse_probe(probe: &SynthesizedUnit, statement: &str) -> Result<syn::File, ParseError> {
    syn::parse_file(&probe.source)
        .map_err(|err| ParseError::from_syn(&err, statement, probe.statement_line))
}

fn entry_body(file: &syn::File) -> Option<&Block> {
    file.items.iter().find_map(|item| match item {
        Item::Fn(f) if f.sig.ident == ENTRY_SYMBOL => Some(f.block.as_ref()),
        _ => None,
    })
}

fn binding_of(stmt: &Stmt) -> Option<String> {
    let Stmt::Local(local) = stmt else {
        return None;
    };
    local.init.as_ref()?;
    single_ident(&local.pat)
}

fn single_ident(pat: &Pat) -> Option<String> {
    match pat {
        Pat::Ident(p) if p.subpat.is_none() && p.by_ref.is_none() => Some(p.ident.to_string()),
        Pat::Type(t) => single_ident(&t.pat),
        _ => None,
    }
}
