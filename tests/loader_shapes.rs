// パス: tests/loader_shapes.rs
// 役割: 手書きユニットで 4 つの呼び出し形とロード失敗を検証する
// 意図: 合成器を通さずにローダーの規約（シンボル名・タグ・受け渡し形式）を確認する
// 関連ファイル: tests/test_support.rs, src/loader.rs, unit_runtime/src/lib.rs

#[path = "test_support.rs"]
mod support;

use dynrepl::env::Environment;
use dynrepl::loader::{load_and_run, LoadError, LoadedUnit};
use dynrepl::synth::{synthesize, ImportSet};
use dynrepl::witness::TypeWitness;
use support::{build_unit, toolchain_ready};
use unit_runtime::{EntryShape, PRELUDE_SOURCE};

fn unit(tag: u32, entry: &str) -> String {
    format!(
        "#![allow(unused)]\n{}\n#[no_mangle]\npub static REPL_ENTRY_SHAPE: u32 = {};\n{}\n",
        PRELUDE_SOURCE, tag, entry
    )
}

#[test]
fn plain_unit_leaves_environment_untouched() {
    if !toolchain_ready() {
        return;
    }
    let (_dir, artifact) = build_unit(&unit(0, "#[no_mangle]\npub fn repl_cmd() {}"));
    let mut env = Environment::new();
    env.insert_value("x", 1i32);
    let loaded = LoadedUnit::open(&artifact).unwrap();
    assert_eq!(loaded.shape(), EntryShape::Plain);
    let outcome = loaded.run(env);
    assert!(outcome.user_error.is_none());
    assert_eq!(outcome.env.downcast_ref::<i32>("x"), Some(&1));
}

#[test]
/// 失敗値は文字列として返され、環境はそのまま残る。
fn fallible_unit_reports_error_text() {
    if !toolchain_ready() {
        return;
    }
    let (_dir, artifact) = build_unit(&unit(
        1,
        "#[no_mangle]\npub fn repl_cmd() -> Outcome { Err(From::from(\"bad input\")) }",
    ));
    let outcome = load_and_run(&artifact, Environment::new()).unwrap();
    assert_eq!(outcome.user_error.as_deref(), Some("bad input"));
}

#[test]
/// 環境を受け取る形は、その場での更新がホストへ戻る。
fn locals_unit_updates_entries_in_place() {
    if !toolchain_ready() {
        return;
    }
    let (_dir, artifact) = build_unit(&unit(
        2,
        r#"#[no_mangle]
pub fn repl_cmd(locals: &mut Locals) -> Outcome {
    let n: i32 = __repl_take::<i32>(locals, "n")?;
    __repl_put(locals, "n", n + 1);
    __repl_put(locals, "label", String::from("set"));
    Ok(())
}"#,
    ));
    let mut env = Environment::new();
    env.insert_value("n", 41i32);
    let outcome = load_and_run(&artifact, env).unwrap();
    assert!(outcome.user_error.is_none());
    assert_eq!(outcome.env.downcast_ref::<i32>("n"), Some(&42));
    assert_eq!(
        outcome.env.get("label").unwrap().witness().path(),
        Some("std::string::String")
    );
}

#[test]
/// 名前と値の組を返す形は、ローダーが環境へ追加する。
fn binding_unit_inserts_returned_pair() {
    if !toolchain_ready() {
        return;
    }
    let (_dir, artifact) = build_unit(&unit(
        3,
        r#"#[no_mangle]
pub fn repl_cmd(locals: &mut Locals) -> BindingOutcome {
    Ok(Some((String::from("answer"), __repl_slot(42u64))))
}"#,
    ));
    let outcome = load_and_run(&artifact, Environment::new()).unwrap();
    assert_eq!(outcome.env.downcast_ref::<u64>("answer"), Some(&42));
    assert_eq!(outcome.env.get("answer").unwrap().witness().path(), Some("u64"));
}

#[test]
/// 取り出す型が記録と異なれば失敗し、値は環境に残る。
fn type_mismatch_is_a_user_error_and_keeps_the_value() {
    if !toolchain_ready() {
        return;
    }
    let (_dir, artifact) = build_unit(&unit(
        2,
        r#"#[no_mangle]
pub fn repl_cmd(locals: &mut Locals) -> Outcome {
    let s: String = __repl_take::<String>(locals, "n")?;
    Ok(())
}"#,
    ));
    let mut env = Environment::new();
    env.insert_value("n", 7i32);
    let outcome = load_and_run(&artifact, env).unwrap();
    assert!(outcome.user_error.unwrap().contains("`n`"));
    assert_eq!(outcome.env.downcast_ref::<i32>("n"), Some(&7));
}

#[test]
/// 後ろのエントリの型が合わなくても、前のエントリは取り出されたまま失われない。
fn failed_extraction_keeps_earlier_entries() {
    if !toolchain_ready() {
        return;
    }
    let mut env = Environment::new();
    env.insert_value("a", 1i32);
    env.set("b", TypeWitness::from_type_name("i32"), Box::new(2u64));
    let synthesized = synthesize(&env, &ImportSet::new(), "a += 1;", None, true);
    let (_dir, artifact) = build_unit(&synthesized.source);
    let outcome = load_and_run(&artifact, env).unwrap();
    assert!(outcome.user_error.unwrap().contains("`b`"));
    assert_eq!(outcome.env.downcast_ref::<i32>("a"), Some(&1));
    assert_eq!(outcome.env.downcast_ref::<u64>("b"), Some(&2));
}

#[test]
fn unknown_shape_tag_is_rejected() {
    if !toolchain_ready() {
        return;
    }
    let (_dir, artifact) = build_unit(&unit(9, "#[no_mangle]\npub fn repl_cmd() {}"));
    assert!(matches!(
        LoadedUnit::open(&artifact),
        Err(LoadError::UnsupportedShape(9))
    ));
}

#[test]
fn missing_entry_point_is_rejected() {
    if !toolchain_ready() {
        return;
    }
    let (_dir, artifact) = build_unit(&unit(0, "pub fn something_else() {}"));
    assert!(matches!(
        LoadedUnit::open(&artifact),
        Err(LoadError::MissingSymbol {
            symbol: "repl_cmd",
            ..
        })
    ));
}
