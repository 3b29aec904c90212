// パス: unit_runtime/src/prelude.rs
// 役割: 生成ユニットの先頭へそのまま埋め込まれる補助定義
// 意図: ホストとユニットが同じ受け渡し型・取り出し/書き戻し関数を共有する
// 関連ファイル: unit_runtime/src/lib.rs, src/synth.rs, src/loader.rs
//
// このファイルはユニット側ではクレートルートへテキストとして挿入される。
// 利用者の `use` と衝突しないよう、パスはすべて完全修飾で書く。

/// 1 エントリ分の受け渡し値（型名, 値）。
pub type Slot = (
    ::std::string::String,
    ::std::boxed::Box<dyn ::std::any::Any>,
);

/// ホストとユニットの間で受け渡す変数環境。
pub type Locals = ::std::collections::HashMap<::std::string::String, Slot>;

/// エントリポイントの失敗値。
pub type Outcome = ::std::result::Result<(), ::std::boxed::Box<dyn ::std::error::Error>>;

/// 名前と値の組を返すエントリポイントの戻り値。
pub type BindingOutcome = ::std::result::Result<
    ::std::option::Option<(::std::string::String, Slot)>,
    ::std::boxed::Box<dyn ::std::error::Error>,
>;

/// 値を動かさずに、`name` が記録済みの型 `T` で取り出せるかを確かめる。
///
/// ユニットはすべてのエントリをこれで確かめてから取り出しを始める。
pub fn __repl_check<T: 'static>(
    locals: &Locals,
    name: &str,
) -> ::std::result::Result<(), ::std::boxed::Box<dyn ::std::error::Error>> {
    match locals.get(name) {
        ::std::option::Option::Some((_, value)) if value.is::<T>() => {
            ::std::result::Result::Ok(())
        }
        ::std::option::Option::Some((witness, _)) => {
            ::std::result::Result::Err(__repl_mismatch::<T>(name, witness))
        }
        ::std::option::Option::None => ::std::result::Result::Err(__repl_missing(name)),
    }
}

/// 環境から `name` を取り出し、記録済みの型 `T` として返す。
///
/// 型が一致しない場合は値を環境へ戻したうえで失敗を返す。
pub fn __repl_take<T: 'static>(
    locals: &mut Locals,
    name: &str,
) -> ::std::result::Result<T, ::std::boxed::Box<dyn ::std::error::Error>> {
    match locals.remove(name) {
        ::std::option::Option::Some((witness, value)) => match value.downcast::<T>() {
            ::std::result::Result::Ok(v) => ::std::result::Result::Ok(*v),
            ::std::result::Result::Err(value) => {
                let err = __repl_mismatch::<T>(name, &witness);
                locals.insert(::std::string::ToString::to_string(name), (witness, value));
                ::std::result::Result::Err(err)
            }
        },
        ::std::option::Option::None => ::std::result::Result::Err(__repl_missing(name)),
    }
}

fn __repl_mismatch<T: 'static>(
    name: &str,
    witness: &str,
) -> ::std::boxed::Box<dyn ::std::error::Error> {
    ::std::convert::From::from(::std::format!(
        "`{}` は {} として記録されていますが {} として取り出されました",
        name,
        witness,
        ::std::any::type_name::<T>()
    ))
}

fn __repl_missing(name: &str) -> ::std::boxed::Box<dyn ::std::error::Error> {
    ::std::convert::From::from(::std::format!("環境に `{}` がありません", name))
}

/// 値を実行時の型名と一緒に環境へ書き戻す。
pub fn __repl_put<T: 'static>(locals: &mut Locals, name: &str, value: T) {
    locals.insert(
        ::std::string::ToString::to_string(name),
        __repl_slot(value),
    );
}

/// 値を型名付きの受け渡し形式へ包む。
pub fn __repl_slot<T: 'static>(value: T) -> Slot {
    (
        ::std::string::ToString::to_string(::std::any::type_name::<T>()),
        ::std::boxed::Box::new(value),
    )
}

/// `catch_unwind` が捕まえたパニックのペイロードを文字列にする。
pub fn __repl_panic_message(
    payload: ::std::boxed::Box<dyn ::std::any::Any + ::std::marker::Send>,
) -> ::std::string::String {
    if let ::std::option::Option::Some(s) = payload.downcast_ref::<&str>() {
        ::std::format!("panic: {}", s)
    } else if let ::std::option::Option::Some(s) = payload.downcast_ref::<::std::string::String>() {
        ::std::format!("panic: {}", s)
    } else {
        ::std::string::ToString::to_string("panic: (文字列以外のペイロード)")
    }
}
