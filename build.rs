// パス: build.rs
// 役割: ホストをビルドした rustc のバージョン文字列を埋め込む
// 意図: 実行時に PATH 上の rustc と比較し、ABI 非互換なユニットを事前に警告する
// 関連ファイル: src/toolchain.rs, src/repl/cmd.rs

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=RUSTC");
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let version = Command::new(&rustc)
        .arg("-V")
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
        .unwrap_or_default();
    println!("cargo:rustc-env=DYNREPL_HOST_RUSTC={}", version);
}
