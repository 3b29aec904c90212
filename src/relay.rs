// パス: src/relay.rs
// 役割: 子プロセス出力の各行へ固定プレフィックスを付けて転送する Write 実装
// 意図: rustc の出力を REPL 自身の出力と見分けられるようにする
// 関連ファイル: src/toolchain.rs, src/repl/session.rs

use std::io::{self, Write};

/// 最初のバイトの前と、改行の後に続くバイトの前へプレフィックスを挿入するライター。
///
/// 1 回の `write` が複数行にまたがっても、行ごとに分割して書いても結果は同じになる。
/// 最後の改行の後ろには、次のバイトが届くまでプレフィックスを出さない。
pub struct PrefixWriter<W: Write> {
    prefix: Vec<u8>,
    inner: W,
    at_line_start: bool,
}

impl<W: Write> PrefixWriter<W> {
    pub fn new(prefix: impl Into<Vec<u8>>, inner: W) -> Self {
        Self {
            prefix: prefix.into(),
            inner,
            at_line_start: true,
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for PrefixWriter<W> {
    /// 戻り値は呼び出し側が渡したバイト数（挿入したプレフィックスは含めない）。
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut out = Vec::with_capacity(buf.len() + self.prefix.len());
        for &b in buf {
            if self.at_line_start {
                out.extend_from_slice(&self.prefix);
                self.at_line_start = false;
            }
            out.push(b);
            if b == b'\n' {
                self.at_line_start = true;
            }
        }
        self.inner.write_all(&out)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::PrefixWriter;
    use std::io::Write;

    fn relay(chunks: &[&[u8]]) -> Vec<u8> {
        let mut w = PrefixWriter::new("#### ", Vec::new());
        for chunk in chunks {
            w.write_all(chunk).unwrap();
        }
        w.into_inner()
    }

    #[test]
    /// 先頭行に改行が先行しなくてもプレフィックスが付く。
    fn first_line_is_prefixed() {
        assert_eq!(relay(&[b"hello"]), b"#### hello");
    }

    #[test]
    /// 一括書き込みと行ごとの書き込みが同じ出力になる。
    fn split_writes_match_single_write() {
        let whole = relay(&[b"a\nb\nc"]);
        let split = relay(&[b"a\n", b"b\n", b"c"]);
        assert_eq!(whole, split);
        assert_eq!(whole, b"#### a\n#### b\n#### c");
    }

    #[test]
    /// 行の途中で分割されても、行頭以外へプレフィックスが入らない。
    fn mid_line_splits_do_not_insert_prefix() {
        assert_eq!(relay(&[b"ab", b"c\nd", b"e\n"]), b"#### abc\n#### de\n");
    }

    #[test]
    /// 複数バイト文字を含む出力がそのまま保持される。
    fn multibyte_text_is_preserved() {
        let text = "警告: 未使用\nエラー: 型\n";
        let out = relay(&[text.as_bytes()]);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "#### 警告: 未使用\n#### エラー: 型\n"
        );
    }

    #[test]
    /// 空行も 1 行として扱われる。
    fn empty_lines_are_prefixed() {
        assert_eq!(relay(&[b"\n\nx"]), b"#### \n#### \n#### x");
    }

    #[test]
    /// `write` はプレフィックスを除いた入力バイト数を返す。
    fn write_reports_caller_length() {
        let mut w = PrefixWriter::new("> ", Vec::new());
        assert_eq!(w.write(b"a\nb").unwrap(), 3);
        assert_eq!(w.write(b"").unwrap(), 0);
        assert_eq!(w.into_inner(), b"> a\n> b");
    }
}
