// パス: src/analyzer/resolver.rs
// 役割: プローブのソース全体を走査し、どこでも束縛されていない識別子を集める
// 意図: 束縛スタックで見える名前を管理し、パスの先頭だけを解決対象にする
// 関連ファイル: src/analyzer/mod.rs, src/analyzer/std_paths.rs

use std::collections::HashSet;

use syn::parse::ParseStream;
use syn::punctuated::Punctuated;
use syn::visit::{self, Visit};
use syn::{Expr, Item, Pat, Stmt, Token, UseTree};

use super::std_paths::{is_builtin, EXPR_ARG_MACROS, PATTERN_ARG_MACRO};

/// ファイル全体から未解決の識別子を発見順・重複なしで返す。
pub fn unresolved_names(file: &syn::File) -> Vec<String> {
    let mut resolver = Resolver::default();
    resolver.visit_file(file);
    resolver.unresolved
}

#[derive(Default)]
struct Resolver {
    scopes: Vec<HashSet<String>>,
    unresolved: Vec<String>,
    reported: HashSet<String>,
}

impl Resolver {
    fn push(&mut self) {
        self.scopes.push(HashSet::new());
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }

    fn bind(&mut self, name: String) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name);
        }
    }

    fn bind_items<'a>(&mut self, items: impl IntoIterator<Item = &'a Item>) {
        let mut names = Vec::new();
        for item in items {
            item_names(item, &mut names);
        }
        for name in names {
            self.bind(name);
        }
    }

    fn bind_pat(&mut self, pat: &Pat) {
        let mut names = Vec::new();
        pat_bindings(pat, &mut names);
        for name in names {
            self.bind(name);
        }
    }

    fn bind_generics(&mut self, generics: &syn::Generics) {
        for param in &generics.params {
            match param {
                syn::GenericParam::Type(t) => self.bind(t.ident.to_string()),
                syn::GenericParam::Const(c) => self.bind(c.ident.to_string()),
                syn::GenericParam::Lifetime(_) => {}
            }
        }
    }

    fn is_bound(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|s| s.contains(name))
    }

    fn check(&mut self, name: String) {
        if self.is_bound(&name) || is_builtin(&name) {
            return;
        }
        if self.reported.insert(name.clone()) {
            self.unresolved.push(name);
        }
    }

    // パターン中の型・パス参照を検査してから、束縛名を現在のスコープへ入れる。
    fn visit_and_bind_pat(&mut self, pat: &Pat) {
        self.visit_pat(pat);
        self.bind_pat(pat);
    }

    fn visit_macro_args(&mut self, mac: &syn::Macro) {
        let parser = Punctuated::<Expr, Token![,]>::parse_terminated;
        if let Ok(args) = mac.parse_body_with(parser) {
            for arg in &args {
                match arg {
                    // `name = expr` の名前付き引数は左辺を束縛扱いにする。
                    Expr::Assign(assign) if is_plain_ident(&assign.left) => {
                        self.visit_expr(&assign.right)
                    }
                    _ => self.visit_expr(arg),
                }
            }
            return;
        }
        // `vec![elem; n]`
        let repeat = |input: ParseStream| -> syn::Result<(Expr, Expr)> {
            let elem: Expr = input.parse()?;
            let _: Token![;] = input.parse()?;
            let len: Expr = input.parse()?;
            Ok((elem, len))
        };
        if let Ok((elem, len)) = mac.parse_body_with(repeat) {
            self.visit_expr(&elem);
            self.visit_expr(&len);
        }
    }

    // `matches!(expr, pat if guard)`: パターンの束縛はガードの中だけで見える。
    fn visit_matches_args(&mut self, mac: &syn::Macro) {
        let parser = |input: ParseStream| -> syn::Result<(Expr, Pat, Option<Expr>)> {
            let scrutinee: Expr = input.parse()?;
            let _: Token![,] = input.parse()?;
            let pat = Pat::parse_multi_with_leading_vert(input)?;
            let guard = if input.peek(Token![if]) {
                let _: Token![if] = input.parse()?;
                Some(input.parse()?)
            } else {
                None
            };
            let _: Option<Token![,]> = input.parse()?;
            Ok((scrutinee, pat, guard))
        };
        if let Ok((scrutinee, pat, guard)) = mac.parse_body_with(parser) {
            self.visit_expr(&scrutinee);
            self.push();
            self.visit_and_bind_pat(&pat);
            if let Some(guard) = &guard {
                self.visit_expr(guard);
            }
            self.pop();
        }
    }
}

fn is_plain_ident(expr: &Expr) -> bool {
    matches!(expr, Expr::Path(p) if p.qself.is_none() && p.path.get_ident().is_some())
}

impl<'ast> Visit<'ast> for Resolver {
    fn visit_file(&mut self, node: &'ast syn::File) {
        self.push();
        self.bind_items(&node.items);
        for item in &node.items {
            self.visit_item(item);
        }
        self.pop();
    }

    fn visit_item(&mut self, node: &'ast Item) {
        let generics = match node {
            Item::Fn(i) => Some(&i.sig.generics),
            Item::Impl(i) => Some(&i.generics),
            Item::Struct(i) => Some(&i.generics),
            Item::Enum(i) => Some(&i.generics),
            Item::Union(i) => Some(&i.generics),
            Item::Trait(i) => Some(&i.generics),
            Item::Type(i) => Some(&i.generics),
            // 名前は外側のスコープで束縛済み。パスは解決対象にしない。
            Item::Use(_) | Item::ExternCrate(_) | Item::Mod(_) => return,
            _ => None,
        };
        self.push();
        if let Some(generics) = generics {
            self.bind_generics(generics);
        }
        visit::visit_item(self, node);
        self.pop();
    }

    fn visit_impl_item(&mut self, node: &'ast syn::ImplItem) {
        self.push();
        visit::visit_impl_item(self, node);
        self.pop();
    }

    fn visit_trait_item(&mut self, node: &'ast syn::TraitItem) {
        self.push();
        visit::visit_trait_item(self, node);
        self.pop();
    }

    // 引数の型を検査してから引数名を束縛する。本体はこの後に走査される。
    fn visit_signature(&mut self, node: &'ast syn::Signature) {
        self.bind_generics(&node.generics);
        visit::visit_generics(self, &node.generics);
        for input in &node.inputs {
            match input {
                syn::FnArg::Receiver(r) => self.visit_type(&r.ty),
                syn::FnArg::Typed(t) => {
                    self.visit_type(&t.ty);
                    self.visit_pat(&t.pat);
                    self.bind_pat(&t.pat);
                }
            }
        }
        self.visit_return_type(&node.output);
    }

    fn visit_block(&mut self, node: &'ast syn::Block) {
        self.push();
        self.bind_items(node.stmts.iter().filter_map(|s| match s {
            Stmt::Item(item) => Some(item),
            _ => None,
        }));
        for stmt in &node.stmts {
            self.visit_stmt(stmt);
        }
        self.pop();
    }

    // 初期化式は束縛より前に評価されるので、先に走査する。
    fn visit_local(&mut self, node: &'ast syn::Local) {
        if let Some(init) = &node.init {
            self.visit_expr(&init.expr);
            if let Some((_, diverge)) = &init.diverge {
                self.visit_expr(diverge);
            }
        }
        self.visit_and_bind_pat(&node.pat);
    }

    fn visit_expr_closure(&mut self, node: &'ast syn::ExprClosure) {
        self.push();
        for input in &node.inputs {
            self.visit_and_bind_pat(input);
        }
        self.visit_return_type(&node.output);
        self.visit_expr(&node.body);
        self.pop();
    }

    fn visit_expr_for_loop(&mut self, node: &'ast syn::ExprForLoop) {
        self.visit_expr(&node.expr);
        self.push();
        self.visit_and_bind_pat(&node.pat);
        self.visit_block(&node.body);
        self.pop();
    }

    fn visit_expr_match(&mut self, node: &'ast syn::ExprMatch) {
        self.visit_expr(&node.expr);
        for arm in &node.arms {
            self.push();
            self.visit_and_bind_pat(&arm.pat);
            if let Some((_, guard)) = &arm.guard {
                self.visit_expr(guard);
            }
            self.visit_expr(&arm.body);
            self.pop();
        }
    }

    fn visit_expr_if(&mut self, node: &'ast syn::ExprIf) {
        self.push();
        self.visit_expr(&node.cond);
        self.visit_block(&node.then_branch);
        self.pop();
        if let Some((_, else_branch)) = &node.else_branch {
            self.visit_expr(else_branch);
        }
    }

    fn visit_expr_while(&mut self, node: &'ast syn::ExprWhile) {
        self.push();
        self.visit_expr(&node.cond);
        self.visit_block(&node.body);
        self.pop();
    }

    // `if let` / `while let` の束縛は呼び出し元が積んだスコープに入る。
    fn visit_expr_let(&mut self, node: &'ast syn::ExprLet) {
        self.visit_expr(&node.expr);
        self.visit_and_bind_pat(&node.pat);
    }

    fn visit_expr_path(&mut self, node: &'ast syn::ExprPath) {
        match &node.qself {
            Some(qself) if qself.position == 0 => {
                self.visit_type(&qself.ty);
                for seg in &node.path.segments {
                    self.visit_path_arguments(&seg.arguments);
                }
            }
            _ => visit::visit_expr_path(self, node),
        }
    }

    fn visit_type_path(&mut self, node: &'ast syn::TypePath) {
        match &node.qself {
            Some(qself) if qself.position == 0 => {
                self.visit_type(&qself.ty);
                for seg in &node.path.segments {
                    self.visit_path_arguments(&seg.arguments);
                }
            }
            _ => visit::visit_type_path(self, node),
        }
    }

    fn visit_path(&mut self, node: &'ast syn::Path) {
        if node.leading_colon.is_none() {
            if let Some(first) = node.segments.first() {
                self.check(first.ident.to_string());
            }
        }
        visit::visit_path(self, node);
    }

    fn visit_macro(&mut self, node: &'ast syn::Macro) {
        if node.path.segments.len() != 1 {
            return;
        }
        let name = node.path.segments[0].ident.to_string();
        if name == PATTERN_ARG_MACRO {
            self.visit_matches_args(node);
        } else if EXPR_ARG_MACROS.iter().any(|m| *m == name) {
            self.visit_macro_args(node);
        }
    }

    fn visit_attribute(&mut self, _node: &'ast syn::Attribute) {}

    fn visit_visibility(&mut self, _node: &'ast syn::Visibility) {}
}

/// 項目が導入する名前（`use` は末端名または別名）。
fn item_names(item: &Item, out: &mut Vec<String>) {
    let ident = match item {
        Item::Fn(i) => Some(&i.sig.ident),
        Item::Struct(i) => Some(&i.ident),
        Item::Enum(i) => Some(&i.ident),
        Item::Union(i) => Some(&i.ident),
        Item::Trait(i) => Some(&i.ident),
        Item::TraitAlias(i) => Some(&i.ident),
        Item::Type(i) => Some(&i.ident),
        Item::Const(i) => Some(&i.ident),
        Item::Static(i) => Some(&i.ident),
        Item::Mod(i) => Some(&i.ident),
        Item::Macro(i) => i.ident.as_ref(),
        Item::ExternCrate(i) => Some(i.rename.as_ref().map_or(&i.ident, |(_, r)| r)),
        Item::Use(i) => {
            use_tree_names(&i.tree, None, out);
            None
        }
        _ => None,
    };
    if let Some(ident) = ident {
        out.push(ident.to_string());
    }
}

fn use_tree_names(tree: &UseTree, parent: Option<&syn::Ident>, out: &mut Vec<String>) {
    match tree {
        UseTree::Path(p) => use_tree_names(&p.tree, Some(&p.ident), out),
        UseTree::Name(n) if n.ident == "self" => {
            if let Some(parent) = parent {
                out.push(parent.to_string());
            }
        }
        UseTree::Name(n) => out.push(n.ident.to_string()),
        UseTree::Rename(r) => out.push(r.rename.to_string()),
        UseTree::Group(g) => {
            for t in &g.items {
                use_tree_names(t, parent, out);
            }
        }
        UseTree::Glob(_) => {}
    }
}

/// パターンが束縛する変数名。
pub(crate) fn pat_bindings(pat: &Pat, out: &mut Vec<String>) {
    match pat {
        Pat::Ident(p) => {
            out.push(p.ident.to_string());
            if let Some((_, sub)) = &p.subpat {
                pat_bindings(sub, out);
            }
        }
        Pat::Tuple(t) => t.elems.iter().for_each(|p| pat_bindings(p, out)),
        Pat::TupleStruct(t) => t.elems.iter().for_each(|p| pat_bindings(p, out)),
        Pat::Slice(s) => s.elems.iter().for_each(|p| pat_bindings(p, out)),
        Pat::Struct(s) => s.fields.iter().for_each(|f| pat_bindings(&f.pat, out)),
        // 各選択肢は同じ名前を束縛する。
        Pat::Or(o) => {
            if let Some(first) = o.cases.first() {
                pat_bindings(first, out);
            }
        }
        Pat::Reference(r) => pat_bindings(&r.pat, out),
        Pat::Paren(p) => pat_bindings(&p.pat, out),
        Pat::Type(t) => pat_bindings(&t.pat, out),
        _ => {}
    }
}
