use crate::callflow::CallGraph;
use crate::comments;
use crate::config::ExtractorConfig;
use crate::error::{ExtractorError, Result};
use crate::language::Language;
use std::collections::HashMap;
use threatspec_core::{ExtractedFile, FunctionRecord};
use tree_sitter::{Node, Parser};

/// AST-based analyzer locating functions, their comments and the calls between them
pub struct FunctionAnalyzer {
    parser: Parser,
    language: Language,
}

impl FunctionAnalyzer {
    /// Create new analyzer for a language
    pub fn new(language: Language) -> Result<Self> {
        if !language.supports_ast() {
            return Err(ExtractorError::unsupported_language(language.as_str()));
        }

        let ts_language = language.tree_sitter_language()?;
        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| ExtractorError::tree_sitter(format!("Failed to set language: {e}")))?;

        Ok(Self { parser, language })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Parse `content` and extract every function declaration in document order
    pub fn analyze(
        &mut self,
        content: &str,
        file_path: &str,
        config: &ExtractorConfig,
    ) -> Result<ExtractedFile> {
        let tree = self
            .parser
            .parse(content, None)
            .ok_or_else(|| ExtractorError::parse(file_path, "Failed to parse source code"))?;
        let root = tree.root_node();

        if root.has_error() {
            let line = first_error_line(root).unwrap_or(1);
            if !config.skip_on_syntax_error {
                return Err(ExtractorError::parse(
                    file_path,
                    format!("syntax error near line {line}"),
                ));
            }
            log::warn!("{file_path}: syntax error near line {line}, extracting what parsed");
        }

        let walker = Walker {
            content,
            language: self.language,
        };

        let mut declarations = Vec::new();
        walker.declarations(root, &mut declarations);

        let lines: Vec<&str> = content.lines().collect();
        let attached = walker.attached_comments(root);
        let functions = declarations
            .iter()
            .map(|decl| FunctionRecord {
                name: decl.name.to_string(),
                qualified_name: decl.qualified_name.clone(),
                file_path: file_path.to_string(),
                start_line: decl.node.start_position().row + 1,
                end_line: decl.node.end_position().row + 1,
                comment: walker.comment_for(&lines, decl, &attached),
            })
            .collect();

        let calls = if config.include_callflow {
            walker.call_graph(&declarations).calls()
        } else {
            Vec::new()
        };

        Ok(ExtractedFile {
            file_path: file_path.to_string(),
            file_comment: walker.file_comment(root),
            functions,
            calls,
        })
    }
}

/// A function declaration located in the tree
struct Declaration<'a, 'tree> {
    node: Node<'tree>,
    /// Outermost node the comment block sits above (decorators, `export`)
    anchor: Node<'tree>,
    name: &'a str,
    /// Type, class, trait or impl target the function belongs to
    owner: Option<&'a str>,
    qualified_name: String,
}

/// Callee as written at a call site
struct Callee<'a> {
    name: &'a str,
    /// Receiver or path text for `x.f()` / `T::f()` calls
    qualifier: Option<&'a str>,
}

struct Walker<'a> {
    content: &'a str,
    language: Language,
}

impl<'a> Walker<'a> {
    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.content.as_bytes()).unwrap_or("")
    }

    fn field_text(&self, node: Node, field: &str) -> Option<&'a str> {
        node.child_by_field_name(field)
            .map(|child| self.text(child))
            .filter(|text| !text.is_empty())
    }

    fn declarations<'tree>(&self, root: Node<'tree>, out: &mut Vec<Declaration<'a, 'tree>>) {
        match self.language {
            Language::Rust => self.rust_items(root, &[], None, out),
            Language::Go => self.go_items(root, out),
            Language::Python => self.python_items(root, &[], None, out),
            Language::JavaScript | Language::TypeScript => self.js_items(root, out),
            Language::Unknown => {}
        }
    }

    fn push<'tree>(
        out: &mut Vec<Declaration<'a, 'tree>>,
        node: Node<'tree>,
        anchor: Node<'tree>,
        name: &'a str,
        scope: &[&'a str],
        owner: Option<&'a str>,
        separator: &str,
    ) {
        let mut qualified_name = scope.join(separator);
        if !qualified_name.is_empty() {
            qualified_name.push_str(separator);
        }
        qualified_name.push_str(name);

        out.push(Declaration {
            node,
            anchor,
            name,
            owner,
            qualified_name,
        });
    }

    /// Functions in a Rust item list: free functions, impl/trait methods, inline modules
    fn rust_items<'tree>(
        &self,
        node: Node<'tree>,
        scope: &[&'a str],
        owner: Option<&'a str>,
        out: &mut Vec<Declaration<'a, 'tree>>,
    ) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "function_item" => {
                    if let Some(name) = self.field_text(child, "name") {
                        Self::push(out, child, child, name, scope, owner, "::");
                    }
                }
                "impl_item" => {
                    let target = child
                        .child_by_field_name("type")
                        .and_then(|ty| self.rust_type_name(ty));
                    if let (Some(target), Some(body)) = (target, child.child_by_field_name("body")) {
                        self.rust_items(body, &extend(scope, target), Some(target), out);
                    }
                }
                "trait_item" => {
                    let name = self.field_text(child, "name");
                    if let (Some(name), Some(body)) = (name, child.child_by_field_name("body")) {
                        self.rust_items(body, &extend(scope, name), Some(name), out);
                    }
                }
                "mod_item" => {
                    let name = self.field_text(child, "name");
                    if let (Some(name), Some(body)) = (name, child.child_by_field_name("body")) {
                        self.rust_items(body, &extend(scope, name), None, out);
                    }
                }
                _ => {}
            }
        }
    }

    /// Base name of an impl target (`Car`, `Store<T>` -> `Store`, `db::Pool` -> `Pool`)
    fn rust_type_name(&self, node: Node) -> Option<&'a str> {
        match node.kind() {
            "generic_type" | "reference_type" => node
                .child_by_field_name("type")
                .and_then(|ty| self.rust_type_name(ty)),
            "scoped_type_identifier" => self.field_text(node, "name"),
            _ => Some(self.text(node)).filter(|text| !text.is_empty()),
        }
    }

    /// Top-level Go functions and methods, qualified with the package name
    fn go_items<'tree>(&self, root: Node<'tree>, out: &mut Vec<Declaration<'a, 'tree>>) {
        let package = self.go_package(root);
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            let Some(name) = self.field_text(child, "name") else {
                continue;
            };
            match child.kind() {
                "function_declaration" => {
                    let scope: Vec<&str> = package.into_iter().collect();
                    Self::push(out, child, child, name, &scope, None, ".");
                }
                "method_declaration" => {
                    let receiver = child
                        .child_by_field_name("receiver")
                        .and_then(|params| self.go_receiver(params));
                    let qualifier = receiver.map(|(base, pointer)| {
                        if pointer {
                            format!("(*{base})")
                        } else {
                            base.to_string()
                        }
                    });

                    let mut segments: Vec<&str> = package.into_iter().collect();
                    segments.extend(qualifier.as_deref());
                    segments.push(name);
                    out.push(Declaration {
                        node: child,
                        anchor: child,
                        name,
                        owner: receiver.map(|(base, _)| base),
                        qualified_name: segments.join("."),
                    });
                }
                _ => {}
            }
        }
    }

    fn go_package(&self, root: Node) -> Option<&'a str> {
        let mut cursor = root.walk();
        let clause = root
            .named_children(&mut cursor)
            .find(|node| node.kind() == "package_clause")?;
        let mut clause_cursor = clause.walk();
        let ident = clause
            .named_children(&mut clause_cursor)
            .find(|node| node.kind() == "package_identifier")?;
        Some(self.text(ident))
    }

    /// Receiver base type and whether it is a pointer receiver
    fn go_receiver(&self, params: Node) -> Option<(&'a str, bool)> {
        let mut cursor = params.walk();
        let param = params
            .named_children(&mut cursor)
            .find(|node| node.kind() == "parameter_declaration")?;
        let ty = param.child_by_field_name("type")?;

        if ty.kind() == "pointer_type" {
            let mut ty_cursor = ty.walk();
            let inner = ty.named_children(&mut ty_cursor).next()?;
            Some((self.go_type_name(inner)?, true))
        } else {
            Some((self.go_type_name(ty)?, false))
        }
    }

    fn go_type_name(&self, node: Node) -> Option<&'a str> {
        match node.kind() {
            "type_identifier" => Some(self.text(node)),
            "generic_type" => node
                .child_by_field_name("type")
                .and_then(|ty| self.go_type_name(ty)),
            _ => None,
        }
    }

    /// Python functions in a module or class body
    fn python_items<'tree>(
        &self,
        node: Node<'tree>,
        scope: &[&'a str],
        owner: Option<&'a str>,
        out: &mut Vec<Declaration<'a, 'tree>>,
    ) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.python_definition(child, child, scope, owner, out);
        }
    }

    fn python_definition<'tree>(
        &self,
        node: Node<'tree>,
        anchor: Node<'tree>,
        scope: &[&'a str],
        owner: Option<&'a str>,
        out: &mut Vec<Declaration<'a, 'tree>>,
    ) {
        match node.kind() {
            "function_definition" => {
                if let Some(name) = self.field_text(node, "name") {
                    Self::push(out, node, anchor, name, scope, owner, ".");
                }
            }
            "class_definition" => {
                let name = self.field_text(node, "name");
                if let (Some(name), Some(body)) = (name, node.child_by_field_name("body")) {
                    self.python_items(body, &extend(scope, name), Some(name), out);
                }
            }
            "decorated_definition" => {
                if let Some(definition) = node.child_by_field_name("definition") {
                    self.python_definition(definition, anchor, scope, owner, out);
                }
            }
            _ => {}
        }
    }

    /// Leading string literal of a module or block
    fn python_docstring(&self, block: Node) -> Option<&'a str> {
        let mut cursor = block.walk();
        let first = block
            .named_children(&mut cursor)
            .find(|node| node.kind() != "comment")?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let mut stmt_cursor = first.walk();
        let literal = first.named_children(&mut stmt_cursor).next()?;
        (literal.kind() == "string").then(|| self.text(literal))
    }

    fn js_items<'tree>(&self, root: Node<'tree>, out: &mut Vec<Declaration<'a, 'tree>>) {
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            self.js_statement(child, child, out);
        }
    }

    fn js_statement<'tree>(
        &self,
        node: Node<'tree>,
        anchor: Node<'tree>,
        out: &mut Vec<Declaration<'a, 'tree>>,
    ) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = self.field_text(node, "name") {
                    Self::push(out, node, anchor, name, &[], None, ".");
                }
            }
            "class_declaration" | "abstract_class_declaration" => {
                let class = self.field_text(node, "name");
                if let (Some(class), Some(body)) = (class, node.child_by_field_name("body")) {
                    let mut cursor = body.walk();
                    for member in body.named_children(&mut cursor) {
                        if member.kind() != "method_definition" {
                            continue;
                        }
                        if let Some(name) = self.field_text(member, "name") {
                            Self::push(out, member, member, name, &[class], Some(class), ".");
                        }
                    }
                }
            }
            "export_statement" => {
                if let Some(declaration) = node.child_by_field_name("declaration") {
                    self.js_statement(declaration, anchor, out);
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = node.walk();
                for declarator in node.named_children(&mut cursor) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    let is_function = declarator.child_by_field_name("value").is_some_and(|value| {
                        matches!(
                            value.kind(),
                            "arrow_function" | "function_expression" | "function" | "generator_function"
                        )
                    });
                    if let (true, Some(name)) = (is_function, self.field_text(declarator, "name")) {
                        Self::push(out, node, anchor, name, &[], None, ".");
                    }
                }
            }
            _ => {}
        }
    }

    fn comment_for(
        &self,
        lines: &[&str],
        decl: &Declaration,
        attached: &HashMap<usize, String>,
    ) -> String {
        if self.language == Language::Go {
            return attached.get(&decl.node.id()).cloned().unwrap_or_default();
        }

        let mut comment =
            comments::comment_above(lines, decl.anchor.start_position().row, self.language);
        if self.language == Language::Python {
            let docstring = decl
                .node
                .child_by_field_name("body")
                .and_then(|body| self.python_docstring(body));
            if let Some(docstring) = docstring {
                comments::push_stripped(&mut comment, docstring);
            }
        }
        comment
    }

    /// Top-level Go comment groups keyed by the declaration they belong to.
    ///
    /// A group (comments on consecutive lines) belongs to the declaration before it
    /// when it starts on the line that declaration ends, or on the next line with a
    /// blank line after the group. Otherwise it belongs to the declaration after it.
    /// Comments past the last declaration go to that declaration.
    fn attached_comments(&self, root: Node) -> HashMap<usize, String> {
        let mut attached: HashMap<usize, String> = HashMap::new();
        if self.language != Language::Go {
            return attached;
        }

        let mut cursor = root.walk();
        let children: Vec<Node> = root.named_children(&mut cursor).collect();

        let mut idx = 0;
        while idx < children.len() {
            if children[idx].kind() != "comment" {
                idx += 1;
                continue;
            }

            let first = idx;
            while idx + 1 < children.len()
                && children[idx + 1].kind() == "comment"
                && children[idx + 1].start_position().row <= children[idx].end_position().row + 1
            {
                idx += 1;
            }
            let group = &children[first..=idx];
            idx += 1;

            let start = group[0].start_position().row;
            let end = group[group.len() - 1].end_position().row;
            let prev = children[..first].iter().rev().find(|n| n.kind() != "comment");
            let next = children[idx..].iter().find(|n| n.kind() != "comment");

            let owner = match (prev, next) {
                (Some(prev), next)
                    if prev.end_position().row == start
                        || (prev.end_position().row + 1 == start
                            && next.map_or(true, |n| end + 1 < n.start_position().row)) =>
                {
                    Some(prev)
                }
                (_, Some(next)) => Some(next),
                (prev, None) => prev,
            };

            if let Some(owner) = owner {
                let text = attached.entry(owner.id()).or_default();
                for comment in group {
                    comments::push_stripped(text, self.text(*comment));
                }
            }
        }
        attached
    }

    /// Every comment in the file in document order, after a Python module docstring
    fn file_comment(&self, root: Node) -> String {
        let mut out = String::new();
        if self.language == Language::Python {
            if let Some(docstring) = self.python_docstring(root) {
                comments::push_stripped(&mut out, docstring);
            }
        }
        self.collect_comments(root, &mut out);
        out
    }

    fn collect_comments(&self, node: Node, out: &mut String) {
        if self.language.comment_kinds().contains(&node.kind()) {
            comments::push_stripped(out, self.text(node));
            return;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_comments(child, out);
        }
    }

    /// Calls between functions of this file
    fn call_graph(&self, declarations: &[Declaration]) -> CallGraph {
        let mut by_name: HashMap<&str, Vec<&Declaration>> = HashMap::new();
        for decl in declarations {
            by_name.entry(decl.name).or_default().push(decl);
        }

        let mut graph = CallGraph::new();
        for caller in declarations {
            let mut callees = Vec::new();
            self.traverse_for_calls(caller.node, &mut callees);

            for callee in callees {
                let Some(candidates) = by_name.get(callee.name) else {
                    continue;
                };
                if let Some(target) = resolve(candidates, caller, &callee) {
                    graph.add_call(&caller.qualified_name, &target.qualified_name);
                }
            }
        }
        graph
    }

    /// Traverse AST for function calls
    fn traverse_for_calls(&self, node: Node, calls: &mut Vec<Callee<'a>>) {
        let is_call = match self.language {
            Language::Python => node.kind() == "call",
            _ => node.kind() == "call_expression",
        };

        if is_call {
            if let Some(callee) = node
                .child_by_field_name("function")
                .and_then(|function| self.callee(function))
            {
                calls.push(callee);
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.traverse_for_calls(child, calls);
        }
    }

    fn callee(&self, node: Node) -> Option<Callee<'a>> {
        match node.kind() {
            "identifier" => Some(Callee {
                name: self.text(node),
                qualifier: None,
            }),
            // rust `x.f`, `T::f`; go `x.F`; python `x.f`; js `x.f`
            "field_expression" => self.member_callee(node, "field", "value"),
            "scoped_identifier" => self.member_callee(node, "name", "path"),
            "selector_expression" => self.member_callee(node, "field", "operand"),
            "attribute" => self.member_callee(node, "attribute", "object"),
            "member_expression" => self.member_callee(node, "property", "object"),
            "generic_function" => node
                .child_by_field_name("function")
                .and_then(|function| self.callee(function)),
            _ => None,
        }
    }

    fn member_callee(&self, node: Node, name_field: &str, object_field: &str) -> Option<Callee<'a>> {
        Some(Callee {
            name: self.field_text(node, name_field)?,
            qualifier: Some(self.field_text(node, object_field).unwrap_or("")),
        })
    }
}

/// Pick the declaration a call refers to, or nothing when it is ambiguous
fn resolve<'d, 'a, 'tree>(
    candidates: &[&'d Declaration<'a, 'tree>],
    caller: &Declaration,
    callee: &Callee,
) -> Option<&'d Declaration<'a, 'tree>> {
    match callee.qualifier {
        None => unique(candidates.iter().copied().filter(|decl| decl.owner.is_none())),
        Some("self" | "Self" | "this" | "cls") => unique_owned_by(candidates, caller.owner),
        Some(qualifier) => unique_owned_by(candidates, Some(qualifier))
            .or_else(|| unique(candidates.iter().copied().filter(|decl| decl.owner.is_some())))
            .or_else(|| unique_owned_by(candidates, caller.owner)),
    }
}

fn unique_owned_by<'d, 'a, 'tree>(
    candidates: &[&'d Declaration<'a, 'tree>],
    owner: Option<&str>,
) -> Option<&'d Declaration<'a, 'tree>> {
    unique(
        candidates
            .iter()
            .copied()
            .filter(|decl| decl.owner.is_some() && decl.owner == owner),
    )
}

fn unique<T>(mut items: impl Iterator<Item = T>) -> Option<T> {
    let first = items.next()?;
    items.next().is_none().then_some(first)
}

fn extend<'a>(scope: &[&'a str], name: &'a str) -> Vec<&'a str> {
    let mut scope = scope.to_vec();
    scope.push(name);
    scope
}

fn first_error_line(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(line) = first_error_line(child) {
            return Some(line);
        }
    }
    None
}
