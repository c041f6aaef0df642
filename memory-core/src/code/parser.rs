//! Multi-language source parser (spec §4.4, C5).
//!
//! Detects a language by extension, guards against binary content, and
//! extracts [`SemanticUnit`]s: tree-sitter traversal for Python/TS/JS/Lua,
//! root-level key extraction for YAML/JSON. Must never be called on the
//! request path directly — callers offload via `spawn_blocking` (spec §5).

use std::path::Path;

use tree_sitter::{Node, Parser, Tree};

use crate::error::{Error, ParseErrorKind, Result};
use crate::types::{SemanticUnit, UnitType};

/// Languages the parser recognizes (spec §4.4 language-detection table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    TypeScript,
    JavaScript,
    Lua,
    Yaml,
    Json,
}

impl Language {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
            Self::Lua => "lua",
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

/// Detect a language from a file extension. Unsupported extensions return
/// `None` so callers can skip the file (spec §4.4).
#[must_use]
pub fn detect_language(path: &Path) -> Option<Language> {
    match path.extension()?.to_str()? {
        "py" => Some(Language::Python),
        "ts" | "tsx" => Some(Language::TypeScript),
        "js" | "jsx" => Some(Language::JavaScript),
        "lua" => Some(Language::Lua),
        "yaml" | "yml" => Some(Language::Yaml),
        "json" => Some(Language::Json),
        _ => None,
    }
}

const BINARY_SNIFF_WINDOW: usize = 8192;

/// `true` if the first 8 KiB of `bytes` contain a NUL byte (spec §4.4 binary
/// guard): the caller should silently skip the file.
#[must_use]
pub fn looks_binary(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(BINARY_SNIFF_WINDOW)].contains(&0)
}

/// Parse `content` (already read from `file_path`) into semantic units.
///
/// Returns `Ok(vec![])` for a recognized-but-empty file; returns
/// `Err(Error::Parse)` for a syntactically broken file — this must never
/// crash the indexer (spec §4.4 tolerance rule).
pub fn parse_file(
    content: &[u8],
    file_path: &str,
    project: &str,
    language: Language,
) -> Result<Vec<SemanticUnit>> {
    if looks_binary(content) {
        return Ok(Vec::new());
    }

    let text = std::str::from_utf8(content).map_err(|e| Error::Parse {
        kind: ParseErrorKind::Encoding,
        path: file_path.into(),
        message: e.to_string(),
    })?;

    match language {
        Language::Python => tree_sitter_units(text, file_path, project, language, &tree_sitter_python::LANGUAGE.into(), &python::walk),
        Language::TypeScript => tree_sitter_units(
            text,
            file_path,
            project,
            language,
            &tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            &ecma::walk,
        ),
        Language::JavaScript => tree_sitter_units(
            text,
            file_path,
            project,
            language,
            &tree_sitter_javascript::LANGUAGE.into(),
            &ecma::walk,
        ),
        Language::Lua => {
            tree_sitter_units(text, file_path, project, language, &tree_sitter_lua::LANGUAGE.into(), &lua::walk)
        }
        Language::Yaml => structured::extract_yaml(text, file_path, project),
        Language::Json => structured::extract_json(text, file_path, project),
    }
}

type WalkFn = dyn Fn(Node, &ExtractCtx) -> Vec<SemanticUnit> + Sync;

struct ExtractCtx<'a> {
    source: &'a [u8],
    file_stem: &'a str,
    file_path: &'a str,
    project: &'a str,
    language: Language,
}

fn tree_sitter_units(
    text: &str,
    file_path: &str,
    project: &str,
    language: Language,
    grammar: &tree_sitter::Language,
    walk: &WalkFn,
) -> Result<Vec<SemanticUnit>> {
    let mut parser = Parser::new();
    parser.set_language(grammar).map_err(|e| Error::Parse {
        kind: ParseErrorKind::Parse,
        path: file_path.into(),
        message: format!("failed to load grammar: {e}"),
    })?;

    let tree: Tree = parser.parse(text, None).ok_or_else(|| Error::Parse {
        kind: ParseErrorKind::Parse,
        path: file_path.into(),
        message: "tree-sitter returned no tree".to_string(),
    })?;

    let stem = Path::new(file_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_path);

    let ctx = ExtractCtx {
        source: text.as_bytes(),
        file_stem: stem,
        file_path,
        project,
        language,
    };

    Ok(walk(tree.root_node(), &ctx))
}

fn node_text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    std::str::from_utf8(&source[node.byte_range()]).unwrap_or("")
}

fn build_unit(
    ctx: &ExtractCtx,
    name: &str,
    qualified_name: String,
    unit_type: UnitType,
    node: Node,
    signature: String,
    docstring: Option<String>,
    complexity: u32,
) -> SemanticUnit {
    let id = SemanticUnit::derive_id(ctx.project, ctx.file_path, &qualified_name);
    SemanticUnit {
        id,
        project: ctx.project.to_string(),
        name: name.to_string(),
        qualified_name,
        unit_type,
        signature,
        content: node_text(node, ctx.source).to_string(),
        file_path: ctx.file_path.to_string(),
        start_line: node.start_position().row as u32 + 1,
        end_line: node.end_position().row as u32 + 1,
        language: ctx.language.as_str().to_string(),
        docstring,
        complexity: Some(complexity.max(1)),
    }
}

/// Count branch nodes under `node` per the language-specific fixed set
/// (spec §4.4 complexity rule: `1 + count(branch-nodes)`).
fn count_branches(node: Node, branch_kinds: &[&str]) -> u32 {
    let mut count = 0;
    let mut cursor = node.walk();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if branch_kinds.contains(&current.kind()) {
            count += 1;
        }
        for child in current.children(&mut cursor) {
            stack.push(child);
        }
    }
    count
}

mod python {
    use super::{build_unit, count_branches, node_text, ExtractCtx};
    use crate::types::{SemanticUnit, UnitType};
    use tree_sitter::Node;

    const BRANCH_KINDS: &[&str] = &[
        "if_statement",
        "elif_clause",
        "for_statement",
        "while_statement",
        "try_statement",
        "except_clause",
        "with_statement",
        "boolean_operator",
        "match_statement",
        "case_clause",
    ];

    pub fn walk(node: Node, ctx: &ExtractCtx) -> Vec<SemanticUnit> {
        let mut units = Vec::new();
        collect(node, ctx, None, &mut units);
        units
    }

    fn collect(node: Node, ctx: &ExtractCtx, parent_class: Option<&str>, out: &mut Vec<SemanticUnit>) {
        match node.kind() {
            "function_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = node_text(name_node, ctx.source).to_string();
                    let qualified_name = match parent_class {
                        Some(class) => format!("{}.{class}.{name}", ctx.file_stem),
                        None => format!("{}.{name}", ctx.file_stem),
                    };
                    let signature = node
                        .child_by_field_name("parameters")
                        .map(|p| format!("def {name}{}:", node_text(p, ctx.source)))
                        .unwrap_or_else(|| format!("def {name}():"));
                    let docstring = docstring_of(node, ctx);
                    let complexity = 1 + count_branches(node, BRANCH_KINDS);
                    out.push(build_unit(
                        ctx,
                        &name,
                        qualified_name,
                        if parent_class.is_some() { UnitType::Method } else { UnitType::Function },
                        node,
                        signature,
                        docstring,
                        complexity,
                    ));
                }
                return;
            }
            "class_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = node_text(name_node, ctx.source).to_string();
                    let qualified_name = format!("{}.{name}", ctx.file_stem);
                    let docstring = docstring_of(node, ctx);
                    out.push(build_unit(
                        ctx,
                        &name,
                        qualified_name,
                        UnitType::Class,
                        node,
                        format!("class {name}:"),
                        docstring,
                        1,
                    ));
                    if let Some(body) = node.child_by_field_name("body") {
                        let mut cursor = body.walk();
                        for child in body.children(&mut cursor) {
                            collect(child, ctx, Some(&name), out);
                        }
                    }
                    return;
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            collect(child, ctx, parent_class, out);
        }
    }

    fn docstring_of(node: Node, ctx: &ExtractCtx) -> Option<String> {
        let body = node.child_by_field_name("body")?;
        let mut cursor = body.walk();
        let first = body.named_children(&mut cursor).next()?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let mut ec = first.walk();
        let expr = first.named_children(&mut ec).next()?;
        if expr.kind() != "string" {
            return None;
        }
        let raw = node_text(expr, ctx.source);
        let trimmed = raw
            .trim_start_matches("\"\"\"")
            .trim_start_matches("'''")
            .trim_start_matches(['"', '\''])
            .trim_end_matches("\"\"\"")
            .trim_end_matches("'''")
            .trim_end_matches(['"', '\''])
            .trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Shared extractor for TypeScript and JavaScript: their grammars share
/// enough node-kind vocabulary that function/class/method extraction,
/// docstrings, and complexity counting can be implemented once.
mod ecma {
    use super::{build_unit, count_branches, node_text, ExtractCtx};
    use crate::types::{SemanticUnit, UnitType};
    use tree_sitter::Node;

    const BRANCH_KINDS: &[&str] = &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "try_statement",
        "catch_clause",
        "switch_statement",
        "switch_case",
        "ternary_expression",
    ];
    const BRANCH_OPERATORS: &[&str] = &["&&", "||"];

    pub fn walk(node: Node, ctx: &ExtractCtx) -> Vec<SemanticUnit> {
        let mut units = Vec::new();
        collect(node, ctx, None, &mut units);
        units
    }

    fn collect(node: Node, ctx: &ExtractCtx, parent_class: Option<&str>, out: &mut Vec<SemanticUnit>) {
        match node.kind() {
            "function_declaration" | "method_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = node_text(name_node, ctx.source).to_string();
                    let qualified_name = match parent_class {
                        Some(class) => format!("{}.{class}.{name}", ctx.file_stem),
                        None => format!("{}.{name}", ctx.file_stem),
                    };
                    let params = node
                        .child_by_field_name("parameters")
                        .map(|p| node_text(p, ctx.source).to_string())
                        .unwrap_or_default();
                    let signature = format!("function {name}{params}");
                    let docstring = leading_doc_comment(node, ctx);
                    let complexity = 1 + count_branches(node, BRANCH_KINDS) + count_logical_operators(node, ctx);
                    out.push(build_unit(
                        ctx,
                        &name,
                        qualified_name,
                        if parent_class.is_some() { UnitType::Method } else { UnitType::Function },
                        node,
                        signature,
                        docstring,
                        complexity,
                    ));
                }
                return;
            }
            "class_declaration" | "interface_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = node_text(name_node, ctx.source).to_string();
                    let qualified_name = format!("{}.{name}", ctx.file_stem);
                    let docstring = leading_doc_comment(node, ctx);
                    let unit_type = if node.kind() == "interface_declaration" {
                        UnitType::Class
                    } else {
                        UnitType::Class
                    };
                    out.push(build_unit(
                        ctx,
                        &name,
                        qualified_name.clone(),
                        unit_type,
                        node,
                        format!("class {name}"),
                        docstring,
                        1,
                    ));
                    if let Some(body) = node.child_by_field_name("body") {
                        let mut cursor = body.walk();
                        for child in body.children(&mut cursor) {
                            collect(child, ctx, Some(&name), out);
                        }
                    }
                    return;
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            collect(child, ctx, parent_class, out);
        }
    }

    fn count_logical_operators(node: Node, ctx: &ExtractCtx) -> u32 {
        let mut count = 0;
        let mut stack = vec![node];
        let mut cursor = node.walk();
        while let Some(current) = stack.pop() {
            if current.kind() == "binary_expression" {
                if let Some(op) = current.child_by_field_name("operator") {
                    if BRANCH_OPERATORS.contains(&node_text(op, ctx.source)) {
                        count += 1;
                    }
                }
            }
            for child in current.children(&mut cursor) {
                stack.push(child);
            }
        }
        count
    }

    /// A `/** ... */` block comment immediately preceding `node` (spec §4.4).
    fn leading_doc_comment(node: Node, ctx: &ExtractCtx) -> Option<String> {
        let prev = node.prev_sibling()?;
        if prev.kind() != "comment" {
            return None;
        }
        let text = node_text(prev, ctx.source);
        if !text.starts_with("/**") {
            return None;
        }
        let cleaned: String = text
            .trim_start_matches("/**")
            .trim_end_matches("*/")
            .lines()
            .map(|line| line.trim().trim_start_matches('*').trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!cleaned.is_empty()).then_some(cleaned)
    }
}

mod lua {
    use super::{build_unit, count_branches, node_text, ExtractCtx};
    use crate::types::{SemanticUnit, UnitType};
    use tree_sitter::Node;

    const BRANCH_KINDS: &[&str] = &[
        "if_statement",
        "elseif",
        "for_statement",
        "for_generic_clause",
        "while_statement",
        "repeat_statement",
    ];
    const BRANCH_OPERATORS: &[&str] = &["and", "or"];

    pub fn walk(node: Node, ctx: &ExtractCtx) -> Vec<SemanticUnit> {
        let mut units = Vec::new();
        collect(node, ctx, &mut units);
        units
    }

    fn collect(node: Node, ctx: &ExtractCtx, out: &mut Vec<SemanticUnit>) {
        if matches!(node.kind(), "function_declaration" | "function_definition") {
            let name = node
                .child_by_field_name("name")
                .map(|n| node_text(n, ctx.source).to_string())
                .unwrap_or_else(|| "anonymous".to_string());
            let qualified_name = format!("{}.{name}", ctx.file_stem);
            let docstring = leading_comment_block(node, ctx);
            let complexity = 1 + count_branches(node, BRANCH_KINDS) + count_logical_keywords(node, ctx);
            out.push(build_unit(
                ctx,
                &name,
                qualified_name,
                UnitType::Function,
                node,
                format!("function {name}(...)"),
                docstring,
                complexity,
            ));
            return;
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            collect(child, ctx, out);
        }
    }

    fn count_logical_keywords(node: Node, ctx: &ExtractCtx) -> u32 {
        let mut count = 0;
        let mut stack = vec![node];
        let mut cursor = node.walk();
        while let Some(current) = stack.pop() {
            if BRANCH_OPERATORS.contains(&node_text(current, ctx.source)) && current.kind() == "operator" {
                count += 1;
            }
            for child in current.children(&mut cursor) {
                stack.push(child);
            }
        }
        count
    }

    fn leading_comment_block(node: Node, ctx: &ExtractCtx) -> Option<String> {
        let prev = node.prev_sibling()?;
        if prev.kind() != "comment" {
            return None;
        }
        let text = node_text(prev, ctx.source);
        let cleaned = text.trim_start_matches("---").trim_start_matches("--").trim();
        (!cleaned.is_empty()).then(|| cleaned.to_string())
    }
}

/// YAML/JSON: root-level key extraction only (spec §4.4). No docstrings, no
/// complexity.
mod structured {
    use crate::error::{Error, ParseErrorKind, Result};
    use crate::types::{SemanticUnit, UnitType};

    pub fn extract_yaml(text: &str, file_path: &str, project: &str) -> Result<Vec<SemanticUnit>> {
        let value: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| Error::Parse {
            kind: ParseErrorKind::Parse,
            path: file_path.into(),
            message: e.to_string(),
        })?;

        let serde_yaml::Value::Mapping(map) = value else {
            return Ok(Vec::new());
        };

        let stem = std::path::Path::new(file_path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_path);

        let mut units = Vec::new();
        for (key, subtree) in &map {
            let Some(name) = key.as_str() else { continue };
            let qualified_name = format!("{stem}.{name}");
            let content = serde_yaml::to_string(subtree).unwrap_or_default();
            units.push(SemanticUnit {
                id: SemanticUnit::derive_id(project, file_path, &qualified_name),
                project: project.to_string(),
                name: name.to_string(),
                qualified_name,
                unit_type: UnitType::Key,
                signature: name.to_string(),
                content,
                file_path: file_path.to_string(),
                start_line: 1,
                end_line: 1,
                language: "yaml".to_string(),
                docstring: None,
                complexity: None,
            });
        }
        Ok(units)
    }

    pub fn extract_json(text: &str, file_path: &str, project: &str) -> Result<Vec<SemanticUnit>> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(|e| Error::Parse {
            kind: ParseErrorKind::Parse,
            path: file_path.into(),
            message: e.to_string(),
        })?;

        let serde_json::Value::Object(map) = value else {
            return Ok(Vec::new());
        };

        let stem = std::path::Path::new(file_path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_path);

        let mut units = Vec::new();
        for (name, subtree) in &map {
            let qualified_name = format!("{stem}.{name}");
            let content = serde_json::to_string_pretty(subtree).unwrap_or_default();
            units.push(SemanticUnit {
                id: SemanticUnit::derive_id(project, file_path, &qualified_name),
                project: project.to_string(),
                name: name.clone(),
                qualified_name,
                unit_type: UnitType::Key,
                signature: name.clone(),
                content,
                file_path: file_path.to_string(),
                start_line: 1,
                end_line: 1,
                language: "json".to_string(),
                docstring: None,
                complexity: None,
            });
        }
        Ok(units)
    }
}
