//! Per-source markdown rendering (spec §4.13 steps 1 and 7-8).

use crate::search::{CodeSearchResult, CommitSearchResult, ExperienceSearchResult, MemorySearchResult, ValueSearchResult};
use crate::types::UnitType;

use super::types::RawItem;

fn unit_type_label(unit_type: UnitType) -> &'static str {
    match unit_type {
        UnitType::Function => "Function",
        UnitType::Class => "Class",
        UnitType::Method => "Method",
        UnitType::Module => "Module",
        UnitType::Key => "Key",
    }
}

pub fn memory_item(result: &MemorySearchResult) -> RawItem {
    let rendered = format!(
        "**Memory**: {}\n*Category: {}, Importance: {:.2}*",
        result.content,
        result.category.as_str(),
        result.importance
    );
    RawItem {
        source: "memories".to_string(),
        dedup_key: format!("memory:{}", result.id),
        relevance: result.score,
        rendered,
        truncation_note: "(truncated)".to_string(),
    }
}

pub fn code_item(result: &CodeSearchResult) -> RawItem {
    let rendered = format!(
        "**{}** `{}` in `{}:{}`\n```{}\n{}\n```",
        unit_type_label(result.unit_type),
        result.qualified_name,
        result.file_path,
        result.start_line,
        result.language,
        result.content,
    );
    RawItem {
        source: "code".to_string(),
        dedup_key: format!("file:{}:{}", result.file_path, result.qualified_name),
        relevance: result.score,
        rendered,
        truncation_note: format!("(truncated, see full at {}:{})", result.file_path, result.start_line),
    }
}

pub fn experience_item(result: &ExperienceSearchResult) -> RawItem {
    let mut lines = vec![
        format!("**Experience**: {} | {}", result.domain, result.strategy),
        format!("- Goal: {}", result.goal),
        format!("- Hypothesis: {}", result.hypothesis),
        format!("- Action: {}", result.action),
        format!("- Prediction: {}", result.prediction),
        format!("- Outcome ({}): {}", result.outcome_status, result.outcome_result),
    ];
    if let Some(surprise) = &result.surprise {
        lines.push(format!("- Surprise: {surprise}"));
    }
    if let Some(lesson) = &result.lesson {
        lines.push(format!("- Lesson: {lesson}"));
    }
    let rendered = lines.join("\n");
    RawItem {
        source: "experiences".to_string(),
        dedup_key: format!("ghap:{}", result.ghap_id),
        relevance: result.score,
        rendered,
        truncation_note: format!("(truncated, see experience {})", result.ghap_id),
    }
}

pub fn value_item(result: &ValueSearchResult) -> RawItem {
    let rendered = format!(
        "**Value** ({}, cluster size: {}):\n{}",
        result.axis, result.cluster_size, result.text
    );
    RawItem {
        source: "values".to_string(),
        dedup_key: format!("content:{}", content_hash(&result.text)),
        relevance: result.score,
        rendered,
        truncation_note: "(truncated)".to_string(),
    }
}

pub fn commit_item(result: &CommitSearchResult) -> RawItem {
    let files_note = summarize_files(&result.files_changed);
    let rendered = format!(
        "**Commit** `{}` by {} on {}\n{}\n*Files: {}*",
        &result.sha[..result.sha.len().min(7)],
        result.author,
        result.timestamp.to_rfc3339(),
        result.message,
        files_note,
    );
    RawItem {
        source: "commits".to_string(),
        dedup_key: format!("commit:{}", result.sha),
        relevance: result.score,
        rendered,
        truncation_note: "(truncated)".to_string(),
    }
}

fn summarize_files(files: &[String]) -> String {
    const SHOWN: usize = 3;
    if files.len() <= SHOWN {
        return files.join(", ");
    }
    format!("{} ({} more)", files[..SHOWN].join(", "), files.len() - SHOWN)
}

fn content_hash(text: &str) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    text.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Render the final `# Context` document from already-selected items,
/// grouped by source in a fixed order (spec §4.13 step 8).
pub fn render_context(items: &[RawItem]) -> String {
    const SOURCE_ORDER: [(&str, &str); 5] = [
        ("experiences", "Experiences"),
        ("code", "Code"),
        ("memories", "Memories"),
        ("values", "Values"),
        ("commits", "Commits"),
    ];

    let mut out = String::from("# Context\n");
    let mut total_items = 0usize;
    let mut sources_with_items = 0usize;

    for (key, title) in SOURCE_ORDER {
        let section: Vec<&RawItem> = items.iter().filter(|i| i.source == key).collect();
        if section.is_empty() {
            continue;
        }
        sources_with_items += 1;
        out.push_str(&format!("\n## {title}\n\n"));
        for item in &section {
            out.push_str(&item.rendered);
            out.push_str("\n\n");
            total_items += 1;
        }
    }

    out.push_str(&format!("*{total_items} items from {sources_with_items} sources*\n"));
    out
}
