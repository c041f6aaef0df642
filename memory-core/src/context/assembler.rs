//! Context Assembler (C14, spec §4.13): fans a query out across the
//! requested sources, dedups and budgets the results, and renders markdown
//! fit for feeding straight into a prompt.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::config::ContextConfig;
use crate::error::{Error, Result};
use crate::learning::ValueStore;
use crate::search::Searcher;

use super::budget::{distribute, estimate_tokens};
use super::dedup::dedup;
use super::render::{code_item, commit_item, experience_item, memory_item, render_context, value_item};
use super::types::{ContextItem, FormattedContext, RawItem, VALID_CONTEXT_TYPES};

/// Wraps [`Searcher`] (and, for premortem principles, [`ValueStore`]) with
/// dedup, budgeting, and markdown rendering (spec §4.13).
pub struct ContextAssembler {
    searcher: Arc<Searcher>,
    values: Arc<ValueStore>,
    config: ContextConfig,
}

impl ContextAssembler {
    #[must_use]
    pub fn new(searcher: Arc<Searcher>, values: Arc<ValueStore>, config: ContextConfig) -> Self {
        Self { searcher, values, config }
    }

    /// `assemble_context(query, context_types?, limit, max_tokens)` (spec
    /// §4.13). An empty `context_types` means "every source".
    pub async fn assemble_context(
        &self,
        query: &str,
        context_types: &[String],
        limit: usize,
        max_tokens: usize,
    ) -> Result<FormattedContext> {
        let requested = self.resolve_context_types(context_types)?;
        if query.trim().is_empty() || requested.is_empty() {
            return Ok(empty_context());
        }

        let fanout = requested.iter().map(|source| {
            let source = source.clone();
            self.fetch_source(source, query, limit)
        });
        let per_source_items: Vec<Vec<RawItem>> = futures::future::join_all(fanout).await;

        let all_items: Vec<RawItem> = per_source_items.into_iter().flatten().collect();
        let deduped = dedup(all_items, self.config.fuzzy_dedup_threshold);

        let budgets = distribute(&requested, max_tokens);
        let selected = select_within_budgets(deduped, &requested, &budgets, self.config.per_item_truncation_fraction);

        Ok(finalize(selected, max_tokens))
    }

    /// `get_premortem_context(domain, strategy?, limit, max_tokens)` (spec
    /// §4.13): a fixed-shape briefing assembled from past experiences and
    /// admitted values, queried in parallel.
    pub async fn get_premortem_context(
        &self,
        domain: &str,
        strategy: Option<&str>,
        limit: usize,
        max_tokens: usize,
    ) -> FormattedContext {
        let (failures, strategy_perf, surprises, root_causes, principles) = tokio::join!(
            self.searcher.search_experiences(domain, "full", Some(domain), None, Some("falsified"), limit),
            async {
                match strategy {
                    Some(s) => self.searcher.search_experiences(domain, "strategy", Some(domain), Some(s), None, limit).await,
                    None => Ok(Vec::new()),
                }
            },
            self.searcher.search_experiences(domain, "surprise", Some(domain), None, None, limit),
            self.searcher.search_experiences(domain, "root_cause", Some(domain), None, None, limit),
            self.values.list_values(None, 5),
        );

        let failures = log_and_default(failures, "experiences:full");
        let strategy_perf = log_and_default(strategy_perf, "experiences:strategy");
        let surprises = log_and_default(surprises, "experiences:surprise");
        let root_causes = log_and_default(root_causes, "experiences:root_cause");
        let principles = principles.unwrap_or_else(|err| {
            warn!(source = "values", error = %err, "premortem source failed, treating as empty");
            Vec::new()
        });

        let experience_count = failures.len() + strategy_perf.len() + surprises.len() + root_causes.len();

        let mut out = String::new();
        out.push_str(&format!("# Premortem: {domain}"));
        if let Some(s) = strategy {
            out.push_str(&format!(" with {s}"));
        }
        out.push('\n');

        push_bullet_section(&mut out, "Common Failures", failures.iter().map(|e| {
            format!("{}/{}: {} → {}", e.domain, e.strategy, e.action, e.outcome_result)
        }));
        if strategy.is_some() {
            push_bullet_section(&mut out, "Strategy Performance", strategy_perf.iter().map(|e| {
                format!("{}/{}: {} → {}", e.domain, e.strategy, e.action, e.outcome_result)
            }));
        }
        push_bullet_section(&mut out, "Unexpected Outcomes", surprises.iter().filter_map(|e| e.surprise.clone()));
        push_bullet_section(&mut out, "Root Causes to Watch", root_causes.iter().filter_map(|e| e.root_cause.as_ref().map(|rc| rc.to_string())));
        push_bullet_section(&mut out, "Relevant Principles", principles.iter().map(|v| v.text.clone()));

        out.push_str(&format!("\n*Based on {experience_count} past experiences*\n"));

        let token_count = estimate_tokens(&out);
        FormattedContext {
            markdown: out,
            items: Vec::new(),
            token_count,
            sources_used: HashMap::new(),
            budget_exceeded: token_count > max_tokens,
            truncated_items: Vec::new(),
        }
    }

    fn resolve_context_types(&self, requested: &[String]) -> Result<Vec<String>> {
        if requested.is_empty() {
            return Ok(VALID_CONTEXT_TYPES.iter().map(|s| (*s).to_string()).collect());
        }
        for source in requested {
            if !VALID_CONTEXT_TYPES.contains(&source.as_str()) {
                return Err(Error::validation(
                    "context_types",
                    format!(
                        "unknown context type `{source}`, valid options are: {}",
                        VALID_CONTEXT_TYPES.join(", ")
                    ),
                ));
            }
        }
        Ok(requested.to_vec())
    }

    async fn fetch_source(&self, source: String, query: &str, limit: usize) -> Vec<RawItem> {
        let result = match source.as_str() {
            "memories" => self
                .searcher
                .search_memories(query, limit, None, None)
                .await
                .map(|hits| hits.iter().map(memory_item).collect::<Vec<_>>()),
            "code" => self
                .searcher
                .search_code(query, limit, None, None)
                .await
                .map(|hits| hits.iter().map(code_item).collect::<Vec<_>>()),
            "experiences" => self
                .searcher
                .search_experiences(query, "full", None, None, None, limit)
                .await
                .map(|hits| hits.iter().map(experience_item).collect::<Vec<_>>()),
            "values" => self
                .searcher
                .search_values(query, limit, None)
                .await
                .map(|hits| hits.iter().map(value_item).collect::<Vec<_>>()),
            "commits" => self
                .searcher
                .search_commits(query, limit, None, None)
                .await
                .map(|hits| hits.iter().map(commit_item).collect::<Vec<_>>()),
            _ => Ok(Vec::new()),
        };

        result.unwrap_or_else(|err| {
            warn!(source = %source, error = %err, "context source failed, treating as empty");
            Vec::new()
        })
    }
}

fn log_and_default<T>(result: Result<Vec<T>>, source: &str) -> Vec<T> {
    result.unwrap_or_else(|err| {
        warn!(source = %source, error = %err, "premortem source failed, treating as empty");
        Vec::new()
    })
}

fn push_bullet_section(out: &mut String, title: &str, bullets: impl Iterator<Item = String>) {
    out.push_str(&format!("\n## {title}\n\n"));
    let mut any = false;
    for bullet in bullets {
        out.push_str(&format!("- {bullet}\n"));
        any = true;
    }
    if !any {
        out.push_str("- none recorded\n");
    }
}

fn empty_context() -> FormattedContext {
    FormattedContext {
        markdown: "# Context\n\n*0 items from 0 sources*\n".to_string(),
        items: Vec::new(),
        token_count: 0,
        sources_used: HashMap::new(),
        budget_exceeded: false,
        truncated_items: Vec::new(),
    }
}

/// Greedy per-source selection against each source's token budget (spec
/// §4.13 steps 4-5): items are tried in relevance order; an oversized item
/// is truncated to `fraction * budget[source]` with a provenance note, and
/// the first item that still doesn't fit stops that source's selection.
fn select_within_budgets(
    deduped: Vec<RawItem>,
    requested: &[String],
    budgets: &HashMap<String, usize>,
    fraction: f64,
) -> Vec<RawItem> {
    let mut selected = Vec::new();

    for source in requested {
        let Some(&budget) = budgets.get(source) else { continue };
        if budget == 0 {
            continue;
        }
        let cap = ((budget as f64) * fraction).floor() as usize;
        let mut used = 0usize;

        for item in deduped.iter().filter(|i| &i.source == source) {
            let mut item = item.clone();
            let mut tokens = estimate_tokens(&item.rendered);

            if cap > 0 && tokens > cap {
                item.rendered = format!("{} {}", truncate_chars(&item.rendered, cap * 4), item.truncation_note);
                tokens = estimate_tokens(&item.rendered);
            }

            if used + tokens > budget {
                break;
            }
            used += tokens;
            selected.push(item);
        }
    }

    selected
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn finalize(selected: Vec<RawItem>, max_tokens: usize) -> FormattedContext {
    let markdown = render_context(&selected);

    let mut sources_used: HashMap<String, usize> = HashMap::new();
    let mut truncated_items = Vec::new();
    let mut token_count = 0usize;
    let mut items = Vec::with_capacity(selected.len());

    for item in selected {
        let tokens = estimate_tokens(&item.rendered);
        token_count += tokens;
        *sources_used.entry(item.source.clone()).or_insert(0) += 1;
        let truncated = item.rendered.ends_with(&item.truncation_note) && !item.truncation_note.is_empty();
        if truncated {
            truncated_items.push(item.dedup_key.clone());
        }
        items.push(ContextItem {
            source: item.source,
            dedup_key: item.dedup_key,
            relevance: item.relevance,
            rendered: item.rendered,
            tokens,
            truncated,
        });
    }

    FormattedContext {
        markdown,
        items,
        token_count,
        sources_used,
        budget_exceeded: token_count > max_tokens,
        truncated_items,
    }
}
