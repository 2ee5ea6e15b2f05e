//! C6 step 7 — parsing the raw LLM reply into `root_cause`/`solutions`/
//! `preventions`. Splits on the three fixed headings, then applies
//! the command/YAML post-processing to each solution step.

use regex::Regex;

use crate::evidence::{clean_markdown, is_kubectl_like, wrap_kubectl_block, wrap_yaml_block};
use crate::models::Solution;
use crate::prompt::output_headings;

pub struct ParsedReply {
    pub root_cause: String,
    pub solutions: Vec<Solution>,
    pub preventions: Vec<String>,
}

/// Returns `None` when the reply deviates from the expected shape (a
/// missing heading, or an empty solution-step list) — the caller falls
/// back to the static template table in that case.
pub fn parse_llm_reply(raw: &str) -> Option<ParsedReply> {
    let headings = output_headings();
    let root_cause_start = raw.find(headings[0])?;
    let solutions_start = raw.find(headings[1])?;
    let preventions_start = raw.find(headings[2])?;

    if !(root_cause_start < solutions_start && solutions_start < preventions_start) {
        return None;
    }

    let root_cause_text = raw[root_cause_start + headings[0].len()..solutions_start].trim();
    let solutions_text = raw[solutions_start + headings[1].len()..preventions_start].trim();
    let preventions_text = raw[preventions_start + headings[2].len()..].trim();

    let solutions = parse_solution_steps(solutions_text);
    if solutions.is_empty() {
        return None;
    }

    let preventions = parse_prevention_bullets(preventions_text);

    Some(ParsedReply {
        root_cause: clean_markdown(root_cause_text),
        solutions,
        preventions,
    })
}

fn parse_solution_steps(text: &str) -> Vec<Solution> {
    let step_marker = Regex::new(r"(?m)^\s*(\d+)\.\s+").expect("static regex is valid");

    let mut matches: Vec<(usize, usize, u32)> = step_marker
        .captures_iter(text)
        .map(|c| {
            let whole = c.get(0).unwrap();
            let number: u32 = c[1].parse().unwrap_or(0);
            (whole.start(), whole.end(), number)
        })
        .collect();

    if matches.is_empty() {
        return Vec::new();
    }

    matches.sort_by_key(|(start, ..)| *start);

    let mut steps = Vec::new();
    for (i, (_, content_start, number)) in matches.iter().enumerate() {
        let content_end = matches.get(i + 1).map(|(start, ..)| *start).unwrap_or(text.len());
        let body = text[*content_start..content_end].trim();
        if body.is_empty() {
            continue;
        }
        steps.push(Solution {
            step: *number,
            body: post_process_step_body(body),
        });
    }
    steps
}

fn post_process_step_body(body: &str) -> String {
    let yaml_fence = Regex::new(r"(?s)```ya?ml\s*\n(.*?)```").expect("static regex is valid");
    let mut result = String::new();
    let mut last_end = 0;

    for capture in yaml_fence.captures_iter(body) {
        let whole = capture.get(0).unwrap();
        result.push_str(&post_process_plain_text(&body[last_end..whole.start()]));
        result.push_str(&wrap_yaml_block(&capture[1]));
        last_end = whole.end();
    }
    result.push_str(&post_process_plain_text(&body[last_end..]));

    clean_markdown(&result)
}

fn post_process_plain_text(text: &str) -> String {
    text.lines()
        .map(|line| {
            if is_kubectl_like(line) {
                wrap_kubectl_block(line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_prevention_bullets(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if let Some(rest) = trimmed.strip_prefix('-').or_else(|| trimmed.strip_prefix('*')) {
                let cleaned = clean_markdown(rest.trim());
                if cleaned.is_empty() {
                    None
                } else {
                    Some(cleaned)
                }
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "### 근본 원인\n컨테이너가 메모리 한도를 초과하여 종료되었습니다.\n\n### 해결 방법\n1. 메모리 한도를 늘리세요:\n```yaml\nresources:\n  limits:\n    memory: 512Mi\n```\n2. `kubectl rollout restart deployment/API_NAME -n NAMESPACE` 를 실행하세요.\n\n### 재발 방지\n- 메모리 사용량에 대한 알림을 설정하세요.\n- 부하 테스트를 주기적으로 수행하세요.\n";

    #[test]
    fn parses_all_three_sections() {
        let parsed = parse_llm_reply(SAMPLE).expect("should parse");
        assert!(parsed.root_cause.contains("메모리"));
        assert_eq!(parsed.solutions.len(), 2);
        assert_eq!(parsed.preventions.len(), 2);
    }

    #[test]
    fn wraps_yaml_fence_in_first_step() {
        let parsed = parse_llm_reply(SAMPLE).expect("should parse");
        assert!(parsed.solutions[0].body.contains("yaml-block"));
    }

    #[test]
    fn wraps_kubectl_command_in_second_step() {
        let parsed = parse_llm_reply(SAMPLE).expect("should parse");
        assert!(parsed.solutions[1].body.contains("kubectl-block"));
    }

    #[test]
    fn missing_heading_yields_none() {
        let broken = "no headings here at all";
        assert!(parse_llm_reply(broken).is_none());
    }

    #[test]
    fn empty_solution_list_yields_none() {
        let broken = "### 근본 원인\nsomething\n\n### 해결 방법\n\n\n### 재발 방지\n- x\n";
        assert!(parse_llm_reply(broken).is_none());
    }
}
