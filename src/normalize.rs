//! Cleanup and parsing of raw model output.
//!
//! Models wrap commands in code fences or backticks despite being told not
//! to, so [`normalize`] peels off one layer of that wrapping. [`split`] then
//! pulls out the sentinel lines requested by the prompt guidelines. Any line
//! that does not match a known sentinel is kept as primary content.

use crate::prompt::{CLARIFY_SENTINEL, EXPLAIN_SENTINEL};
use crate::protocol::{Annotation, ParsedAnswer};

const FENCE: &str = "```";

/// Strip incidental markdown wrapping from `raw`.
pub fn normalize(raw: &str) -> String {
    let text = raw.trim();

    if text.len() >= 2 * FENCE.len() && text.starts_with(FENCE) && text.ends_with(FENCE) {
        let inner = &text[FENCE.len()..text.len() - FENCE.len()];
        return strip_language_tag(inner)
            .trim_start_matches(['\r', '\n'])
            .trim_end()
            .to_string();
    }

    if text.len() > 2 && text.starts_with('`') && text.ends_with('`') {
        return text[1..text.len() - 1].trim().to_string();
    }

    text.to_string()
}

/// Drop the first line of a fence body when it is only a language tag and
/// more content follows it.
fn strip_language_tag(inner: &str) -> &str {
    match inner.split_once('\n') {
        Some((first, rest)) if is_language_tag(first) && !rest.trim().is_empty() => rest,
        _ => inner,
    }
}

fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.' | '#'))
}

/// Partition normalized text into primary content and annotations.
///
/// Blank lines are dropped. Annotation order is preserved.
pub fn split(normalized: &str) -> ParsedAnswer {
    let mut primary = Vec::new();
    let mut annotations = Vec::new();

    for line in normalized.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_annotation(line) {
            Some(annotation) => annotations.push(annotation),
            None => primary.push(line),
        }
    }

    ParsedAnswer {
        primary_text: primary.join("\n"),
        annotations,
    }
}

fn parse_annotation(line: &str) -> Option<Annotation> {
    let line = line.trim_start();
    if let Some(rest) = line.strip_prefix(EXPLAIN_SENTINEL) {
        return Some(Annotation::warning(rest.trim()));
    }
    if let Some(rest) = line.strip_prefix(CLARIFY_SENTINEL) {
        return Some(Annotation::clarification(rest.trim()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AnnotationKind;

    #[test]
    fn test_normalize_plain() {
        assert_eq!(normalize("  ls -la \n"), "ls -la");
    }

    #[test]
    fn test_normalize_code_block() {
        assert_eq!(normalize("```bash\nls -la\n```"), "ls -la");
    }

    #[test]
    fn test_normalize_code_block_without_tag() {
        assert_eq!(normalize("```\nls -la\n```"), "ls -la");
    }

    #[test]
    fn test_normalize_single_line_fence_keeps_content() {
        assert_eq!(normalize("```ls -la```"), "ls -la");
    }

    #[test]
    fn test_normalize_lone_word_in_fence_is_content() {
        assert_eq!(normalize("```ls\n```"), "ls");
        assert_eq!(normalize("```pwd\n\n```"), "pwd");
        assert_eq!(normalize("```\n```"), "");
    }

    #[test]
    fn test_normalize_backticks() {
        assert_eq!(normalize("`ls -la`"), "ls -la");
        // Only one layer comes off.
        assert_eq!(normalize("``ls``"), "`ls`");
        // Too short to be a wrapped command.
        assert_eq!(normalize("``"), "``");
    }

    #[test]
    fn test_normalize_removes_exactly_one_fence() {
        let bodies = [
            "ls -la",
            "  echo one\n  echo two",
            "find . -name '*.rs' \\\n  | xargs wc -l",
            "```\nnested\n```",
        ];
        for body in bodies {
            for tag in ["", "bash", "sh", "shell-session", "c++"] {
                let wrapped = format!("```{}\n{}\n```", tag, body);
                assert_eq!(normalize(&wrapped), body, "tag {:?}", tag);
            }
        }
    }

    #[test]
    fn test_normalize_idempotent_without_fences() {
        let samples = [
            "ls -la",
            "  git status  ",
            "echo a\n\necho b\n",
            "# explain: removes everything\nrm -rf /tmp/x",
            "",
            "   ",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "sample {:?}", sample);
        }
    }

    #[test]
    fn test_split_plain_command() {
        let answer = split("git branch -a");
        assert_eq!(answer.primary_text, "git branch -a");
        assert!(answer.annotations.is_empty());
    }

    #[test]
    fn test_split_extracts_warning() {
        let answer =
            split("rm -rf node_modules\n# explain: Deletes the node_modules directory permanently.");
        assert_eq!(answer.primary_text, "rm -rf node_modules");
        assert_eq!(
            answer.annotations,
            vec![Annotation::warning(
                "Deletes the node_modules directory permanently."
            )]
        );
    }

    #[test]
    fn test_split_extracts_clarification() {
        let answer = split("# clarify: Which directory should be archived?");
        assert!(answer.primary_text.is_empty());
        assert_eq!(answer.annotations[0].kind, AnnotationKind::Clarification);
        assert_eq!(
            answer.annotations[0].text,
            "Which directory should be archived?"
        );
    }

    #[test]
    fn test_split_sentinel_only() {
        let answer = split(&normalize("# explain: This wipes the disk."));
        assert!(answer.primary_text.is_empty());
        assert_eq!(answer.annotations, vec![Annotation::warning("This wipes the disk.")]);
    }

    #[test]
    fn test_split_keeps_order_and_unknown_comments() {
        let text =
            "cp a b\n# explain: overwrites b\nmv c d\n  # explain: overwrites d\n# just a comment";
        let answer = split(text);
        assert_eq!(answer.primary_text, "cp a b\nmv c d\n# just a comment");
        assert_eq!(
            answer.annotations,
            vec![
                Annotation::warning("overwrites b"),
                Annotation::warning("overwrites d"),
            ]
        );
        assert_eq!(
            answer.joined(AnnotationKind::Warning).as_deref(),
            Some("overwrites b overwrites d")
        );
    }

    #[test]
    fn test_split_never_drops_lines() {
        let samples = [
            "ls",
            "a\nb\n\nc",
            "# explain: x\n# clarify: y\nz",
            "  \n# explain: only\n\n",
            "one\n  two  \n# explain:\nthree",
        ];
        for sample in samples {
            let answer = split(sample);
            let primary_lines = answer.primary_text.lines().count();
            let nonempty = sample.lines().filter(|l| !l.trim().is_empty()).count();
            assert_eq!(
                primary_lines + answer.annotations.len(),
                nonempty,
                "sample {:?}",
                sample
            );
        }
    }
}
