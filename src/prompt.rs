//! Prompt assembly.
//!
//! Renders an [`EnvironmentSnapshot`] and a [`PromptRequest`] into the single
//! instruction string sent to the model. The guidelines below are a contract
//! with the model: [`crate::normalize`] relies on the sentinels they name.

use crate::context::EnvironmentSnapshot;
use crate::protocol::PromptRequest;
use std::fmt::Write;

/// Line prefix the model uses to flag a potentially destructive command.
pub const EXPLAIN_SENTINEL: &str = "# explain:";

/// Line prefix the model uses to ask a clarifying question.
pub const CLARIFY_SENTINEL: &str = "# clarify:";

/// Behavioral guidelines for generate mode, in order.
pub const GUIDELINES: [&str; 5] = [
    "Prefer a single command. If several commands are truly needed, put one command per line.",
    "Do not include any conversational preamble, commentary, or markdown formatting.",
    "If a command is potentially destructive (deletes data, overwrites files, or cannot be undone), follow it with exactly one line starting with `# explain:` that describes the risk.",
    "If the question is purely conceptual and no command applies, answer in one sentence instead of a command.",
    "If the request is ambiguous, reply with a single line starting with `# clarify:` that asks one clarifying question.",
];

/// Build the prompt for `request`.
pub fn build(request: &PromptRequest, env: &EnvironmentSnapshot) -> String {
    match request {
        PromptRequest::Generate { question } => build_generate(question, env),
        PromptRequest::Explain { command_text } => build_explain(command_text, env),
    }
}

fn build_generate(question: &str, env: &EnvironmentSnapshot) -> String {
    let mut out = String::new();
    out.push_str(
        "You are an expert command-line assistant. Translate the user's request into a shell \
         command that works in their environment.\n\n",
    );

    out.push_str("Environment:\n");
    push_field(&mut out, "Platform", &env.platform);
    if let Some(distro) = &env.distro {
        push_field(&mut out, "Distro", distro);
    }
    push_field(&mut out, "Shell", &env.shell);
    push_field(&mut out, "User", &env.user);
    push_field(&mut out, "Working directory", &env.cwd.display().to_string());

    if !env.files.is_empty() {
        let mut files = env.files.names.join(", ");
        if env.files.omitted > 0 {
            let _ = write!(files, ", ... ({} more)", env.files.omitted);
        }
        push_field(&mut out, "Files", &files);
    }

    if !env.tools.is_empty() {
        push_field(&mut out, "Available tools", &env.tools.join(", "));
    }

    if env.vcs.is_repository {
        push_field(
            &mut out,
            "Git branch",
            env.vcs.branch.as_deref().unwrap_or("unknown"),
        );
        if !env.vcs.recent_status_lines.is_empty() {
            out.push_str("- Git status:\n");
            for line in &env.vcs.recent_status_lines {
                let _ = writeln!(out, "    {}", line);
            }
        }
    }

    if let Some(project) = &env.project {
        if let Some(stack) = &project.stack {
            push_field(&mut out, "Project stack", stack);
        }
        if let Some(manager) = &project.package_manager {
            push_field(&mut out, "Package manager", manager);
        }
        if !project.tags.is_empty() {
            push_field(&mut out, "Project tags", &project.tags.join(", "));
        }
    }

    out.push_str("\nGuidelines:\n");
    for (i, guideline) in GUIDELINES.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, guideline);
    }

    let _ = write!(out, "\nRequest: {}\n\nCommand:", question);
    out
}

fn build_explain(command_text: &str, env: &EnvironmentSnapshot) -> String {
    let mut out = String::new();
    out.push_str("You are an expert command-line assistant who explains shell commands clearly.\n\n");

    out.push_str("Environment:\n");
    push_field(&mut out, "Platform", &env.platform);
    push_field(&mut out, "Shell", &env.shell);
    push_field(&mut out, "Working directory", &env.cwd.display().to_string());

    out.push_str(
        "\nExplain what the following command does, step by step. Describe each notable flag \
         and point out anything risky.\n",
    );

    let _ = write!(out, "\nCommand: {}\n\nExplanation:", command_text);
    out
}

fn push_field(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "- {}: {}", label, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FileSample, ProjectHints, VcsInfo};
    use std::path::PathBuf;

    fn snapshot() -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            platform: "linux".to_string(),
            distro: None,
            shell: "/bin/zsh".to_string(),
            user: "dev".to_string(),
            cwd: PathBuf::from("/home/dev/project"),
            files: FileSample::default(),
            tools: Vec::new(),
            vcs: VcsInfo::default(),
            project: None,
        }
    }

    fn generate(question: &str) -> PromptRequest {
        PromptRequest::Generate {
            question: question.to_string(),
        }
    }

    #[test]
    fn test_generate_skips_absent_fields() {
        let prompt = build(&generate("list files"), &snapshot());

        assert!(prompt.contains("- Platform: linux\n"));
        assert!(prompt.contains("- Shell: /bin/zsh\n"));
        assert!(prompt.contains("- Working directory: /home/dev/project\n"));
        assert!(!prompt.contains("Distro"));
        assert!(!prompt.contains("Files"));
        assert!(!prompt.contains("Available tools"));
        assert!(!prompt.contains("Git"));
        assert!(!prompt.contains("Project"));
    }

    #[test]
    fn test_generate_renders_populated_fields() {
        let env = EnvironmentSnapshot {
            distro: Some("Ubuntu 24.04 LTS".to_string()),
            files: FileSample {
                names: vec!["Cargo.toml".to_string(), "src/".to_string()],
                omitted: 3,
            },
            tools: vec!["git".to_string(), "cargo".to_string()],
            vcs: VcsInfo {
                is_repository: true,
                branch: Some("main".to_string()),
                recent_status_lines: vec![" M src/lib.rs".to_string()],
            },
            project: Some(ProjectHints {
                stack: Some("rust".to_string()),
                package_manager: None,
                tags: vec!["cli".to_string()],
            }),
            ..snapshot()
        };

        let prompt = build(&generate("run the tests"), &env);

        assert!(prompt.contains("- Distro: Ubuntu 24.04 LTS\n"));
        assert!(prompt.contains("- Files: Cargo.toml, src/, ... (3 more)\n"));
        assert!(prompt.contains("- Available tools: git, cargo\n"));
        assert!(prompt.contains("- Git branch: main\n"));
        assert!(prompt.contains("- Git status:\n     M src/lib.rs\n"));
        assert!(prompt.contains("- Project stack: rust\n"));
        assert!(prompt.contains("- Project tags: cli\n"));
        assert!(!prompt.contains("Package manager"));
    }

    #[test]
    fn test_generate_contract() {
        let prompt = build(&generate("how to list all git branches"), &snapshot());

        for (i, guideline) in GUIDELINES.iter().enumerate() {
            assert!(prompt.contains(&format!("{}. {}\n", i + 1, guideline)));
        }
        assert!(prompt.contains(EXPLAIN_SENTINEL));
        assert!(prompt.contains(CLARIFY_SENTINEL));
        assert!(prompt.ends_with("Request: how to list all git branches\n\nCommand:"));
    }

    #[test]
    fn test_question_is_verbatim() {
        let question = "find files named `*.log` & \"delete\" them\nplease";
        let prompt = build(&generate(question), &snapshot());
        assert!(prompt.contains(question));
    }

    #[test]
    fn test_explain_uses_reduced_environment() {
        let env = EnvironmentSnapshot {
            tools: vec!["git".to_string()],
            vcs: VcsInfo {
                is_repository: true,
                branch: Some("main".to_string()),
                recent_status_lines: Vec::new(),
            },
            ..snapshot()
        };
        let request = PromptRequest::Explain {
            command_text: "tar -xzvf archive.tar.gz".to_string(),
        };

        let prompt = build(&request, &env);

        assert!(prompt.contains("- Platform: linux\n"));
        assert!(prompt.contains("- Shell: /bin/zsh\n"));
        assert!(prompt.contains("- Working directory: /home/dev/project\n"));
        assert!(!prompt.contains("User"));
        assert!(!prompt.contains("Available tools"));
        assert!(!prompt.contains("Git branch"));
        assert!(!prompt.contains("Guidelines"));
        assert!(prompt.ends_with("Command: tar -xzvf archive.tar.gz\n\nExplanation:"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let env = snapshot();
        let request = generate("show disk usage");
        assert_eq!(build(&request, &env), build(&request, &env));
    }
}
