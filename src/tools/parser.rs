use once_cell::sync::Lazy;
use regex::Regex;

use super::types::ToolInvocation;

/// A model reply split into reasoning and at most one proposed invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub thought: String,
    pub invocation: Option<ToolInvocation>,
}

static ACTION_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([A-Z_]+)(?::\s*([^\]]*))?\]").expect("action header regex"));

/// Parse a model reply into a thought and zero-or-one tool invocation
///
/// Actions use bracket-tag blocks, e.g. `[READ_FILE: src/main.rs]` or
/// `[WRITE_FILE: src/main.rs] ... [/WRITE_FILE]`. Only the first action is
/// taken; the loop executes one tool per cycle, and anything after the
/// first block is the model getting ahead of its observations.
pub fn parse_reply(response: &str) -> ParsedReply {
    let mut invocation = None;
    let mut thought = response.to_string();

    if let Some(captures) = ACTION_HEADER.captures(response) {
        let full = captures.get(0).expect("regex match");
        let tag = captures.get(1).expect("tag group").as_str();
        let header = captures.get(2).map(|m| m.as_str().trim()).unwrap_or("");

        // Body blocks carry content up to a matching close tag
        let close_tag = format!("[/{}]", tag);
        let after_header = &response[full.end()..];
        let (body, block_end) = match after_header.find(&close_tag) {
            Some(pos) => (
                Some(after_header[..pos].trim_matches('\n').to_string()),
                full.end() + pos + close_tag.len(),
            ),
            None => (None, full.end()),
        };

        let raw = response[full.start()..block_end].to_string();
        invocation = Some(build_invocation(tag, header, body, raw));

        // The thought is everything before the first action block
        thought = response[..full.start()].to_string();
    }

    let thought = thought
        .trim()
        .trim_start_matches("Thought:")
        .trim()
        .to_string();

    ParsedReply {
        thought,
        invocation,
    }
}

/// Map a block tag onto a named invocation with its argument mapping
fn build_invocation(tag: &str, header: &str, body: Option<String>, raw: String) -> ToolInvocation {
    let name = tag.to_ascii_lowercase();

    let mut inv = match tag {
        "READ_FILE" | "DELETE_FILE" | "CREATE_DIR" => {
            ToolInvocation::new(name, raw).with_arg("path", header)
        }
        "LIST_FILES" => {
            let path = if header.is_empty() { "." } else { header };
            ToolInvocation::new(name, raw).with_arg("path", path)
        }
        "SEARCH_FILES" => {
            let (pattern, path) = match header.split_once(char::is_whitespace) {
                Some((pattern, path)) => (pattern, path.trim()),
                None => (header, "."),
            };
            ToolInvocation::new(name, raw)
                .with_arg("pattern", pattern)
                .with_arg("path", path)
        }
        "COMMAND" => ToolInvocation::new("run_command", raw).with_arg("command", header),
        "WRITE_FILE" => ToolInvocation::new(name, raw).with_arg("path", header),
        "EDIT_FILE" => {
            // Header format: `path start_line end_line`
            let mut inv = ToolInvocation::new(name, raw);
            let mut parts = header.rsplitn(3, char::is_whitespace);
            let end = parts.next().unwrap_or_default();
            let start = parts.next().unwrap_or_default();
            let path = parts.next().unwrap_or_default();
            inv = inv
                .with_arg("path", path)
                .with_arg("start_line", start)
                .with_arg("end_line", end);
            inv
        }
        "GIT_STATUS" => ToolInvocation::new(name, raw),
        "GIT_DIFF" => {
            let inv = ToolInvocation::new(name, raw);
            if header.is_empty() {
                inv
            } else {
                inv.with_arg("path", header)
            }
        }
        "GIT_COMMIT" => ToolInvocation::new(name, raw).with_arg("message", header),
        "FINISH" => {
            let inv = ToolInvocation::new(name, raw);
            match &body {
                Some(summary) if !summary.is_empty() => inv.with_arg("summary", summary.as_str()),
                _ if !header.is_empty() => inv.with_arg("summary", header),
                _ => inv,
            }
        }
        // Unrecognized tags still parse; resolution reports UnknownTool
        _ => {
            let inv = ToolInvocation::new(name, raw);
            if header.is_empty() {
                inv
            } else {
                inv.with_arg("input", header)
            }
        }
    };

    // Body content attaches as the `content` argument for file mutations
    if matches!(tag, "WRITE_FILE" | "EDIT_FILE") {
        inv = inv.with_arg("content", body.unwrap_or_default());
    }

    inv
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_reply_has_no_invocation() {
        let parsed = parse_reply("The task is complete; all files compile.");
        assert!(parsed.invocation.is_none());
        assert_eq!(parsed.thought, "The task is complete; all files compile.");
    }

    #[test]
    fn test_read_file_block() {
        let parsed = parse_reply("Thought: need to inspect the entry point\n[READ_FILE: src/main.rs]");
        assert_eq!(parsed.thought, "need to inspect the entry point");

        let inv = parsed.invocation.unwrap();
        assert_eq!(inv.name, "read_file");
        assert_eq!(inv.args.get("path").unwrap(), "src/main.rs");
    }

    #[test]
    fn test_write_file_block_with_body() {
        let reply = "Creating the readme now.\n[WRITE_FILE: README.md]\n# Hello\n[/WRITE_FILE]";
        let parsed = parse_reply(reply);

        let inv = parsed.invocation.unwrap();
        assert_eq!(inv.name, "write_file");
        assert_eq!(inv.args.get("path").unwrap(), "README.md");
        assert_eq!(inv.args.get("content").unwrap(), "# Hello");
        assert!(inv.raw.contains("[/WRITE_FILE]"));
    }

    #[test]
    fn test_edit_file_header_parts() {
        let reply = "[EDIT_FILE: src/lib.rs 3 7]\nnew body\n[/EDIT_FILE]";
        let inv = parse_reply(reply).invocation.unwrap();

        assert_eq!(inv.args.get("path").unwrap(), "src/lib.rs");
        assert_eq!(inv.args.get("start_line").unwrap(), "3");
        assert_eq!(inv.args.get("end_line").unwrap(), "7");
        assert_eq!(inv.args.get("content").unwrap(), "new body");
    }

    #[test]
    fn test_command_block() {
        let inv = parse_reply("[COMMAND: cargo test --lib]").invocation.unwrap();
        assert_eq!(inv.name, "run_command");
        assert_eq!(inv.args.get("command").unwrap(), "cargo test --lib");
    }

    #[test]
    fn test_only_first_action_is_taken() {
        let reply = "[READ_FILE: a.txt]\n[READ_FILE: b.txt]";
        let inv = parse_reply(reply).invocation.unwrap();
        assert_eq!(inv.args.get("path").unwrap(), "a.txt");
    }

    #[test]
    fn test_finish_with_summary_body() {
        let reply = "All done.\n[FINISH]\nAdded the endpoint and tests.\n[/FINISH]";
        let inv = parse_reply(reply).invocation.unwrap();
        assert_eq!(inv.name, "finish");
        assert_eq!(inv.args.get("summary").unwrap(), "Added the endpoint and tests.");
    }

    #[test]
    fn test_unknown_tag_still_parses() {
        let inv = parse_reply("[FORMAT_DISK: /dev/sda]").invocation.unwrap();
        assert_eq!(inv.name, "format_disk");
        assert_eq!(inv.args.get("input").unwrap(), "/dev/sda");
    }

    #[test]
    fn test_search_files_pattern_and_dir() {
        let inv = parse_reply("[SEARCH_FILES: TODO src]").invocation.unwrap();
        assert_eq!(inv.args.get("pattern").unwrap(), "TODO");
        assert_eq!(inv.args.get("path").unwrap(), "src");
    }
}
