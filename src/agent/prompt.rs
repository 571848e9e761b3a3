use crate::context::PackedContext;
use crate::models::{ChatMessage, GenerationParams, ModelRequest};

/// System prompt: who the agent is, what tools exist, how to invoke them
pub fn system_prompt() -> String {
    format!(
        "You are an expert software development agent working inside a sandboxed project.\n\
         \n\
         Available tools (one action per reply, using exactly these forms):\n\
         {}\n\
         \n\
         Reply with your reasoning, then at most ONE action block. After each\n\
         action you will receive an Observation with the result. When the task\n\
         is complete, reply with [FINISH] and a short summary, or simply answer\n\
         with no action block.\n\
         \n\
         Guidelines:\n\
         - Verify structure with [LIST_FILES] before operating on files\n\
         - Build on earlier observations instead of repeating actions\n\
         - Denied or failed actions are feedback: adjust and try another way\n\
         - Every path must stay inside the project; destructive operations are\n\
           backed up automatically and may require operator confirmation",
        tool_reference()
    )
}

/// The tool reference shown to the model
fn tool_reference() -> String {
    [
        "[READ_FILE: path] - read a file",
        "[WRITE_FILE: path] content [/WRITE_FILE] - create or overwrite a file",
        "[EDIT_FILE: path start_line end_line] content [/EDIT_FILE] - replace a line range",
        "[DELETE_FILE: path] - delete a file",
        "[CREATE_DIR: path] - create a directory",
        "[LIST_FILES: path] - list directory entries",
        "[SEARCH_FILES: pattern path] - search file contents",
        "[COMMAND: shell command] - run a command in the project root",
        "[GIT_STATUS] - show repository status",
        "[GIT_DIFF] or [GIT_DIFF: path] - show working-tree changes",
        "[GIT_COMMIT: message] - stage everything and commit",
        "[FINISH] summary [/FINISH] - declare the task complete",
    ]
    .map(|line| format!("- {}", line))
    .join("\n")
}

/// Assemble the request for one THINKING transition
pub fn build_request(task: &str, packed: &PackedContext, params: GenerationParams) -> ModelRequest {
    let mut user = String::new();

    let context = packed.render();
    if !context.is_empty() {
        user.push_str("Project context:\n\n");
        user.push_str(&context);
    }

    user.push_str(&format!("Task: {}\n\n", task));
    user.push_str(
        "Think about the next concrete step, then reply with your reasoning \
         and at most one action block.",
    );

    ModelRequest {
        messages: vec![ChatMessage::system(system_prompt()), ChatMessage::user(user)],
        params,
    }
}
