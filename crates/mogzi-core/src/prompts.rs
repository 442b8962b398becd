// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT

/// Compose the system prompt.  Pure function: everything it needs comes in
/// through the arguments.
pub fn system_prompt(custom: Option<&str>, tool_names: &[String]) -> String {
    if let Some(text) = custom {
        return text.to_string();
    }
    let mut prompt = String::from(
        "You are mogzi, an interactive terminal assistant. You help the user \
         by answering questions and operating on their working directory \
         through the available tools. Prefer tools over guessing file \
         contents. Keep answers concise; this is a terminal.",
    );
    if !tool_names.is_empty() {
        prompt.push_str("\n\nAvailable tools: ");
        prompt.push_str(&tool_names.join(", "));
        prompt.push('.');
    }
    prompt
}
