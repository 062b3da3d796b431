//! Prompt templates.

/// Default prompt for answering a question from retrieved page context.
pub const DEFAULT_ANSWER_PROMPT: &str = r#"You are answering a question about a PDF document using ONLY the context below. Each context block is labelled with the page it came from.

Context:
{context}

Question: {question}

Respond with ONLY a JSON object of this shape, no markdown and no preamble:
{"answer": "<your answer in plain prose>", "sources": "<one or more sentences copied VERBATIM from the context that support the answer, joined with '. '>"}

Copy the source sentences exactly as they appear in the context. Do not paraphrase them. If the context does not contain the answer, say so in "answer" and leave "sources" empty."#;
