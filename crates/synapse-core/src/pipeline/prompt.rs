pub const GRADER_PROMPT_TEMPLATE: &str = "\
You are a lenient relevance grader for source-code retrieval. Decide whether the \
document could help answer the question.

Scoring (prefer keeping documents):
- \"yes\": directly relevant, contains key information that answers the question
- \"partial\": indirectly relevant, background, related concepts, or useful context
- \"no\": entirely unrelated to the question

Guidelines:
1. Documents from the same project lean towards \"partial\" rather than \"no\".
2. Function, class, or variable names that match the question deserve \"yes\" or \"partial\".
3. READMEs, config files, and comments usually carry useful context.

Respond with strict JSON only:
{\"score\": \"yes\"} or {\"score\": \"partial\"} or {\"score\": \"no\"}

Question: {question}
Document:
{document}
JSON:";

/// Build the per-fragment grading prompt.
#[must_use]
pub fn build_grader_prompt(question: &str, document: &str) -> String {
    fill_template(
        GRADER_PROMPT_TEMPLATE,
        &[("question", question), ("document", document)],
    )
}

pub const GENERATOR_SYSTEM_PROMPT: &str = "\
You are a software architect fluent in Python and open-source codebases. Answer the \
user's question using only the provided context code.

If the answer is not in the context, say plainly that you could not find the relevant \
information in the provided code. Do not invent anything. Be professional and concise, \
and cite function or variable names from the code where possible.";

pub const GENERATOR_USER_TEMPLATE: &str = "\
---
Context code:
{context}
---
Question:
{question}
---
Answer:";

/// Build the user turn for answer generation.
#[must_use]
pub fn build_generator_prompt(question: &str, context: &str) -> String {
    fill_template(
        GENERATOR_USER_TEMPLATE,
        &[("context", context), ("question", question)],
    )
}

/// Substitute `{name}` placeholders in one pass over `template`.
///
/// Substituted values are never rescanned, so braces inside retrieved code survive
/// verbatim. Unknown `{...}` sequences are copied through.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let filled = values.iter().find_map(|(name, value)| {
            after
                .strip_prefix(*name)?
                .strip_prefix('}')
                .map(|tail| (*value, tail))
        });
        match filled {
            Some((value, tail)) => {
                out.push_str(value);
                rest = tail;
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
