//! Prompt templates for the language-model backend.

use readagent_types::multiple_choice_text;

/// System message for answering calls.
pub const ANSWER_SYSTEM: &str = "You are a question answering assistant.";

/// Ask for a natural pause point among the `<k>` labels of a passage.
pub fn pagination_prompt(preceding: &str, passage: &str, end_tag: &str) -> String {
    format!(
        r#"
You are given a passage taken from a longer text.
Numbered labels such as <0> appear between some of its sentences.
Pick one label that sits at a natural transition in the passage,
for example the end of a dialogue, the end of an argument, or a change of topic.
Reply with the label first and then explain your choice.
For example, if <57> is a natural transition, answer with "Label: <57>\n Because ..."

Passage:

{preceding}
{passage}
{end_tag}

"#
    )
}

/// Ask for a shortened version of one page.
pub fn gisting_prompt(page: &str) -> String {
    format!(
        r#"
Please shorten the following passage.
Only give the shortened version. DO NOT explain your reasoning.

Passage:
{page}

"#
    )
}

/// Ask which pages to re-read before answering.
pub fn lookup_prompt(shortened_article: &str, question: &str, max_lookup_pages: usize) -> String {
    format!(
        r#"
The following text is what you remember from reading an article, followed by a question about it.
You may read 1 to {max_lookup_pages} page(s) of the article again to refresh your memory before answering.
Respond with the page(s) you would like to read.
For example, if you only need Page 8, respond with "I want to look up Page [8] to ...";
if you need Pages 7 and 12, respond with "I want to look up Page [7, 12] to ...";
if you need Pages 2, 3, 7, 15 and 18, respond with "I want to look up Page [2, 3, 7, 15, 18] to ...".
DO NOT select more pages than you need.
DO NOT answer the question yet.

Text:
{shortened_article}

Question:
{question}

Which 1 to {max_lookup_pages} page(s) would you like to read again?

"#
    )
}

/// Multiple-choice answering prompt; the answer is marked `[[n]]`.
pub fn multiple_choice_prompt(context: &str, question: &str, options: &[String]) -> String {
    let question_and_options = multiple_choice_text(question, options);
    let markers: Vec<String> = (1..=options.len()).map(|n| format!("[[{}]]", n)).collect();
    format!(
        r#"
[Start of Context]:

{context}

[End of Context]

[Start of Question]:

{question_and_options}

[End of Question]

[Instructions:]
Based on the context provided, select the most accurate answer to the question from the given options.
Start with a short explanation and then give your answer as {markers}.
For example, if the first option is the most accurate answer, respond with [[1]].
"#,
        markers = markers.join(" or ")
    )
}

/// Short factual answering prompt for free-form questions.
pub fn generation_prompt(context: &str, question: &str) -> String {
    format!(
        r#"
[Start of Context]:

{context}

[End of Context]

[Start of Question]:

{question}

[End of Question]

[Instructions:]
- Answer the question **only** from the provided context.
- Keep the answer **short and factual** (preferably 1-20 words).
- Do **not** add explanations beyond what is necessary.
- If the answer is **not stated** in the context, respond with: "Not found in context."

"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_prompt_contains_sections() {
        let prompt = pagination_prompt("...\nprev", "a\n<3>\nb\n<4>", "next\n...");
        assert!(prompt.contains("...\nprev\na\n<3>\nb\n<4>\nnext\n..."));
    }

    #[test]
    fn test_lookup_prompt_mentions_bound() {
        let prompt = lookup_prompt("<Page 0>\ngist", "Why?", 4);
        assert!(prompt.contains("1 to 4 page(s)"));
        assert!(prompt.contains("<Page 0>\ngist"));
    }

    #[test]
    fn test_multiple_choice_prompt_numbers_options() {
        let options = vec!["yes".to_string(), "no".to_string()];
        let prompt = multiple_choice_prompt("ctx", "Is it?", &options);
        assert!(prompt.contains("[[1]]: yes"));
        assert!(prompt.contains("[[2]]: no"));
        assert!(prompt.contains("as [[1]] or [[2]]"));
    }
}
