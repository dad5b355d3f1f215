//! Prompt templates sent to the summarization agent.

use trendbot_shared::{Article, PromptStyle};

/// System message for every request.
pub const INSTRUCTIONS: &str = "You are a technology news analyst. \
Read the article you are given and reply using exactly the output template in the request. \
Keep the labels unchanged. If no code example fits the article, write なし in the code section.";

/// Output template both styles ask the model to fill in. The labels here are
/// what [`crate::parse`] looks for.
const OUTPUT_TEMPLATE: &str = "\
**要約：**
<summary>

**サンプルコード：**
<a short code example related to the article, or なし>";

/// Build the user prompt for one article.
pub fn build(style: PromptStyle, article: &Article, max_summary_chars: usize) -> String {
    match style {
        PromptStyle::Digest => format!(
            "Summarize the following article in three lines, then add a sample code snippet \
             if one is relevant.\n\n\
             Title: {title}\n\
             URL: {url}\n\
             Content: {content}\n\n\
             Reply in this format:\n{OUTPUT_TEMPLATE}",
            title = article.title,
            url = article.source_url,
            content = article.content.as_deref().unwrap_or(""),
        ),
        PromptStyle::Social => format!(
            "Write a casual, friendly summary of the following text in at most \
             {max_summary_chars} characters, the way you would post it on social media.\n\n\
             {text}\n\n\
             Reply in this format:\n{OUTPUT_TEMPLATE}",
            text = article.body_or_title(),
        ),
    }
}
