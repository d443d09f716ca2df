// Provider module
// Seams for the hosted embedding and completion services

pub mod openai;

use anyhow::Result;
use async_trait::async_trait;

pub use openai::OpenAiClient;

/// Instructions that precede the retrieved context in every prompt
pub const QA_INSTRUCTIONS: &str = "Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Produces one embedding vector per input text, in input order
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Generates answer text for a question and its supporting context
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<String>;
}

/// A question together with the retrieved context, best match first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub question: String,
    pub context: Vec<String>,
}

impl Prompt {
    #[inline]
    pub fn new(question: impl Into<String>, context: Vec<String>) -> Self {
        Self {
            question: question.into(),
            context,
        }
    }

    /// Render the prompt text sent to the completion provider
    #[inline]
    pub fn render(&self) -> String {
        format!(
            "{}\n\n{}\n\nQuestion: {}\nHelpful Answer:",
            QA_INSTRUCTIONS,
            self.context.join("\n\n"),
            self.question
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_places_context_before_question() {
        let prompt = Prompt::new(
            "How many paid leave days do I get?",
            vec![
                "Employees receive 20 paid leave days per year.".to_string(),
                "Leave requests go through the HR portal.".to_string(),
            ],
        );

        let rendered = prompt.render();
        assert!(rendered.starts_with(QA_INSTRUCTIONS));
        assert!(rendered.ends_with("Question: How many paid leave days do I get?\nHelpful Answer:"));

        let first = rendered
            .find("Employees receive 20")
            .expect("first chunk present");
        let second = rendered.find("Leave requests go").expect("second chunk present");
        let question = rendered.find("Question:").expect("question present");
        assert!(first < second);
        assert!(second < question);
    }

    #[test]
    fn render_without_context() {
        let prompt = Prompt::new("Anything?", Vec::new());
        assert_eq!(
            prompt.render(),
            format!("{}\n\n\n\nQuestion: Anything?\nHelpful Answer:", QA_INSTRUCTIONS)
        );
    }
}
