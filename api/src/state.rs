use crate::assistant::Assistant;
use crate::llm::LanguageModel;
use crate::prediction::Classifier;
use crate::resolver::AdviceResolver;

#[derive(Clone)]
pub struct AppState {
    pub advisor: AdviceResolver,
    pub assistant: Assistant,
    pub classifier: Classifier,
}

impl AppState {
    pub fn new(model: LanguageModel, classifier: Classifier) -> Self {
        Self {
            advisor: AdviceResolver::new(model.clone()),
            assistant: Assistant::new(model),
            classifier,
        }
    }

    /// State with no language model and no classifier, as when neither
    /// `GEMINI_API_KEY` nor `KRISHI_PREDICT_URL` is set.
    #[cfg(test)]
    pub fn fallback_only() -> Self {
        let timeout = std::time::Duration::from_secs(1);
        Self::new(
            LanguageModel::unavailable("GEMINI_API_KEY is not set", timeout),
            Classifier::unavailable("KRISHI_PREDICT_URL is not set", timeout),
        )
    }
}
