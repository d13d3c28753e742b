//! Text classification demo
//!
//! A toy "conversation monitor": a fixed labelled corpus is embedded with
//! TF-IDF, a logistic model flags urgent sentences, and linear SHAP shows
//! which words drove the decision. It shares no data with the tabular
//! pipeline.

mod vectorizer;

pub use vectorizer::{TextTokenizer, TfidfVectorizer};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::{PipelineConfig, TextDemoConfig};
use crate::error::Result;
use crate::explainability::LinearExplainer;
use crate::training::{Classifier, LogisticRegression};
use crate::visualization::{colors, BarChart};

/// Labelled training sentences; 1 marks an urgent message
pub const CORPUS: [(&str, u8); 15] = [
    ("I have a slight headache", 0),
    ("My finger is itching", 0),
    ("I think I have a cold", 0),
    ("SEVERE CHEST PAIN AND DIZZINESS", 1),
    ("URGENT HEART ATTACK SYMPTOMS", 1),
    ("I CANNOT BREATHE", 1),
    ("Just a normal checkup", 0),
    ("My knee hurts after walking", 0),
    ("I feel fine today", 0),
    ("SUDDEN PARALYSIS ON LEFT SIDE", 1),
    ("CRUSHING PRESSURE IN CHEST", 1),
    ("My foot is sore", 0),
    ("SHARP PAIN SPREADING TO MY LEFT ARM", 1),
    ("I AM COUGHING UP BLOOD", 1),
    ("I have a mild rash on my arm", 0),
];

/// Plot written by the single-run variant
pub const DEMO_PLOT: &str = "text_explanation_demo.png";

/// Attribution of one vocabulary token present in the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenAttribution {
    pub token: String,
    pub tfidf: f64,
    pub attribution: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextExplanation {
    /// Probability of the urgent class
    pub probability: f64,
    pub urgent: bool,
    /// Present tokens in vocabulary order
    pub tokens: Vec<TokenAttribution>,
}

impl TextExplanation {
    /// Token with the largest absolute attribution
    pub fn strongest(&self) -> Option<&TokenAttribution> {
        self.tokens.iter().max_by(|a, b| {
            a.attribution
                .abs()
                .partial_cmp(&b.attribution.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}

/// Result of classifying one sentence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TextOutcome {
    Explained(TextExplanation),
    /// No token of the sentence is in the vocabulary
    NoKnownTokens,
}

/// Fitted vectorizer, classifier and explainer
pub struct TextDemo {
    vectorizer: TfidfVectorizer,
    model: LogisticRegression,
    explainer: LinearExplainer,
    config: TextDemoConfig,
    plots_dir: PathBuf,
}

impl TextDemo {
    /// Fit on [`CORPUS`]
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let sentences: Vec<&str> = CORPUS.iter().map(|(s, _)| *s).collect();
        let labels: Array1<f64> = CORPUS.iter().map(|(_, l)| f64::from(*l)).collect();

        let mut vectorizer = TfidfVectorizer::new();
        let x: Array2<f64> = vectorizer.fit_transform(&sentences)?;

        let mut model = LogisticRegression::from_config(config.text.logistic.clone());
        model.fit(&x, &labels)?;
        info!(
            sentences = sentences.len(),
            vocabulary = vectorizer.get_feature_names().len(),
            train_accuracy = %format!("{:.3}", model.accuracy(&x, &labels)?),
            "Text monitor trained"
        );

        let explainer = LinearExplainer::for_logistic(&model, &x)?
            .with_feature_names(vectorizer.get_feature_names().to_vec());

        Ok(Self {
            vectorizer,
            model,
            explainer,
            config: config.text.clone(),
            plots_dir: config.paths.text_demo_plots(),
        })
    }

    pub fn vocabulary(&self) -> &[String] {
        self.vectorizer.get_feature_names()
    }

    /// Classify and attribute one sentence
    pub fn explain(&self, sentence: &str) -> Result<TextOutcome> {
        let x = self.vectorizer.transform(&[sentence])?;
        let row = x.row(0);
        if row.iter().all(|&v| v == 0.0) {
            return Ok(TextOutcome::NoKnownTokens);
        }

        let probability = self.model.predict_proba(&x)?[0];
        let phi = self.explainer.shap_values(&x)?;
        let tokens = row
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v != 0.0)
            .map(|(j, &tfidf)| TokenAttribution {
                token: self.vocabulary()[j].clone(),
                tfidf,
                attribution: phi[[0, j]],
            })
            .collect();

        Ok(TextOutcome::Explained(TextExplanation {
            probability,
            urgent: probability > self.config.urgent_threshold,
            tokens,
        }))
    }

    fn save_plot(&self, explanation: &TextExplanation, file: &str) -> Result<PathBuf> {
        let bars = explanation
            .tokens
            .iter()
            .map(|t| (t.token.clone(), t.attribution));
        let chart = BarChart::new("XAI 'Behind the Scenes': Which words triggered the 'Urgent' Alert?")
            .with_x_label("SHAP Value (Impact on Decision)")
            .with_colors(colors::RED, colors::BLUE)
            .with_bars(bars)
            .render();
        chart.save(&self.plots_dir.join(file))
    }

    /// Explain the configured demo sentence and plot it
    pub fn run_once(&self) -> Result<(TextOutcome, Option<PathBuf>)> {
        let sentence = self.config.demo_sentence.as_str();
        info!(sentence, "Explaining demo sentence");

        let outcome = self.explain(sentence)?;
        let plot = match &outcome {
            TextOutcome::Explained(explanation) => {
                let path = self.save_plot(explanation, DEMO_PLOT)?;
                info!(
                    probability = %format!("{:.3}", explanation.probability),
                    path = %path.display(),
                    "Text explanation saved"
                );
                Some(path)
            }
            TextOutcome::NoKnownTokens => None,
        };
        Ok((outcome, plot))
    }

    /// Line-oriented chat loop; returns the number of explained sentences
    pub fn run_interactive<R: BufRead, W: Write>(&self, input: R, mut output: W) -> Result<usize> {
        writeln!(
            output,
            "Describe how you feel. Type '{}' to exit.",
            self.config.quit_command
        )?;

        let mut explained = 0;
        for line in input.lines() {
            let line = line?;
            let sentence = line.trim();
            if sentence.eq_ignore_ascii_case(self.config.quit_command.trim()) {
                break;
            }
            if sentence.is_empty() {
                continue;
            }

            match self.explain(sentence)? {
                TextOutcome::NoKnownTokens => {
                    writeln!(
                        output,
                        "None of those words are known to the monitor. Please try different wording."
                    )?;
                }
                TextOutcome::Explained(explanation) => {
                    explained += 1;
                    let verdict = if explanation.urgent { "URGENT" } else { "normal" };
                    writeln!(
                        output,
                        "Assessment: {} (P(urgent) = {:.3})",
                        verdict, explanation.probability
                    )?;
                    if let Some(top) = explanation.strongest() {
                        writeln!(output, "Most influential word: '{}' ({:+.4})", top.token, top.attribution)?;
                    }
                    let path = self.save_plot(&explanation, &format!("chat_explanation_{}.png", explained))?;
                    writeln!(output, "Explanation plot: {}", path.display())?;
                    debug!(n = explained, path = %path.display(), "Chat explanation saved");
                }
            }
        }

        writeln!(output, "Goodbye.")?;
        Ok(explained)
    }
}
